//! Autenticación Bearer
//!
//! `AuthenticatedUser` es un extractor: valida el JWT, comprueba que la sesión
//! siga viva en el session cache y expone el `Actor` para los controllers.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::models::auth::{Actor, SessionInfo};
use crate::models::profile::Role;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};

/// Usuario autenticado que se inyecta en los handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    pub session_id: Uuid,
    pub email: String,
}

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.user_id,
            role: self.role,
        }
    }

    /// Rechazar si el rol no está entre los permitidos
    pub fn require_role(&self, allowed: &[Role], operation: &str) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(forbidden_error(operation, &format!("role '{}' is not allowed", self.role)))
        }
    }
}

impl From<SessionInfo> for AuthenticatedUser {
    fn from(session: SessionInfo) -> Self {
        Self {
            user_id: session.user_id,
            role: session.role,
            session_id: session.session_id,
            email: session.email,
        }
    }
}

/// Token del header `Authorization: Bearer`, o del query `access_token`
/// (EventSource no puede mandar headers)
fn bearer_token(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    from_header.or_else(|| {
        parts.uri.query().and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "access_token")
                .and_then(|(_, value)| urlencoding::decode(value).ok())
                .map(|token| token.into_owned())
        })
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

        let claims = state.jwt.validate_token(&token)?;

        let session_id = Uuid::parse_str(&claims.sid)
            .map_err(|_| AppError::Unauthorized("Invalid session id".to_string()))?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id".to_string()))?;

        let session = state
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired or signed out".to_string()))?;

        if session.user_id != user_id {
            return Err(AppError::Unauthorized("Session does not match token".to_string()));
        }

        Ok(session.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_bearer_token_from_header_or_query() {
        let with_header = parts(
            Request::builder()
                .uri("/api/home")
                .header(header::AUTHORIZATION, "Bearer abc.def")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&with_header).as_deref(), Some("abc.def"));

        let with_query = parts(
            Request::builder()
                .uri("/api/realtime/transport_requests?filter=status%3Deq.pending&access_token=xyz")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&with_query).as_deref(), Some("xyz"));

        let without = parts(Request::builder().uri("/api/home").body(()).unwrap());
        assert!(bearer_token(&without).is_none());
    }

    #[test]
    fn test_require_role() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            role: Role::Driver,
            session_id: Uuid::new_v4(),
            email: "motorista@ald.com.br".to_string(),
        };
        assert!(user.require_role(&[Role::Driver], "claim request").is_ok());
        assert!(matches!(
            user.require_role(&[Role::Controller], "resolve alert"),
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(user.actor().role, Role::Driver);
    }
}
