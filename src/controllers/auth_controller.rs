//! Sign-up, sign-in y sign-out
//!
//! Cada sign-in abre una sesión nueva en el session cache; el JWT lleva su id
//! y deja de ser aceptado en cuanto la sesión se revoca.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cache::SessionCache;
use crate::dto::auth_dto::{normalize_email, SignInRequest, SignUpRequest};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::auth::{Session, SessionInfo, SessionUser, UserCredentials};
use crate::models::profile::{Profile, Role};
use crate::repositories::{ProfileRepository, UserRepository};
use crate::services::jwt_service::JwtService;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, validation_error, AppError, AppResult};

pub struct AuthController {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileRepository>,
    sessions: Arc<dyn SessionCache>,
    jwt: JwtService,
    bcrypt_cost: u32,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            users: state.repos.users.clone(),
            profiles: state.repos.profiles.clone(),
            sessions: state.sessions.clone(),
            jwt: state.jwt.clone(),
            bcrypt_cost: state.config.bcrypt_cost,
        }
    }

    /// Crear cuenta + perfil y abrir sesión
    pub async fn sign_up(&self, request: SignUpRequest) -> AppResult<Session> {
        request.validate()?;

        if request.role == Role::Controller {
            return Err(forbidden_error("sign up", "controller accounts are provisioned"));
        }

        let company_name = request
            .company_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        match (request.role, &company_name) {
            (Role::Company, None) => {
                return Err(validation_error("company_name", "Company name is required"))
            }
            (Role::Company, Some(_)) => {}
            (_, Some(_)) => {
                return Err(validation_error(
                    "company_name",
                    "Only company accounts have a company name",
                ))
            }
            (_, None) => {}
        }

        let email = normalize_email(&request.email);
        let password_hash = bcrypt::hash(&request.password, self.bcrypt_cost)
            .map_err(|e| AppError::Hash(e.to_string()))?;

        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let credentials = UserCredentials {
            id: user_id,
            email: email.clone(),
            password_hash,
            created_at: now,
        };
        let profile = Profile {
            id: user_id,
            email: email.clone(),
            full_name: request.full_name.trim().to_string(),
            phone: Some(request.phone.trim().to_string()),
            role: request.role,
            avatar_url: None,
            company_name,
            created_at: now,
            updated_at: now,
        };

        let profile = self.users.create_account(&credentials, &profile).await?;
        info!("👤 Cuenta creada: {} ({})", profile.email, profile.role);

        self.open_session(profile.id, &profile.email, profile.role).await
    }

    pub async fn sign_in(&self, request: SignInRequest) -> AppResult<Session> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let credentials = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        let valid = bcrypt::verify(&request.password, &credentials.password_hash)
            .map_err(|e| AppError::Hash(e.to_string()))?;
        if !valid {
            warn!("🔒 Contraseña incorrecta para {}", email);
            return Err(invalid_credentials());
        }

        let profile = self
            .profiles
            .find_by_id(credentials.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("User {} has no profile", credentials.id)))?;

        self.open_session(profile.id, &profile.email, profile.role).await
    }

    pub async fn sign_out(&self, user: &AuthenticatedUser) -> AppResult<()> {
        if self.sessions.revoke(user.session_id).await? {
            info!("👋 Sesión {} cerrada", user.session_id);
        }
        Ok(())
    }

    /// Sesión vigente del usuario autenticado
    pub async fn current(&self, user: &AuthenticatedUser) -> AppResult<SessionInfo> {
        self.sessions
            .get(user.session_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session expired or signed out".to_string()))
    }

    async fn open_session(&self, user_id: Uuid, email: &str, role: Role) -> AppResult<Session> {
        let session_id = Uuid::new_v4();
        let issued = self.jwt.issue(user_id, role, session_id)?;

        self.sessions
            .store(&SessionInfo {
                session_id,
                user_id,
                email: email.to_string(),
                role,
                created_at: Utc::now(),
                expires_at: issued.expires_at,
            })
            .await?;

        Ok(Session {
            access_token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            user: SessionUser {
                id: user_id,
                email: email.to_string(),
                role,
            },
        })
    }
}
