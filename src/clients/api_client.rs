//! Cliente HTTP tipado del backend ALD Transport
//!
//! Lo usan las apps (empresa, driver, controlador) y los tests de integración.
//! El token se toma del [`SessionState`]; un 401 del servidor cierra la sesión.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clients::session_state::SessionState;
use crate::dto::auth_dto::{SignInRequest, SignUpRequest};
use crate::dto::home_dto::HomeView;
use crate::dto::profile_dto::UpdateProfileRequest;
use crate::dto::request_dto::{ClaimOutcome, ClaimResponse, CreateTransportRequest};
use crate::dto::ApiResponse;
use crate::models::auth::Session;
use crate::models::profile::Profile;
use crate::models::transport_request::TransportRequest;
use crate::services::realtime_service::{ChangeEvent, ChangeKind, Entity, FieldFilter};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not signed in")]
    SignedOut,

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    message: String,
    #[serde(default)]
    code: Option<String>,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionState,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: SessionState::new(),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    // ==================== AUTH ====================

    pub async fn sign_up(&self, request: &SignUpRequest) -> ClientResult<Session> {
        let session: Session = self
            .send(self.http.post(self.url("/api/auth/sign-up")).json(request))
            .await?;
        self.session.signed_in(session.clone());
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ClientResult<Session> {
        let body = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session: Session = self
            .send(self.http.post(self.url("/api/auth/sign-in")).json(&body))
            .await?;
        self.session.signed_in(session.clone());
        Ok(session)
    }

    /// Cierra la sesión local aunque el servidor falle
    pub async fn sign_out(&self) -> ClientResult<()> {
        let result = match self.authorized(self.http.post(self.url("/api/auth/sign-out"))) {
            Ok(request) => self.send_empty(request).await,
            Err(e) => Err(e),
        };
        self.session.signed_out();
        result
    }

    // ==================== SOLICITUDES ====================

    pub async fn create_request(
        &self,
        request: &CreateTransportRequest,
    ) -> ClientResult<TransportRequest> {
        let builder = self.authorized(self.http.post(self.url("/api/requests")).json(request))?;
        self.send(builder).await
    }

    pub async fn get_request(&self, id: Uuid) -> ClientResult<TransportRequest> {
        let builder = self.authorized(self.http.get(self.url(&format!("/api/requests/{}", id))))?;
        self.send(builder).await
    }

    pub async fn pending_requests(&self) -> ClientResult<Vec<TransportRequest>> {
        let builder = self.authorized(self.http.get(self.url("/api/requests/pending")))?;
        self.send(builder).await
    }

    pub async fn my_requests(&self) -> ClientResult<Vec<TransportRequest>> {
        let builder = self.authorized(self.http.get(self.url("/api/requests/mine")))?;
        self.send(builder).await
    }

    pub async fn claim(&self, id: Uuid) -> ClientResult<ClaimOutcome> {
        let response: ClaimResponse = self.lifecycle(id, "claim").await?;
        Ok(response.into())
    }

    pub async fn start(&self, id: Uuid) -> ClientResult<TransportRequest> {
        self.lifecycle(id, "start").await
    }

    pub async fn complete(&self, id: Uuid) -> ClientResult<TransportRequest> {
        self.lifecycle(id, "complete").await
    }

    pub async fn cancel(&self, id: Uuid) -> ClientResult<TransportRequest> {
        self.lifecycle(id, "cancel").await
    }

    async fn lifecycle<T: DeserializeOwned>(&self, id: Uuid, action: &str) -> ClientResult<T> {
        let path = format!("/api/requests/{}/{}", id, action);
        let builder = self.authorized(self.http.post(self.url(&path)))?;
        self.send(builder).await
    }

    // ==================== PERFIL ====================

    pub async fn profile(&self) -> ClientResult<Profile> {
        let builder = self.authorized(self.http.get(self.url("/api/profile")))?;
        self.send(builder).await
    }

    pub async fn update_profile(&self, changes: &UpdateProfileRequest) -> ClientResult<Profile> {
        let builder = self.authorized(self.http.patch(self.url("/api/profile")).json(changes))?;
        self.send(builder).await
    }

    pub async fn upload_avatar(
        &self,
        content_type: &str,
        data: impl Into<Bytes>,
    ) -> ClientResult<Profile> {
        let builder = self.authorized(
            self.http
                .put(self.url("/api/profile/avatar"))
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(data.into()),
        )?;
        self.send(builder).await
    }

    /// Descargar un blob a partir de la URL pública guardada en el perfil
    pub async fn fetch_blob(&self, public_url: &str) -> ClientResult<Bytes> {
        let response = self.http.get(self.url(public_url)).send().await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }
        Ok(response.bytes().await?)
    }

    pub async fn home(&self) -> ClientResult<HomeView> {
        let builder = self.authorized(self.http.get(self.url("/api/home")))?;
        self.send(builder).await
    }

    // ==================== REALTIME ====================

    /// Suscribirse a los cambios de una entidad. El stream termina al cerrar
    /// la conexión; hacer drop del stream cancela la suscripción.
    pub async fn subscribe(
        &self,
        entity: Entity,
        kinds: &[ChangeKind],
        filter: Option<&FieldFilter>,
    ) -> ClientResult<impl Stream<Item = ClientResult<ChangeEvent>>> {
        let events = kinds
            .iter()
            .map(|kind| match kind {
                ChangeKind::Insert => "insert",
                ChangeKind::Update => "update",
            })
            .collect::<Vec<_>>()
            .join(",");

        let mut query = vec![("events", events)];
        if let Some(filter) = filter {
            query.push(("filter", filter.to_string()));
        }

        let path = format!("/api/realtime/{}", entity.as_str());
        let builder = self.authorized(self.http.get(self.url(&path)).query(&query))?;
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        debug!("📡 Suscrito a {}", entity);
        let mut body = Box::pin(response.bytes_stream());

        Ok(async_stream::try_stream! {
            let mut buffer = String::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some((frame, rest)) = split_frame(&buffer) {
                    let event = parse_frame(&frame)?;
                    buffer = rest;
                    if let Some(event) = event {
                        yield event;
                    }
                }
            }
        })
    }

    /// Suscripción al tablero de pendientes de un driver
    pub async fn subscribe_pending(
        &self,
    ) -> ClientResult<impl Stream<Item = ClientResult<ChangeEvent>>> {
        self.subscribe(
            Entity::TransportRequests,
            &[ChangeKind::Insert, ChangeKind::Update],
            None,
        )
        .await
    }

    // ==================== HELPERS ====================

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.session.access_token().ok_or(ClientError::SignedOut)?;
        Ok(builder.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }

        let body: ApiResponse<T> = response.json().await?;
        body.data
            .ok_or_else(|| ClientError::Decode("response without data".to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> ClientResult<()> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(self.api_error(response).await);
        }
        Ok(())
    }

    async fn api_error(&self, response: reqwest::Response) -> ClientError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.signed_out();
        }

        match response.json::<ApiErrorBody>().await {
            Ok(body) => {
                warn!("❌ API {}: {}", status, body.message);
                ClientError::Api {
                    status: status.as_u16(),
                    code: body.code.unwrap_or(body.error),
                    message: body.message,
                }
            }
            Err(_) => ClientError::Api {
                status: status.as_u16(),
                code: status.canonical_reason().unwrap_or("UNKNOWN").to_string(),
                message: format!("HTTP {}", status),
            },
        }
    }
}

/// Separa el primer frame SSE completo del buffer
fn split_frame(buffer: &str) -> Option<(String, String)> {
    let normalized = buffer.replace("\r\n", "\n");
    normalized
        .split_once("\n\n")
        .map(|(frame, rest)| (frame.to_string(), rest.to_string()))
}

/// Interpreta un frame SSE; los keep-alive y frames sin `data` se ignoran
fn parse_frame(frame: &str) -> ClientResult<Option<ChangeEvent>> {
    let data = frame
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n");

    if data.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&data)
        .map(Some)
        .map_err(|e| ClientError::Decode(format!("invalid change event: {}", e)))
}
