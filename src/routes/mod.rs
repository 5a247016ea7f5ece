//! Routers HTTP
//!
//! Un router por recurso; `create_router` los monta con las capas comunes.

pub mod alert_routes;
pub mod auth_routes;
pub mod driver_routes;
pub mod health_routes;
pub mod profile_routes;
pub mod realtime_routes;
pub mod request_routes;
pub mod storage_routes;

use axum::{error_handling::HandleErrorLayer, routing::get, BoxError, Router};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::middleware::cors_layer;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Tiempo máximo de un request de la API (no aplica al SSE)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

async fn handle_timeout_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::ServiceUnavailable("Request timed out".to_string())
    } else {
        AppError::Internal(err.to_string())
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/api/auth", auth_routes::create_auth_router(&state))
        .nest("/api/requests", request_routes::create_request_router())
        .nest("/api/profile", profile_routes::create_profile_router())
        .nest("/api/home", profile_routes::create_home_router())
        .nest("/api/alerts", alert_routes::create_alert_router())
        .nest("/api/drivers", driver_routes::create_driver_router())
        .route("/api/storage/*key", get(storage_routes::get_blob))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(REQUEST_TIMEOUT),
        );

    Router::new()
        .route("/health", get(health_routes::health))
        .route("/metrics", get(health_routes::metrics))
        .merge(api)
        .nest("/api/realtime", realtime_routes::create_realtime_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}
