use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};

use crate::controllers::AuthController;
use crate::dto::auth_dto::{SignInRequest, SignUpRequest};
use crate::dto::ApiResponse;
use crate::middleware::{rate_limit_middleware, AuthenticatedUser};
use crate::models::auth::{Session, SessionInfo};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_auth_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        // Sólo los endpoints con credenciales pasan por el rate limit
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_middleware,
        ))
        .route("/sign-out", post(sign_out))
        .route("/session", get(current_session))
}

async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Session>>), AppError> {
    let session = AuthController::new(&state).sign_up(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(session, "Account created")),
    ))
}

async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> Result<Json<ApiResponse<Session>>, AppError> {
    let session = AuthController::new(&state).sign_in(request).await?;
    Ok(Json(ApiResponse::success(session)))
}

async fn sign_out(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<()>>, AppError> {
    AuthController::new(&state).sign_out(&user).await?;
    Ok(Json(ApiResponse::success_with_message((), "Signed out")))
}

async fn current_session(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let session = AuthController::new(&state).current(&user).await?;
    Ok(Json(ApiResponse::success(session)))
}
