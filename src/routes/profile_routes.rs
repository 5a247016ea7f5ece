use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap},
    routing::{get, put},
    Json, Router,
};

use crate::controllers::{HomeController, ProfileController};
use crate::dto::home_dto::HomeView;
use crate::dto::profile_dto::UpdateProfileRequest;
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::profile::Profile;
use crate::state::AppState;
use crate::utils::errors::AppError;

// Límite duro del body; el límite configurado lo aplica el controller
const AVATAR_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn create_profile_router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).patch(update_profile))
        .route(
            "/avatar",
            put(upload_avatar)
                .delete(remove_avatar)
                .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
}

pub fn create_home_router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = ProfileController::new(&state).get(&user.actor()).await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = ProfileController::new(&state)
        .update(&user.actor(), request)
        .await?;
    Ok(Json(ApiResponse::success_with_message(profile, "Profile updated")))
}

async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let profile = ProfileController::new(&state)
        .replace_avatar(&user.actor(), content_type, body)
        .await?;
    Ok(Json(ApiResponse::success_with_message(profile, "Avatar updated")))
}

async fn remove_avatar(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Profile>>, AppError> {
    let profile = ProfileController::new(&state)
        .remove_avatar(&user.actor())
        .await?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn home(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<HomeView>>, AppError> {
    let view = HomeController::new(&state).view(&user.actor()).await?;
    Ok(Json(ApiResponse::success(view)))
}
