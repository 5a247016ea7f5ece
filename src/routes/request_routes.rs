use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::TransportRequestController;
use crate::dto::request_dto::{ClaimResponse, CreateTransportRequest};
use crate::dto::{ApiResponse, ListQuery};
use crate::middleware::AuthenticatedUser;
use crate::models::transport_request::TransportRequest;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_request_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_request))
        .route("/pending", get(list_pending))
        .route("/mine", get(list_mine))
        .route("/:id", get(get_request))
        .route("/:id/claim", post(claim_request))
        .route("/:id/start", post(start_request))
        .route("/:id/complete", post(complete_request))
        .route("/:id/cancel", post(cancel_request))
}

async fn create_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateTransportRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TransportRequest>>), AppError> {
    let controller = TransportRequestController::new(&state);
    let created = controller.create(&user.actor(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(created, "Transport request created")),
    ))
}

async fn list_pending(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<TransportRequest>>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let requests = controller.list_pending(&user.actor(), query.limit()).await?;
    Ok(Json(ApiResponse::success(requests)))
}

async fn list_mine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<TransportRequest>>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let requests = controller.list_mine(&user.actor(), query.limit()).await?;
    Ok(Json(ApiResponse::success(requests)))
}

async fn get_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransportRequest>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let request = controller.get(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(request)))
}

async fn claim_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ClaimResponse>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let outcome = controller.claim(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

async fn start_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransportRequest>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let request = controller.start(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(request)))
}

async fn complete_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransportRequest>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let request = controller.complete(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(request)))
}

async fn cancel_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransportRequest>>, AppError> {
    let controller = TransportRequestController::new(&state);
    let request = controller.cancel(&user.actor(), id).await?;
    Ok(Json(ApiResponse::success(request)))
}
