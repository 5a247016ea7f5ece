use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::AlertController;
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::alert::{Alert, AlertFilters};
use crate::models::profile::Role;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_alert_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_alerts))
        .route("/:id/resolve", post(resolve_alert))
}

async fn list_alerts(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(filters): Query<AlertFilters>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    user.require_role(&[Role::Controller], "list alerts")?;
    let alerts = AlertController::new(&state).list(&filters).await?;
    Ok(Json(ApiResponse::success(alerts)))
}

async fn resolve_alert(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    user.require_role(&[Role::Controller], "resolve alert")?;
    let alert = AlertController::new(&state).resolve(id).await?;
    Ok(Json(ApiResponse::success_with_message(alert, "Alert resolved")))
}
