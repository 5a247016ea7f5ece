use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};

use crate::controllers::DriverController;
use crate::dto::driver_dto::{AvailabilityRequest, LocationRequest, UpsertDriverRequest};
use crate::dto::ApiResponse;
use crate::middleware::AuthenticatedUser;
use crate::models::driver::DriverDetails;
use crate::models::profile::Role;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_driver_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_details).put(upsert_details))
        .route("/me/availability", put(set_availability))
        .route("/me/location", put(update_location))
}

async fn get_details(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<DriverDetails>>, AppError> {
    user.require_role(&[Role::Driver], "read driver details")?;
    let details = DriverController::new(&state).get(&user.actor()).await?;
    Ok(Json(ApiResponse::success(details)))
}

async fn upsert_details(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpsertDriverRequest>,
) -> Result<Json<ApiResponse<DriverDetails>>, AppError> {
    user.require_role(&[Role::Driver], "register vehicle")?;
    let details = DriverController::new(&state)
        .upsert(&user.actor(), request)
        .await?;
    Ok(Json(ApiResponse::success_with_message(details, "Vehicle registered")))
}

async fn set_availability(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<ApiResponse<DriverDetails>>, AppError> {
    user.require_role(&[Role::Driver], "change availability")?;
    let details = DriverController::new(&state)
        .set_availability(&user.actor(), request.is_available)
        .await?;
    Ok(Json(ApiResponse::success(details)))
}

async fn update_location(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<LocationRequest>,
) -> Result<Json<ApiResponse<DriverDetails>>, AppError> {
    user.require_role(&[Role::Driver], "report location")?;
    let details = DriverController::new(&state)
        .update_location(&user.actor(), request)
        .await?;
    Ok(Json(ApiResponse::success(details)))
}
