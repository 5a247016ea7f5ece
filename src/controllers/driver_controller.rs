use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::dto::driver_dto::{LocationRequest, UpsertDriverRequest};
use crate::models::auth::Actor;
use crate::models::driver::DriverDetails;
use crate::repositories::DriverRepository;
use crate::services::realtime_service::{ChangeFeed, ChangeKind, Entity};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub struct DriverController {
    drivers: Arc<dyn DriverRepository>,
    feed: ChangeFeed,
}

fn not_registered() -> AppError {
    AppError::NotFound("Driver has not registered a vehicle yet".to_string())
}

impl DriverController {
    pub fn new(state: &AppState) -> Self {
        Self {
            drivers: state.repos.drivers.clone(),
            feed: state.feed.clone(),
        }
    }

    pub async fn get(&self, actor: &Actor) -> AppResult<DriverDetails> {
        self.drivers
            .find_by_user(actor.id)
            .await?
            .ok_or_else(not_registered)
    }

    /// Ficha del driver si ya registró vehículo
    pub async fn find(&self, actor: &Actor) -> AppResult<Option<DriverDetails>> {
        self.drivers.find_by_user(actor.id).await
    }

    pub async fn upsert(&self, actor: &Actor, request: UpsertDriverRequest) -> AppResult<DriverDetails> {
        request.validate()?;

        let details = self
            .drivers
            .upsert_vehicle(actor.id, &request.into_vehicle(), Utc::now())
            .await?;

        info!("🚐 Vehículo {} registrado para {}", details.vehicle_plate, actor.id);
        self.feed.publish(Entity::Drivers, ChangeKind::Update, &details);
        Ok(details)
    }

    pub async fn set_availability(&self, actor: &Actor, is_available: bool) -> AppResult<DriverDetails> {
        let details = self
            .drivers
            .set_availability(actor.id, is_available, Utc::now())
            .await?
            .ok_or_else(not_registered)?;

        self.feed.publish(Entity::Drivers, ChangeKind::Update, &details);
        Ok(details)
    }

    pub async fn update_location(&self, actor: &Actor, request: LocationRequest) -> AppResult<DriverDetails> {
        request.validate()?;

        let details = self
            .drivers
            .update_location(actor.id, request.lat, request.lng, Utc::now())
            .await?
            .ok_or_else(not_registered)?;

        self.feed.publish(Entity::Drivers, ChangeKind::Update, &details);
        Ok(details)
    }
}
