use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::alert::{Alert, AlertFilters};
use crate::repositories::AlertRepository;
use crate::services::realtime_service::{ChangeFeed, ChangeKind, Entity};
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError, AppResult};

pub struct AlertController {
    alerts: Arc<dyn AlertRepository>,
    feed: ChangeFeed,
}

impl AlertController {
    pub fn new(state: &AppState) -> Self {
        Self {
            alerts: state.repos.alerts.clone(),
            feed: state.feed.clone(),
        }
    }

    pub async fn list(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>> {
        self.alerts.list(filters).await
    }

    /// Resolver una alerta; resolverla dos veces es un conflicto
    pub async fn resolve(&self, id: Uuid) -> AppResult<Alert> {
        if let Some(resolved) = self.alerts.resolve(id, Utc::now()).await? {
            info!("✅ Alerta {} resuelta", id);
            self.feed.publish(Entity::Alerts, ChangeKind::Update, &resolved);
            return Ok(resolved);
        }

        match self.alerts.find_by_id(id).await? {
            Some(_) => Err(AppError::Conflict(format!("Alert {} is already resolved", id))),
            None => Err(not_found_error("Alert", &id.to_string())),
        }
    }
}
