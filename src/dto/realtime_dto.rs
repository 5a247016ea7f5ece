use serde::{Deserialize, Serialize};

use crate::services::realtime_service::{ChangeKind, Entity, FieldFilter, SubscriptionSpec};
use crate::utils::errors::{AppError, AppResult};

// Query de `GET /api/realtime/:entity?filter=status=eq.pending&events=insert,update`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeQuery {
    pub filter: Option<String>,
    pub events: Option<String>,
}

impl RealtimeQuery {
    pub fn into_spec(self, entity: &str) -> AppResult<SubscriptionSpec> {
        let entity = Entity::from_str(entity)
            .ok_or_else(|| AppError::NotFound(format!("Unknown realtime entity '{}'", entity)))?;

        let mut spec = SubscriptionSpec::new(entity);

        if let Some(events) = self.events.filter(|e| !e.trim().is_empty()) {
            let kinds = events
                .split(',')
                .map(|raw| {
                    ChangeKind::from_str(raw)
                        .ok_or_else(|| AppError::BadRequest(format!("Unknown event '{}'", raw.trim())))
                })
                .collect::<AppResult<Vec<_>>>()?;
            spec = spec.kinds(kinds);
        }

        if let Some(filter) = self.filter.filter(|f| !f.trim().is_empty()) {
            spec = spec.filter(FieldFilter::parse(&filter)?);
        }

        Ok(spec)
    }
}
