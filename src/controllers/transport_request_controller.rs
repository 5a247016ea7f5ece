//! Casos de uso de TransportRequest
//!
//! Crear, listar y mover solicitudes por su ciclo de vida. Cada transición
//! lee el registro, calcula el cambio con `TransportRequest::apply` y lo
//! escribe con compare-and-set usando el guard del registro leído.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;
use validator::Validate;

use crate::dto::request_dto::{ClaimOutcome, CreateTransportRequest};
use crate::models::auth::Actor;
use crate::models::profile::Role;
use crate::models::transport_request::{
    LifecycleError, RequestEvent, RequestStatus, TransportRequest,
};
use crate::repositories::{DriverRepository, RequestFilters, TransportRequestRepository};
use crate::services::metrics::Metrics;
use crate::services::realtime_service::{ChangeFeed, ChangeKind, Entity};
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, not_found_error, AppError, AppResult};

pub struct TransportRequestController {
    requests: Arc<dyn TransportRequestRepository>,
    drivers: Arc<dyn DriverRepository>,
    feed: ChangeFeed,
    metrics: Arc<Metrics>,
}

fn lifecycle_error(err: LifecycleError) -> AppError {
    match err {
        LifecycleError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
        LifecycleError::RoleNotAllowed { .. }
        | LifecycleError::NotBoundDriver { .. }
        | LifecycleError::NotAllowedToCancel => AppError::Forbidden(err.to_string()),
    }
}

impl TransportRequestController {
    pub fn new(state: &AppState) -> Self {
        Self {
            requests: state.repos.requests.clone(),
            drivers: state.repos.drivers.clone(),
            feed: state.feed.clone(),
            metrics: state.metrics.clone(),
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateTransportRequest,
    ) -> AppResult<TransportRequest> {
        if !actor.role.is_requester() {
            return Err(forbidden_error(
                "create transport request",
                &format!("role '{}' cannot request transport", actor.role),
            ));
        }

        request.validate()?;

        let record = TransportRequest::new_pending(request.into_new(actor.id), Utc::now());
        let created = self.requests.insert(&record).await?;

        self.metrics.request_created();
        self.feed
            .publish(Entity::TransportRequests, ChangeKind::Insert, &created);
        info!(
            "🆕 Solicitud {} creada por {} ({} pasajeros, {} paradas)",
            created.id,
            actor.id,
            created.num_passengers,
            created.destinations.len()
        );

        Ok(created)
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> AppResult<TransportRequest> {
        let request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("TransportRequest", &id.to_string()))?;

        if !request.is_visible_to(actor) {
            return Err(forbidden_error("read request", "not a participant"));
        }

        Ok(request)
    }

    /// Tablero de pendientes, más recientes primero
    pub async fn list_pending(&self, actor: &Actor, limit: i64) -> AppResult<Vec<TransportRequest>> {
        if !matches!(actor.role, Role::Driver | Role::Controller) {
            return Err(forbidden_error("list pending requests", "only drivers and controllers"));
        }

        self.requests
            .list(&RequestFilters::pending().limit(limit))
            .await
    }

    /// Historial propio: solicitudes creadas (requester) o asignadas (driver)
    pub async fn list_mine(&self, actor: &Actor, limit: i64) -> AppResult<Vec<TransportRequest>> {
        let filters = match actor.role {
            Role::Company | Role::Passenger => RequestFilters::default().company(actor.id),
            Role::Driver => RequestFilters::default().driver(actor.id),
            Role::Controller => {
                return Err(forbidden_error("list own requests", "controllers have no history"))
            }
        };

        self.requests.list(&filters.limit(limit)).await
    }

    /// Viajes no terminados de un driver
    pub async fn list_driver_active(&self, driver_id: Uuid) -> AppResult<Vec<TransportRequest>> {
        let filters = RequestFilters::default()
            .driver(driver_id)
            .statuses(vec![RequestStatus::Accepted, RequestStatus::InProgress]);
        self.requests.list(&filters).await
    }

    /// Todas las solicitudes no terminadas (vista de controller)
    pub async fn list_active(&self, limit: i64) -> AppResult<Vec<TransportRequest>> {
        let filters = RequestFilters::default()
            .statuses(RequestStatus::active().to_vec())
            .limit(limit);
        self.requests.list(&filters).await
    }

    /// Reclamar una solicitud pendiente. Sólo un driver gana; el resto recibe
    /// `Unavailable`.
    pub async fn claim(&self, actor: &Actor, id: Uuid) -> AppResult<ClaimOutcome> {
        let Some(request) = self.requests.find_by_id(id).await? else {
            return Err(not_found_error("TransportRequest", &id.to_string()));
        };

        let change = match request.apply(RequestEvent::Claim, actor, Utc::now()) {
            Ok(change) => change,
            Err(LifecycleError::InvalidTransition { from, .. }) => {
                debug!("Solicitud {} ya no está pendiente ({})", id, from);
                self.metrics.claim("unavailable");
                return Ok(ClaimOutcome::Unavailable);
            }
            Err(e) => return Err(lifecycle_error(e)),
        };

        match self.requests.compare_and_set(id, request.guard(), &change).await? {
            Some(claimed) => {
                self.metrics.claim("accepted");
                self.metrics.transition(claimed.status);
                self.feed
                    .publish(Entity::TransportRequests, ChangeKind::Update, &claimed);
                info!("✅ Solicitud {} aceptada por el driver {}", id, actor.id);
                Ok(ClaimOutcome::Accepted(claimed))
            }
            None => {
                info!("🏁 Driver {} perdió la solicitud {}", actor.id, id);
                self.metrics.claim("unavailable");
                Ok(ClaimOutcome::Unavailable)
            }
        }
    }

    pub async fn start(&self, actor: &Actor, id: Uuid) -> AppResult<TransportRequest> {
        self.transition(actor, id, RequestEvent::Start).await
    }

    pub async fn complete(&self, actor: &Actor, id: Uuid) -> AppResult<TransportRequest> {
        let completed = self.transition(actor, id, RequestEvent::Complete).await?;
        // El viaje ya quedó completado; el contador no puede revertirlo
        if let Err(e) = self.drivers.increment_trips(actor.id, completed.updated_at).await {
            error!("❌ No se pudo sumar el viaje {} al driver {}: {}", id, actor.id, e);
        }
        Ok(completed)
    }

    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> AppResult<TransportRequest> {
        self.transition(actor, id, RequestEvent::Cancel).await
    }

    async fn transition(
        &self,
        actor: &Actor,
        id: Uuid,
        event: RequestEvent,
    ) -> AppResult<TransportRequest> {
        let request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("TransportRequest", &id.to_string()))?;

        let change = request
            .apply(event, actor, Utc::now())
            .map_err(lifecycle_error)?;

        let updated = self
            .requests
            .compare_and_set(id, request.guard(), &change)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Request {} was modified concurrently", id))
            })?;

        self.metrics.transition(updated.status);
        self.feed
            .publish(Entity::TransportRequests, ChangeKind::Update, &updated);
        info!("🔄 Solicitud {}: {} -> {} ({})", id, request.status, updated.status, event);

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use tokio::sync::Barrier;

    use crate::cache::MemorySessionCache;
    use crate::config::EnvironmentConfig;
    use crate::models::driver::{DriverDetails, DriverVehicle};
    use crate::models::transport_request::{
        Destination, LifecycleChange, NewTransportRequest, TransitionGuard, VehicleType,
    };
    use crate::repositories::{MemoryStore, Repositories};
    use crate::storage::MemoryBlobStore;

    /// Hace que dos lecturas concurrentes vean el mismo registro antes de
    /// que cualquiera de las dos escriba
    struct RacingReads {
        inner: Arc<dyn TransportRequestRepository>,
        barrier: Barrier,
    }

    #[async_trait]
    impl TransportRequestRepository for RacingReads {
        async fn insert(&self, request: &TransportRequest) -> AppResult<TransportRequest> {
            self.inner.insert(request).await
        }

        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TransportRequest>> {
            let found = self.inner.find_by_id(id).await?;
            self.barrier.wait().await;
            Ok(found)
        }

        async fn list(&self, filters: &RequestFilters) -> AppResult<Vec<TransportRequest>> {
            self.inner.list(filters).await
        }

        async fn compare_and_set(
            &self,
            id: Uuid,
            guard: TransitionGuard,
            change: &LifecycleChange,
        ) -> AppResult<Option<TransportRequest>> {
            self.inner.compare_and_set(id, guard, change).await
        }

        async fn list_stale_pending(
            &self,
            created_before: DateTime<Utc>,
        ) -> AppResult<Vec<TransportRequest>> {
            self.inner.list_stale_pending(created_before).await
        }

        async fn mark_alert_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
            self.inner.mark_alert_sent(id, at).await
        }

        async fn clear_alert_sent(&self, id: Uuid) -> AppResult<()> {
            self.inner.clear_alert_sent(id).await
        }
    }

    struct BrokenDrivers;

    #[async_trait]
    impl DriverRepository for BrokenDrivers {
        async fn find_by_user(&self, _user_id: Uuid) -> AppResult<Option<DriverDetails>> {
            Ok(None)
        }

        async fn upsert_vehicle(
            &self,
            _user_id: Uuid,
            _vehicle: &DriverVehicle,
            _now: DateTime<Utc>,
        ) -> AppResult<DriverDetails> {
            Err(AppError::Internal("connection reset".to_string()))
        }

        async fn set_availability(
            &self,
            _user_id: Uuid,
            _is_available: bool,
            _now: DateTime<Utc>,
        ) -> AppResult<Option<DriverDetails>> {
            Err(AppError::Internal("connection reset".to_string()))
        }

        async fn update_location(
            &self,
            _user_id: Uuid,
            _lat: f64,
            _lng: f64,
            _now: DateTime<Utc>,
        ) -> AppResult<Option<DriverDetails>> {
            Err(AppError::Internal("connection reset".to_string()))
        }

        async fn increment_trips(&self, _user_id: Uuid, _now: DateTime<Utc>) -> AppResult<()> {
            Err(AppError::Internal("connection reset".to_string()))
        }
    }

    fn pending_request() -> TransportRequest {
        TransportRequest::new_pending(
            NewTransportRequest {
                company_id: Uuid::new_v4(),
                origin_address: "Av. Paulista, 1000".to_string(),
                origin_lat: -23.5614,
                origin_lng: -46.6559,
                destinations: vec![Destination {
                    address: "Aeroporto de Congonhas".to_string(),
                    lat: -23.6273,
                    lng: -46.6566,
                }],
                num_passengers: 1,
                vehicle_type: VehicleType::Sedan,
                scheduled_time: None,
                notes: None,
                distance_km: None,
                estimated_duration_minutes: None,
            },
            Utc::now(),
        )
    }

    fn driver() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role: Role::Driver,
        }
    }

    fn state_with(repos: Repositories) -> AppState {
        AppState::new(
            EnvironmentConfig::default(),
            repos,
            Arc::new(MemorySessionCache::new()),
            Arc::new(MemoryBlobStore::new()),
        )
        .unwrap()
    }

    fn racing_state(store: Arc<dyn TransportRequestRepository>) -> AppState {
        let repos = Repositories {
            requests: Arc::new(RacingReads {
                inner: store,
                barrier: Barrier::new(2),
            }),
            ..Repositories::in_memory()
        };
        state_with(repos)
    }

    #[tokio::test]
    async fn test_claims_reading_same_snapshot_have_one_winner() {
        let store: Arc<dyn TransportRequestRepository> = Arc::new(MemoryStore::new());
        let request = store.insert(&pending_request()).await.unwrap();
        let controller = TransportRequestController::new(&racing_state(store.clone()));
        let (first, second) = (driver(), driver());

        let (a, b) = tokio::join!(
            controller.claim(&first, request.id),
            controller.claim(&second, request.id)
        );

        let outcomes = [a.unwrap(), b.unwrap()];
        let winners: Vec<&TransportRequest> = outcomes
            .iter()
            .filter_map(|o| match o {
                ClaimOutcome::Accepted(r) => Some(r),
                ClaimOutcome::Unavailable => None,
            })
            .collect();
        assert_eq!(winners.len(), 1);
        assert!(outcomes.iter().any(|o| matches!(o, ClaimOutcome::Unavailable)));

        let stored = store.find_by_id(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Accepted);
        assert_eq!(stored.driver_id, winners[0].driver_id);
    }

    #[tokio::test]
    async fn test_concurrent_start_loses_with_conflict() {
        let store: Arc<dyn TransportRequestRepository> = Arc::new(MemoryStore::new());
        let request = store.insert(&pending_request()).await.unwrap();
        let bound = driver();
        let change = request.apply(RequestEvent::Claim, &bound, Utc::now()).unwrap();
        store
            .compare_and_set(request.id, request.guard(), &change)
            .await
            .unwrap()
            .unwrap();

        let controller = TransportRequestController::new(&racing_state(store.clone()));
        let (a, b) = tokio::join!(
            controller.start(&bound, request.id),
            controller.start(&bound, request.id)
        );

        let results = [a, b];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
    }

    #[tokio::test]
    async fn test_complete_survives_trip_counter_failure() {
        let repos = Repositories {
            drivers: Arc::new(BrokenDrivers),
            ..Repositories::in_memory()
        };
        let state = state_with(repos);
        let request = state.repos.requests.insert(&pending_request()).await.unwrap();
        let controller = TransportRequestController::new(&state);
        let bound = driver();

        assert!(matches!(
            controller.claim(&bound, request.id).await.unwrap(),
            ClaimOutcome::Accepted(_)
        ));
        controller.start(&bound, request.id).await.unwrap();
        let completed = controller.complete(&bound, request.id).await.unwrap();

        assert_eq!(completed.status, RequestStatus::Completed);
        assert!(completed.completed_at.is_some());
    }
}
