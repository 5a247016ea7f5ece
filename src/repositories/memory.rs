//! Store en memoria
//!
//! Implementa todos los repositorios sobre un único `RwLock`, de modo que
//! cada compare-and-set es atómico. Se usa cuando no hay `DATABASE_URL`
//! (desarrollo local) y en los tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::alert::{Alert, AlertFilters};
use crate::models::auth::UserCredentials;
use crate::models::driver::{DriverDetails, DriverVehicle};
use crate::models::profile::{Profile, ProfileChanges};
use crate::models::transport_request::{LifecycleChange, RequestStatus, TransitionGuard, TransportRequest};
use crate::repositories::alert_repository::AlertRepository;
use crate::repositories::driver_repository::DriverRepository;
use crate::repositories::profile_repository::ProfileRepository;
use crate::repositories::transport_request_repository::{RequestFilters, TransportRequestRepository};
use crate::repositories::user_repository::UserRepository;
use crate::utils::errors::{conflict_error, AppResult};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserCredentials>,
    profiles: HashMap<Uuid, Profile>,
    requests: HashMap<Uuid, TransportRequest>,
    alerts: HashMap<Uuid, Alert>,
    drivers: HashMap<Uuid, DriverDetails>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut items: Vec<T>, created_at: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

#[async_trait]
impl TransportRequestRepository for MemoryStore {
    async fn insert(&self, request: &TransportRequest) -> AppResult<TransportRequest> {
        let mut tables = self.tables.write().await;
        if tables.requests.contains_key(&request.id) {
            return Err(conflict_error("TransportRequest", "id", &request.id.to_string()));
        }
        tables.requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TransportRequest>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn list(&self, filters: &RequestFilters) -> AppResult<Vec<TransportRequest>> {
        let tables = self.tables.read().await;
        let matching: Vec<TransportRequest> = tables
            .requests
            .values()
            .filter(|r| filters.matches(r))
            .cloned()
            .collect();

        let mut sorted = newest_first(matching, |r| r.created_at);
        if let Some(limit) = filters.limit {
            sorted.truncate(limit.max(0) as usize);
        }
        Ok(sorted)
    }

    async fn compare_and_set(
        &self,
        id: Uuid,
        guard: TransitionGuard,
        change: &LifecycleChange,
    ) -> AppResult<Option<TransportRequest>> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.requests.get_mut(&id) else {
            return Ok(None);
        };

        if current.status != guard.expected_status || current.driver_id != guard.expected_driver {
            return Ok(None);
        }

        *current = current.clone().with_change(change.clone());
        Ok(Some(current.clone()))
    }

    async fn list_stale_pending(
        &self,
        created_before: DateTime<Utc>,
    ) -> AppResult<Vec<TransportRequest>> {
        let tables = self.tables.read().await;
        let mut stale: Vec<TransportRequest> = tables
            .requests
            .values()
            .filter(|r| {
                r.status == RequestStatus::Pending
                    && r.alert_sent_at.is_none()
                    && r.created_at < created_before
            })
            .cloned()
            .collect();
        stale.sort_by_key(|r| r.created_at);
        Ok(stale)
    }

    async fn mark_alert_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.requests.get_mut(&id) {
            Some(request)
                if request.status == RequestStatus::Pending && request.alert_sent_at.is_none() =>
            {
                request.alert_sent_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn clear_alert_sent(&self, id: Uuid) -> AppResult<()> {
        if let Some(request) = self.tables.write().await.requests.get_mut(&id) {
            request.alert_sent_at = None;
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let mut tables = self.tables.write().await;
        let Some(profile) = tables.profiles.get_mut(&id) else {
            return Ok(None);
        };
        *profile = profile.clone().apply_changes(changes, now);
        Ok(Some(profile.clone()))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_account(
        &self,
        credentials: &UserCredentials,
        profile: &Profile,
    ) -> AppResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&credentials.email) {
            return Err(conflict_error("User", "email", &credentials.email));
        }
        tables.users.insert(credentials.email.clone(), credentials.clone());
        tables.profiles.insert(profile.id, profile.clone());
        Ok(profile.clone())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(self.tables.read().await.users.get(email).cloned())
    }
}

#[async_trait]
impl AlertRepository for MemoryStore {
    async fn insert(&self, alert: &Alert) -> AppResult<Alert> {
        let mut tables = self.tables.write().await;
        tables.alerts.insert(alert.id, alert.clone());
        Ok(alert.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Alert>> {
        Ok(self.tables.read().await.alerts.get(&id).cloned())
    }

    async fn list(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>> {
        let tables = self.tables.read().await;
        let unresolved_only = filters.unresolved_only.unwrap_or(false);
        let matching: Vec<Alert> = tables
            .alerts
            .values()
            .filter(|a| !unresolved_only || !a.is_resolved)
            .filter(|a| filters.request_id.map_or(true, |id| a.request_id == id))
            .cloned()
            .collect();
        Ok(newest_first(matching, |a| a.created_at))
    }

    async fn resolve(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Alert>> {
        let mut tables = self.tables.write().await;
        match tables.alerts.get_mut(&id) {
            Some(alert) if !alert.is_resolved => {
                alert.is_resolved = true;
                alert.resolved_at = Some(at);
                Ok(Some(alert.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl DriverRepository for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<DriverDetails>> {
        Ok(self.tables.read().await.drivers.get(&user_id).cloned())
    }

    async fn upsert_vehicle(
        &self,
        user_id: Uuid,
        vehicle: &DriverVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<DriverDetails> {
        let mut tables = self.tables.write().await;
        let details = match tables.drivers.remove(&user_id) {
            Some(existing) => DriverDetails {
                driver_license: vehicle.driver_license.clone(),
                vehicle_model: vehicle.vehicle_model.clone(),
                vehicle_plate: vehicle.vehicle_plate.clone(),
                vehicle_color: vehicle.vehicle_color.clone(),
                vehicle_type: vehicle.vehicle_type,
                updated_at: now,
                ..existing
            },
            None => DriverDetails::new(user_id, vehicle.clone(), now),
        };
        tables.drivers.insert(user_id, details.clone());
        Ok(details)
    }

    async fn set_availability(
        &self,
        user_id: Uuid,
        is_available: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DriverDetails>> {
        let mut tables = self.tables.write().await;
        Ok(tables.drivers.get_mut(&user_id).map(|driver| {
            driver.is_available = is_available;
            driver.updated_at = now;
            driver.clone()
        }))
    }

    async fn update_location(
        &self,
        user_id: Uuid,
        lat: f64,
        lng: f64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DriverDetails>> {
        let mut tables = self.tables.write().await;
        Ok(tables.drivers.get_mut(&user_id).map(|driver| {
            driver.current_location_lat = Some(lat);
            driver.current_location_lng = Some(lng);
            driver.updated_at = now;
            driver.clone()
        }))
    }

    async fn increment_trips(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(driver) = tables.drivers.get_mut(&user_id) {
            driver.total_trips += 1;
            driver.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Actor;
    use crate::models::profile::Role;
    use crate::models::transport_request::{
        Destination, NewTransportRequest, RequestEvent, VehicleType,
    };

    fn pending(now: DateTime<Utc>) -> TransportRequest {
        TransportRequest::new_pending(
            NewTransportRequest {
                company_id: Uuid::new_v4(),
                origin_address: "Rua Augusta, 500".to_string(),
                origin_lat: -23.5537,
                origin_lng: -46.6546,
                destinations: vec![Destination {
                    address: "Estação da Luz".to_string(),
                    lat: -23.5347,
                    lng: -46.6354,
                }],
                num_passengers: 4,
                vehicle_type: VehicleType::Van,
                scheduled_time: None,
                notes: None,
                distance_km: None,
                estimated_duration_minutes: None,
            },
            now,
        )
    }

    fn driver() -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role: Role::Driver,
        }
    }

    #[tokio::test]
    async fn test_second_write_with_same_guard_is_rejected() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let request = TransportRequestRepository::insert(&store, &pending(now)).await.unwrap();
        let (first, second) = (driver(), driver());

        let guard = request.guard();
        let first_change = request.apply(RequestEvent::Claim, &first, now).unwrap();
        let second_change = request.apply(RequestEvent::Claim, &second, now).unwrap();

        let won = store.compare_and_set(request.id, guard, &first_change).await.unwrap();
        assert_eq!(won.map(|r| r.driver_id), Some(Some(first.id)));

        let lost = store.compare_and_set(request.id, guard, &second_change).await.unwrap();
        assert!(lost.is_none());

        let stored = TransportRequestRepository::find_by_id(&store, request.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Accepted);
        assert_eq!(stored.driver_id, Some(first.id));
    }

    #[tokio::test]
    async fn test_alert_mark_requires_pending_status() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let request = TransportRequestRepository::insert(&store, &pending(now)).await.unwrap();
        let change = request.apply(RequestEvent::Claim, &driver(), now).unwrap();
        store
            .compare_and_set(request.id, request.guard(), &change)
            .await
            .unwrap();

        assert!(!store.mark_alert_sent(request.id, now).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleared_alert_mark_can_be_taken_again() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let request = TransportRequestRepository::insert(&store, &pending(now)).await.unwrap();

        assert!(store.mark_alert_sent(request.id, now).await.unwrap());
        assert!(!store.mark_alert_sent(request.id, now).await.unwrap());

        store.clear_alert_sent(request.id).await.unwrap();
        assert!(store.mark_alert_sent(request.id, now).await.unwrap());
    }
}
