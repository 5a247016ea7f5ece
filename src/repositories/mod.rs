//! Repositorios
//!
//! Un trait por entidad, con adaptador PostgreSQL (`sqlx`) y adaptador en
//! memoria. Los controllers sólo ven los traits.

pub mod alert_repository;
pub mod driver_repository;
pub mod memory;
pub mod profile_repository;
pub mod transport_request_repository;
pub mod user_repository;

use sqlx::PgPool;
use std::sync::Arc;

pub use alert_repository::{AlertRepository, PgAlertRepository};
pub use driver_repository::{DriverRepository, PgDriverRepository};
pub use memory::MemoryStore;
pub use profile_repository::{PgProfileRepository, ProfileRepository};
pub use transport_request_repository::{
    PgTransportRequestRepository, RequestFilters, TransportRequestRepository,
};
pub use user_repository::{PgUserRepository, UserRepository};

/// Conjunto de repositorios compartido por los controllers
#[derive(Clone)]
pub struct Repositories {
    pub requests: Arc<dyn TransportRequestRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub users: Arc<dyn UserRepository>,
    pub alerts: Arc<dyn AlertRepository>,
    pub drivers: Arc<dyn DriverRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            requests: Arc::new(PgTransportRequestRepository::new(pool.clone())),
            profiles: Arc::new(PgProfileRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool.clone())),
            alerts: Arc::new(PgAlertRepository::new(pool.clone())),
            drivers: Arc::new(PgDriverRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            requests: store.clone(),
            profiles: store.clone(),
            users: store.clone(),
            alerts: store.clone(),
            drivers: store,
        }
    }
}
