//! Modelos del sistema
//!
//! Tipos de dominio. Los repositorios convierten desde/hacia las filas de
//! PostgreSQL; aquí no hay nada específico del store.

pub mod alert;
pub mod auth;
pub mod driver;
pub mod profile;
pub mod transport_request;
