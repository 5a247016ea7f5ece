//! Controllers
//!
//! Casos de uso por recurso. Se construyen por request a partir del
//! `AppState` y sólo dependen de los traits de repositorio.

pub mod alert_controller;
pub mod auth_controller;
pub mod driver_controller;
pub mod home_controller;
pub mod profile_controller;
pub mod transport_request_controller;

pub use alert_controller::AlertController;
pub use auth_controller::AuthController;
pub use driver_controller::DriverController;
pub use home_controller::HomeController;
pub use profile_controller::ProfileController;
pub use transport_request_controller::TransportRequestController;
