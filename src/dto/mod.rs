//! DTOs de la API HTTP

pub mod auth_dto;
pub mod common;
pub mod driver_dto;
pub mod home_dto;
pub mod profile_dto;
pub mod realtime_dto;
pub mod request_dto;

pub use common::{ApiResponse, ListQuery};
