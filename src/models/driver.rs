//! Modelo de DriverDetails
//!
//! Extensión del perfil para usuarios con rol `driver`: vehículo,
//! disponibilidad, ubicación y contador de viajes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::transport_request::VehicleType;

/// DriverDetails - mapea a la tabla drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub driver_license: String,
    pub vehicle_model: String,
    pub vehicle_plate: String,
    pub vehicle_color: Option<String>,
    pub vehicle_type: VehicleType,
    pub is_available: bool,
    pub current_location_lat: Option<f64>,
    pub current_location_lng: Option<f64>,
    pub rating: Option<f64>,
    pub total_trips: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos del vehículo que el driver registra o reemplaza
#[derive(Debug, Clone)]
pub struct DriverVehicle {
    pub driver_license: String,
    pub vehicle_model: String,
    pub vehicle_plate: String,
    pub vehicle_color: Option<String>,
    pub vehicle_type: VehicleType,
}

impl DriverDetails {
    pub fn new(user_id: Uuid, vehicle: DriverVehicle, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            driver_license: vehicle.driver_license,
            vehicle_model: vehicle.vehicle_model,
            vehicle_plate: vehicle.vehicle_plate,
            vehicle_color: vehicle.vehicle_color,
            vehicle_type: vehicle.vehicle_type,
            is_available: true,
            current_location_lat: None,
            current_location_lng: None,
            rating: None,
            total_trips: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
