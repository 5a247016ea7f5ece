use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::driver::DriverVehicle;
use crate::models::transport_request::VehicleType;
use crate::utils::validation::{validate_license_plate, validate_not_empty};

// Registro / reemplazo de los datos del vehículo
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertDriverRequest {
    #[validate(length(max = 30), custom = "validate_not_empty")]
    pub driver_license: String,
    #[validate(length(max = 100), custom = "validate_not_empty")]
    pub vehicle_model: String,
    #[validate(custom = "validate_license_plate")]
    pub vehicle_plate: String,
    #[serde(default)]
    #[validate(length(max = 30))]
    pub vehicle_color: Option<String>,
    pub vehicle_type: VehicleType,
}

impl UpsertDriverRequest {
    pub fn into_vehicle(self) -> DriverVehicle {
        DriverVehicle {
            driver_license: self.driver_license.trim().to_string(),
            vehicle_model: self.vehicle_model.trim().to_string(),
            vehicle_plate: self.vehicle_plate.trim().to_uppercase(),
            vehicle_color: self.vehicle_color.map(|c| c.trim().to_string()),
            vehicle_type: self.vehicle_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}
