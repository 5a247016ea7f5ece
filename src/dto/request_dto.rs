use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::transport_request::{Destination, NewTransportRequest, TransportRequest, VehicleType};
use crate::utils::validation::{validate_destinations, validate_not_empty};

// Request para crear una solicitud de transporte
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransportRequest {
    #[validate(length(max = 500), custom = "validate_not_empty")]
    pub origin_address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub origin_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub origin_lng: f64,
    #[validate(custom = "validate_destinations")]
    pub destinations: Vec<Destination>,
    #[validate(range(min = 1, max = 60))]
    pub num_passengers: i32,
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub distance_km: Option<f64>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub estimated_duration_minutes: Option<i32>,
}

impl CreateTransportRequest {
    pub fn into_new(self, company_id: Uuid) -> NewTransportRequest {
        NewTransportRequest {
            company_id,
            origin_address: self.origin_address.trim().to_string(),
            origin_lat: self.origin_lat,
            origin_lng: self.origin_lng,
            destinations: self
                .destinations
                .into_iter()
                .map(|stop| Destination {
                    address: stop.address.trim().to_string(),
                    ..stop
                })
                .collect(),
            num_passengers: self.num_passengers,
            vehicle_type: self.vehicle_type,
            scheduled_time: self.scheduled_time,
            notes: self
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            distance_km: self.distance_km,
            estimated_duration_minutes: self.estimated_duration_minutes,
        }
    }
}

/// Resultado de intentar reclamar una solicitud. Perder la carrera no es un error.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    Accepted(TransportRequest),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Accepted,
    Unavailable,
}

// Response del claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub outcome: ClaimStatus,
    pub request: Option<TransportRequest>,
}

impl From<ClaimOutcome> for ClaimResponse {
    fn from(outcome: ClaimOutcome) -> Self {
        match outcome {
            ClaimOutcome::Accepted(request) => Self {
                outcome: ClaimStatus::Accepted,
                request: Some(request),
            },
            ClaimOutcome::Unavailable => Self {
                outcome: ClaimStatus::Unavailable,
                request: None,
            },
        }
    }
}

impl From<ClaimResponse> for ClaimOutcome {
    fn from(response: ClaimResponse) -> Self {
        match (response.outcome, response.request) {
            (ClaimStatus::Accepted, Some(request)) => ClaimOutcome::Accepted(request),
            _ => ClaimOutcome::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> CreateTransportRequest {
        CreateTransportRequest {
            origin_address: "  Av. Paulista, 1000 ".to_string(),
            origin_lat: -23.5614,
            origin_lng: -46.6559,
            destinations: vec![Destination {
                address: "Shopping Ibirapuera".to_string(),
                lat: -23.6101,
                lng: -46.6664,
            }],
            num_passengers: 4,
            vehicle_type: VehicleType::Van,
            scheduled_time: None,
            notes: Some("   ".to_string()),
            distance_km: Some(7.5),
            estimated_duration_minutes: Some(25),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_requires_destination_and_passenger() {
        let mut no_stops = valid();
        no_stops.destinations.clear();
        let errors = no_stops.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("destinations"));

        let mut nobody = valid();
        nobody.num_passengers = 0;
        let errors = nobody.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("num_passengers"));
    }

    #[test]
    fn test_rejects_blank_origin_and_bad_coordinates() {
        let mut blank = valid();
        blank.origin_address = "   ".to_string();
        assert!(blank.validate().is_err());

        let mut off_map = valid();
        off_map.origin_lat = 123.0;
        assert!(off_map.validate().is_err());
    }

    #[test]
    fn test_into_new_trims_text() {
        let company = Uuid::new_v4();
        let new = valid().into_new(company);
        assert_eq!(new.company_id, company);
        assert_eq!(new.origin_address, "Av. Paulista, 1000");
        assert!(new.notes.is_none());
    }

    #[test]
    fn test_claim_response_conversion() {
        let response = ClaimResponse::from(ClaimOutcome::Unavailable);
        assert_eq!(response.outcome, ClaimStatus::Unavailable);
        assert_eq!(ClaimOutcome::from(response), ClaimOutcome::Unavailable);
    }
}
