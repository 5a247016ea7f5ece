//! Modelo de TransportRequest y su ciclo de vida
//!
//! Una solicitud nace en `pending`, un driver la reclama (`accepted`), la
//! inicia (`in_progress`) y la termina (`completed`). `cancelled` es
//! alcanzable desde cualquier estado no terminal.
//!
//! Las transiciones se calculan aquí de forma pura; la escritura se hace con
//! un compare-and-set en el repositorio usando el [`TransitionGuard`] del
//! registro leído.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::Actor;
use crate::models::profile::Role;

/// Estado de la solicitud - mapea a la columna `status` (TEXT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "accepted" => Some(RequestStatus::Accepted),
            "in_progress" => Some(RequestStatus::InProgress),
            "completed" => Some(RequestStatus::Completed),
            "cancelled" => Some(RequestStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    /// Estados que no son terminales, en orden del ciclo de vida
    pub fn active() -> &'static [RequestStatus] {
        &[
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::InProgress,
        ]
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de vehículo solicitado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Sedan,
    Suv,
    Van,
    Bus,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Sedan => "sedan",
            VehicleType::Suv => "suv",
            VehicleType::Van => "van",
            VehicleType::Bus => "bus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sedan" => Some(VehicleType::Sedan),
            "suv" => Some(VehicleType::Suv),
            "van" => Some(VehicleType::Van),
            "bus" => Some(VehicleType::Bus),
            _ => None,
        }
    }
}

/// Parada del recorrido
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub address: String,
    pub lat: f64,
    pub lng: f64,
}

/// Solicitud de transporte - mapea a la tabla transport_requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub id: Uuid,
    pub company_id: Uuid,
    pub origin_address: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub destinations: Vec<Destination>,
    pub num_passengers: i32,
    pub vehicle_type: VehicleType,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<i32>,
    pub status: RequestStatus,
    pub driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub alert_sent_at: Option<DateTime<Utc>>,
}

/// Datos de una solicitud nueva, ya validados
#[derive(Debug, Clone)]
pub struct NewTransportRequest {
    pub company_id: Uuid,
    pub origin_address: String,
    pub origin_lat: f64,
    pub origin_lng: f64,
    pub destinations: Vec<Destination>,
    pub num_passengers: i32,
    pub vehicle_type: VehicleType,
    pub scheduled_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub distance_km: Option<f64>,
    pub estimated_duration_minutes: Option<i32>,
}

/// Eventos que mueven una solicitud por su ciclo de vida
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEvent {
    Claim,
    Start,
    Complete,
    Cancel,
}

impl RequestEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestEvent::Claim => "claim",
            RequestEvent::Start => "start",
            RequestEvent::Complete => "complete",
            RequestEvent::Cancel => "cancel",
        }
    }
}

impl fmt::Display for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errores del ciclo de vida
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {event} a request in status '{from}'")]
    InvalidTransition {
        from: RequestStatus,
        event: RequestEvent,
    },

    #[error("role '{role}' cannot {event} requests")]
    RoleNotAllowed { role: Role, event: RequestEvent },

    #[error("only the bound driver can {event} this request")]
    NotBoundDriver { event: RequestEvent },

    #[error("not allowed to cancel this request")]
    NotAllowedToCancel,
}

/// Valores esperados de los campos de ciclo de vida al escribir (compare-and-set)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionGuard {
    pub expected_status: RequestStatus,
    pub expected_driver: Option<Uuid>,
}

/// Campos de ciclo de vida tras aplicar un evento
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleChange {
    pub status: RequestStatus,
    pub driver_id: Option<Uuid>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Tabla de transiciones
pub fn next_status(from: RequestStatus, event: RequestEvent) -> Option<RequestStatus> {
    use RequestEvent::*;
    use RequestStatus::*;

    match (from, event) {
        (Pending, Claim) => Some(Accepted),
        (Accepted, Start) => Some(InProgress),
        (InProgress, Complete) => Some(Completed),
        (Pending | Accepted | InProgress, Cancel) => Some(Cancelled),
        _ => None,
    }
}

impl TransportRequest {
    /// Crear el registro inicial en estado `pending`, sin driver
    pub fn new_pending(new: NewTransportRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: new.company_id,
            origin_address: new.origin_address,
            origin_lat: new.origin_lat,
            origin_lng: new.origin_lng,
            destinations: new.destinations,
            num_passengers: new.num_passengers,
            vehicle_type: new.vehicle_type,
            scheduled_time: new.scheduled_time,
            notes: new.notes,
            distance_km: new.distance_km,
            estimated_duration_minutes: new.estimated_duration_minutes,
            status: RequestStatus::Pending,
            driver_id: None,
            created_at: now,
            updated_at: now,
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            alert_sent_at: None,
        }
    }

    /// Guard que debe seguir siendo cierto al escribir el siguiente estado
    pub fn guard(&self) -> TransitionGuard {
        TransitionGuard {
            expected_status: self.status,
            expected_driver: self.driver_id,
        }
    }

    /// ¿Puede este actor ver la solicitud?
    pub fn is_visible_to(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Controller => true,
            Role::Driver => {
                self.status == RequestStatus::Pending || self.driver_id == Some(actor.id)
            }
            Role::Company | Role::Passenger => self.company_id == actor.id,
        }
    }

    /// Calcular los campos de ciclo de vida tras `event`, sin mutar el registro
    pub fn apply(
        &self,
        event: RequestEvent,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<LifecycleChange, LifecycleError> {
        match event {
            RequestEvent::Claim | RequestEvent::Start | RequestEvent::Complete => {
                if actor.role != Role::Driver {
                    return Err(LifecycleError::RoleNotAllowed {
                        role: actor.role,
                        event,
                    });
                }
            }
            RequestEvent::Cancel => {
                let allowed = actor.role == Role::Controller
                    || self.company_id == actor.id
                    || self.driver_id == Some(actor.id);
                if !allowed {
                    return Err(LifecycleError::NotAllowedToCancel);
                }
            }
        }

        let to = next_status(self.status, event).ok_or(LifecycleError::InvalidTransition {
            from: self.status,
            event,
        })?;

        let mut change = LifecycleChange {
            status: to,
            driver_id: self.driver_id,
            accepted_at: self.accepted_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            updated_at: now,
        };

        match event {
            RequestEvent::Claim => {
                change.driver_id = Some(actor.id);
                change.accepted_at = Some(now);
            }
            RequestEvent::Start | RequestEvent::Complete => {
                if self.driver_id != Some(actor.id) {
                    return Err(LifecycleError::NotBoundDriver { event });
                }
                if event == RequestEvent::Start {
                    change.started_at = Some(now);
                } else {
                    change.completed_at = Some(now);
                }
            }
            // El driver se conserva para el historial
            RequestEvent::Cancel => change.cancelled_at = Some(now),
        }

        Ok(change)
    }

    /// Aplicar un cambio ya escrito en el store
    pub fn with_change(mut self, change: LifecycleChange) -> Self {
        self.status = change.status;
        self.driver_id = change.driver_id;
        self.accepted_at = change.accepted_at;
        self.started_at = change.started_at;
        self.completed_at = change.completed_at;
        self.cancelled_at = change.cancelled_at;
        self.updated_at = change.updated_at;
        self
    }
}
