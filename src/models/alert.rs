//! Modelo de Alert
//!
//! Artefacto derivado del monitoreo del ciclo de vida: no cambia el estado
//! de la solicitud a la que apunta.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PendingTimeout,
    Manual,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PendingTimeout => "pending_timeout",
            AlertType::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending_timeout" => Some(AlertType::PendingTimeout),
            "manual" => Some(AlertType::Manual),
            _ => None,
        }
    }
}

/// Alert - mapea a la tabla alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub request_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(request_id: Uuid, alert_type: AlertType, message: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            alert_type,
            message,
            is_resolved: false,
            created_at: now,
            resolved_at: None,
        }
    }
}

/// Filtros para listar alertas
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertFilters {
    pub unresolved_only: Option<bool>,
    pub request_id: Option<Uuid>,
}
