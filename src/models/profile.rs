//! Modelo de Profile
//!
//! Un perfil pertenece exclusivamente a la identidad que representa.
//! El rol se fija al crearlo y nunca se actualiza.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Rol del perfil - variante cerrada, se despacha una sola vez por request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Company,
    Driver,
    Passenger,
    Controller,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Company => "company",
            Role::Driver => "driver",
            Role::Passenger => "passenger",
            Role::Controller => "controller",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "company" => Some(Role::Company),
            "driver" => Some(Role::Driver),
            "passenger" => Some(Role::Passenger),
            "controller" => Some(Role::Controller),
            _ => None,
        }
    }

    /// Roles que pueden crear solicitudes de transporte
    pub fn is_requester(&self) -> bool {
        matches!(self, Role::Company | Role::Passenger)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Profile - mapea a la tabla profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cambios parciales: `None` deja el campo como está
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub avatar_url: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone.is_none()
            && self.company_name.is_none()
            && self.avatar_url.is_none()
    }

    pub fn avatar(avatar_url: Option<String>) -> Self {
        Self {
            avatar_url: Some(avatar_url),
            ..Default::default()
        }
    }
}

impl Profile {
    /// Aplicar cambios parciales sin tocar id, email ni rol
    pub fn apply_changes(mut self, changes: &ProfileChanges, now: DateTime<Utc>) -> Self {
        if let Some(full_name) = &changes.full_name {
            self.full_name = full_name.clone();
        }
        if let Some(phone) = &changes.phone {
            self.phone = Some(phone.clone());
        }
        if let Some(company_name) = &changes.company_name {
            self.company_name = Some(company_name.clone());
        }
        if let Some(avatar_url) = &changes.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
        self.updated_at = now;
        self
    }
}
