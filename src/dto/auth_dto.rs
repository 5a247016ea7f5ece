use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::profile::Role;
use crate::utils::validation::validate_phone;

// Sign-up request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub company_name: Option<String>,
}

// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Emails se comparan siempre normalizados
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
