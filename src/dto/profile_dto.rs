use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::profile::ProfileChanges;
use crate::utils::validation::validate_phone;

// Request de actualización parcial: los campos ausentes no se tocan
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub company_name: Option<String>,
}

impl UpdateProfileRequest {
    pub fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            full_name: self.full_name.map(|s| s.trim().to_string()),
            phone: self.phone.map(|s| s.trim().to_string()),
            company_name: self.company_name.map(|s| s.trim().to_string()),
            avatar_url: None,
        }
    }
}
