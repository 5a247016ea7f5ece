use serde::{Deserialize, Serialize};

// Response genérica
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

// Paginación simple para listados
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    pub const MAX_LIMIT: i64 = 200;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, Self::MAX_LIMIT)
    }
}
