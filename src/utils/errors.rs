//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &str) -> Self {
        Self {
            error: error.to_string(),
            message,
            details: None,
            code: Some(code.to_string()),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl AppError {
    /// Código estable que los clientes usan para distinguir errores
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DB_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Jwt(_) => "JWT_ERROR",
            AppError::Hash(_) => "HASH_ERROR",
            AppError::Cache(_) => "CACHE_ERROR",
            AppError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) | AppError::Hash(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) | AppError::Cache(_) | AppError::Storage(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            AppError::Database(e) => {
                error!("❌ Database error: {}", e);
                ErrorResponse::new(
                    "Database Error",
                    "An error occurred while accessing the database".to_string(),
                    code,
                )
                .with_details(json!({ "sql_error": e.to_string() }))
            }

            AppError::Validation(e) => {
                warn!("⚠️ Validation error: {}", e);
                ErrorResponse::new(
                    "Validation Error",
                    "The provided data is invalid".to_string(),
                    code,
                )
                .with_details(json!(e))
            }

            AppError::Unauthorized(msg) => {
                warn!("🔒 Unauthorized access: {}", msg);
                ErrorResponse::new("Unauthorized", msg, code)
            }

            AppError::Forbidden(msg) => {
                warn!("🚫 Forbidden access: {}", msg);
                ErrorResponse::new("Forbidden", msg, code)
            }

            AppError::NotFound(msg) => ErrorResponse::new("Not Found", msg, code),

            AppError::Conflict(msg) => {
                warn!("⚠️ Conflict: {}", msg);
                ErrorResponse::new("Conflict", msg, code)
            }

            AppError::BadRequest(msg) => ErrorResponse::new("Bad Request", msg, code),

            AppError::Internal(msg) => {
                error!("❌ Internal error: {}", msg);
                ErrorResponse::new(
                    "Internal Server Error",
                    "An unexpected error occurred".to_string(),
                    code,
                )
                .with_details(json!({ "internal_error": msg }))
            }

            AppError::RateLimitExceeded => ErrorResponse::new(
                "Rate Limit Exceeded",
                "Too many requests. Please try again later".to_string(),
                code,
            ),

            AppError::ServiceUnavailable(msg) => {
                error!("❌ Service unavailable: {}", msg);
                ErrorResponse::new("Service Unavailable", msg, code)
            }

            AppError::Jwt(msg) => {
                warn!("🔒 JWT error: {}", msg);
                ErrorResponse::new("JWT Error", msg, code)
            }

            AppError::Hash(msg) => {
                error!("❌ Hash error: {}", msg);
                ErrorResponse::new(
                    "Hash Error",
                    "An error occurred while processing credentials".to_string(),
                    code,
                )
            }

            AppError::Cache(msg) => {
                error!("❌ Cache error: {}", msg);
                ErrorResponse::new(
                    "Cache Error",
                    "The session service is temporarily unavailable".to_string(),
                    code,
                )
            }

            AppError::Storage(msg) => {
                error!("❌ Storage error: {}", msg);
                ErrorResponse::new(
                    "Storage Error",
                    "The file storage is temporarily unavailable".to_string(),
                    code,
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de validación
pub fn validation_error(field: &'static str, message: &'static str) -> AppError {
    use validator::ValidationError;

    let mut error = ValidationError::new("custom");
    error.message = Some(message.into());

    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);

    AppError::Validation(errors)
}

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: &str) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de conflicto
pub fn conflict_error(resource: &str, field: &str, value: &str) -> AppError {
    AppError::Conflict(format!("{} with {} '{}' already exists", resource, field, value))
}

/// Función helper para crear errores de acceso prohibido
pub fn forbidden_error(operation: &str, reason: &str) -> AppError {
    AppError::Forbidden(format!("Cannot {}: {}", operation, reason))
}
