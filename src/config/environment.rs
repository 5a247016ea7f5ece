//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno. Las variables ausentes
//! toman valores de desarrollo; las presentes pero mal formadas son error.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    /// Sin URL se usa el store en memoria
    pub database_url: Option<String>,
    /// Sin URL las sesiones viven en memoria
    pub redis_url: Option<String>,
    pub storage_root: PathBuf,
    pub avatar_max_bytes: usize,
    pub pending_alert_threshold_minutes: i64,
    pub alert_scan_interval_secs: u64,
    /// Cada cuánto un feed SSE abierto revisa que su sesión siga viva
    pub realtime_session_check_secs: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            jwt_secret: "dev-secret-change-me".to_string(),
            jwt_expiration: 60 * 60 * 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cors_origins: Vec::new(),
            rate_limit_requests: 30,
            rate_limit_window: 60,
            database_url: None,
            redis_url: None,
            storage_root: PathBuf::from("./storage"),
            avatar_max_bytes: 2 * 1024 * 1024,
            pending_alert_threshold_minutes: 10,
            alert_scan_interval_secs: 60,
            realtime_session_check_secs: 30,
        }
    }
}

fn parsed_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid value, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl EnvironmentConfig {
    /// Leer la configuración desde el entorno (después de `dotenvy::dotenv()`)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            environment: optional("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parsed_or("PORT", defaults.port)?,
            host: optional("HOST").unwrap_or(defaults.host),
            jwt_secret: optional("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiration: parsed_or("JWT_EXPIRATION", defaults.jwt_expiration)?,
            bcrypt_cost: parsed_or("BCRYPT_COST", defaults.bcrypt_cost)?,
            cors_origins: optional("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            rate_limit_requests: parsed_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            rate_limit_window: parsed_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window)?,
            database_url: optional("DATABASE_URL"),
            redis_url: optional("REDIS_URL"),
            storage_root: optional("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            avatar_max_bytes: parsed_or("AVATAR_MAX_BYTES", defaults.avatar_max_bytes)?,
            pending_alert_threshold_minutes: parsed_or(
                "PENDING_ALERT_THRESHOLD_MINUTES",
                defaults.pending_alert_threshold_minutes,
            )?,
            alert_scan_interval_secs: parsed_or(
                "ALERT_SCAN_INTERVAL_SECS",
                defaults.alert_scan_interval_secs,
            )?,
            realtime_session_check_secs: parsed_or(
                "REALTIME_SESSION_CHECK_SECS",
                defaults.realtime_session_check_secs,
            )?,
        };

        if config.is_production() && config.jwt_secret == Self::default().jwt_secret {
            anyhow::bail!("JWT_SECRET must be set in production");
        }

        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la dirección del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
