//! Configuración de cache
//!
//! Este módulo contiene la configuración del session cache.

use serde::{Deserialize, Serialize};

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: String,
    /// TTL por defecto en segundos, usado cuando la sesión no trae expiración
    pub default_ttl: u64,
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            default_ttl: 3600, // 1 hora
            key_prefix: "ald_transport".to_string(),
        }
    }
}
