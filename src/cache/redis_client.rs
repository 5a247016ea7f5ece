use redis::{aio::ConnectionManager, AsyncCommands, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use super::CacheConfig;
use crate::utils::errors::{AppError, AppResult};

/// Cliente Redis con connection manager y operaciones async
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisClient {
    /// Crear nuevo cliente Redis
    pub async fn new(config: CacheConfig) -> anyhow::Result<Self> {
        info!("🔗 Conectando a Redis: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.clone())?;
        let manager = ConnectionManager::new(client).await?;

        // Test de conexión
        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Redis conectado exitosamente");

        Ok(Self { manager, config })
    }

    /// Generar clave de cache con prefijo
    fn make_key(&self, prefix: &str, identifier: &str) -> String {
        format!("{}:{}:{}", self.config.key_prefix, prefix, identifier)
    }

    /// Clave de una sesión
    pub fn session_key(&self, session_id: &str) -> String {
        self.make_key("session", session_id)
    }

    pub fn default_ttl(&self) -> u64 {
        self.config.default_ttl
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.manager.clone();

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| AppError::Cache(format!("GET {}: {}", key, e)))?;

        match value {
            Some(raw) => {
                debug!("📥 Cache HIT para clave: {}", key);
                serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|e| AppError::Cache(format!("Corrupted entry {}: {}", key, e)))
            }
            None => {
                debug!("❌ Cache MISS para clave: {}", key);
                Ok(None)
            }
        }
    }

    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: u64) -> AppResult<()> {
        let mut conn = self.manager.clone();

        let serialized = serde_json::to_string(value)
            .map_err(|e| AppError::Cache(format!("Serializing {}: {}", key, e)))?;

        let result: RedisResult<()> = conn.set_ex(key, serialized, ttl.max(1)).await;

        match result {
            Ok(()) => {
                debug!("💾 Cache SET para clave: {} (TTL: {}s)", key, ttl);
                Ok(())
            }
            Err(e) => {
                error!("❌ Error guardando en cache para clave {}: {}", key, e);
                Err(AppError::Cache(format!("SET {}: {}", key, e)))
            }
        }
    }

    pub async fn delete(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();

        let result: RedisResult<i64> = conn.del(key).await;

        match result {
            Ok(count) => {
                debug!("🗑️ Cache DELETE para clave: {} (eliminados: {})", key, count);
                Ok(count > 0)
            }
            Err(e) => {
                warn!("⚠️ Error eliminando cache para clave {}: {}", key, e);
                Err(AppError::Cache(format!("DEL {}: {}", key, e)))
            }
        }
    }

    /// Verificar si Redis está conectado
    pub async fn is_connected(&self) -> bool {
        let mut conn = self.manager.clone();
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(response) => response == "PONG",
            Err(_) => false,
        }
    }
}
