//! Session cache
//!
//! Las sesiones emitidas en sign-in viven aquí hasta que expiran o se hace
//! sign-out. Un token JWT válido cuya sesión ya no está se rechaza.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::redis_client::RedisClient;
use crate::models::auth::SessionInfo;
use crate::utils::errors::AppResult;

#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn store(&self, session: &SessionInfo) -> AppResult<()>;

    /// Sesión vigente; `None` si no existe o ya expiró
    async fn get(&self, session_id: Uuid) -> AppResult<Option<SessionInfo>>;

    /// Revocar una sesión. Devuelve si existía.
    async fn revoke(&self, session_id: Uuid) -> AppResult<bool>;
}

/// Sesiones en Redis, con TTL igual a la vida restante del token
pub struct RedisSessionCache {
    client: RedisClient,
}

impl RedisSessionCache {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn store(&self, session: &SessionInfo) -> AppResult<()> {
        let remaining = (session.expires_at - Utc::now()).num_seconds();
        let ttl = if remaining > 0 {
            remaining as u64
        } else {
            self.client.default_ttl()
        };

        let key = self.client.session_key(&session.session_id.to_string());
        self.client.set_json(&key, session, ttl).await
    }

    async fn get(&self, session_id: Uuid) -> AppResult<Option<SessionInfo>> {
        let key = self.client.session_key(&session_id.to_string());
        let session: Option<SessionInfo> = self.client.get_json(&key).await?;
        Ok(session.filter(|s| !s.is_expired()))
    }

    async fn revoke(&self, session_id: Uuid) -> AppResult<bool> {
        let key = self.client.session_key(&session_id.to_string());
        self.client.delete(&key).await
    }
}

/// Sesiones en memoria, para desarrollo sin Redis y para tests
#[derive(Default)]
pub struct MemorySessionCache {
    sessions: RwLock<HashMap<Uuid, SessionInfo>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn store(&self, session: &SessionInfo) -> AppResult<()> {
        let mut sessions = self.sessions.write().await;
        // Limpiar expiradas de paso
        sessions.retain(|_, s| !s.is_expired());
        sessions.insert(session.session_id, session.clone());
        debug!("💾 Sesión {} guardada ({} activas)", session.session_id, sessions.len());
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> AppResult<Option<SessionInfo>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session_id).filter(|s| !s.is_expired()).cloned())
    }

    async fn revoke(&self, session_id: Uuid) -> AppResult<bool> {
        Ok(self.sessions.write().await.remove(&session_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::Role;
    use chrono::Duration;

    fn session(expires_in: Duration) -> SessionInfo {
        let now = Utc::now();
        SessionInfo {
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "motorista@ald.com.br".to_string(),
            role: Role::Driver,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[tokio::test]
    async fn test_store_get_and_revoke() {
        let cache = MemorySessionCache::new();
        let info = session(Duration::hours(1));

        cache.store(&info).await.unwrap();
        assert_eq!(cache.get(info.session_id).await.unwrap(), Some(info.clone()));

        assert!(cache.revoke(info.session_id).await.unwrap());
        assert!(cache.get(info.session_id).await.unwrap().is_none());
        assert!(!cache.revoke(info.session_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_not_returned() {
        let cache = MemorySessionCache::new();
        let info = session(Duration::seconds(-5));

        cache.store(&info).await.unwrap();
        assert!(cache.get(info.session_id).await.unwrap().is_none());
    }
}
