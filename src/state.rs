//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::cache::{MemorySessionCache, SessionCache};
use crate::config::environment::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::Repositories;
use crate::services::{ChangeFeed, JwtConfig, JwtService, Metrics};
use crate::storage::{BlobStore, MemoryBlobStore};
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub repos: Repositories,
    pub sessions: Arc<dyn SessionCache>,
    pub blobs: Arc<dyn BlobStore>,
    pub feed: ChangeFeed,
    pub jwt: JwtService,
    pub metrics: Arc<Metrics>,
    pub rate_limit: RateLimitState,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        repos: Repositories,
        sessions: Arc<dyn SessionCache>,
        blobs: Arc<dyn BlobStore>,
    ) -> AppResult<Self> {
        Ok(Self {
            jwt: JwtService::new(JwtConfig::from_environment(&config)),
            rate_limit: RateLimitState::new(&config),
            metrics: Arc::new(Metrics::new()?),
            feed: ChangeFeed::default(),
            config,
            repos,
            sessions,
            blobs,
        })
    }

    /// Estado completamente en memoria (desarrollo sin servicios externos y tests)
    pub fn in_memory(config: EnvironmentConfig) -> AppResult<Self> {
        Self::new(
            config,
            Repositories::in_memory(),
            Arc::new(MemorySessionCache::new()),
            Arc::new(MemoryBlobStore::new()),
        )
    }
}
