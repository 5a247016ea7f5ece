//! Middleware de Rate Limiting
//!
//! Ventana fija por IP (`x-forwarded-for`), aplicada a los endpoints de auth.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::EnvironmentConfig;
use crate::utils::errors::AppError;

#[derive(Debug, Clone)]
struct RateLimitInfo {
    requests: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimitState {
    requests: Arc<RwLock<HashMap<String, RateLimitInfo>>>,
    max_requests: u32,
    window_duration: Duration,
}

impl RateLimitState {
    pub fn new(config: &EnvironmentConfig) -> Self {
        Self {
            requests: Arc::new(RwLock::new(HashMap::new())),
            max_requests: config.rate_limit_requests,
            window_duration: Duration::from_secs(config.rate_limit_window),
        }
    }

    /// Registrar un request de `ip`; error si ya agotó la ventana
    pub async fn check_rate_limit(&self, ip: &str) -> Result<(), AppError> {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        // Limpiar entradas expiradas
        requests.retain(|_, info| now.duration_since(info.window_start) < self.window_duration);

        let info = requests.entry(ip.to_string()).or_insert(RateLimitInfo {
            requests: 0,
            window_start: now,
        });

        if info.requests >= self.max_requests {
            return Err(AppError::RateLimitExceeded);
        }

        info.requests += 1;
        Ok(())
    }
}

fn client_ip(request: &Request) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit_middleware(
    State(rate_limit_state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ip = client_ip(&request);

    if let Err(e) = rate_limit_state.check_rate_limit(&ip).await {
        warn!("🚦 Rate limit excedido para {}", ip);
        return Err(e);
    }

    Ok(next.run(request).await)
}
