//! Métricas Prometheus del ciclo de vida
//!
//! Registro propio (no el global) para que cada `AppState` tenga sus
//! contadores; `GET /metrics` expone el formato de texto.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::debug;

use crate::models::transport_request::RequestStatus;
use crate::utils::errors::{AppError, AppResult};

pub struct Metrics {
    registry: Registry,
    requests_created_total: IntCounter,
    claims_total: IntCounterVec,
    transitions_total: IntCounterVec,
    alerts_raised_total: IntCounter,
}

fn metrics_error(err: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics: {}", err))
}

impl Metrics {
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new();

        let requests_created_total = IntCounter::new(
            "transport_requests_created_total",
            "Transport requests submitted",
        )
        .map_err(metrics_error)?;
        let claims_total = IntCounterVec::new(
            Opts::new("transport_request_claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transport_request_transitions_total",
                "Lifecycle transitions by target status",
            ),
            &["to"],
        )
        .map_err(metrics_error)?;
        let alerts_raised_total =
            IntCounter::new("alerts_raised_total", "Alerts raised by the monitor")
                .map_err(metrics_error)?;

        registry
            .register(Box::new(requests_created_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(claims_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(transitions_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(alerts_raised_total.clone()))
            .map_err(metrics_error)?;

        debug!("📊 Métricas prometheus registradas");

        Ok(Self {
            registry,
            requests_created_total,
            claims_total,
            transitions_total,
            alerts_raised_total,
        })
    }

    pub fn request_created(&self) {
        self.requests_created_total.inc();
    }

    /// `outcome` es `accepted` o `unavailable`
    pub fn claim(&self, outcome: &str) {
        self.claims_total.with_label_values(&[outcome]).inc();
    }

    pub fn transition(&self, to: RequestStatus) {
        self.transitions_total.with_label_values(&[to.as_str()]).inc();
    }

    pub fn alert_raised(&self) {
        self.alerts_raised_total.inc();
    }

    /// Formato de texto para `GET /metrics`
    pub fn render(&self) -> AppResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.to_string()))
    }
}
