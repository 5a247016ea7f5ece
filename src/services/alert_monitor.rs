//! Monitor de solicitudes pendientes
//!
//! Cada `ALERT_SCAN_INTERVAL_SECS` busca solicitudes `pending` más viejas que
//! el umbral y sin alerta enviada, y crea una alerta `pending_timeout` por cada
//! una. `alert_sent_at` se marca antes de insertar la alerta: si dos monitores
//! corren a la vez sólo uno gana la marca. Si la alerta no se pudo insertar,
//! la marca se deshace y la solicitud vuelve a entrar en la próxima pasada.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::alert::{Alert, AlertType};
use crate::repositories::{AlertRepository, TransportRequestRepository};
use crate::services::metrics::Metrics;
use crate::services::realtime_service::{ChangeFeed, ChangeKind, Entity};
use crate::state::AppState;
use crate::utils::errors::AppResult;

pub struct AlertMonitor {
    requests: Arc<dyn TransportRequestRepository>,
    alerts: Arc<dyn AlertRepository>,
    feed: ChangeFeed,
    metrics: Arc<Metrics>,
    threshold: Duration,
    interval: std::time::Duration,
}

impl AlertMonitor {
    pub fn new(state: &AppState) -> Self {
        Self {
            requests: state.repos.requests.clone(),
            alerts: state.repos.alerts.clone(),
            feed: state.feed.clone(),
            metrics: state.metrics.clone(),
            threshold: Duration::minutes(state.config.pending_alert_threshold_minutes),
            interval: std::time::Duration::from_secs(state.config.alert_scan_interval_secs.max(1)),
        }
    }

    /// Una pasada del monitor. Devuelve cuántas alertas se crearon.
    pub async fn run_once(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let stale = self.requests.list_stale_pending(now - self.threshold).await?;
        let mut raised = 0;

        for request in stale {
            if !self.requests.mark_alert_sent(request.id, now).await? {
                // Otro monitor la marcó o ya no está pending
                continue;
            }

            let waited = (now - request.created_at).num_minutes();
            let alert = Alert::new(
                request.id,
                AlertType::PendingTimeout,
                format!(
                    "Request from '{}' has been pending for {} minutes",
                    request.origin_address, waited
                ),
                now,
            );

            match self.alerts.insert(&alert).await {
                Ok(alert) => {
                    warn!("🚨 Solicitud {} sin driver hace {} min", request.id, waited);
                    self.metrics.alert_raised();
                    self.feed.publish(Entity::Alerts, ChangeKind::Insert, &alert);
                    raised += 1;
                }
                Err(e) => {
                    error!("❌ No se pudo crear la alerta para {}: {}", request.id, e);
                    self.requests.clear_alert_sent(request.id).await?;
                }
            }
        }

        Ok(raised)
    }

    /// Lanzar el loop en background
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "⏰ Monitor de alertas cada {:?} (umbral {} min)",
            self.interval,
            self.threshold.num_minutes()
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                match self.run_once(Utc::now()).await {
                    Ok(0) => {}
                    Ok(raised) => info!("🚨 {} alertas nuevas", raised),
                    Err(e) => error!("❌ Error en el monitor de alertas: {}", e),
                }
            }
        })
    }
}
