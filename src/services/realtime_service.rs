//! Feed de cambios en tiempo real
//!
//! Cada escritura exitosa publica un [`ChangeEvent`]. Los suscriptores
//! eligen entidad, tipos de evento y un filtro `columna=eq.valor` que se
//! evalúa en el servidor antes de entregar. La entrega es at-least-once y sin
//! orden garantizado entre suscriptores lentos: quien consume deduplica por id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    TransportRequests,
    Profiles,
    Alerts,
    Drivers,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::TransportRequests => "transport_requests",
            Entity::Profiles => "profiles",
            Entity::Alerts => "alerts",
            Entity::Drivers => "drivers",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "transport_requests" => Some(Entity::TransportRequests),
            "profiles" => Some(Entity::Profiles),
            "alerts" => Some(Entity::Alerts),
            "drivers" => Some(Entity::Drivers),
            _ => None,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
}

impl ChangeKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Some(ChangeKind::Insert),
            "update" => Some(ChangeKind::Update),
            _ => None,
        }
    }
}

/// Evento publicado tras una escritura
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_id: Uuid,
    pub entity: Entity,
    pub kind: ChangeKind,
    pub record: serde_json::Value,
    pub committed_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Id del registro afectado, si lo tiene
    pub fn record_id(&self) -> Option<Uuid> {
        self.record
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// Filtro de igualdad sobre una columna del registro (`status=eq.pending`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub column: String,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        let (column, rest) = raw
            .split_once('=')
            .ok_or_else(|| AppError::BadRequest(format!("Invalid filter '{}'", raw)))?;
        let value = rest.strip_prefix("eq.").ok_or_else(|| {
            AppError::BadRequest(format!("Only 'eq' filters are supported, got '{}'", raw))
        })?;

        if column.trim().is_empty() {
            return Err(AppError::BadRequest(format!("Invalid filter '{}'", raw)));
        }

        Ok(Self::eq(column.trim(), value))
    }

    pub fn matches(&self, record: &serde_json::Value) -> bool {
        match record.get(&self.column) {
            Some(serde_json::Value::String(s)) => s == &self.value,
            Some(serde_json::Value::Null) | None => self.value == "null",
            Some(other) => other.to_string() == self.value,
        }
    }
}

impl fmt::Display for FieldFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

/// Qué eventos quiere recibir un suscriptor
#[derive(Debug, Clone)]
pub struct SubscriptionSpec {
    pub entity: Entity,
    pub kinds: Vec<ChangeKind>,
    pub filter: Option<FieldFilter>,
}

impl SubscriptionSpec {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            kinds: vec![ChangeKind::Insert, ChangeKind::Update],
            filter: None,
        }
    }

    pub fn kinds(mut self, kinds: Vec<ChangeKind>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.entity == self.entity
            && self.kinds.contains(&event.kind)
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| filter.matches(&event.record))
    }
}

/// Hub de publicación/suscripción
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publicar un cambio. Devuelve cuántos suscriptores lo recibieron.
    pub fn publish<T: Serialize>(&self, entity: Entity, kind: ChangeKind, record: &T) -> usize {
        let record = match serde_json::to_value(record) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ No se pudo serializar el cambio de {}: {}", entity, e);
                return 0;
            }
        };

        let event = ChangeEvent {
            event_id: Uuid::new_v4(),
            entity,
            kind,
            record,
            committed_at: Utc::now(),
        };

        // Sin suscriptores `send` falla; no es un error
        let delivered = self.tx.send(event).unwrap_or(0);
        debug!("📡 {:?} en {} entregado a {} suscriptores", kind, entity, delivered);
        delivered
    }

    pub fn subscribe(&self, spec: SubscriptionSpec) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            spec,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Suscripción activa; se cancela al hacer drop
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    spec: SubscriptionSpec,
}

impl Subscription {
    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }

    /// Siguiente evento que pasa el filtro; `None` cuando el feed se cierra
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.spec.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "⚠️ Suscriptor de {} atrasado, {} eventos descartados",
                        self.spec.entity, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_parse_filter() {
        let filter = FieldFilter::parse("status=eq.pending").unwrap();
        assert_eq!(filter, FieldFilter::eq("status", "pending"));
        assert_eq!(filter.to_string(), "status=eq.pending");

        assert!(FieldFilter::parse("status").is_err());
        assert!(FieldFilter::parse("status=neq.pending").is_err());
        assert!(FieldFilter::parse("=eq.pending").is_err());
    }

    #[test]
    fn test_filter_matches_scalars() {
        let record = json!({ "status": "pending", "num_passengers": 3, "driver_id": null });
        assert!(FieldFilter::eq("status", "pending").matches(&record));
        assert!(!FieldFilter::eq("status", "accepted").matches(&record));
        assert!(FieldFilter::eq("num_passengers", "3").matches(&record));
        assert!(FieldFilter::eq("driver_id", "null").matches(&record));
    }

    #[tokio::test]
    async fn test_subscriber_only_receives_matching_events() {
        let feed = ChangeFeed::new(16);
        let mut subscription = feed.subscribe(
            SubscriptionSpec::new(Entity::TransportRequests)
                .filter(FieldFilter::eq("status", "pending")),
        );

        feed.publish(Entity::Alerts, ChangeKind::Insert, &json!({ "status": "pending" }));
        feed.publish(
            Entity::TransportRequests,
            ChangeKind::Update,
            &json!({ "id": Uuid::nil(), "status": "accepted" }),
        );
        feed.publish(
            Entity::TransportRequests,
            ChangeKind::Insert,
            &json!({ "id": Uuid::nil(), "status": "pending" }),
        );

        let event = tokio::time::timeout(Duration::from_secs(1), subscription.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.record_id(), Some(Uuid::nil()));
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let feed = ChangeFeed::new(16);
        let subscription = feed.subscribe(SubscriptionSpec::new(Entity::Profiles));
        assert_eq!(feed.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.publish(Entity::Profiles, ChangeKind::Update, &json!({})), 0);
    }
}
