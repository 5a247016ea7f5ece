//! Services module
//!
//! Este módulo contiene los servicios transversales: JWT, feed de cambios en
//! tiempo real, monitor de alertas y métricas.

pub mod alert_monitor;
pub mod jwt_service;
pub mod metrics;
pub mod realtime_service;

pub use alert_monitor::AlertMonitor;
pub use jwt_service::{IssuedToken, JwtConfig, JwtService};
pub use metrics::Metrics;
pub use realtime_service::{
    ChangeEvent, ChangeFeed, ChangeKind, Entity, FieldFilter, Subscription, SubscriptionSpec,
};
