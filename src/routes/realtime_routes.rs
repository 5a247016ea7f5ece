//! Feed de cambios por Server-Sent Events
//!
//! `GET /api/realtime/:entity?filter=status=eq.pending&events=insert,update`.
//! Además del filtro pedido, cada evento pasa por las reglas de visibilidad
//! del actor suscrito. La sesión se revisa cada
//! `REALTIME_SESSION_CHECK_SECS`; tras sign-out o expiración el feed termina.

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::SessionCache;
use crate::dto::realtime_dto::RealtimeQuery;
use crate::middleware::AuthenticatedUser;
use crate::models::auth::Actor;
use crate::models::profile::Role;
use crate::models::transport_request::{RequestStatus, TransportRequest};
use crate::services::realtime_service::{ChangeEvent, ChangeKind, Entity};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_realtime_router() -> Router<AppState> {
    Router::new().route("/:entity", get(subscribe))
}

fn record_field(event: &ChangeEvent, field: &str) -> Option<Uuid> {
    event
        .record
        .get(field)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// ¿Sigue vigente la sesión? Un error del cache no corta el feed; se
/// vuelve a intentar en la próxima revisión.
async fn session_alive(sessions: &dyn SessionCache, session_id: Uuid) -> bool {
    match sessions.get(session_id).await {
        Ok(session) => session.is_some(),
        Err(e) => {
            warn!("⚠️ No se pudo revisar la sesión {}: {}", session_id, e);
            true
        }
    }
}

/// ¿Puede `actor` ver este evento?
fn visible_to(actor: &Actor, event: &ChangeEvent) -> bool {
    if actor.role == Role::Controller {
        return true;
    }

    match event.entity {
        Entity::TransportRequests => serde_json::from_value::<TransportRequest>(event.record.clone())
            .map(|request| request.is_visible_to(actor))
            .unwrap_or(false),
        Entity::Profiles => event.record_id() == Some(actor.id),
        Entity::Drivers => record_field(event, "user_id") == Some(actor.id),
        Entity::Alerts => false,
    }
}

/// Evento a entregar a `actor`. Un driver que no ve la solicitud recibe sólo
/// `{id, status, updated_at}` cuando ésta sale de `pending`, para que la
/// quite de su tablero.
fn deliverable(actor: &Actor, event: &ChangeEvent) -> Option<ChangeEvent> {
    if visible_to(actor, event) {
        return Some(event.clone());
    }

    if actor.role != Role::Driver
        || event.entity != Entity::TransportRequests
        || event.kind != ChangeKind::Update
    {
        return None;
    }

    let request = serde_json::from_value::<TransportRequest>(event.record.clone()).ok()?;
    if request.status == RequestStatus::Pending || request.started_at.is_some() {
        return None;
    }

    Some(ChangeEvent {
        record: serde_json::json!({
            "id": request.id,
            "status": request.status,
            "updated_at": request.updated_at,
        }),
        ..event.clone()
    })
}

fn event_name(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Insert => "insert",
        ChangeKind::Update => "update",
    }
}

async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entity): Path<String>,
    Query(query): Query<RealtimeQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    let spec = query.into_spec(&entity)?;
    if spec.entity == Entity::Alerts {
        user.require_role(&[Role::Controller], "subscribe to alerts")?;
    }

    let actor = user.actor();
    info!(
        "📡 {} suscrito a {} (filtro: {})",
        actor.id,
        spec.entity,
        spec.filter
            .as_ref()
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string())
    );

    let mut subscription = state.feed.subscribe(spec);
    let sessions = state.sessions.clone();
    let session_id = user.session_id;
    let check_every = Duration::from_secs(state.config.realtime_session_check_secs.max(1));

    let stream = async_stream::stream! {
        let mut checks = tokio::time::interval(check_every);
        // El primer tick es inmediato y la sesión ya se validó al conectar
        checks.tick().await;

        loop {
            let received = tokio::select! {
                received = subscription.next() => received,
                _ = checks.tick() => {
                    if session_alive(sessions.as_ref(), session_id).await {
                        continue;
                    }
                    info!("🔒 Sesión {} cerrada, fin del feed de {}", session_id, actor.id);
                    break;
                }
            };
            let Some(event) = received else {
                break;
            };
            let Some(event) = deliverable(&actor, &event) else {
                continue;
            };
            match serde_json::to_string(&event) {
                Ok(data) => {
                    yield Ok(SseEvent::default()
                        .event(event_name(event.kind))
                        .id(event.event_id.to_string())
                        .data(data));
                }
                Err(e) => warn!("⚠️ Evento no serializable: {}", e),
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn event(entity: Entity, record: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            event_id: Uuid::new_v4(),
            entity,
            kind: ChangeKind::Update,
            record,
            committed_at: Utc::now(),
        }
    }

    #[test]
    fn test_profiles_and_alerts_visibility() {
        let me = Actor {
            id: Uuid::new_v4(),
            role: Role::Company,
        };
        assert!(visible_to(&me, &event(Entity::Profiles, json!({ "id": me.id }))));
        assert!(!visible_to(&me, &event(Entity::Profiles, json!({ "id": Uuid::new_v4() }))));
        assert!(!visible_to(&me, &event(Entity::Alerts, json!({}))));

        let controller = Actor {
            id: Uuid::new_v4(),
            role: Role::Controller,
        };
        assert!(visible_to(&controller, &event(Entity::Alerts, json!({}))));
    }

    #[test]
    fn test_other_drivers_get_a_tombstone_when_request_is_claimed() {
        let now = Utc::now();
        let winner = Uuid::new_v4();
        let record = json!({
            "id": Uuid::new_v4(),
            "company_id": Uuid::new_v4(),
            "origin_address": "Av. Paulista, 1000",
            "origin_lat": -23.5614,
            "origin_lng": -46.6559,
            "destinations": [{ "address": "Shopping Ibirapuera", "lat": -23.6101, "lng": -46.6664 }],
            "num_passengers": 2,
            "vehicle_type": "sedan",
            "scheduled_time": null,
            "notes": null,
            "distance_km": null,
            "estimated_duration_minutes": null,
            "status": "accepted",
            "driver_id": winner,
            "created_at": now,
            "updated_at": now,
            "accepted_at": now,
            "started_at": null,
            "completed_at": null,
            "cancelled_at": null,
            "alert_sent_at": null
        });
        let claimed = event(Entity::TransportRequests, record.clone());

        let other = Actor {
            id: Uuid::new_v4(),
            role: Role::Driver,
        };
        let delivered = deliverable(&other, &claimed).unwrap();
        assert_eq!(delivered.record.get("status").unwrap(), "accepted");
        assert!(delivered.record.get("driver_id").is_none());

        let owner = Actor {
            id: winner,
            role: Role::Driver,
        };
        assert_eq!(deliverable(&owner, &claimed).unwrap().record, record);

        let company = Actor {
            id: Uuid::new_v4(),
            role: Role::Company,
        };
        assert!(deliverable(&company, &claimed).is_none());
    }

    #[tokio::test]
    async fn test_revoked_session_is_not_alive() {
        use crate::cache::MemorySessionCache;
        use crate::models::auth::SessionInfo;

        let sessions = MemorySessionCache::new();
        let now = Utc::now();
        let session = SessionInfo {
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            email: "motorista@ald.com.br".to_string(),
            role: Role::Driver,
            created_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };
        sessions.store(&session).await.unwrap();

        assert!(session_alive(&sessions, session.session_id).await);
        sessions.revoke(session.session_id).await.unwrap();
        assert!(!session_alive(&sessions, session.session_id).await);
    }
}
