use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::transport_request::{
    Destination, LifecycleChange, RequestStatus, TransitionGuard, TransportRequest, VehicleType,
};
use crate::utils::errors::{AppError, AppResult};

/// Filtros de igualdad para listar solicitudes; el orden es siempre
/// `created_at DESC` (la más reciente primero)
#[derive(Debug, Clone, Default)]
pub struct RequestFilters {
    pub statuses: Option<Vec<RequestStatus>>,
    pub company_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl RequestFilters {
    pub fn pending() -> Self {
        Self {
            statuses: Some(vec![RequestStatus::Pending]),
            ..Default::default()
        }
    }

    pub fn statuses(mut self, statuses: Vec<RequestStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn company(mut self, company_id: Uuid) -> Self {
        self.company_id = Some(company_id);
        self
    }

    pub fn driver(mut self, driver_id: Uuid) -> Self {
        self.driver_id = Some(driver_id);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, request: &TransportRequest) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&request.status) {
                return false;
            }
        }
        if let Some(company_id) = self.company_id {
            if request.company_id != company_id {
                return false;
            }
        }
        if let Some(driver_id) = self.driver_id {
            if request.driver_id != Some(driver_id) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait TransportRequestRepository: Send + Sync {
    async fn insert(&self, request: &TransportRequest) -> AppResult<TransportRequest>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TransportRequest>>;

    async fn list(&self, filters: &RequestFilters) -> AppResult<Vec<TransportRequest>>;

    /// Escribir los campos de ciclo de vida sólo si el registro sigue
    /// teniendo el estado y el driver esperados. `None` si el guard falló
    /// o el registro no existe.
    async fn compare_and_set(
        &self,
        id: Uuid,
        guard: TransitionGuard,
        change: &LifecycleChange,
    ) -> AppResult<Option<TransportRequest>>;

    /// Solicitudes `pending` creadas antes de `created_before` y sin alerta enviada
    async fn list_stale_pending(
        &self,
        created_before: DateTime<Utc>,
    ) -> AppResult<Vec<TransportRequest>>;

    /// Marcar la alerta como enviada; `false` si ya estaba marcada o la
    /// solicitud ya no está `pending`
    async fn mark_alert_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    /// Deshacer la marca cuando la alerta no llegó a crearse
    async fn clear_alert_sent(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct TransportRequestRow {
    id: Uuid,
    company_id: Uuid,
    origin_address: String,
    origin_lat: f64,
    origin_lng: f64,
    destinations: Json<Vec<Destination>>,
    num_passengers: i32,
    vehicle_type: String,
    scheduled_time: Option<DateTime<Utc>>,
    notes: Option<String>,
    distance_km: Option<f64>,
    estimated_duration_minutes: Option<i32>,
    status: String,
    driver_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    alert_sent_at: Option<DateTime<Utc>>,
}

impl TryFrom<TransportRequestRow> for TransportRequest {
    type Error = AppError;

    fn try_from(row: TransportRequestRow) -> Result<Self, Self::Error> {
        let status = RequestStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Internal(format!("Unknown request status '{}' for {}", row.status, row.id))
        })?;
        let vehicle_type = VehicleType::from_str(&row.vehicle_type).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown vehicle type '{}' for {}",
                row.vehicle_type, row.id
            ))
        })?;

        Ok(TransportRequest {
            id: row.id,
            company_id: row.company_id,
            origin_address: row.origin_address,
            origin_lat: row.origin_lat,
            origin_lng: row.origin_lng,
            destinations: row.destinations.0,
            num_passengers: row.num_passengers,
            vehicle_type,
            scheduled_time: row.scheduled_time,
            notes: row.notes,
            distance_km: row.distance_km,
            estimated_duration_minutes: row.estimated_duration_minutes,
            status,
            driver_id: row.driver_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            accepted_at: row.accepted_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            alert_sent_at: row.alert_sent_at,
        })
    }
}

fn into_models(rows: Vec<TransportRequestRow>) -> AppResult<Vec<TransportRequest>> {
    rows.into_iter().map(TransportRequest::try_from).collect()
}

pub struct PgTransportRequestRepository {
    pool: PgPool,
}

impl PgTransportRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransportRequestRepository for PgTransportRequestRepository {
    async fn insert(&self, request: &TransportRequest) -> AppResult<TransportRequest> {
        let row = sqlx::query_as::<_, TransportRequestRow>(
            r#"
            INSERT INTO transport_requests (
                id, company_id, origin_address, origin_lat, origin_lng, destinations,
                num_passengers, vehicle_type, scheduled_time, notes, distance_km,
                estimated_duration_minutes, status, driver_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.company_id)
        .bind(&request.origin_address)
        .bind(request.origin_lat)
        .bind(request.origin_lng)
        .bind(Json(&request.destinations))
        .bind(request.num_passengers)
        .bind(request.vehicle_type.as_str())
        .bind(request.scheduled_time)
        .bind(&request.notes)
        .bind(request.distance_km)
        .bind(request.estimated_duration_minutes)
        .bind(request.status.as_str())
        .bind(request.driver_id)
        .bind(request.created_at)
        .bind(request.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<TransportRequest>> {
        let row = sqlx::query_as::<_, TransportRequestRow>(
            "SELECT * FROM transport_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransportRequest::try_from).transpose()
    }

    async fn list(&self, filters: &RequestFilters) -> AppResult<Vec<TransportRequest>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM transport_requests WHERE 1 = 1");

        if let Some(statuses) = &filters.statuses {
            let statuses: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            query.push(" AND status = ANY(").push_bind(statuses).push(")");
        }
        if let Some(company_id) = filters.company_id {
            query.push(" AND company_id = ").push_bind(company_id);
        }
        if let Some(driver_id) = filters.driver_id {
            query.push(" AND driver_id = ").push_bind(driver_id);
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filters.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let rows = query
            .build_query_as::<TransportRequestRow>()
            .fetch_all(&self.pool)
            .await?;

        into_models(rows)
    }

    async fn compare_and_set(
        &self,
        id: Uuid,
        guard: TransitionGuard,
        change: &LifecycleChange,
    ) -> AppResult<Option<TransportRequest>> {
        let row = sqlx::query_as::<_, TransportRequestRow>(
            r#"
            UPDATE transport_requests
            SET status = $2, driver_id = $3, accepted_at = $4, started_at = $5,
                completed_at = $6, cancelled_at = $7, updated_at = $8
            WHERE id = $1
              AND status = $9
              AND driver_id IS NOT DISTINCT FROM $10
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(change.status.as_str())
        .bind(change.driver_id)
        .bind(change.accepted_at)
        .bind(change.started_at)
        .bind(change.completed_at)
        .bind(change.cancelled_at)
        .bind(change.updated_at)
        .bind(guard.expected_status.as_str())
        .bind(guard.expected_driver)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransportRequest::try_from).transpose()
    }

    async fn list_stale_pending(
        &self,
        created_before: DateTime<Utc>,
    ) -> AppResult<Vec<TransportRequest>> {
        let rows = sqlx::query_as::<_, TransportRequestRow>(
            r#"
            SELECT * FROM transport_requests
            WHERE status = 'pending' AND alert_sent_at IS NULL AND created_at < $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(created_before)
        .fetch_all(&self.pool)
        .await?;

        into_models(rows)
    }

    async fn mark_alert_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE transport_requests SET alert_sent_at = $2
            WHERE id = $1 AND alert_sent_at IS NULL AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn clear_alert_sent(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE transport_requests SET alert_sent_at = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
