use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::alert::{Alert, AlertFilters, AlertType};
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn insert(&self, alert: &Alert) -> AppResult<Alert>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Alert>>;

    async fn list(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>>;

    /// Resolver sólo si sigue sin resolver; `None` en caso contrario
    async fn resolve(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Alert>>;
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    request_id: Uuid,
    alert_type: String,
    message: String,
    is_resolved: bool,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = AppError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let alert_type = AlertType::from_str(&row.alert_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown alert type '{}' for {}", row.alert_type, row.id))
        })?;

        Ok(Alert {
            id: row.id,
            request_id: row.request_id,
            alert_type,
            message: row.message,
            is_resolved: row.is_resolved,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

pub struct PgAlertRepository {
    pool: PgPool,
}

impl PgAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn insert(&self, alert: &Alert) -> AppResult<Alert> {
        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            INSERT INTO alerts (id, request_id, alert_type, message, is_resolved, created_at, resolved_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(alert.id)
        .bind(alert.request_id)
        .bind(alert.alert_type.as_str())
        .bind(&alert.message)
        .bind(alert.is_resolved)
        .bind(alert.created_at)
        .bind(alert.resolved_at)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Alert>> {
        let row = sqlx::query_as::<_, AlertRow>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Alert::try_from).transpose()
    }

    async fn list(&self, filters: &AlertFilters) -> AppResult<Vec<Alert>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM alerts WHERE 1 = 1");

        if filters.unresolved_only.unwrap_or(false) {
            query.push(" AND is_resolved = FALSE");
        }
        if let Some(request_id) = filters.request_id {
            query.push(" AND request_id = ").push_bind(request_id);
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build_query_as::<AlertRow>().fetch_all(&self.pool).await?;

        rows.into_iter().map(Alert::try_from).collect()
    }

    async fn resolve(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Alert>> {
        let row = sqlx::query_as::<_, AlertRow>(
            r#"
            UPDATE alerts SET is_resolved = TRUE, resolved_at = $2
            WHERE id = $1 AND is_resolved = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Alert::try_from).transpose()
    }
}
