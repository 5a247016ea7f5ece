use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::profile::{Profile, ProfileChanges, Role};
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>>;

    /// Actualización parcial: los campos ausentes en `changes` no se tocan
    async fn update(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>>;
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProfileRow {
    id: Uuid,
    email: String,
    full_name: String,
    phone: Option<String>,
    user_type: String,
    avatar_url: Option<String>,
    company_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = Role::from_str(&row.user_type).ok_or_else(|| {
            AppError::Internal(format!("Unknown role '{}' for profile {}", row.user_type, row.id))
        })?;

        Ok(Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            phone: row.phone,
            role,
            avatar_url: row.avatar_url,
            company_name: row.company_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Profile::try_from).transpose()
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Profile>> {
        let (set_avatar, avatar_url) = match &changes.avatar_url {
            Some(url) => (true, url.clone()),
            None => (false, None),
        };

        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            UPDATE profiles
            SET full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                company_name = COALESCE($4, company_name),
                avatar_url = CASE WHEN $5 THEN $6 ELSE avatar_url END,
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.full_name)
        .bind(&changes.phone)
        .bind(&changes.company_name)
        .bind(set_avatar)
        .bind(avatar_url)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Profile::try_from).transpose()
    }
}
