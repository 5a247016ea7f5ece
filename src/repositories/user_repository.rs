use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::auth::UserCredentials;
use crate::models::profile::Profile;
use crate::repositories::profile_repository::ProfileRow;
use crate::utils::errors::{conflict_error, AppResult};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Crear credenciales y perfil juntos; si el email ya existe devuelve `Conflict`
    async fn create_account(
        &self,
        credentials: &UserCredentials,
        profile: &Profile,
    ) -> AppResult<Profile>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>>;
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserCredentials {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_account(
        &self,
        credentials: &UserCredentials,
        profile: &Profile,
    ) -> AppResult<Profile> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(credentials.id)
        .bind(&credentials.email)
        .bind(&credentials.password_hash)
        .bind(credentials.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(sqlx::Error::Database(db_error)) = &inserted {
            if db_error.is_unique_violation() {
                return Err(conflict_error("User", "email", &credentials.email));
            }
        }
        inserted?;

        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (
                id, email, full_name, phone, user_type, avatar_url, company_name,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.phone)
        .bind(profile.role.as_str())
        .bind(&profile.avatar_url)
        .bind(&profile.company_name)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Profile::try_from(row)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserCredentials::from))
    }
}
