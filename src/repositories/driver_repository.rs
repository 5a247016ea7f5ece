use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::driver::{DriverDetails, DriverVehicle};
use crate::models::transport_request::VehicleType;
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait DriverRepository: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<DriverDetails>>;

    /// Registrar o reemplazar los datos del vehículo del driver
    async fn upsert_vehicle(
        &self,
        user_id: Uuid,
        vehicle: &DriverVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<DriverDetails>;

    async fn set_availability(
        &self,
        user_id: Uuid,
        is_available: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DriverDetails>>;

    async fn update_location(
        &self,
        user_id: Uuid,
        lat: f64,
        lng: f64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DriverDetails>>;

    /// Sumar un viaje completado; no hace nada si el driver no registró vehículo
    async fn increment_trips(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct DriverRow {
    id: Uuid,
    user_id: Uuid,
    driver_license: String,
    vehicle_model: String,
    vehicle_plate: String,
    vehicle_color: Option<String>,
    vehicle_type: String,
    is_available: bool,
    current_location_lat: Option<f64>,
    current_location_lng: Option<f64>,
    rating: Option<f64>,
    total_trips: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DriverRow> for DriverDetails {
    type Error = AppError;

    fn try_from(row: DriverRow) -> Result<Self, Self::Error> {
        let vehicle_type = VehicleType::from_str(&row.vehicle_type).ok_or_else(|| {
            AppError::Internal(format!(
                "Unknown vehicle type '{}' for driver {}",
                row.vehicle_type, row.user_id
            ))
        })?;

        Ok(DriverDetails {
            id: row.id,
            user_id: row.user_id,
            driver_license: row.driver_license,
            vehicle_model: row.vehicle_model,
            vehicle_plate: row.vehicle_plate,
            vehicle_color: row.vehicle_color,
            vehicle_type,
            is_available: row.is_available,
            current_location_lat: row.current_location_lat,
            current_location_lng: row.current_location_lng,
            rating: row.rating,
            total_trips: row.total_trips,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct PgDriverRepository {
    pool: PgPool,
}

impl PgDriverRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DriverRepository for PgDriverRepository {
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<DriverDetails>> {
        let row = sqlx::query_as::<_, DriverRow>("SELECT * FROM drivers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(DriverDetails::try_from).transpose()
    }

    async fn upsert_vehicle(
        &self,
        user_id: Uuid,
        vehicle: &DriverVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<DriverDetails> {
        let row = sqlx::query_as::<_, DriverRow>(
            r#"
            INSERT INTO drivers (
                id, user_id, driver_license, vehicle_model, vehicle_plate, vehicle_color,
                vehicle_type, is_available, total_trips, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE, 0, $8, $8)
            ON CONFLICT (user_id) DO UPDATE
            SET driver_license = EXCLUDED.driver_license,
                vehicle_model = EXCLUDED.vehicle_model,
                vehicle_plate = EXCLUDED.vehicle_plate,
                vehicle_color = EXCLUDED.vehicle_color,
                vehicle_type = EXCLUDED.vehicle_type,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&vehicle.driver_license)
        .bind(&vehicle.vehicle_model)
        .bind(&vehicle.vehicle_plate)
        .bind(&vehicle.vehicle_color)
        .bind(vehicle.vehicle_type.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn set_availability(
        &self,
        user_id: Uuid,
        is_available: bool,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DriverDetails>> {
        let row = sqlx::query_as::<_, DriverRow>(
            "UPDATE drivers SET is_available = $2, updated_at = $3 WHERE user_id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(is_available)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DriverDetails::try_from).transpose()
    }

    async fn update_location(
        &self,
        user_id: Uuid,
        lat: f64,
        lng: f64,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DriverDetails>> {
        let row = sqlx::query_as::<_, DriverRow>(
            r#"
            UPDATE drivers
            SET current_location_lat = $2, current_location_lng = $3, updated_at = $4
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(lat)
        .bind(lng)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DriverDetails::try_from).transpose()
    }

    async fn increment_trips(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE drivers SET total_trips = total_trips + 1, updated_at = $2 WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
