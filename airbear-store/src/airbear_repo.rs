use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use airbear_core::repository::AirBearRepository;
use airbear_core::{AirBear, CoreResult, LocationUpdate, StatusUpdate};

use crate::database::storage;

pub struct StoreAirBearRepository {
    pool: PgPool,
}

impl StoreAirBearRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirBearRow {
    id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
    heading: Option<f64>,
    battery_level: Option<i32>,
    is_available: bool,
    is_charging: bool,
    updated_at: DateTime<Utc>,
}

impl From<AirBearRow> for AirBear {
    fn from(row: AirBearRow) -> Self {
        AirBear {
            id: row.id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            heading: row.heading,
            battery_level: row.battery_level,
            is_available: row.is_available,
            is_charging: row.is_charging,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl AirBearRepository for StoreAirBearRepository {
    async fn list_airbears(&self) -> CoreResult<Vec<AirBear>> {
        let rows = sqlx::query_as::<_, AirBearRow>(
            "SELECT id, name, latitude, longitude, heading, battery_level, is_available, is_charging, updated_at \
             FROM airbears ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.into_iter().map(AirBear::from).collect())
    }

    async fn get_airbear(&self, id: Uuid) -> CoreResult<Option<AirBear>> {
        let row = sqlx::query_as::<_, AirBearRow>(
            "SELECT id, name, latitude, longitude, heading, battery_level, is_available, is_charging, updated_at \
             FROM airbears WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(AirBear::from))
    }

    async fn update_location(&self, id: Uuid, update: &LocationUpdate) -> CoreResult<Option<AirBear>> {
        let row = sqlx::query_as::<_, AirBearRow>(
            r#"
            UPDATE airbears
            SET latitude = $2,
                longitude = $3,
                heading = COALESCE($4, heading),
                battery_level = COALESCE($5, battery_level),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, latitude, longitude, heading, battery_level, is_available, is_charging, updated_at
            "#,
        )
        .bind(id)
        .bind(update.latitude)
        .bind(update.longitude)
        .bind(update.heading)
        .bind(update.battery_level)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(AirBear::from))
    }

    async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> CoreResult<Option<AirBear>> {
        let row = sqlx::query_as::<_, AirBearRow>(
            r#"
            UPDATE airbears
            SET is_available = COALESCE($2, is_available),
                is_charging = COALESCE($3, is_charging),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, latitude, longitude, heading, battery_level, is_available, is_charging, updated_at
            "#,
        )
        .bind(id)
        .bind(update.is_available)
        .bind(update.is_charging)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(AirBear::from))
    }

    async fn claim_available(&self) -> CoreResult<Option<AirBear>> {
        // SKIP LOCKED keeps concurrent bookings from queueing on the same row
        let row = sqlx::query_as::<_, AirBearRow>(
            r#"
            UPDATE airbears
            SET is_available = FALSE, updated_at = NOW()
            WHERE id = (
                SELECT id FROM airbears
                WHERE is_available AND NOT is_charging
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            AND is_available
            RETURNING id, name, latitude, longitude, heading, battery_level, is_available, is_charging, updated_at
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(AirBear::from))
    }

    async fn release(&self, id: Uuid) -> CoreResult<()> {
        sqlx::query("UPDATE airbears SET is_available = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }
}
