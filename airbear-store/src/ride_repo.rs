use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use airbear_core::repository::RideRepository;
use airbear_core::{CoreError, CoreResult};
use airbear_ride::{Ride, RideStatus, RideTransition};

use crate::database::storage;

const RIDE_COLUMNS: &str = "id, user_id, pickup_spot_id, dropoff_spot_id, airbear_id, driver_id, status, \
     fare, distance, payment_method, created_at, updated_at, completed_at";

pub struct StoreRideRepository {
    pool: PgPool,
}

impl StoreRideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    user_id: Uuid,
    pickup_spot_id: Uuid,
    dropoff_spot_id: Uuid,
    airbear_id: Option<Uuid>,
    driver_id: Option<Uuid>,
    status: String,
    fare: f64,
    distance: f64,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RideRow> for Ride {
    type Error = CoreError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        let status: RideStatus = row
            .status
            .parse()
            .map_err(|e: airbear_ride::UnknownStatus| CoreError::StorageError(e.to_string()))?;

        Ok(Ride {
            id: row.id,
            user_id: row.user_id,
            pickup_spot_id: row.pickup_spot_id,
            dropoff_spot_id: row.dropoff_spot_id,
            airbear_id: row.airbear_id,
            driver_id: row.driver_id,
            status,
            fare: row.fare,
            distance: row.distance,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

fn into_rides(rows: Vec<RideRow>) -> CoreResult<Vec<Ride>> {
    rows.into_iter().map(Ride::try_from).collect()
}

#[async_trait]
impl RideRepository for StoreRideRepository {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rides (id, user_id, pickup_spot_id, dropoff_spot_id, airbear_id, driver_id, status,
                               fare, distance, payment_method, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(ride.id)
        .bind(ride.user_id)
        .bind(ride.pickup_spot_id)
        .bind(ride.dropoff_spot_id)
        .bind(ride.airbear_id)
        .bind(ride.driver_id)
        .bind(ride.status.as_str())
        .bind(ride.fare)
        .bind(ride.distance)
        .bind(ride.payment_method.as_deref())
        .bind(ride.created_at)
        .bind(ride.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn get_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        let sql = format!("SELECT {} FROM rides WHERE id = $1", RIDE_COLUMNS);
        let row = sqlx::query_as::<_, RideRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(Ride::try_from).transpose()
    }

    async fn list_rides_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Ride>> {
        let sql = format!(
            "SELECT {} FROM rides WHERE user_id = $1 OR driver_id = $1 ORDER BY created_at DESC",
            RIDE_COLUMNS
        );
        let rows = sqlx::query_as::<_, RideRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        into_rides(rows)
    }

    async fn list_pending_rides(&self) -> CoreResult<Vec<Ride>> {
        let sql = format!(
            "SELECT {} FROM rides WHERE status IN ('pending', 'confirmed', 'booked') ORDER BY created_at ASC",
            RIDE_COLUMNS
        );
        let rows = sqlx::query_as::<_, RideRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        into_rides(rows)
    }

    async fn apply_transition(&self, transition: &RideTransition) -> CoreResult<Option<Ride>> {
        let mut from: Vec<String> = transition.from.iter().map(|s| s.as_str().to_string()).collect();
        // legacy spelling of confirmed
        if transition.from.contains(&RideStatus::Confirmed) {
            from.push("booked".to_string());
        }

        let sql = format!(
            r#"
            UPDATE rides
            SET status = $2,
                driver_id = COALESCE($3, driver_id),
                payment_method = COALESCE($4, payment_method),
                completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($5)
            RETURNING {}
            "#,
            RIDE_COLUMNS
        );

        let row = sqlx::query_as::<_, RideRow>(&sql)
            .bind(transition.ride_id)
            .bind(transition.to.as_str())
            .bind(transition.driver_id)
            .bind(transition.payment_method.as_deref())
            .bind(&from)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(Ride::try_from).transpose()
    }
}
