use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use airbear_core::repository::SpotRepository;
use airbear_core::{CoreResult, Spot};

use crate::database::storage;

pub struct StoreSpotRepository {
    pool: PgPool,
}

impl StoreSpotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SpotRow {
    id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
    is_active: bool,
}

impl From<SpotRow> for Spot {
    fn from(row: SpotRow) -> Self {
        Spot {
            id: row.id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            is_active: row.is_active,
        }
    }
}

#[async_trait]
impl SpotRepository for StoreSpotRepository {
    async fn list_active_spots(&self) -> CoreResult<Vec<Spot>> {
        let rows = sqlx::query_as::<_, SpotRow>(
            "SELECT id, name, latitude, longitude, is_active FROM spots WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows.into_iter().map(Spot::from).collect())
    }

    async fn get_spot(&self, id: Uuid) -> CoreResult<Option<Spot>> {
        let row = sqlx::query_as::<_, SpotRow>(
            "SELECT id, name, latitude, longitude, is_active FROM spots WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        Ok(row.map(Spot::from))
    }
}
