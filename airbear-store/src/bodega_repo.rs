use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use airbear_bodega::{BodegaItem, BodegaOrder, OrderError, OrderStatus, PricedLine};
use airbear_core::repository::BodegaRepository;
use airbear_core::{CoreError, CoreResult};

use crate::database::storage;

const ORDER_COLUMNS: &str =
    "id, user_id, lines, total_cents, status, checkout_session_id, created_at, updated_at";

pub struct StoreBodegaRepository {
    pool: PgPool,
}

impl StoreBodegaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i64,
    image_url: Option<String>,
    category: Option<String>,
    is_active: bool,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    lines: Json<Vec<PricedLine>>,
    total_cents: i64,
    status: String,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for BodegaOrder {
    type Error = CoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(|e: OrderError| CoreError::StorageError(e.to_string()))?;

        Ok(BodegaOrder {
            id: row.id,
            user_id: row.user_id,
            lines: row.lines.0,
            total_cents: row.total_cents,
            status,
            checkout_session_id: row.checkout_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BodegaRepository for StoreBodegaRepository {
    async fn list_active_items(&self) -> CoreResult<Vec<BodegaItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            "SELECT id, name, description, price_cents, image_url, category, is_active \
             FROM bodega_items WHERE is_active ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|row| BodegaItem {
                id: row.id,
                name: row.name,
                description: row.description,
                price_cents: row.price_cents,
                image_url: row.image_url,
                category: row.category,
                is_active: row.is_active,
            })
            .collect())
    }

    async fn create_order(&self, order: &BodegaOrder) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bodega_orders (id, user_id, lines, total_cents, status, checkout_session_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.lines))
        .bind(order.total_cents)
        .bind(order.status.as_str())
        .bind(order.checkout_session_id.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<BodegaOrder>> {
        let sql = format!("SELECT {} FROM bodega_orders WHERE id = $1", ORDER_COLUMNS);
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(BodegaOrder::try_from).transpose()
    }

    async fn set_checkout_session(&self, id: Uuid, session_id: &str) -> CoreResult<()> {
        sqlx::query("UPDATE bodega_orders SET checkout_session_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> CoreResult<Option<BodegaOrder>> {
        let sql = format!(
            "UPDATE bodega_orders SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2 RETURNING {}",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.map(BodegaOrder::try_from).transpose()
    }
}
