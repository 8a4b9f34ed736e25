use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Merchandise sold in the bodega
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodegaItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in cents
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
}
