use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named pickup / dropoff location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Spot {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_active: bool,
}
