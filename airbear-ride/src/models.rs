use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::lifecycle::RideError;

/// Ride status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Accepted,
    #[serde(alias = "booked")]
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Pending => "pending",
            RideStatus::Accepted => "accepted",
            RideStatus::Confirmed => "confirmed",
            RideStatus::InProgress => "in_progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown ride status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for RideStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RideStatus::Pending),
            "accepted" => Ok(RideStatus::Accepted),
            // older rows were written as "booked"
            "confirmed" | "booked" => Ok(RideStatus::Confirmed),
            "in_progress" => Ok(RideStatus::InProgress),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A booking linking a rider, two spots and (optionally) an AirBear
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ride {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pickup_spot_id: Uuid,
    pub dropoff_spot_id: Uuid,
    pub airbear_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: RideStatus,
    pub fare: f64,
    pub distance: f64,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Ride {
    /// Create a pending ride for `user_id`
    pub fn new(user_id: Uuid, draft: &RideDraft, airbear_id: Option<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            pickup_spot_id: draft.pickup_spot_id,
            dropoff_spot_id: draft.dropoff_spot_id,
            airbear_id,
            driver_id: None,
            status: RideStatus::Pending,
            fare: draft.fare,
            distance: draft.distance,
            payment_method: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Fare in the smallest currency unit, as payment processors expect it
    pub fn fare_cents(&self) -> i64 {
        (self.fare * 100.0).round() as i64
    }

    /// Riders see their own rides, drivers the rides they accepted
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.driver_id == Some(user_id)
    }
}

/// Incoming booking payload. Every field is optional so that a missing value is
/// reported as a validation failure rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideRequest {
    pub pickup_spot_id: Option<Uuid>,
    pub dropoff_spot_id: Option<Uuid>,
    pub fare: Option<f64>,
    pub distance: Option<f64>,
}

/// A booking payload that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RideDraft {
    pub pickup_spot_id: Uuid,
    pub dropoff_spot_id: Uuid,
    pub fare: f64,
    pub distance: f64,
}

impl RideRequest {
    pub fn validate(&self) -> Result<RideDraft, RideError> {
        let (Some(pickup_spot_id), Some(dropoff_spot_id), Some(fare), Some(distance)) =
            (self.pickup_spot_id, self.dropoff_spot_id, self.fare, self.distance)
        else {
            return Err(RideError::Validation(
                "Missing required fields: pickup_spot_id, dropoff_spot_id, fare, distance".to_string(),
            ));
        };

        if pickup_spot_id == dropoff_spot_id {
            return Err(RideError::Validation(
                "Pickup and dropoff must be different spots".to_string(),
            ));
        }
        if !fare.is_finite() || fare <= 0.0 {
            return Err(RideError::Validation("Fare must be a positive amount".to_string()));
        }
        if !distance.is_finite() || distance < 0.0 {
            return Err(RideError::Validation("Distance must not be negative".to_string()));
        }

        Ok(RideDraft {
            pickup_spot_id,
            dropoff_spot_id,
            fare,
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RideRequest {
        RideRequest {
            pickup_spot_id: Some(Uuid::new_v4()),
            dropoff_spot_id: Some(Uuid::new_v4()),
            fare: Some(4.5),
            distance: Some(1.2),
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<RideStatus>(), Ok(RideStatus::InProgress));
        assert_eq!("booked".parse::<RideStatus>(), Ok(RideStatus::Confirmed));
        assert!("teleported".parse::<RideStatus>().is_err());

        let status: RideStatus = serde_json::from_str("\"booked\"").unwrap();
        assert_eq!(status, RideStatus::Confirmed);
        assert_eq!(serde_json::to_string(&RideStatus::InProgress).unwrap(), "\"in_progress\"");
    }

    #[test]
    fn test_valid_request_creates_pending_ride() {
        let user_id = Uuid::new_v4();
        let draft = request().validate().unwrap();
        let ride = Ride::new(user_id, &draft, None);

        assert_eq!(ride.status, RideStatus::Pending);
        assert_eq!(ride.user_id, user_id);
        assert_eq!(ride.fare_cents(), 450);
        assert!(ride.is_visible_to(user_id));
        assert!(!ride.is_visible_to(Uuid::new_v4()));
    }

    #[test]
    fn test_request_validation() {
        let missing = RideRequest { fare: None, ..request() };
        assert!(matches!(missing.validate(), Err(RideError::Validation(_))));

        let spot = Uuid::new_v4();
        let same_spot = RideRequest {
            pickup_spot_id: Some(spot),
            dropoff_spot_id: Some(spot),
            ..request()
        };
        assert!(same_spot.validate().is_err());

        let free = RideRequest { fare: Some(0.0), ..request() };
        assert!(free.validate().is_err());

        let nan = RideRequest { distance: Some(f64::NAN), ..request() };
        assert!(nan.validate().is_err());
    }
}
