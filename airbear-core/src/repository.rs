use async_trait::async_trait;
use uuid::Uuid;

use airbear_bodega::{BodegaItem, BodegaOrder, OrderStatus};
use airbear_ride::{Ride, RideTransition};

use crate::airbear::{AirBear, LocationUpdate, StatusUpdate};
use crate::profile::UserProfile;
use crate::spot::Spot;
use crate::CoreResult;

/// Repository trait for ride data access
#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()>;

    async fn get_ride(&self, id: Uuid) -> CoreResult<Option<Ride>>;

    /// Rides where the user is the rider or the accepting driver, newest first
    async fn list_rides_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Ride>>;

    /// Pending or confirmed requests waiting for a driver, oldest first
    async fn list_pending_rides(&self) -> CoreResult<Vec<Ride>>;

    /// Apply `transition` only if the ride is still in one of `transition.from`.
    /// Returns `None` when another writer moved the ride first.
    async fn apply_transition(&self, transition: &RideTransition) -> CoreResult<Option<Ride>>;
}

/// Repository trait for vehicle data access
#[async_trait]
pub trait AirBearRepository: Send + Sync {
    async fn list_airbears(&self) -> CoreResult<Vec<AirBear>>;

    async fn get_airbear(&self, id: Uuid) -> CoreResult<Option<AirBear>>;

    async fn update_location(&self, id: Uuid, update: &LocationUpdate) -> CoreResult<Option<AirBear>>;

    async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> CoreResult<Option<AirBear>>;

    /// Atomically take the first available, non-charging AirBear out of service.
    /// Concurrent callers never receive the same vehicle.
    async fn claim_available(&self) -> CoreResult<Option<AirBear>>;

    /// Put a vehicle back into service
    async fn release(&self, id: Uuid) -> CoreResult<()>;
}

/// Repository trait for pickup / dropoff spots
#[async_trait]
pub trait SpotRepository: Send + Sync {
    async fn list_active_spots(&self) -> CoreResult<Vec<Spot>>;

    async fn get_spot(&self, id: Uuid) -> CoreResult<Option<Spot>>;
}

/// Repository trait for user profiles
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> CoreResult<Option<UserProfile>>;

    /// Insert `profile` unless one already exists for its id; returns the stored row
    async fn ensure_profile(&self, profile: &UserProfile) -> CoreResult<UserProfile>;
}

/// Repository trait for the merchandise storefront
#[async_trait]
pub trait BodegaRepository: Send + Sync {
    async fn list_active_items(&self) -> CoreResult<Vec<BodegaItem>>;

    async fn create_order(&self, order: &BodegaOrder) -> CoreResult<()>;

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<BodegaOrder>>;

    async fn set_checkout_session(&self, id: Uuid, session_id: &str) -> CoreResult<()>;

    /// Conditional status change; `None` when the order is no longer in `from`
    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> CoreResult<Option<BodegaOrder>>;
}

/// Liveness probe for the backing store
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> CoreResult<()>;
}
