//! In-process store used when no database is configured, and by tests.
//! Every conditional write runs under a single write lock so the compare and
//! the update cannot interleave.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use airbear_bodega::{BodegaItem, BodegaOrder, OrderStatus};
use airbear_core::repository::{
    AirBearRepository, BodegaRepository, HealthCheck, ProfileRepository, RideRepository, SpotRepository,
};
use airbear_core::{AirBear, CoreResult, LocationUpdate, Spot, StatusUpdate, UserProfile};
use airbear_ride::{apply, Ride, RideAction, RideTransition};

#[derive(Default)]
pub struct MemoryStore {
    rides: RwLock<HashMap<Uuid, Ride>>,
    airbears: RwLock<HashMap<Uuid, AirBear>>,
    spots: RwLock<HashMap<Uuid, Spot>>,
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
    items: RwLock<HashMap<Uuid, BodegaItem>>,
    orders: RwLock<HashMap<Uuid, BodegaOrder>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_spot(&self, spot: Spot) {
        self.spots.write().await.insert(spot.id, spot);
    }

    pub async fn insert_airbear(&self, airbear: AirBear) {
        self.airbears.write().await.insert(airbear.id, airbear);
    }

    pub async fn insert_item(&self, item: BodegaItem) {
        self.items.write().await.insert(item.id, item);
    }

    pub async fn insert_profile(&self, profile: UserProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl RideRepository for MemoryStore {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()> {
        self.rides.write().await.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn get_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        Ok(self.rides.read().await.get(&id).cloned())
    }

    async fn list_rides_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Ride>> {
        let mut rides: Vec<Ride> = self
            .rides
            .read()
            .await
            .values()
            .filter(|r| r.is_visible_to(user_id))
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rides)
    }

    async fn list_pending_rides(&self) -> CoreResult<Vec<Ride>> {
        let mut rides: Vec<Ride> = self
            .rides
            .read()
            .await
            .values()
            .filter(|r| RideAction::Accept.allowed_from().contains(&r.status))
            .cloned()
            .collect();
        rides.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rides)
    }

    async fn apply_transition(&self, transition: &RideTransition) -> CoreResult<Option<Ride>> {
        let mut rides = self.rides.write().await;
        match rides.get_mut(&transition.ride_id) {
            Some(ride) if transition.from.contains(&ride.status) => {
                apply(ride, transition);
                Ok(Some(ride.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl AirBearRepository for MemoryStore {
    async fn list_airbears(&self) -> CoreResult<Vec<AirBear>> {
        let mut airbears: Vec<AirBear> = self.airbears.read().await.values().cloned().collect();
        airbears.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(airbears)
    }

    async fn get_airbear(&self, id: Uuid) -> CoreResult<Option<AirBear>> {
        Ok(self.airbears.read().await.get(&id).cloned())
    }

    async fn update_location(&self, id: Uuid, update: &LocationUpdate) -> CoreResult<Option<AirBear>> {
        let mut airbears = self.airbears.write().await;
        Ok(airbears.get_mut(&id).map(|airbear| {
            airbear.apply_location(update);
            airbear.clone()
        }))
    }

    async fn update_status(&self, id: Uuid, update: &StatusUpdate) -> CoreResult<Option<AirBear>> {
        let mut airbears = self.airbears.write().await;
        Ok(airbears.get_mut(&id).map(|airbear| {
            airbear.apply_status(update);
            airbear.clone()
        }))
    }

    async fn claim_available(&self) -> CoreResult<Option<AirBear>> {
        let mut airbears = self.airbears.write().await;
        let candidate = airbears
            .values()
            .filter(|a| a.is_assignable())
            .map(|a| a.id)
            .min();

        Ok(candidate.and_then(|id| airbears.get_mut(&id)).map(|airbear| {
            airbear.is_available = false;
            airbear.updated_at = Utc::now();
            airbear.clone()
        }))
    }

    async fn release(&self, id: Uuid) -> CoreResult<()> {
        if let Some(airbear) = self.airbears.write().await.get_mut(&id) {
            airbear.is_available = true;
            airbear.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl SpotRepository for MemoryStore {
    async fn list_active_spots(&self) -> CoreResult<Vec<Spot>> {
        let mut spots: Vec<Spot> = self
            .spots
            .read()
            .await
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        spots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(spots)
    }

    async fn get_spot(&self, id: Uuid) -> CoreResult<Option<Spot>> {
        Ok(self.spots.read().await.get(&id).cloned())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_profile(&self, id: Uuid) -> CoreResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }

    async fn ensure_profile(&self, profile: &UserProfile) -> CoreResult<UserProfile> {
        let mut profiles = self.profiles.write().await;
        let stored = profiles.entry(profile.id).or_insert_with(|| profile.clone());
        if stored.email.is_none() {
            stored.email = profile.email.clone();
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl BodegaRepository for MemoryStore {
    async fn list_active_items(&self) -> CoreResult<Vec<BodegaItem>> {
        let mut items: Vec<BodegaItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|i| i.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn create_order(&self, order: &BodegaOrder) -> CoreResult<()> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> CoreResult<Option<BodegaOrder>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn set_checkout_session(&self, id: Uuid, session_id: &str) -> CoreResult<()> {
        if let Some(order) = self.orders.write().await.get_mut(&id) {
            order.checkout_session_id = Some(session_id.to_string());
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn transition_order(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> CoreResult<Option<BodegaOrder>> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.get_mut(&id) else {
            return Ok(None);
        };
        if order.status != from || order.transition(to).is_err() {
            return Ok(None);
        }
        Ok(Some(order.clone()))
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }
}
