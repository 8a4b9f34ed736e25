use uuid::Uuid;

use crate::models::{Ride, RideStatus};

/// Payment methods a rider may confirm with
pub const PAYMENT_METHODS: [&str; 3] = ["cash", "card", "stripe"];

/// A requested change to a ride
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideAction {
    /// Rider confirms their booking
    Confirm { payment_method: String },
    /// Driver takes an open or rider-confirmed request
    Accept,
    /// Driver picks the rider up
    Start,
    /// Driver drops the rider off
    Complete,
    /// Rider withdraws a request no driver has taken yet
    Cancel,
}

impl RideAction {
    pub fn name(&self) -> &'static str {
        match self {
            RideAction::Confirm { .. } => "confirm",
            RideAction::Accept => "accept",
            RideAction::Start => "start",
            RideAction::Complete => "complete",
            RideAction::Cancel => "cancel",
        }
    }

    /// Statuses the ride must currently be in
    pub fn allowed_from(&self) -> &'static [RideStatus] {
        match self {
            RideAction::Confirm { .. } => &[RideStatus::Pending],
            RideAction::Accept | RideAction::Cancel => &[RideStatus::Pending, RideStatus::Confirmed],
            RideAction::Start => &[RideStatus::Accepted],
            RideAction::Complete => &[RideStatus::Accepted, RideStatus::InProgress],
        }
    }

    pub fn target(&self) -> RideStatus {
        match self {
            RideAction::Confirm { .. } => RideStatus::Confirmed,
            RideAction::Accept => RideStatus::Accepted,
            RideAction::Start => RideStatus::InProgress,
            RideAction::Complete => RideStatus::Completed,
            RideAction::Cancel => RideStatus::Cancelled,
        }
    }

    /// Whether the assigned AirBear goes back into service afterwards
    pub fn releases_vehicle(&self) -> bool {
        matches!(self, RideAction::Complete | RideAction::Cancel)
    }
}

/// A guarded status change, ready to be applied as a conditional update
#[derive(Debug, Clone, PartialEq)]
pub struct RideTransition {
    pub ride_id: Uuid,
    pub from: &'static [RideStatus],
    pub to: RideStatus,
    pub driver_id: Option<Uuid>,
    pub payment_method: Option<String>,
}

impl RideTransition {
    /// Payment-processor confirmation; the rider is not the caller here
    pub fn paid(ride_id: Uuid, payment_method: &str) -> Self {
        Self {
            ride_id,
            from: &[RideStatus::Pending],
            to: RideStatus::Confirmed,
            driver_id: None,
            payment_method: Some(payment_method.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RideError {
    #[error("{0}")]
    Validation(String),

    #[error("Ride not found: {0}")]
    NotFound(Uuid),

    #[error("Ride already processed")]
    AlreadyProcessed,

    #[error("Invalid ride transition from {from} to {to}")]
    InvalidTransition { from: RideStatus, to: RideStatus },
}

/// Check that `actor` may apply `action` to `ride` in its current state.
///
/// Ownership failures are reported as `NotFound`, so callers cannot probe for
/// rides that are not theirs. Role checks (rider vs driver) happen upstream.
pub fn authorize(ride: &Ride, actor: Uuid, action: &RideAction) -> Result<RideTransition, RideError> {
    let payment_method = match action {
        RideAction::Confirm { payment_method } => {
            let method = payment_method.trim().to_ascii_lowercase();
            if !PAYMENT_METHODS.contains(&method.as_str()) {
                return Err(RideError::Validation(format!(
                    "Unsupported payment method: {}",
                    payment_method
                )));
            }
            Some(method)
        }
        _ => None,
    };

    let owns = match action {
        RideAction::Confirm { .. } | RideAction::Cancel => ride.user_id == actor,
        RideAction::Start | RideAction::Complete => ride.driver_id == Some(actor),
        RideAction::Accept => true,
    };
    if !owns {
        return Err(RideError::NotFound(ride.id));
    }

    let from = action.allowed_from();
    if !from.contains(&ride.status) {
        return Err(match action {
            RideAction::Confirm { .. } | RideAction::Accept => RideError::AlreadyProcessed,
            _ => RideError::InvalidTransition {
                from: ride.status,
                to: action.target(),
            },
        });
    }

    Ok(RideTransition {
        ride_id: ride.id,
        from,
        to: action.target(),
        driver_id: matches!(action, RideAction::Accept).then_some(actor),
        payment_method,
    })
}

/// Apply an authorized transition to an in-memory copy of the ride
pub fn apply(ride: &mut Ride, transition: &RideTransition) {
    let now = chrono::Utc::now();
    ride.status = transition.to;
    if let Some(driver_id) = transition.driver_id {
        ride.driver_id = Some(driver_id);
    }
    if let Some(method) = &transition.payment_method {
        ride.payment_method = Some(method.clone());
    }
    if transition.to == RideStatus::Completed {
        ride.completed_at = Some(now);
    }
    ride.updated_at = now;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RideDraft;

    fn pending_ride(rider: Uuid) -> Ride {
        let draft = RideDraft {
            pickup_spot_id: Uuid::new_v4(),
            dropoff_spot_id: Uuid::new_v4(),
            fare: 6.0,
            distance: 2.0,
        };
        Ride::new(rider, &draft, Some(Uuid::new_v4()))
    }

    fn step(ride: &mut Ride, actor: Uuid, action: RideAction) -> Result<(), RideError> {
        let transition = authorize(ride, actor, &action)?;
        apply(ride, &transition);
        Ok(())
    }

    #[test]
    fn test_driver_lifecycle() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let mut ride = pending_ride(rider);

        // Pending → Accepted
        step(&mut ride, driver, RideAction::Accept).unwrap();
        assert_eq!(ride.status, RideStatus::Accepted);
        assert_eq!(ride.driver_id, Some(driver));

        // Accepted → InProgress
        step(&mut ride, driver, RideAction::Start).unwrap();
        assert_eq!(ride.status, RideStatus::InProgress);

        // InProgress → Completed
        step(&mut ride, driver, RideAction::Complete).unwrap();
        assert_eq!(ride.status, RideStatus::Completed);
        assert!(ride.completed_at.is_some());
        assert!(ride.status.is_terminal());
    }

    #[test]
    fn test_complete_straight_from_accepted() {
        let driver = Uuid::new_v4();
        let mut ride = pending_ride(Uuid::new_v4());
        step(&mut ride, driver, RideAction::Accept).unwrap();

        let transition = authorize(&ride, driver, &RideAction::Complete).unwrap();
        assert_eq!(transition.from, &[RideStatus::Accepted, RideStatus::InProgress]);
        assert!(RideAction::Complete.releases_vehicle());
    }

    #[test]
    fn test_confirm_twice_is_already_processed() {
        let rider = Uuid::new_v4();
        let mut ride = pending_ride(rider);
        let confirm = RideAction::Confirm { payment_method: "Cash".to_string() };

        step(&mut ride, rider, confirm.clone()).unwrap();
        assert_eq!(ride.status, RideStatus::Confirmed);
        assert_eq!(ride.payment_method.as_deref(), Some("cash"));

        assert_eq!(authorize(&ride, rider, &confirm), Err(RideError::AlreadyProcessed));
    }

    #[test]
    fn test_accept_twice_is_already_processed() {
        let mut ride = pending_ride(Uuid::new_v4());
        step(&mut ride, Uuid::new_v4(), RideAction::Accept).unwrap();

        let result = authorize(&ride, Uuid::new_v4(), &RideAction::Accept);
        assert_eq!(result, Err(RideError::AlreadyProcessed));
    }

    #[test]
    fn test_confirmed_ride_is_driven_to_completion() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let mut ride = pending_ride(rider);
        let confirm = RideAction::Confirm { payment_method: "card".to_string() };
        step(&mut ride, rider, confirm).unwrap();

        step(&mut ride, driver, RideAction::Accept).unwrap();
        assert_eq!(ride.status, RideStatus::Accepted);
        assert_eq!(ride.driver_id, Some(driver));
        assert_eq!(ride.payment_method.as_deref(), Some("card"));

        // Accepting again is still rejected
        assert_eq!(
            authorize(&ride, Uuid::new_v4(), &RideAction::Accept),
            Err(RideError::AlreadyProcessed)
        );

        step(&mut ride, driver, RideAction::Start).unwrap();
        step(&mut ride, driver, RideAction::Complete).unwrap();
        assert_eq!(ride.status, RideStatus::Completed);
    }

    #[test]
    fn test_rider_cancels_confirmed_ride() {
        let rider = Uuid::new_v4();
        let mut ride = pending_ride(rider);
        let paid = RideTransition::paid(ride.id, "stripe");
        apply(&mut ride, &paid);

        let transition = authorize(&ride, rider, &RideAction::Cancel).unwrap();
        assert!(transition.from.contains(&RideStatus::Confirmed));
        apply(&mut ride, &transition);
        assert_eq!(ride.status, RideStatus::Cancelled);
    }

    #[test]
    fn test_only_the_accepting_driver_completes() {
        let driver = Uuid::new_v4();
        let mut ride = pending_ride(Uuid::new_v4());
        step(&mut ride, driver, RideAction::Accept).unwrap();

        let other = Uuid::new_v4();
        assert_eq!(
            authorize(&ride, other, &RideAction::Complete),
            Err(RideError::NotFound(ride.id))
        );
    }

    #[test]
    fn test_confirm_requires_owner() {
        let ride = pending_ride(Uuid::new_v4());
        let confirm = RideAction::Confirm { payment_method: "card".to_string() };
        assert_eq!(
            authorize(&ride, Uuid::new_v4(), &confirm),
            Err(RideError::NotFound(ride.id))
        );
    }

    #[test]
    fn test_invalid_transitions() {
        let rider = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let mut ride = pending_ride(rider);
        step(&mut ride, driver, RideAction::Accept).unwrap();

        // Cannot cancel once a driver has accepted
        assert_eq!(
            authorize(&ride, rider, &RideAction::Cancel),
            Err(RideError::InvalidTransition {
                from: RideStatus::Accepted,
                to: RideStatus::Cancelled,
            })
        );

        // Cannot start twice
        step(&mut ride, driver, RideAction::Start).unwrap();
        assert!(matches!(
            authorize(&ride, driver, &RideAction::Start),
            Err(RideError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_unsupported_payment_method() {
        let rider = Uuid::new_v4();
        let ride = pending_ride(rider);
        let confirm = RideAction::Confirm { payment_method: "bitcoin".to_string() };
        assert!(matches!(authorize(&ride, rider, &confirm), Err(RideError::Validation(_))));
    }

    #[test]
    fn test_paid_transition() {
        let mut ride = pending_ride(Uuid::new_v4());
        let transition = RideTransition::paid(ride.id, "card");
        assert!(transition.from.contains(&ride.status));
        apply(&mut ride, &transition);
        assert_eq!(ride.status, RideStatus::Confirmed);
        assert_eq!(ride.payment_method.as_deref(), Some("card"));
    }
}
