pub mod models;
pub mod lifecycle;

pub use models::{Ride, RideDraft, RideRequest, RideStatus, UnknownStatus};
pub use lifecycle::{apply, authorize, RideAction, RideError, RideTransition};
