pub mod airbear;
pub mod spot;
pub mod profile;
pub mod repository;
pub mod payment;
pub mod identity;
pub mod webhook;

pub use airbear::{AirBear, LocationUpdate, StatusUpdate};
pub use profile::{Role, UserProfile};
pub use spot::Spot;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Upstream service error: {0}")]
    UpstreamError(String),
    #[error("Identity verification failed: {0}")]
    IdentityError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
