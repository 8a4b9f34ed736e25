pub mod auth;

pub use auth::{ensure_caller_profile, require_driver, user_auth_middleware, AuthUser, Claims};
