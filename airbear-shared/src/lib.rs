pub mod pii;
pub mod rate_limit;

pub use pii::{scrub_text, scrub_value, Masked};
pub use rate_limit::RateLimiter;
