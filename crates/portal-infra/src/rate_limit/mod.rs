//! Request throttling.

mod memory;

pub use memory::{KeyedRateLimiter, RateLimitConfig};
