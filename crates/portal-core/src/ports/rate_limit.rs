//! Request throttling port.

use async_trait::async_trait;
use std::time::Duration;

/// Rate limiter trait - throttles requests per client key.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check whether the key may proceed and consume one unit if so.
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError>;
}

/// Result of a rate limit check. Also reported by the posting limiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until one more unit becomes available.
    pub reset_after: Duration,
}

/// Rate limit errors.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Backend error: {0}")]
    Backend(String),
}
