//! Per-key request throttling with governor's GCRA.
//!
//! Limits are per process; every server instance keeps its own state.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter as GovernorRateLimiter};

use portal_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

type KeyedGovernor = GovernorRateLimiter<
    String,
    DefaultKeyedStateStore<String>,
    DefaultClock,
    StateInformationMiddleware,
>;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// One bucket per key, typically the client IP.
pub struct KeyedRateLimiter {
    limiter: KeyedGovernor,
    clock: DefaultClock,
}

impl KeyedRateLimiter {
    pub fn new(config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(config.max_requests)
            .ok_or_else(|| RateLimitError::Backend("max_requests must be positive".into()))?;
        let quota = Quota::with_period(config.window / burst.get())
            .ok_or_else(|| RateLimitError::Backend("window must be positive".into()))?
            .allow_burst(burst);

        Ok(Self {
            limiter: GovernorRateLimiter::keyed(quota)
                .with_middleware::<StateInformationMiddleware>(),
            clock: DefaultClock::default(),
        })
    }

    /// Drop buckets that have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

#[async_trait]
impl RateLimiter for KeyedRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        match self.limiter.check_key(&key.to_string()) {
            Ok(snapshot) => Ok(RateLimitResult {
                allowed: true,
                remaining: snapshot.remaining_burst_capacity(),
                reset_after: Duration::ZERO,
            }),
            Err(not_until) => Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_after: not_until.wait_time_from(self.clock.now()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keys_are_limited_independently() {
        let limiter = KeyedRateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        })
        .unwrap();

        assert!(limiter.check("10.0.0.1").await.unwrap().allowed);
        assert!(limiter.check("10.0.0.1").await.unwrap().allowed);

        let blocked = limiter.check("10.0.0.1").await.unwrap();
        assert!(!blocked.allowed);
        assert!(blocked.reset_after > Duration::ZERO);

        assert!(limiter.check("10.0.0.2").await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_remaining_counts_down() {
        let limiter = KeyedRateLimiter::new(RateLimitConfig {
            max_requests: 3,
            window: Duration::from_secs(60),
        })
        .unwrap();

        assert_eq!(limiter.check("10.0.0.1").await.unwrap().remaining, 2);
        assert_eq!(limiter.check("10.0.0.1").await.unwrap().remaining, 1);
        assert_eq!(limiter.check("10.0.0.1").await.unwrap().remaining, 0);
        assert_eq!(limiter.check("10.0.0.1").await.unwrap().remaining, 0);
    }

    #[test]
    fn test_zero_quota_is_rejected() {
        let result = KeyedRateLimiter::new(RateLimitConfig {
            max_requests: 0,
            window: Duration::from_secs(1),
        });
        assert!(result.is_err());
    }
}
