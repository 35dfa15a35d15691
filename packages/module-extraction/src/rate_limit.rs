//! Shared rate limiter for provider-bound calls.
//!
//! One limiter is handed to the inference engine and to the managed
//! scraping strategy, so every worker draws permits from the same GCRA
//! state no matter how many URLs are in flight.

use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::types::config::RateLimitConfig;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Cloneable handle to a single process-wide limiter.
#[derive(Clone)]
pub struct SharedRateLimiter {
    limiter: Arc<DirectRateLimiter>,
}

impl std::fmt::Debug for SharedRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRateLimiter").finish_non_exhaustive()
    }
}

impl SharedRateLimiter {
    /// Create a limiter from config. Zero values are raised to one.
    pub fn new(config: &RateLimitConfig) -> Self {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(config.burst).unwrap_or(nonzero!(1u32));
        Self::with_quota(Quota::per_second(rate).allow_burst(burst))
    }

    /// Create with a custom quota.
    pub fn with_quota(quota: Quota) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// A limiter that effectively never waits.
    pub fn unlimited() -> Self {
        Self::with_quota(Quota::per_second(nonzero!(100_000u32)).allow_burst(nonzero!(100_000u32)))
    }

    /// Wait until a permit is available.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl Default for SharedRateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_burst_is_immediate() {
        let limiter = SharedRateLimiter::new(&RateLimitConfig {
            requests_per_second: 1,
            burst: 3,
        });
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let limiter = SharedRateLimiter::new(&RateLimitConfig {
            requests_per_second: 5,
            burst: 1,
        });
        let other = limiter.clone();

        limiter.acquire().await;
        let start = Instant::now();
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_zero_config_is_clamped() {
        let _ = SharedRateLimiter::new(&RateLimitConfig {
            requests_per_second: 0,
            burst: 0,
        });
    }
}
