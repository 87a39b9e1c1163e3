//! Local request throttle for the remote search service
//!
//! The remote API is rate-limited upstream; throttling locally turns a
//! remote 429 into a cheap local denial. Denials are retryable but never
//! count toward circuit breaker thresholds.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

use governor::{Quota, RateLimiter as GovernorLimiter};
use parking_lot::Mutex;

use crate::config::RateLimitConfig;

/// Rate limiter for outbound request throttling
pub struct RateLimiter {
    /// Whether rate limiting is enabled
    enabled: AtomicBool,
    /// Internal rate limiter (lazy initialized)
    inner: Mutex<
        Option<
            GovernorLimiter<
                governor::state::NotKeyed,
                governor::state::InMemoryState,
                governor::clock::DefaultClock,
            >,
        >,
    >,
    /// Quota configuration
    rps: u32,
    burst: u32,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: AtomicBool::new(config.enabled),
            inner: Mutex::new(None),
            rps: config.requests_per_second,
            burst: config.burst_size,
        }
    }

    /// Try to acquire a permit
    pub fn try_acquire(&self) -> bool {
        if !self.enabled.load(Ordering::Relaxed) {
            return true;
        }

        let mut inner = self.inner.lock();
        let limiter = inner.get_or_insert_with(|| {
            let quota = Quota::per_second(NonZeroU32::new(self.rps).unwrap_or(NonZeroU32::MIN))
                .allow_burst(NonZeroU32::new(self.burst).unwrap_or(NonZeroU32::MIN));
            GovernorLimiter::direct(quota)
        });

        limiter.check().is_ok()
    }

    /// Enable or disable rate limiting
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_bounded() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_second: 1,
            burst_size: 3,
        });

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn disabled_limiter_always_admits() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            requests_per_second: 1,
            burst_size: 1,
        });

        for _ in 0..100 {
            assert!(limiter.try_acquire());
        }
    }

    #[test]
    fn can_be_disabled_at_runtime() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_second: 1,
            burst_size: 1,
        });

        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        limiter.set_enabled(false);
        assert!(limiter.try_acquire());
    }
}
