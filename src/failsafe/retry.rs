//! Retry logic with exponential backoff

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use tokio::time::sleep;
use tracing::debug;

use crate::config::RetryConfig;
use crate::{Error, Result};

/// Fraction of the computed delay added as randomized jitter.
///
/// Jitter is additive and bounded, so a jittered delay never exceeds
/// `max_delay * (1 + JITTER_FRACTION)`.
pub const JITTER_FRACTION: f64 = 0.25;

/// Retry policy configuration
#[derive(Clone)]
pub struct RetryPolicy {
    /// Whether retries are enabled
    pub enabled: bool,
    /// Maximum attempts, including the first
    pub max_attempts: u32,
    /// Base delay before the first retry
    pub base_delay: Duration,
    /// Cap on the computed delay (before jitter)
    pub max_delay: Duration,
    /// Exponential growth factor
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Create from config
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            backoff_factor: config.backoff_factor,
        }
    }

    /// Backoff delay before retry number `attempt` (0-indexed), before jitter.
    ///
    /// `min(base_delay * backoff_factor^attempt, max_delay)`
    #[must_use]
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(raw.min(self.max_delay.as_secs_f64()))
    }

    /// Backoff with uniform jitter in `[0, JITTER_FRACTION * delay]` added.
    #[must_use]
    pub fn jittered_backoff(&self, attempt: u32) -> Duration {
        let delay = self.calculate_backoff(attempt);
        let jitter = rand::rng().random_range(0.0..=JITTER_FRACTION) * delay.as_secs_f64();
        delay + Duration::from_secs_f64(jitter)
    }
}

/// Execute a future-producing operation with retry.
///
/// The first attempt runs immediately. Non-retryable failures surface
/// untouched; exhausting the attempt budget surfaces
/// [`Error::RetriesExhausted`] wrapping the last transient failure so
/// callers can tell a retried-and-failed call from a first-attempt one.
/// Sleeps suspend the current task only.
///
/// The policy is not idempotency-aware: only pass operations that are safe
/// to repeat.
///
/// # Errors
///
/// Returns the operation's own error when it is not retryable, or
/// [`Error::RetriesExhausted`] after `max_attempts` retryable failures.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, name: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !policy.enabled {
        return f().await;
    }

    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    debug!(operation = name, error = %e, "Non-retryable failure");
                    return Err(e);
                }

                if attempt >= policy.max_attempts {
                    debug!(
                        operation = name,
                        attempts = attempt,
                        "Retry attempts exhausted"
                    );
                    return Err(Error::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }

                let delay = policy.jittered_backoff(attempt - 1);
                debug!(
                    operation = name,
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "Retrying after backoff"
                );
                sleep(delay).await;
            }
        }
    }
}
