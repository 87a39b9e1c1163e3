//! Circuit breaker implementation

use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::CircuitBreakerConfig;
use crate::{Error, Result};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed (allowing requests)
    Closed,
    /// Circuit is open (rejecting requests)
    Open,
    /// Circuit is half-open (admitting serialized trial requests)
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Mutable breaker state, guarded by one mutex.
///
/// All transitions happen under the lock; call execution happens outside it
/// so remote latency never blocks other callers' admission checks.
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    /// Set when entering OPEN, re-stamped on every re-trip
    opened_at: Option<Instant>,
    /// A half-open trial call is currently executing
    trial_in_flight: bool,
}

/// Admission decision, resolved under the lock before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Normal pass-through (CLOSED, or breaker disabled)
    Pass,
    /// The single half-open trial call
    Trial,
}

/// Circuit breaker guarding one named remote dependency
pub struct CircuitBreaker {
    /// Dependency name
    name: String,
    enabled: bool,
    failure_threshold: u32,
    success_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    #[must_use]
    pub fn new(name: &str, config: &CircuitBreakerConfig) -> Self {
        Self {
            name: name.to_string(),
            enabled: config.enabled,
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            recovery_timeout: config.recovery_timeout,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Execute `op` under breaker protection.
    ///
    /// Rejected calls fail with [`Error::CircuitOpen`] without invoking the
    /// operation; admitted calls propagate the operation's own outcome after
    /// recording it. A call whose future is dropped mid-flight is reported
    /// as cancelled and excluded from the breaker's accounting.
    #[tracing::instrument(skip(self, op), fields(dependency = %self.name))]
    pub async fn call<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let admission = self.admit()?;
        let guard = OutcomeGuard {
            breaker: self,
            trial: admission == Admission::Trial,
            armed: true,
        };

        let result = op().await;
        guard.report(&result);
        result
    }

    /// Decide admission under the lock.
    fn admit(&self) -> Result<Admission> {
        if !self.enabled {
            return Ok(Admission::Pass);
        }

        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(Admission::Pass),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map_or(Duration::MAX, |t| t.elapsed());
                if elapsed >= self.recovery_timeout {
                    // Optimistically enter half-open; this caller owns the trial
                    debug!(dependency = %self.name, "Recovery timeout elapsed, admitting trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    inner.trial_in_flight = true;
                    Ok(Admission::Trial)
                } else {
                    warn!(dependency = %self.name, "Circuit open, rejecting call");
                    Err(Error::CircuitOpen {
                        dependency: self.name.clone(),
                        retry_in: self.recovery_timeout.saturating_sub(elapsed),
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    debug!(dependency = %self.name, "Trial already in flight, rejecting call");
                    Err(Error::CircuitOpen {
                        dependency: self.name.clone(),
                        retry_in: Duration::ZERO,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(Admission::Trial)
                }
            }
        }
    }

    /// Record a successful call
    fn record_success(&self, trial: bool) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        if trial {
            inner.trial_in_flight = false;
        }
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                debug!(
                    dependency = %self.name,
                    successes = inner.consecutive_successes,
                    threshold = self.success_threshold,
                    "Trial call succeeded"
                );
                if inner.consecutive_successes >= self.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                    info!(dependency = %self.name, "Circuit breaker closed");
                }
            }
            CircuitState::Open => {
                // Stale call admitted before the trip; nothing to record
            }
        }
    }

    /// Record a breaker-relevant failure
    fn record_failure(&self, trial: bool) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        if trial {
            inner.trial_in_flight = false;
        }
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                warn!(
                    dependency = %self.name,
                    failures = inner.consecutive_failures,
                    threshold = self.failure_threshold,
                    "Call failed in closed state"
                );
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    warn!(
                        dependency = %self.name,
                        failures = inner.consecutive_failures,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // One failure is enough to re-trip, unlike CLOSED's threshold
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.consecutive_successes = 0;
                warn!(dependency = %self.name, "Trial call failed, reopening circuit");
            }
            CircuitState::Open => {}
        }
    }

    /// Release an admitted call without counting it either way.
    ///
    /// Used for cancelled calls and for failures the classifier rules out
    /// (caller errors say nothing about remote health).
    fn record_neutral(&self, trial: bool) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        if trial {
            inner.trial_in_flight = false;
        }
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Consecutive breaker-relevant failures observed in CLOSED
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    /// Human-readable status line for health/status endpoints
    pub fn status_message(&self) -> String {
        let inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => {
                format!("Dependency '{}': circuit breaker is closed", self.name)
            }
            CircuitState::Open => {
                let retry_in = inner.opened_at.map_or(Duration::ZERO, |t| {
                    self.recovery_timeout.saturating_sub(t.elapsed())
                });
                format!(
                    "Dependency '{}': circuit breaker is open after {} failures, retry in {} seconds",
                    self.name,
                    inner.consecutive_failures,
                    retry_in.as_secs()
                )
            }
            CircuitState::HalfOpen => {
                format!(
                    "Dependency '{}': circuit breaker is half-open, testing recovery",
                    self.name
                )
            }
        }
    }
}

/// Reports each admitted call's outcome to the breaker exactly once.
///
/// If the caller's future is dropped before completion the `Drop` impl
/// reports a cancellation, so an abandoned trial can never wedge the
/// breaker in half-open.
struct OutcomeGuard<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    armed: bool,
}

impl OutcomeGuard<'_> {
    fn report<T>(mut self, result: &Result<T>) {
        self.armed = false;
        match result {
            Ok(_) => self.breaker.record_success(self.trial),
            Err(e) if e.is_breaker_relevant() => self.breaker.record_failure(self.trial),
            Err(_) => self.breaker.record_neutral(self.trial),
        }
    }
}

impl Drop for OutcomeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.record_neutral(self.trial);
        }
    }
}
