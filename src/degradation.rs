//! Graceful degradation: cached reads and marked fallback responses
//!
//! When the breaker rejects a call or retries run dry, the gateway consults
//! this manager instead of failing outright. Every fallback is explicitly
//! marked so a degraded answer can never pass for authoritative data.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::cache::{CacheStatsSnapshot, ResponseCache};
use crate::config::{CacheConfig, DegradationConfig};

/// Status marker carried by every degraded response
pub const DEGRADED_STATUS: &str = "degraded";

/// Non-authoritative response served when the remote is unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegradedResponse {
    /// Always [`DEGRADED_STATUS`]; callers must check before trusting data
    pub status: String,
    /// Operation the fallback stands in for
    pub operation: String,
    /// Human-readable explanation
    pub message: String,
    /// Suggested wait before retrying, seconds
    pub retry_after_secs: u64,
    /// Empty result payload in the remote's response shape
    pub payload: Value,
}

/// Cache + fallback provider, each gated by its own feature flag
pub struct DegradationManager {
    cache: ResponseCache,
    caching_enabled: bool,
    fallback_enabled: bool,
    retry_after: Duration,
}

impl DegradationManager {
    /// Create a manager from cache and degradation configuration
    #[must_use]
    pub fn new(cache_config: &CacheConfig, degradation: &DegradationConfig) -> Self {
        Self {
            cache: ResponseCache::new(),
            caching_enabled: cache_config.enabled,
            fallback_enabled: degradation.fallback_enabled,
            retry_after: degradation.retry_after,
        }
    }

    /// Fresh cached value for `key`, if caching is enabled and the entry
    /// hasn't expired. Missing and expired are indistinguishable.
    pub fn get_cached(&self, key: &str) -> Option<Value> {
        if !self.caching_enabled {
            return None;
        }
        self.cache.get(key)
    }

    /// Store a successful response. No-op when caching is disabled.
    pub fn store(&self, key: &str, value: Value, ttl: Duration) {
        if self.caching_enabled {
            self.cache.set(key, value, ttl);
        }
    }

    /// Whether terminal failures should be converted to fallbacks
    #[must_use]
    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Build the marked fallback response for `operation`. Never fails.
    #[must_use]
    pub fn fallback(&self, operation: &str) -> DegradedResponse {
        warn!(operation, "Serving degraded fallback response");
        DegradedResponse {
            status: DEGRADED_STATUS.to_string(),
            operation: operation.to_string(),
            message: "Remote search service is temporarily unavailable; returning an empty degraded result".to_string(),
            retry_after_secs: self.retry_after.as_secs(),
            payload: json!({ "response": { "numFound": 0, "docs": [] } }),
        }
    }

    /// Cache statistics snapshot
    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.cache.stats()
    }

    /// Evict expired cache entries (periodic maintenance hook)
    pub fn sweep(&self) {
        self.cache.evict_expired();
    }
}
