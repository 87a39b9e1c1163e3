//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Remote search service configuration
    pub remote: RemoteConfig,
    /// Failsafe configuration
    pub failsafe: FailsafeConfig,
    /// Response cache configuration
    pub cache: CacheConfig,
    /// Graceful degradation configuration
    pub degradation: DegradationConfig,
    /// Query builder limits
    pub query: QueryConfig,
}

/// Remote search service endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Logical dependency name (used for breaker identity and logging)
    pub name: String,
    /// Base URL of the enriched citation API
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            name: "uspto-citations".to_string(),
            base_url: "https://developer.uspto.gov/ds-api".to_string(),
            api_key_env: "USPTO_API_KEY".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Failsafe configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FailsafeConfig {
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Enable circuit breaker
    pub enabled: bool,
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Consecutive half-open successes needed to close
    pub success_threshold: u32,
    /// Time OPEN must elapse before a trial call is admitted
    #[serde(with = "humantime_serde")]
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 3,
            success_threshold: 2,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries
    pub enabled: bool,
    /// Maximum attempts, including the first
    pub max_attempts: u32,
    /// Base backoff delay
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    /// Maximum backoff delay (before jitter)
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Exponential backoff factor
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable local rate limiting
    pub enabled: bool,
    /// Requests per second toward the remote service
    pub requests_per_second: u32,
    /// Burst size
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 10,
            burst_size: 5,
        }
    }
}

/// Cache configuration for search responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable response caching
    pub enabled: bool,
    /// Default TTL for cached search responses
    #[serde(with = "humantime_serde")]
    pub search_ttl: Duration,
    /// TTL for cached field-definition responses
    #[serde(with = "humantime_serde")]
    pub fields_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_ttl: Duration::from_secs(300),
            fields_ttl: Duration::from_secs(3600),
        }
    }
}

/// Graceful degradation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DegradationConfig {
    /// Serve a marked fallback response when the remote is unavailable
    pub fallback_enabled: bool,
    /// Retry-after hint attached to fallback responses
    #[serde(with = "humantime_serde")]
    pub retry_after: Duration,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            retry_after: Duration::from_secs(30),
        }
    }
}

/// Query builder limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Maximum length of the raw free-text criteria
    pub max_criteria_length: usize,
    /// Maximum wildcards allowed in raw criteria
    pub max_wildcards: usize,
    /// Maximum parenthesis/bracket nesting depth in raw criteria
    pub max_nesting_depth: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_criteria_length: 1000,
            max_wildcards: 10,
            max_nesting_depth: 5,
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file plus `CITATION_GATEWAY_*`
    /// environment variables (environment wins).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed("CITATION_GATEWAY_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate cross-field constraints that serde defaults can't express.
    pub fn validate(&self) -> Result<()> {
        if self.failsafe.retry.max_attempts == 0 {
            return Err(Error::Config(
                "failsafe.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.failsafe.retry.backoff_factor < 1.0 {
            return Err(Error::Config(
                "failsafe.retry.backoff_factor must be >= 1.0".to_string(),
            ));
        }
        if self.failsafe.circuit_breaker.failure_threshold == 0
            || self.failsafe.circuit_breaker.success_threshold == 0
        {
            return Err(Error::Config(
                "circuit breaker thresholds must be at least 1".to_string(),
            ));
        }
        if self.failsafe.rate_limit.enabled && self.failsafe.rate_limit.requests_per_second == 0 {
            return Err(Error::Config(
                "failsafe.rate_limit.requests_per_second must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.failsafe.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.failsafe.circuit_breaker.success_threshold, 2);
        assert_eq!(
            config.failsafe.circuit_breaker.recovery_timeout,
            Duration::from_secs(30)
        );
        assert_eq!(config.failsafe.retry.max_attempts, 3);
        assert_eq!(config.failsafe.retry.base_delay, Duration::from_secs(1));
        assert_eq!(config.failsafe.retry.max_delay, Duration::from_secs(60));
        assert!((config.failsafe.retry.backoff_factor - 2.0).abs() < f64::EPSILON);
        assert!(config.cache.enabled);
        assert!(config.degradation.fallback_enabled);
    }

    #[test]
    fn defaults_pass_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_max_attempts_is_rejected() {
        let mut config = Config::default();
        config.failsafe.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(
            file,
            "failsafe:\n  circuit_breaker:\n    failure_threshold: 7\n    recovery_timeout: 10s\ncache:\n  enabled: false\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.failsafe.circuit_breaker.failure_threshold, 7);
        assert_eq!(
            config.failsafe.circuit_breaker.recovery_timeout,
            Duration::from_secs(10)
        );
        assert!(!config.cache.enabled);
        // Untouched sections keep defaults
        assert_eq!(config.failsafe.retry.max_attempts, 3);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
