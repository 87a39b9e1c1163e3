//! Error types for the citation gateway

use std::time::Duration;

use thiserror::Error;

/// Result type alias for the citation gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Citation gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query built from parameters where no field survived validation
    #[error("At least one search criterion is required")]
    NoCriteria,

    /// Invalid caller input for a named field
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Failed to reach the remote search service
    #[error("Connection to remote search service failed: {0}")]
    Network(String),

    /// Remote call exceeded its deadline
    #[error("Remote search request timed out after {0:?}")]
    Timeout(Duration),

    /// Remote service returned a server-side (5xx) error
    #[error("Remote search service error (HTTP {status})")]
    RemoteServer {
        /// HTTP status code
        status: u16,
    },

    /// Remote service rejected the request as malformed (4xx)
    #[error("Remote search rejected the request (HTTP {status}): {message}")]
    RemoteClient {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// Local or remote rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait before the next attempt
        retry_after: Duration,
    },

    /// Circuit breaker rejected the call without dispatching it
    #[error("'{dependency}' unavailable: circuit breaker is open, retry in {retry_in:?}")]
    CircuitOpen {
        /// Remote dependency name
        dependency: String,
        /// Time until a trial call will be admitted
        retry_in: Duration,
    },

    /// Retry budget exhausted; wraps the last transient failure
    #[error("all {attempts} attempts failed: {source}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last failure observed
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the retry policy may re-attempt after this failure.
    ///
    /// Transient infrastructure failures and throttling are retryable;
    /// caller mistakes (validation, 4xx) surface immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_)
            | Self::Timeout(_)
            | Self::RemoteServer { .. }
            | Self::RateLimited { .. }
            | Self::Http(_) => true,
            Self::RetriesExhausted { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Whether this failure counts toward circuit breaker thresholds.
    ///
    /// Rate-limit denials are retryable but excluded: a local throttle
    /// says nothing about remote health.
    #[must_use]
    pub fn is_breaker_relevant(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RemoteServer { .. } | Self::Http(_) => {
                true
            }
            Self::RetriesExhausted { source, .. } => source.is_breaker_relevant(),
            _ => false,
        }
    }

    /// Map to an HTTP-ish status code for user-facing error responses.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NoCriteria | Self::Validation { .. } => 400,
            Self::RateLimited { .. } => 429,
            Self::Network(_) => 502,
            Self::Timeout(_) => 504,
            Self::RemoteServer { status } | Self::RemoteClient { status, .. } => *status,
            Self::CircuitOpen { .. } => 503,
            Self::RetriesExhausted { source, .. } => source.status_code(),
            _ => 500,
        }
    }
}
