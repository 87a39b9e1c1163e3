//! Citation Gateway Library
//!
//! Resilient query gateway for the USPTO Enriched Citation API.
//!
//! # Features
//!
//! - **Typed query construction**: structured parameters become validated
//!   Lucene expressions, with warnings instead of errors for dropped input
//! - **Circuit breaker**: per-dependency CLOSED/OPEN/HALF_OPEN gate with
//!   serialized trial calls
//! - **Bounded retries**: exponential backoff with jitter, tagged
//!   exhaustion
//! - **Graceful degradation**: TTL response cache plus explicitly marked
//!   fallback responses
//!
//! Circuit state and caches are in-memory only; nothing survives a process
//! restart.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod degradation;
pub mod error;
pub mod failsafe;
pub mod gateway;
pub mod query;
pub mod transport;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
