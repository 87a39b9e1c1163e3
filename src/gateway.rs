//! Resilient gateway composing cache, breaker, rate limit and retry
//!
//! Every remote search flows through [`ResilientGateway::execute`]:
//! cache first, then the circuit breaker, then the retry-wrapped transport
//! call with the local rate limiter consulted just before dispatch. All
//! collaborators are injected; there are no process-wide singletons.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::degradation::{DegradationManager, DegradedResponse};
use crate::failsafe::{CircuitBreaker, Failsafe, with_retry};
use crate::query::{QueryBuildResult, QueryParameters, build_query_with_limits};
use crate::transport::{Pagination, SearchTransport};
use crate::{Error, Result};

/// Largest pagination window the remote service accepts
pub const MAX_ROWS_PER_REQUEST: u32 = 1000;

/// Outcome of a gateway call.
///
/// `Degraded` data is explicitly separated from authoritative results so a
/// caller has to opt in to treating it as an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// Fresh result from the remote service
    Fresh(Value),
    /// Result served from the response cache, no remote call made
    Cached(Value),
    /// Marked fallback served because the remote is unavailable
    Degraded(DegradedResponse),
}

impl GatewayResponse {
    /// Authoritative value, if any
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Fresh(v) | Self::Cached(v) => Some(v),
            Self::Degraded(_) => None,
        }
    }

    /// Whether this is a degraded (non-authoritative) response
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// A completed search: the gateway response plus how the query was built
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Gateway response (fresh, cached or degraded)
    pub response: GatewayResponse,
    /// Query construction details, including validation warnings
    pub built: QueryBuildResult,
}

/// Gateway protecting one remote search dependency
pub struct ResilientGateway {
    transport: Arc<dyn SearchTransport>,
    failsafe: Failsafe,
    degradation: Arc<DegradationManager>,
    query_limits: crate::config::QueryConfig,
    search_ttl: Duration,
}

impl ResilientGateway {
    /// Build a gateway from configuration and an injected transport
    #[must_use]
    pub fn new(transport: Arc<dyn SearchTransport>, config: &Config) -> Self {
        Self {
            transport,
            failsafe: Failsafe::new(&config.remote.name, &config.failsafe),
            degradation: Arc::new(DegradationManager::new(&config.cache, &config.degradation)),
            query_limits: config.query.clone(),
            search_ttl: config.cache.search_ttl,
        }
    }

    /// Build a search query from typed parameters and execute it.
    ///
    /// # Errors
    ///
    /// [`Error::NoCriteria`] if no parameter survives validation,
    /// [`Error::Validation`] for an oversized pagination window, otherwise
    /// whatever [`execute`](Self::execute) surfaces.
    pub async fn search(
        &self,
        params: &QueryParameters,
        page: Pagination,
    ) -> Result<SearchOutcome> {
        if page.rows > MAX_ROWS_PER_REQUEST {
            return Err(Error::Validation {
                field: "rows".to_string(),
                reason: format!("maximum {MAX_ROWS_PER_REQUEST} rows per request"),
            });
        }

        let built = build_query_with_limits(params, &self.query_limits)?;
        let response = self
            .execute("search", &built.query, page, self.search_ttl)
            .await?;
        Ok(SearchOutcome { response, built })
    }

    /// Execute one operation through the full resilience pipeline.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::CircuitOpen`] and [`Error::RetriesExhausted`]
    /// only when fallback is disabled; non-transient failures
    /// (e.g. [`Error::RemoteClient`]) always propagate.
    #[tracing::instrument(
        skip(self, query),
        fields(operation = %operation, request_id = %uuid::Uuid::new_v4())
    )]
    pub async fn execute(
        &self,
        operation: &str,
        query: &str,
        page: Pagination,
        ttl: Duration,
    ) -> Result<GatewayResponse> {
        let cache_key = ResponseCache::build_key(operation, query, &page);

        if let Some(value) = self.degradation.get_cached(&cache_key) {
            debug!("Serving cached response");
            return Ok(GatewayResponse::Cached(value));
        }

        let transport = &self.transport;
        let limiter = &self.failsafe.rate_limiter;
        let result = self
            .failsafe
            .circuit_breaker
            .call(|| {
                with_retry(&self.failsafe.retry_policy, operation, move || {
                    let transport = Arc::clone(transport);
                    async move {
                        if !limiter.try_acquire() {
                            return Err(Error::RateLimited {
                                retry_after: Duration::from_secs(1),
                            });
                        }
                        transport.invoke(query, page).await
                    }
                })
            })
            .await;

        match result {
            Ok(value) => {
                self.degradation.store(&cache_key, value.clone(), ttl);
                Ok(GatewayResponse::Fresh(value))
            }
            Err(e @ (Error::CircuitOpen { .. } | Error::RetriesExhausted { .. })) => {
                if self.degradation.fallback_enabled() {
                    warn!(error = %e, "Terminal failure, serving fallback");
                    Ok(GatewayResponse::Degraded(self.degradation.fallback(operation)))
                } else {
                    Err(e)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Circuit breaker guarding this gateway's dependency
    #[must_use]
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.failsafe.circuit_breaker
    }

    /// Degradation manager (cache statistics, maintenance sweep)
    #[must_use]
    pub fn degradation(&self) -> &DegradationManager {
        &self.degradation
    }
}
