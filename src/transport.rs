//! Outbound transport to the remote search service
//!
//! The gateway only needs one operation from its transport: invoke a query
//! with a pagination window and get JSON or a classified error back.
//! [`HttpTransport`] is the thin reqwest implementation; everything
//! interesting (retry, breaker, cache, fallback) lives above this seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::config::RemoteConfig;
use crate::{Error, Result};

/// Cap on error-body text carried into error messages
const ERROR_BODY_PREVIEW: usize = 200;

/// Pagination window for a search request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Zero-based offset of the first row
    pub start: u32,
    /// Number of rows requested
    pub rows: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { start: 0, rows: 50 }
    }
}

/// Remote-call abstraction consumed by the gateway
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Execute one search request against the remote service.
    ///
    /// # Errors
    ///
    /// Failures arrive pre-classified: [`Error::Network`],
    /// [`Error::Timeout`], [`Error::RemoteServer`] for transient
    /// infrastructure trouble, [`Error::RateLimited`] for throttling,
    /// [`Error::RemoteClient`] when the request itself is at fault.
    async fn invoke(&self, query: &str, page: Pagination) -> Result<Value>;
}

/// HTTP transport for the enriched citation records endpoint
pub struct HttpTransport {
    client: reqwest::Client,
    records_url: Url,
    api_key: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from remote configuration plus the resolved API key.
    pub fn new(config: &RemoteConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let records_url = format!(
            "{}/enriched_cited_reference_metadata/v3/records",
            config.base_url.trim_end_matches('/')
        );
        let records_url = Url::parse(&records_url)
            .map_err(|e| Error::Config(format!("Invalid remote base_url: {e}")))?;

        Ok(Self {
            client,
            records_url,
            api_key,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn invoke(&self, query: &str, page: Pagination) -> Result<Value> {
        let form = [
            ("criteria", query.to_string()),
            ("start", page.start.to_string()),
            ("rows", page.rows.to_string()),
        ];

        let response = self
            .client
            .post(self.records_url.clone())
            .header("X-API-KEY", &self.api_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| map_send_error(&e, self.timeout).unwrap_or(Error::Http(e)))?;

        let status = response.status();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );

        if let Some(err) = status_error(status, retry_after) {
            // 4xx bodies usually explain what was wrong with the request
            if let Error::RemoteClient { status, .. } = err {
                let mut message = response.text().await.unwrap_or_default();
                message.truncate(ERROR_BODY_PREVIEW);
                return Err(Error::RemoteClient { status, message });
            }
            return Err(err);
        }

        let body: Value = response.json().await?;

        // The remote reports some failures inside a 200 body
        if body.get("error").is_some() {
            return Err(Error::RemoteServer { status: 502 });
        }

        Ok(body)
    }
}

/// Map transport-level send failures into the error taxonomy.
fn map_send_error(e: &reqwest::Error, timeout: Duration) -> Option<Error> {
    if e.is_timeout() {
        Some(Error::Timeout(timeout))
    } else if e.is_connect() {
        Some(Error::Network(e.to_string()))
    } else {
        None
    }
}

/// Classify an HTTP status into the error taxonomy.
///
/// Returns `None` for success statuses.
fn status_error(status: StatusCode, retry_after: Option<Duration>) -> Option<Error> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(Error::RateLimited {
            retry_after: retry_after.unwrap_or(Duration::from_secs(1)),
        });
    }
    if status.is_server_error() {
        return Some(Error::RemoteServer {
            status: status.as_u16(),
        });
    }
    if status.is_client_error() {
        return Some(Error::RemoteClient {
            status: status.as_u16(),
            message: String::new(),
        });
    }
    None
}

/// Parse a `Retry-After` header value given in seconds.
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_map_to_none() {
        assert!(status_error(StatusCode::OK, None).is_none());
        assert!(status_error(StatusCode::NO_CONTENT, None).is_none());
    }

    #[test]
    fn server_errors_are_breaker_relevant() {
        let err = status_error(StatusCode::BAD_GATEWAY, None).unwrap();
        assert!(matches!(err, Error::RemoteServer { status: 502 }));
        assert!(err.is_breaker_relevant());
    }

    #[test]
    fn client_errors_are_not_retryable() {
        let err = status_error(StatusCode::BAD_REQUEST, None).unwrap();
        assert!(matches!(err, Error::RemoteClient { status: 400, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn too_many_requests_honors_retry_after() {
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(7)))
            .unwrap();
        assert!(matches!(
            err,
            Error::RateLimited {
                retry_after
            } if retry_after == Duration::from_secs(7)
        ));
    }

    #[test]
    fn retry_after_header_parses_seconds_only() {
        assert_eq!(parse_retry_after(Some("30")), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after(Some(" 5 ")), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2015")), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn transport_rejects_invalid_base_url() {
        let config = RemoteConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpTransport::new(&config, "key".to_string()),
            Err(Error::Config(_))
        ));
    }
}
