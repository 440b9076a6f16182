//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};

use super::traits::{Transport, TransportResponse};
use crate::types::FetchRequest;
use crate::{FetchError, Result};

/// Default user agent sent by [`HttpTransport`].
pub const DEFAULT_USER_AGENT: &str = concat!("fetchcache/", env!("CARGO_PKG_VERSION"));

/// Settings for the HTTP client.
///
/// ```rust
/// # use fetchcache::HttpTransportConfig;
/// # use std::time::Duration;
/// let config = HttpTransportConfig::new().timeout(Duration::from_secs(10));
/// assert_eq!(config.timeout, Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Whole-request timeout. Default: 30s.
    pub timeout: Duration,
    /// `User-Agent` header. Default: `fetchcache/<version>`.
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpTransportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Production transport over a shared [`reqwest::Client`].
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client from the given settings.
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (e.g. one with custom TLS or proxy settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: &FetchRequest) -> Result<TransportResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(header_map(&request.headers)?);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// Build a header map where a later entry replaces an earlier one.
fn header_map(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Configuration(format!("invalid header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::Configuration(format!("invalid value for header {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Parse the delay-seconds form of `Retry-After`. HTTP-date values are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
