//! Opt-in retries for transient transport failures.
//!
//! The fetcher never retries on its own. With
//! [`CachedFetcherBuilder::retry()`](crate::CachedFetcherBuilder::retry) the
//! transport is wrapped in a [`RetryingTransport`], and every retry then
//! happens inside one in-flight request:
//!
//! - callers that arrive during the backoff coalesce onto the same request;
//! - the entry settles once, after the last attempt, so the spacing floor
//!   is measured from the final outcome and not from the first failure;
//! - a 429 `Retry-After` hint replaces the computed backoff, capped at
//!   [`RetryConfig::max_delay`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::{Transport, TransportResponse};
use crate::telemetry;
use crate::types::FetchRequest;
use crate::Result;

/// How many times a request is attempted and how long to wait in between.
///
/// ```rust
/// # use fetchcache::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// // 200ms, 400ms, 800ms, ...
/// assert_eq!(config.delay_for_attempt(1), Duration::from_millis(400));
/// ```
///
/// Every attempt keeps callers waiting on the in-flight entry, so the total
/// backoff should stay well below the freshness windows callers ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts per request, the first one included. 1 means no retry.
    pub max_attempts: u32,
    /// Wait before the first retry; doubled for each later one.
    pub initial_delay: Duration,
    /// Upper bound on any single wait, server hints included.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    /// Three attempts, 500ms then 1s apart, never more than 30s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single attempt. Building a fetcher with this skips the wrapper.
    pub fn disabled() -> Self {
        Self::default().max_attempts(1)
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff before retry `attempt` (0 = first retry).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Wait before retry `attempt`, preferring the server's `Retry-After`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(hint) => hint.min(self.max_delay),
            None => self.delay_for_attempt(attempt),
        }
    }
}

/// Run `attempt_fn` until it succeeds, fails permanently, or runs out of
/// attempts. Only errors for which [`FetchError::is_transient`](crate::FetchError::is_transient) holds are
/// retried; the last one is returned when attempts run out.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    transport_name: &str,
    url: &str,
    attempt_fn: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        let err = match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        attempt += 1;
        if !err.is_transient() || attempt >= attempts {
            return Err(err);
        }

        let delay = config.effective_delay(attempt - 1, err.retry_after());
        metrics::counter!(telemetry::RETRIES_TOTAL, "transport" => transport_name.to_owned())
            .increment(1);
        warn!(
            transport = transport_name,
            url,
            attempt,
            max_attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "transient failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// [`Transport`] that retries the wrapped one.
///
/// Responses are passed through [`TransportResponse::ensure_success`]
/// before the retry decision, so a 429 or 5xx status counts as a transient
/// failure here even though a bare transport reports it as a response.
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    config: RetryConfig,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn Transport>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Transport for RetryingTransport {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, request: &FetchRequest) -> Result<TransportResponse> {
        with_retry(&self.config, self.inner.name(), &request.url, || async {
            self.inner.send(request).await?.ensure_success()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(30), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(350));
    }

    #[test]
    fn retry_after_hint_takes_precedence() {
        let config = RetryConfig::new();
        assert_eq!(
            config.effective_delay(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            config.effective_delay(0, Some(Duration::from_secs(600))),
            config.max_delay
        );
    }

    #[test]
    fn disabled_is_single_attempt() {
        assert_eq!(RetryConfig::disabled().max_attempts, 1);
    }
}
