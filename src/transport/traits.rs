//! Transport trait and raw response type.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::types::FetchRequest;
use crate::{FetchError, Result};

/// Maximum number of body bytes quoted in a status error message.
const ERROR_BODY_SNIPPET: usize = 200;

/// A raw response: status code and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header, when the server sent one.
    pub retry_after: Option<Duration>,
}

impl TransportResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, body)
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Pass 2xx responses through; map everything else to an error.
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        if self.status == 429 {
            return Err(FetchError::RateLimited {
                retry_after: self.retry_after,
            });
        }
        let message = if self.body.trim().is_empty() {
            StatusCode::from_u16(self.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unknown status")
                .to_string()
        } else {
            self.body.chars().take(ERROR_BODY_SNIPPET).collect()
        };
        Err(FetchError::Status {
            status: self.status,
            message,
        })
    }

    /// Body text of a 2xx response, or the status error.
    pub fn into_text(self) -> Result<String> {
        self.ensure_success().map(|r| r.body)
    }
}

/// Fetch a resolved request and return its status and body text.
///
/// Implementations report transport-level failures (connection refused,
/// DNS, timeouts) as errors and return every HTTP response, including
/// non-2xx ones, as `Ok`. Status classification happens in
/// [`TransportResponse::ensure_success`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging and metrics.
    fn name(&self) -> &str;

    async fn send(&self, request: &FetchRequest) -> Result<TransportResponse>;
}
