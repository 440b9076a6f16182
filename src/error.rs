//! Fetch error types

use std::time::Duration;

/// Fetch error types.
///
/// `Clone` because a single settled outcome is handed to every caller
/// that coalesced onto the same request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    // Transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    // Data errors
    #[error("empty response body")]
    EmptyBody,

    #[error("JSON error: {0}")]
    Json(String),

    /// A `before_json` / `after_json` transform returned nothing.
    #[error("{0} transform produced no value")]
    Transform(&'static str),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The background request task panicked or was cancelled by runtime shutdown.
    #[error("request task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, rate limiting, 408 and 5xx statuses are
    /// transient. Everything else (4xx, data and configuration errors) is
    /// permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::Timeout | FetchError::RateLimited { .. } => true,
            FetchError::Status { status, .. } => *status == 408 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Server-provided retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

/// Result type alias for fetch operations
pub type Result<T> = std::result::Result<T, FetchError>;
