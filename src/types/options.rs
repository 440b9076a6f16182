//! Per-call fetch options.

use std::time::Duration;

/// Options for a single fetch.
///
/// ```rust
/// # use fetchcache::FetchOptions;
/// # use std::time::Duration;
/// let options = FetchOptions::default()
///     .cache_fresh_time(Duration::from_secs(30))
///     .stale_on_error(true);
/// assert!(!options.ignore_cache);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Request payload. Part of the cache key.
    pub body: Option<String>,
    /// Skip the freshness check and issue a new request. Coalescing onto an
    /// in-flight request and the minimum-spacing floor still apply.
    pub ignore_cache: bool,
    /// Reuse a successful response younger than this. `None` = always stale.
    pub cache_fresh_time: Option<Duration>,
    /// Extra headers for this call. Not part of the cache key.
    pub headers: Vec<(String, String)>,
    /// On failure, answer with the last successful body for the key (if any).
    pub stale_on_error: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn ignore_cache(mut self, ignore: bool) -> Self {
        self.ignore_cache = ignore;
        self
    }

    pub fn cache_fresh_time(mut self, fresh: Duration) -> Self {
        self.cache_fresh_time = Some(fresh);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn stale_on_error(mut self, enabled: bool) -> Self {
        self.stale_on_error = enabled;
        self
    }
}
