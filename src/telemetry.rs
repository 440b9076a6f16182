//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `fetchcache_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `transport`: transport name (e.g. "http")
//! - `status`: outcome: "ok" or "error"
//! - `reason`: why a cached value was served: "in_flight", "spacing" or "fresh"

/// Total network requests issued by the fetcher (cache misses that went out).
///
/// Labels: `transport`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "fetchcache_requests_total";

/// Network request duration in seconds.
///
/// Labels: `transport`.
pub const REQUEST_DURATION_SECONDS: &str = "fetchcache_request_duration_seconds";

/// Requests that exceeded the slow-request threshold.
///
/// Labels: `transport`.
pub const SLOW_REQUESTS_TOTAL: &str = "fetchcache_slow_requests_total";

/// Non-success HTTP responses.
///
/// Labels: `status` (numeric code).
pub const HTTP_ERRORS_TOTAL: &str = "fetchcache_http_errors_total";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `transport`.
pub const RETRIES_TOTAL: &str = "fetchcache_retries_total";

/// Calls answered without a new network request.
///
/// Labels: `reason`.
pub const CACHE_HITS_TOTAL: &str = "fetchcache_cache_hits_total";

/// Calls that issued a new network request.
pub const CACHE_MISSES_TOTAL: &str = "fetchcache_cache_misses_total";

/// Failed requests answered with the last successful body for the key.
pub const STALE_FALLBACKS_TOTAL: &str = "fetchcache_stale_fallbacks_total";
