//! The request-coalescing fetch cache.
//!
//! Two kinds of state per [`CacheKey`]:
//!
//! - **in flight**: a shared handle to the one outstanding request for the
//!   key. Every concurrent caller awaits the same handle. Held outside the
//!   bounded store so it can never be evicted mid-request.
//! - **settled**: the outcome of the last request (body or error), when it
//!   settled, and the last successful body. Kept in a bounded moka cache
//!   (capacity plus optional TTL).
//!
//! A settled entry answers a call when it is inside the minimum-spacing
//! floor, or when it is a success inside the caller's freshness window.
//! Otherwise the caller starts a new request, which overwrites the entry
//! when it settles. Failures are cached like successes (as errors), so a
//! burst of calls against a failing endpoint still produces one request per
//! spacing interval.

pub mod entry;
pub mod fetcher;
pub mod json;
pub mod key;

pub use entry::ReuseReason;
pub use fetcher::{
    CachedFetcher, CachedFetcherBuilder, DEFAULT_MAX_ENTRIES, DEFAULT_MIN_SPACING,
    DEFAULT_SLOW_REQUEST_THRESHOLD,
};
pub use json::{JsonOptions, JsonTransform, TextTransform};
pub use key::{CacheKey, cache_key};
