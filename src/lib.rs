//! fetchcache - request-coalescing, freshness-aware fetch cache
//!
//! [`CachedFetcher`] wraps a text-fetch capability (a [`Transport`]; HTTP via
//! reqwest by default) and minimizes redundant network calls:
//!
//! - concurrent calls for the same URL + body share one request;
//! - a response is reused for a fixed minimum spacing after it settles,
//!   whatever the caller asked for;
//! - a successful response is reused while it is younger than the caller's
//!   freshness window.
//!
//! The public `fetch_*` operations never fail: every error collapses to
//! `None` (the `try_fetch_*` variants keep the [`FetchError`]).
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use fetchcache::{CachedFetcher, FetchOptions, JsonOptions};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Pool {
//!     id: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> fetchcache::Result<()> {
//!     let fetcher = CachedFetcher::builder().build()?;
//!
//!     let options = JsonOptions::from(
//!         FetchOptions::default().cache_fresh_time(Duration::from_secs(30)),
//!     );
//!     let pools: Option<Vec<Pool>> = fetcher
//!         .fetch_json("https://api.example.com/pools", &options)
//!         .await;
//!
//!     match pools {
//!         Some(pools) => println!("{} pools", pools.len()),
//!         None => println!("pools unavailable"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use cache::{CacheKey, CachedFetcher, CachedFetcherBuilder, JsonOptions, cache_key};
pub use config::{FetcherConfig, RetrySection};
pub use error::{FetchError, Result};
pub use transport::{
    HttpTransport, HttpTransportConfig, RetryConfig, RetryingTransport, Transport,
    TransportResponse,
};
pub use types::{FetchOptions, FetchRequest, FetchTarget, Method};

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
