//! The text-fetch capability the cache sits on.
//!
//! [`Transport`] is the seam: [`HttpTransport`] talks to the network via
//! reqwest, tests inject their own implementations, and
//! [`RetryingTransport`] decorates any transport with retry on transient
//! failures.

pub mod http;
pub mod retry;
pub mod traits;

pub use http::{HttpTransport, HttpTransportConfig};
pub use retry::{RetryConfig, RetryingTransport};
pub use traits::{Transport, TransportResponse};
