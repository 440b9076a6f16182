//! Public request types for the fetcher.

mod options;
mod request;
mod target;

pub use options::FetchOptions;
pub use request::FetchRequest;
pub use target::FetchTarget;

pub use reqwest::Method;
