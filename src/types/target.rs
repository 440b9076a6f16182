//! Request targets: a bare URL or a request descriptor carrying one.

use reqwest::Method;

/// What to fetch.
///
/// Anything URL-like converts into a target (`&str`, `String`,
/// [`reqwest::Url`]). Use the builder methods to describe a non-GET request
/// or attach headers:
///
/// ```rust
/// # use fetchcache::{FetchTarget, Method};
/// let target = FetchTarget::new("https://api.example.com/pools")
///     .method(Method::POST)
///     .header("accept", "application/json");
/// assert_eq!(target.url(), "https://api.example.com/pools");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
}

impl FetchTarget {
    /// Create a GET target for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
        }
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a request header. Headers do not participate in the cache key.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn http_method(&self) -> &Method {
        &self.method
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl From<&str> for FetchTarget {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for FetchTarget {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl From<&String> for FetchTarget {
    fn from(url: &String) -> Self {
        Self::new(url.as_str())
    }
}

impl From<reqwest::Url> for FetchTarget {
    fn from(url: reqwest::Url) -> Self {
        Self::new(String::from(url))
    }
}

impl From<&FetchTarget> for FetchTarget {
    fn from(target: &FetchTarget) -> Self {
        target.clone()
    }
}
