//! Fully resolved request handed to a [`Transport`](crate::transport::Transport).

use reqwest::Method;

use super::{FetchOptions, FetchTarget};

/// A request ready to send.
///
/// Headers are merged in order: fetcher defaults, then target headers, then
/// per-call option headers. Later entries win at the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub(crate) fn resolve(
        default_headers: &[(String, String)],
        target: &FetchTarget,
        options: &FetchOptions,
    ) -> Self {
        let headers = default_headers
            .iter()
            .chain(target.headers())
            .chain(&options.headers)
            .cloned()
            .collect();
        Self {
            url: target.url().to_string(),
            method: target.http_method().clone(),
            headers,
            body: options.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_merges_headers_in_order() {
        let defaults = vec![("user-agent".to_string(), "a".to_string())];
        let target = FetchTarget::new("https://x").header("accept", "text/plain");
        let options = FetchOptions::new().header("user-agent", "b").body("payload");

        let request = FetchRequest::resolve(&defaults, &target, &options);
        assert_eq!(request.url, "https://x");
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.body.as_deref(), Some("payload"));
        let names: Vec<_> = request.headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            names,
            vec![("user-agent", "a"), ("accept", "text/plain"), ("user-agent", "b")]
        );
    }
}
