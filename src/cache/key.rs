//! Cache key derivation.

use std::fmt;

use crate::types::FetchTarget;

/// Identifies one logical resource + payload pair.
///
/// Built by [`cache_key`]; two calls share cached state exactly when their
/// keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a target and request body.
///
/// The key is `"{METHOD} {url}"`, followed by a newline and the body when
/// one is present. URLs cannot contain a raw newline, so the URL/body split
/// is unambiguous. Headers never participate.
pub fn cache_key(target: &FetchTarget, body: Option<&str>) -> CacheKey {
    let method = target.http_method().as_str();
    let url = target.url();
    match body {
        Some(body) => CacheKey(format!("{method} {url}\n{body}")),
        None => CacheKey(format!("{method} {url}")),
    }
}
