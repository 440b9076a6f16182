//! JSON decoding on top of the text cache.
//!
//! The cache stores raw text only. Decoding happens per call, so a parse
//! failure never poisons the cached entry and two callers may decode the
//! same body differently.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::fetcher::CachedFetcher;
use crate::types::{FetchOptions, FetchTarget};
use crate::{FetchError, Result};

/// Text → text rewrite applied before parsing (e.g. field renames).
pub type TextTransform = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Value → value reshape applied after parsing.
pub type JsonTransform = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

/// Options for [`CachedFetcher::fetch_json`].
///
/// ```rust
/// # use fetchcache::{FetchOptions, JsonOptions};
/// # use std::time::Duration;
/// let options = JsonOptions::from(FetchOptions::default().cache_fresh_time(Duration::from_secs(30)))
///     .before_json(|text| Some(text.replace("\"mintA\"", "\"base_mint\"")))
///     .after_json(|value| value.get("data").cloned());
/// ```
#[derive(Clone, Default)]
pub struct JsonOptions {
    pub fetch: FetchOptions,
    before_json: Option<TextTransform>,
    after_json: Option<JsonTransform>,
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the underlying fetch options.
    pub fn fetch(mut self, options: FetchOptions) -> Self {
        self.fetch = options;
        self
    }

    /// Rewrite the body text before parsing. Returning `None` yields no value.
    pub fn before_json<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.before_json = Some(Arc::new(f));
        self
    }

    /// Reshape the parsed value. Returning `None` yields no value.
    pub fn after_json<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.after_json = Some(Arc::new(f));
        self
    }
}

impl From<FetchOptions> for JsonOptions {
    fn from(fetch: FetchOptions) -> Self {
        Self {
            fetch,
            ..Self::default()
        }
    }
}

impl fmt::Debug for JsonOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonOptions")
            .field("fetch", &self.fetch)
            .field("before_json", &self.before_json.is_some())
            .field("after_json", &self.after_json.is_some())
            .finish()
    }
}

impl CachedFetcher {
    /// Fetch `target` and decode it as `T`, reporting why it failed.
    pub async fn try_fetch_json<T: DeserializeOwned>(
        &self,
        target: impl Into<FetchTarget>,
        options: &JsonOptions,
    ) -> Result<T> {
        let text = self.try_fetch_text(target, &options.fetch).await?;
        decode_json(&text, options)
    }

    /// Fetch `target` and decode it as `T`. Every failure collapses to `None`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        target: impl Into<FetchTarget>,
        options: &JsonOptions,
    ) -> Option<T> {
        self.try_fetch_json(target, options)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "JSON fetch yielded no value"))
            .ok()
    }
}

/// Empty text (before or after `before_json`) yields [`FetchError::EmptyBody`].
pub(crate) fn decode_json<T: DeserializeOwned>(text: &str, options: &JsonOptions) -> Result<T> {
    if text.is_empty() {
        return Err(FetchError::EmptyBody);
    }
    let text = match &options.before_json {
        Some(transform) => Cow::Owned(transform(text).ok_or(FetchError::Transform("before_json"))?),
        None => Cow::Borrowed(text),
    };
    if text.is_empty() {
        return Err(FetchError::EmptyBody);
    }

    let value: Value = serde_json::from_str(&text)?;
    let value = match &options.after_json {
        Some(transform) => transform(value).ok_or(FetchError::Transform("after_json"))?,
        None => value,
    };
    Ok(serde_json::from_value(value)?)
}
