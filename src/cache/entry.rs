//! Settled cache entries and the reuse decision.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::types::FetchOptions;
use crate::Result;

/// Why a settled entry was served instead of issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseReason {
    /// Settled less than the minimum spacing ago.
    Spacing,
    /// Successful and younger than the caller's freshness window.
    Fresh,
}

impl ReuseReason {
    pub(crate) fn as_label(self) -> &'static str {
        match self {
            ReuseReason::Spacing => "spacing",
            ReuseReason::Fresh => "fresh",
        }
    }
}

/// The outcome of the most recent request for a key.
#[derive(Debug, Clone)]
pub(crate) struct SettledEntry {
    pub outcome: Result<Arc<str>>,
    pub settled_at: Instant,
    /// Most recent successful body for the key, carried across failures.
    pub last_good: Option<Arc<str>>,
}

impl SettledEntry {
    /// Build the entry that replaces `previous` once a request settles.
    pub fn settle(
        outcome: Result<Arc<str>>,
        settled_at: Instant,
        previous: Option<&SettledEntry>,
    ) -> Self {
        let last_good = match &outcome {
            Ok(text) => Some(Arc::clone(text)),
            Err(_) => previous.and_then(|p| p.last_good.clone()),
        };
        Self {
            outcome,
            settled_at,
            last_good,
        }
    }

    /// Decide whether this entry answers a call made at `now`.
    ///
    /// The spacing floor applies to every call, `ignore_cache` included.
    /// The freshness window applies only to successful outcomes and only
    /// when the caller did not ask to ignore the cache.
    pub fn reuse(
        &self,
        now: Instant,
        min_spacing: Duration,
        options: &FetchOptions,
    ) -> Option<ReuseReason> {
        let age = now.saturating_duration_since(self.settled_at);
        if age < min_spacing {
            return Some(ReuseReason::Spacing);
        }
        if options.ignore_cache || self.outcome.is_err() {
            return None;
        }
        match options.cache_fresh_time {
            Some(fresh) if age < fresh => Some(ReuseReason::Fresh),
            _ => None,
        }
    }
}
