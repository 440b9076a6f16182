//! [`CachedFetcher`] and its builder.

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::entry::SettledEntry;
use super::key::{CacheKey, cache_key};
use crate::config::FetcherConfig;
use crate::telemetry;
use crate::transport::{
    HttpTransport, HttpTransportConfig, RetryConfig, RetryingTransport, Transport,
    TransportResponse,
};
use crate::types::{FetchOptions, FetchRequest, FetchTarget};
use crate::{FetchError, Result};

/// Default minimum spacing between network requests for one key.
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(2000);

/// Default soft timeout after which a slow request is logged.
pub const DEFAULT_SLOW_REQUEST_THRESHOLD: Duration = Duration::from_millis(2000);

/// Default maximum number of settled entries kept.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Handle to the outcome of an in-flight request, cloned to every caller
/// that coalesces onto it.
type PendingText = Shared<BoxFuture<'static, Result<Arc<str>>>>;

enum Lookup {
    Cached(Result<Arc<str>>),
    Pending(PendingText),
}

struct FetcherSettings {
    min_spacing: Duration,
    slow_request_threshold: Duration,
    default_headers: Vec<(String, String)>,
}

struct FetcherInner {
    transport: Arc<dyn Transport>,
    settings: FetcherSettings,
    /// At most one entry per key; removed when the request settles.
    in_flight: Mutex<HashMap<CacheKey, PendingText>>,
    settled: moka::sync::Cache<CacheKey, SettledEntry>,
}

/// Request-coalescing, freshness-aware text fetcher.
///
/// Cheap to clone; clones share one cache. For each call the fetcher:
///
/// 1. joins the in-flight request for the same key, if there is one;
/// 2. otherwise serves the settled outcome if it settled less than
///    `min_spacing` ago (this floor also applies to `ignore_cache` calls);
/// 3. otherwise serves a successful outcome younger than the caller's
///    `cache_fresh_time`, unless `ignore_cache` is set;
/// 4. otherwise issues one new request, registered before any await so
///    concurrent callers coalesce onto it.
///
/// Requests run in a spawned task and always settle the entry, even if
/// every caller has gone away or the task is dropped with its runtime.
/// Requires a tokio runtime.
///
/// ```rust,no_run
/// # use fetchcache::{CachedFetcher, FetchOptions};
/// # use std::time::Duration;
/// # async fn demo() -> fetchcache::Result<()> {
/// let fetcher = CachedFetcher::builder().build()?;
/// let options = FetchOptions::default().cache_fresh_time(Duration::from_secs(30));
/// if let Some(text) = fetcher.fetch_text("https://api.example.com/pools", &options).await {
///     println!("{text}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CachedFetcher {
    inner: Arc<FetcherInner>,
}

impl CachedFetcher {
    /// Create a new builder.
    pub fn builder() -> CachedFetcherBuilder {
        CachedFetcherBuilder::new()
    }

    /// Fetch `target` as text, reporting why it failed.
    ///
    /// With [`FetchOptions::stale_on_error`], a failure is answered with the
    /// last successful body for the key when one exists.
    pub async fn try_fetch_text(
        &self,
        target: impl Into<FetchTarget>,
        options: &FetchOptions,
    ) -> Result<Arc<str>> {
        let target = target.into();
        let key = cache_key(&target, options.body.as_deref());
        let outcome = match self.lookup(&key, &target, options) {
            Lookup::Cached(outcome) => outcome,
            Lookup::Pending(pending) => pending.await,
        };

        match outcome {
            Err(err) if options.stale_on_error => match self.last_good(&key) {
                Some(text) => {
                    metrics::counter!(telemetry::STALE_FALLBACKS_TOTAL).increment(1);
                    warn!(key = %key, error = %err, "serving last successful response");
                    Ok(text)
                }
                None => Err(err),
            },
            other => other,
        }
    }

    /// Fetch `target` as text. Every failure collapses to `None`.
    pub async fn fetch_text(
        &self,
        target: impl Into<FetchTarget>,
        options: &FetchOptions,
    ) -> Option<Arc<str>> {
        self.try_fetch_text(target, options)
            .await
            .inspect_err(|e| debug!(error = %e, "fetch yielded no value"))
            .ok()
    }

    /// Whether a request for this target/body is currently outstanding.
    pub fn is_in_flight(&self, target: impl Into<FetchTarget>, body: Option<&str>) -> bool {
        let key = cache_key(&target.into(), body);
        self.inner.lock_in_flight().contains_key(&key)
    }

    /// Drop the settled entry for `key`. An in-flight request is left alone.
    pub fn invalidate(&self, key: &CacheKey) {
        self.inner.settled.invalidate(key);
    }

    /// Drop every settled entry.
    pub fn clear(&self) {
        self.inner.settled.invalidate_all();
    }

    /// Number of settled entries.
    pub fn len(&self) -> u64 {
        self.inner.settled.run_pending_tasks();
        self.inner.settled.entry_count()
    }

    /// Whether no settled entries are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the underlying transport.
    pub fn transport_name(&self) -> &str {
        self.inner.transport.name()
    }

    fn last_good(&self, key: &CacheKey) -> Option<Arc<str>> {
        self.inner.settled.get(key).and_then(|entry| entry.last_good)
    }

    /// Check-and-register under one lock: no await between observing "no
    /// usable entry" and inserting the in-flight placeholder.
    fn lookup(&self, key: &CacheKey, target: &FetchTarget, options: &FetchOptions) -> Lookup {
        let mut in_flight = self.inner.lock_in_flight();

        if let Some(pending) = in_flight.get(key) {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL, "reason" => "in_flight").increment(1);
            debug!(key = %key, "joining in-flight request");
            return Lookup::Pending(pending.clone());
        }

        if let Some(entry) = self.inner.settled.get(key) {
            let now = Instant::now();
            if let Some(reason) = entry.reuse(now, self.inner.settings.min_spacing, options) {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL, "reason" => reason.as_label())
                    .increment(1);
                debug!(
                    key = %key,
                    reason = reason.as_label(),
                    age_ms = now.saturating_duration_since(entry.settled_at).as_millis() as u64,
                    "serving cached response"
                );
                return Lookup::Cached(entry.outcome);
            }
        }

        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        let request = FetchRequest::resolve(&self.inner.settings.default_headers, target, options);
        let (pending, request_task) = self.prepare_request(key.clone(), request);
        in_flight.insert(key.clone(), pending.clone());
        // Spawn outside the lock: a task dropped at spawn settles through
        // its guard, which takes the same lock.
        drop(in_flight);
        tokio::spawn(request_task);
        Lookup::Pending(pending)
    }

    /// Build the shared handle callers await and the task that fulfils it.
    fn prepare_request(
        &self,
        key: CacheKey,
        request: FetchRequest,
    ) -> (PendingText, impl Future<Output = ()> + Send + 'static) {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let mut guard = SettleGuard {
            inner: Arc::clone(&self.inner),
            key: Some(key.clone()),
            tx: Some(tx),
        };
        let request_task = async move {
            let outcome = AssertUnwindSafe(inner.execute(&key, &request))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(FetchError::Task("transport panicked".into())));
            guard.finish(outcome);
        };
        let pending = rx
            .map(|received| received.unwrap_or_else(|_| Err(cancelled())))
            .boxed()
            .shared();
        (pending, request_task)
    }
}

fn cancelled() -> FetchError {
    FetchError::Task("request task was cancelled".into())
}

/// Settles the key exactly once, then hands the outcome to waiting callers.
///
/// If the request task is dropped before it finishes (runtime shutdown,
/// abort) the entry settles as a task error, so the in-flight slot is
/// released and the key can be retried once the spacing floor allows.
struct SettleGuard {
    inner: Arc<FetcherInner>,
    key: Option<CacheKey>,
    tx: Option<oneshot::Sender<Result<Arc<str>>>>,
}

impl SettleGuard {
    fn finish(&mut self, outcome: Result<Arc<str>>) {
        if let Some(key) = self.key.take() {
            self.inner.settle(key, outcome.clone());
        }
        if let Some(tx) = self.tx.take() {
            // every caller may have gone away
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(key) = &self.key {
            warn!(key = %key, "request task dropped before settling");
            self.finish(Err(cancelled()));
        }
    }
}

impl FetcherInner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<CacheKey, PendingText>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute(&self, key: &CacheKey, request: &FetchRequest) -> Result<Arc<str>> {
        let transport = self.transport.name().to_owned();
        let threshold = self.settings.slow_request_threshold;
        let started = Instant::now();

        let mut send = std::pin::pin!(self.transport.send(request));
        let response = if threshold.is_zero() {
            send.await
        } else {
            match tokio::time::timeout(threshold, send.as_mut()).await {
                Ok(response) => response,
                Err(_) => {
                    metrics::counter!(telemetry::SLOW_REQUESTS_TOTAL, "transport" => transport.clone())
                        .increment(1);
                    warn!(
                        key = %key,
                        threshold_ms = threshold.as_millis() as u64,
                        "request is taking longer than expected"
                    );
                    send.await
                }
            }
        };

        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "transport" => transport.clone())
            .record(started.elapsed().as_secs_f64());

        let outcome = response
            .and_then(TransportResponse::into_text)
            .map(Arc::<str>::from);
        match &outcome {
            Ok(text) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "transport" => transport,
                    "status" => "ok",
                )
                .increment(1);
                debug!(key = %key, bytes = text.len(), "request succeeded");
            }
            Err(err) => {
                metrics::counter!(telemetry::REQUESTS_TOTAL,
                    "transport" => transport,
                    "status" => "error",
                )
                .increment(1);
                if let Some(status) = err.status() {
                    metrics::counter!(telemetry::HTTP_ERRORS_TOTAL, "status" => status.to_string())
                        .increment(1);
                }
                match err {
                    FetchError::RateLimited { retry_after } => {
                        warn!(key = %key, ?retry_after, "too many requests");
                    }
                    _ => warn!(key = %key, error = %err, "request failed"),
                }
            }
        }
        outcome
    }

    /// Record the outcome, then release the in-flight slot. Both happen
    /// under the in-flight lock, so a lookup sees one or the other.
    fn settle(&self, key: CacheKey, outcome: Result<Arc<str>>) {
        let mut in_flight = self.lock_in_flight();
        let previous = self.settled.get(&key);
        let entry = SettledEntry::settle(outcome, Instant::now(), previous.as_ref());
        self.settled.insert(key.clone(), entry);
        in_flight.remove(&key);
    }
}

/// Builder for [`CachedFetcher`].
///
/// Without an explicit [`transport`](Self::transport), an [`HttpTransport`]
/// is built from the request timeout and user agent settings.
pub struct CachedFetcherBuilder {
    transport: Option<Arc<dyn Transport>>,
    http: HttpTransportConfig,
    retry: Option<RetryConfig>,
    min_spacing: Duration,
    slow_request_threshold: Duration,
    max_entries: u64,
    entry_ttl: Option<Duration>,
    default_headers: Vec<(String, String)>,
}

impl Default for CachedFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CachedFetcherBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            http: HttpTransportConfig::default(),
            retry: None,
            min_spacing: DEFAULT_MIN_SPACING,
            slow_request_threshold: DEFAULT_SLOW_REQUEST_THRESHOLD,
            max_entries: DEFAULT_MAX_ENTRIES,
            entry_ttl: None,
            default_headers: Vec::new(),
        }
    }

    /// Apply every setting from a loaded [`FetcherConfig`].
    pub fn config(mut self, config: &FetcherConfig) -> Self {
        self.http = HttpTransportConfig::new()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone());
        self.retry = config.retry.clone().map(Into::into);
        self.min_spacing = config.min_spacing();
        self.slow_request_threshold = config.slow_request_threshold();
        self.max_entries = config.max_entries;
        self.entry_ttl = config.entry_ttl();
        self.default_headers = config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self
    }

    /// Use a custom transport instead of the default HTTP client.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Whole-request timeout for the default HTTP transport.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// `User-Agent` for the default HTTP transport.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.http.user_agent = user_agent.into();
        self
    }

    /// Retry transient failures. Off by default.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Minimum spacing between requests for one key. Zero disables the floor.
    pub fn min_spacing(mut self, spacing: Duration) -> Self {
        self.min_spacing = spacing;
        self
    }

    /// Soft timeout after which a slow request is logged. Zero disables it.
    pub fn slow_request_threshold(mut self, threshold: Duration) -> Self {
        self.slow_request_threshold = threshold;
        self
    }

    /// Maximum number of settled entries kept.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Evict settled entries this long after they were written.
    ///
    /// A TTL shorter than the minimum spacing is raised to it; otherwise an
    /// evicted entry would let a request through before the floor expires.
    pub fn entry_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = Some(ttl);
        self
    }

    /// Header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    fn effective_ttl(&self) -> Option<Duration> {
        self.entry_ttl.map(|ttl| {
            if ttl < self.min_spacing {
                debug!(
                    ttl_ms = ttl.as_millis() as u64,
                    min_spacing_ms = self.min_spacing.as_millis() as u64,
                    "raising entry TTL to the minimum spacing"
                );
            }
            ttl.max(self.min_spacing)
        })
    }

    pub fn build(self) -> Result<CachedFetcher> {
        if self.max_entries == 0 {
            return Err(FetchError::Configuration(
                "max_entries must be at least 1".into(),
            ));
        }
        let entry_ttl = self.effective_ttl();

        let mut transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(&self.http)?),
        };
        if let Some(retry) = self.retry.filter(|r| r.max_attempts > 1) {
            transport = Arc::new(RetryingTransport::new(transport, retry));
        }

        let mut settled = moka::sync::Cache::builder().max_capacity(self.max_entries);
        if let Some(ttl) = entry_ttl {
            settled = settled.time_to_live(ttl);
        }

        Ok(CachedFetcher {
            inner: Arc::new(FetcherInner {
                transport,
                settings: FetcherSettings {
                    min_spacing: self.min_spacing,
                    slow_request_threshold: self.slow_request_threshold,
                    default_headers: self.default_headers,
                },
                in_flight: Mutex::new(HashMap::new()),
                settled: settled.build(),
            }),
        })
    }
}
