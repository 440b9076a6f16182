//! End-to-end tests for [`CachedFetcher`] over [`HttpTransport`] via wiremock.

use std::time::Duration;

use futures_util::future::join_all;
use serde::Deserialize;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fetchcache::{
    CachedFetcher, FetchError, FetchOptions, FetchTarget, HttpTransport, HttpTransportConfig,
    JsonOptions, Method, RetryConfig, Transport,
};

fn fetcher() -> CachedFetcher {
    CachedFetcher::builder().build().unwrap()
}

// =============================================================================
// Caching over HTTP
// =============================================================================

#[tokio::test]
async fn repeated_calls_inside_floor_hit_server_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pools"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[1,2,3]"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let url = format!("{}/pools", server.uri());
    for _ in 0..3 {
        let text = fetcher.fetch_text(&url, &FetchOptions::new()).await;
        assert_eq!(text.as_deref(), Some("[1,2,3]"));
    }
}

#[tokio::test]
async fn concurrent_calls_coalesce() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("done")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let url = format!("{}/slow", server.uri());
    let options = FetchOptions::new();
    let results = join_all((0..5).map(|_| fetcher.fetch_text(&url, &options))).await;

    assert!(results.iter().all(|r| r.as_deref() == Some("done")));
}

#[tokio::test]
async fn bodies_are_part_of_the_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/quote"))
        .and(body_string("A"))
        .respond_with(ResponseTemplate::new(200).set_body_string("quote-a"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/quote"))
        .and(body_string("B"))
        .respond_with(ResponseTemplate::new(200).set_body_string("quote-b"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let target = FetchTarget::new(format!("{}/quote", server.uri())).method(Method::POST);

    let a = fetcher.fetch_text(&target, &FetchOptions::new().body("A")).await;
    let b = fetcher.fetch_text(&target, &FetchOptions::new().body("B")).await;
    let a_again = fetcher.fetch_text(&target, &FetchOptions::new().body("A")).await;

    assert_eq!(a.as_deref(), Some("quote-a"));
    assert_eq!(b.as_deref(), Some("quote-b"));
    assert_eq!(a_again.as_deref(), Some("quote-a"));
}

#[tokio::test]
async fn default_and_target_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/h"))
        .and(header("x-client", "fetchcache"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = CachedFetcher::builder()
        .default_header("x-client", "fetchcache")
        .build()
        .unwrap();
    let target = FetchTarget::new(format!("{}/h", server.uri())).header("accept", "application/json");

    assert_eq!(
        fetcher.fetch_text(target, &FetchOptions::new()).await.as_deref(),
        Some("ok")
    );
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn server_error_is_absent_and_not_retried_inside_floor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let url = format!("{}/broken", server.uri());

    assert!(fetcher.fetch_text(&url, &FetchOptions::new()).await.is_none());
    let err = fetcher
        .try_fetch_text(&url, &FetchOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = fetcher()
        .try_fetch_text(format!("{}/limited", server.uri()), &FetchOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );
}

#[tokio::test]
async fn connection_refused_is_http_error() {
    // bind then release a port so nothing is listening on it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/gone", listener.local_addr().unwrap());
    drop(listener);

    let err = fetcher()
        .try_fetch_text(&url, &FetchOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Http(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn client_timeout_is_timeout_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hang"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let fetcher = CachedFetcher::builder()
        .request_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let err = fetcher
        .try_fetch_text(format!("{}/hang", server.uri()), &FetchOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
}

#[tokio::test]
async fn slow_request_still_completes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sluggish"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("eventually")
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&server)
        .await;

    let fetcher = CachedFetcher::builder()
        .slow_request_threshold(Duration::from_millis(20))
        .build()
        .unwrap();
    let text = fetcher
        .fetch_text(format!("{}/sluggish", server.uri()), &FetchOptions::new())
        .await;
    assert_eq!(text.as_deref(), Some("eventually"));
}

// =============================================================================
// Retry
// =============================================================================

#[tokio::test]
async fn retry_recovers_from_transient_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let fetcher = CachedFetcher::builder()
        .retry(RetryConfig::new().initial_delay(Duration::from_millis(10)))
        .build()
        .unwrap();
    let text = fetcher
        .fetch_text(format!("{}/flaky", server.uri()), &FetchOptions::new())
        .await;
    assert_eq!(text.as_deref(), Some("ok"));
}

#[tokio::test]
async fn retry_does_not_repeat_permanent_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = CachedFetcher::builder()
        .retry(RetryConfig::new().initial_delay(Duration::from_millis(10)))
        .build()
        .unwrap();
    let err = fetcher
        .try_fetch_text(format!("{}/missing", server.uri()), &FetchOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

// =============================================================================
// JSON and raw transport
// =============================================================================

#[derive(Debug, Deserialize, PartialEq)]
struct Fees {
    avg: f64,
}

#[tokio::test]
async fn fetch_json_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fees"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"15":{"avg":1200.5}}"#))
        .mount(&server)
        .await;

    let options = JsonOptions::from(FetchOptions::new().cache_fresh_time(Duration::from_secs(300)))
        .after_json(|value| value.get("15").cloned());
    let fees: Option<Fees> = fetcher()
        .fetch_json(format!("{}/fees", server.uri()), &options)
        .await;
    assert_eq!(fees, Some(Fees { avg: 1200.5 }));
}

#[tokio::test]
async fn transport_returns_non_success_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/teapot"))
        .respond_with(ResponseTemplate::new(418).set_body_string("short and stout"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new(&HttpTransportConfig::default()).unwrap();
    let request = fetchcache::FetchRequest {
        url: format!("{}/teapot", server.uri()),
        method: Method::GET,
        headers: vec![],
        body: None,
    };
    let response = transport.send(&request).await.unwrap();
    assert_eq!(response.status, 418);
    assert_eq!(response.body, "short and stout");
    assert!(!response.is_success());
}
