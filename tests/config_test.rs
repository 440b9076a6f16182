//! TOML loading for [`FetcherConfig`].
#![cfg(feature = "cli")]

use std::time::Duration;

use fetchcache::{CachedFetcher, FetchError, FetcherConfig, RetryConfig};

#[test]
fn empty_file_yields_defaults() {
    let config = FetcherConfig::from_toml("").unwrap();
    assert_eq!(config, FetcherConfig::default());
}

#[test]
fn parse_full_config() {
    let toml = r#"
        min_spacing_ms = 500
        slow_request_ms = 0
        max_entries = 250
        entry_ttl_secs = 3600
        request_timeout_secs = 10
        user_agent = "pools-ui/2.0"

        [headers]
        accept = "application/json"

        [retry]
        max_attempts = 4
        initial_delay_ms = 100
    "#;
    let config = FetcherConfig::from_toml(toml).unwrap();
    assert_eq!(config.min_spacing(), Duration::from_millis(500));
    assert_eq!(config.slow_request_threshold(), Duration::ZERO);
    assert_eq!(config.max_entries, 250);
    assert_eq!(config.entry_ttl(), Some(Duration::from_secs(3600)));
    assert_eq!(config.request_timeout(), Duration::from_secs(10));
    assert_eq!(config.user_agent, "pools-ui/2.0");
    assert_eq!(config.headers["accept"], "application/json");

    let retry: RetryConfig = config.retry.clone().unwrap().into();
    assert_eq!(retry.max_attempts, 4);
    assert_eq!(retry.initial_delay, Duration::from_millis(100));
    assert_eq!(retry.max_delay, Duration::from_secs(30));
}

#[test]
fn invalid_toml_is_configuration_error() {
    let err = FetcherConfig::from_toml("max_entries = \"lots\"").unwrap_err();
    assert!(matches!(err, FetchError::Configuration(_)));
}

#[test]
fn load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "min_spacing_ms = 100\n").unwrap();

    let config = FetcherConfig::load(Some(&path)).unwrap();
    assert_eq!(config.min_spacing_ms, 100);
    assert_eq!(config.max_entries, 10_000);
}

#[test]
fn load_missing_explicit_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = FetcherConfig::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn corrupt_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is = = not toml").unwrap();

    let err = FetcherConfig::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("config.toml"));
}

#[test]
fn builder_accepts_loaded_config() {
    let config = FetcherConfig::from_toml("max_entries = 5\n[retry]\nmax_attempts = 2\n").unwrap();
    let fetcher = CachedFetcher::builder().config(&config).build().unwrap();
    assert_eq!(fetcher.transport_name(), "http");
}
