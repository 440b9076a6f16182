//! Fetcher configuration.
//!
//! [`FetcherConfig`] deserializes from TOML; every field has a default, so
//! an empty file is a valid configuration:
//!
//! ```toml
//! min_spacing_ms = 2000
//! slow_request_ms = 2000
//! max_entries = 10000
//! entry_ttl_secs = 3600
//! request_timeout_secs = 30
//! user_agent = "my-app/1.0"
//!
//! [headers]
//! accept = "application/json"
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 500
//! max_delay_ms = 30000
//! ```
//!
//! With the `cli` feature, [`FetcherConfig::load`] resolves the file in this
//! order:
//! 1. explicit path (CLI flag)
//! 2. `<config_dir>/fetchcache/config.toml` (e.g. `~/.config` on Linux)
//! 3. `/etc/fetchcache/config.toml`
//!
//! and falls back to defaults when none exists.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::transport::RetryConfig;
use crate::transport::http::DEFAULT_USER_AGENT;

/// Fetcher settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetcherConfig {
    /// Minimum spacing between network requests for one key (default: 2000).
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
    /// Soft timeout after which a slow request is logged; 0 disables (default: 2000).
    #[serde(default = "default_slow_request_ms")]
    pub slow_request_ms: u64,
    /// Maximum settled entries kept (default: 10,000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Evict settled entries this many seconds after they were written;
    /// never shorter than `min_spacing_ms`.
    #[serde(default)]
    pub entry_ttl_secs: Option<u64>,
    /// Whole-request timeout in seconds (default: 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Retry transient failures. Absent = no retries.
    #[serde(default)]
    pub retry: Option<RetrySection>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            min_spacing_ms: default_min_spacing_ms(),
            slow_request_ms: default_slow_request_ms(),
            max_entries: default_max_entries(),
            entry_ttl_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
            retry: None,
        }
    }
}

fn default_min_spacing_ms() -> u64 {
    2000
}

fn default_slow_request_ms() -> u64 {
    2000
}

fn default_max_entries() -> u64 {
    10_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl FetcherConfig {
    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }

    pub fn slow_request_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_request_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn entry_ttl(&self) -> Option<Duration> {
        self.entry_ttl_secs.map(Duration::from_secs)
    }
}

/// `[retry]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl From<RetrySection> for RetryConfig {
    fn from(section: RetrySection) -> Self {
        RetryConfig::new()
            .max_attempts(section.max_attempts)
            .initial_delay(Duration::from_millis(section.initial_delay_ms))
            .max_delay(Duration::from_millis(section.max_delay_ms))
    }
}

#[cfg(feature = "cli")]
mod load {
    use std::fs;
    use std::path::{Path, PathBuf};

    use tracing::debug;

    use super::FetcherConfig;
    use crate::{FetchError, Result};

    impl FetcherConfig {
        /// Load configuration from the standard locations.
        ///
        /// An explicit path must exist. Without one, the user and system
        /// locations are tried and defaults are used when neither exists.
        pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
            match Self::resolve_config_path(explicit_path)? {
                Some(path) => Self::load_from_file(&path),
                None => {
                    debug!("no config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }

        /// Parse a TOML file.
        pub fn load_from_file(path: &Path) -> Result<Self> {
            let content = fs::read_to_string(path).map_err(|e| {
                FetchError::Configuration(format!("Failed to read config file {path:?}: {e}"))
            })?;
            Self::from_toml(&content).map_err(|e| match e {
                FetchError::Configuration(msg) => {
                    FetchError::Configuration(format!("{path:?}: {msg}"))
                }
                other => other,
            })
        }

        /// Parse TOML text.
        pub fn from_toml(content: &str) -> Result<Self> {
            toml::from_str(content)
                .map_err(|e| FetchError::Configuration(format!("Failed to parse config: {e}")))
        }

        fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
            if let Some(path) = explicit {
                if path.exists() {
                    return Ok(Some(path.to_path_buf()));
                }
                return Err(FetchError::Configuration(format!(
                    "Config file not found: {path:?}"
                )));
            }

            if let Some(dir) = dirs::config_dir() {
                let user_config = dir.join("fetchcache").join("config.toml");
                if user_config.exists() {
                    return Ok(Some(user_config));
                }
            }

            let system_config = PathBuf::from("/etc/fetchcache/config.toml");
            if system_config.exists() {
                return Ok(Some(system_config));
            }

            Ok(None)
        }
    }
}
