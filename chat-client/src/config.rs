//! Configuration for the pollchat client.
//!
//! Configuration comes from defaults, an optional TOML file, and the
//! `POLLCHAT_SERVER_URL` environment variable (which always wins for the
//! server address). It is resolved once at startup.

use pollchat_core::{BackoffPolicy, DEFAULT_MAX_BACKOFF_TICKS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the remote base address.
pub const SERVER_URL_ENV: &str = "POLLCHAT_SERVER_URL";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// Base address of the messaging service (default: http://localhost:8080).
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Path prefix of the API routes (default: /api).
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Interval between feed refreshes in milliseconds (default: 2000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request timeout in milliseconds (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Cap on ticks skipped after repeated transient failures (default: 15).
    #[serde(default = "default_max_backoff_ticks")]
    pub max_backoff_ticks: u32,
    /// Picture used when registering without one.
    #[serde(default = "default_profile_picture")]
    pub default_profile_picture: String,
}

// Default value functions
fn default_server_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_max_backoff_ticks() -> u32 {
    DEFAULT_MAX_BACKOFF_TICKS
}

fn default_profile_picture() -> String {
    "https://via.placeholder.com/50".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            api_prefix: default_api_prefix(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_backoff_ticks: default_max_backoff_ticks(),
            default_profile_picture: default_profile_picture(),
        }
    }
}

impl ClientConfig {
    /// Defaults plus the server address from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_from(|key| std::env::var(key).ok())
    }

    /// Load a TOML config file, then apply the environment override.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?.with_env_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML config text. Missing fields take their defaults.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    ///
    /// Blank values are treated as unset.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(SERVER_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        self
    }

    /// Check values that would make the client unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "server_url",
                reason: format!("expected http:// or https:// URL, got {:?}", self.server_url),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Set the server address.
    pub fn with_server_url(mut self, url: &str) -> Self {
        self.server_url = url.to_string();
        self
    }

    /// Set the refresh interval.
    ///
    /// Sub-millisecond intervals round up to one millisecond; only a zero
    /// interval stays zero and fails [`validate`](Self::validate).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.poll_interval_ms = if millis == 0 && !interval.is_zero() {
            1
        } else {
            millis
        };
        self
    }

    /// Set the backoff cap.
    pub fn with_max_backoff_ticks(mut self, ticks: u32) -> Self {
        self.max_backoff_ticks = ticks;
        self
    }

    /// Full URL prefix for API routes, e.g. `http://localhost:8080/api`.
    pub fn api_base(&self) -> String {
        let prefix = self.api_prefix.trim_end_matches('/');
        let prefix = if prefix.is_empty() || prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{}", prefix)
        };
        format!("{}{}", self.server_url.trim_end_matches('/'), prefix)
    }

    /// Refresh interval as a Duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Backoff policy for the poll cycle.
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            max_skip_ticks: self.max_backoff_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base(), "http://localhost:8080/api");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.max_backoff_ticks, DEFAULT_MAX_BACKOFF_TICKS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_server_url() {
        let config = ClientConfig::default().with_env_from(|key| {
            (key == SERVER_URL_ENV).then(|| "https://chat.example.com/".to_string())
        });
        assert_eq!(config.api_base(), "https://chat.example.com/api");
    }

    #[test]
    fn blank_env_is_ignored() {
        let config = ClientConfig::default().with_env_from(|_| Some("  ".to_string()));
        assert_eq!(config.server_url, "http://localhost:8080");
    }

    #[test]
    fn parse_partial_toml_uses_defaults() {
        let config = ClientConfig::parse(
            r#"
            server_url = "http://10.0.0.5:9000"
            poll_interval_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url, "http://10.0.0.5:9000");
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.request_timeout_ms, 10_000);
    }

    #[test]
    fn sub_millisecond_interval_rounds_up() {
        let config = ClientConfig::default().with_poll_interval(Duration::from_micros(500));
        assert_eq!(config.poll_interval_ms, 1);
        assert!(config.validate().is_ok());

        let zero = ClientConfig::default().with_poll_interval(Duration::ZERO);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn parse_rejects_zero_interval() {
        let err = ClientConfig::parse("poll_interval_ms = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "poll_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn parse_rejects_non_http_url() {
        let err = ClientConfig::parse(r#"server_url = "ftp://x""#).unwrap_err();
        assert!(err.to_string().contains("server_url"), "got: {}", err);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn api_prefix_is_normalized() {
        let config = ClientConfig {
            api_prefix: "v2/".into(),
            ..ClientConfig::default()
        };
        assert_eq!(config.api_base(), "http://localhost:8080/v2");

        let config = ClientConfig {
            api_prefix: String::new(),
            ..ClientConfig::default()
        };
        assert_eq!(config.api_base(), "http://localhost:8080");
    }

    #[test]
    fn builder_pattern() {
        let config = ClientConfig::default()
            .with_server_url("http://127.0.0.1:1")
            .with_poll_interval(Duration::from_millis(250))
            .with_max_backoff_ticks(3);

        assert_eq!(config.server_url, "http://127.0.0.1:1");
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.backoff_policy().max_skip_ticks, 3);
    }
}
