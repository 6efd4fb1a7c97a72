//! Sync configuration from environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The combination of values is inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Material sync configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Backend base URL, e.g. `http://localhost:3000/api`
    pub api_base_url: String,

    /// Total timeout of one HTTP request
    pub request_timeout: Duration,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Delay before a committed transition's flag is cleared
    pub settle_delay: Duration,

    /// Quiet period before a notified view refetches
    pub refresh_debounce: Duration,

    /// Whether to push the recomputed project status after a change
    pub sync_project_status: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(2),
            settle_delay: Duration::from_millis(1500),
            refresh_debounce: Duration::from_millis(300),
            sync_project_status: true,
        }
    }
}

impl SyncConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LC_API_BASE_URL`: Backend base URL (default: http://localhost:3000/api)
    /// - `LC_REQUEST_TIMEOUT_MS`: Request timeout (default: 10000)
    /// - `LC_CONNECT_TIMEOUT_MS`: Connect timeout (default: 2000)
    /// - `LC_SETTLE_DELAY_MS`: Settle delay (default: 1500)
    /// - `LC_REFRESH_DEBOUNCE_MS`: Refresh debounce (default: 300)
    /// - `LC_SYNC_PROJECT_STATUS`: Push project aggregate status (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse::<u64>().map(Duration::from_millis).map_err(|e| {
                    ConfigError::InvalidValue {
                        key,
                        value: raw,
                        reason: e.to_string(),
                    }
                }),
            }
        };

        let sync_project_status = match lookup("LC_SYNC_PROJECT_STATUS") {
            None => defaults.sync_project_status,
            Some(raw) => match raw.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "LC_SYNC_PROJECT_STATUS",
                        value: raw,
                        reason: "expected a boolean".to_string(),
                    })
                }
            },
        };

        let config = Self {
            api_base_url: lookup("LC_API_BASE_URL").unwrap_or(defaults.api_base_url),
            request_timeout: millis("LC_REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            connect_timeout: millis("LC_CONNECT_TIMEOUT_MS", defaults.connect_timeout)?,
            settle_delay: millis("LC_SETTLE_DELAY_MS", defaults.settle_delay)?,
            refresh_debounce: millis("LC_REFRESH_DEBOUNCE_MS", defaults.refresh_debounce)?,
            sync_project_status,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "api_base_url must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout > self.request_timeout {
            return Err(ConfigError::Invalid(
                "connect_timeout must not exceed request_timeout".to_string(),
            ));
        }
        Ok(())
    }
}
