//! Configuration for the pipeline and its remote collaborators.

use crate::errors::OkrflowError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`PipelineConfig::base_url`].
pub const ENV_BASE_URL: &str = "OKRFLOW_BASE_URL";
/// Environment variable overriding [`PipelineConfig::timeout_seconds`].
pub const ENV_TIMEOUT_SECS: &str = "OKRFLOW_TIMEOUT_SECS";
/// Environment variable overriding [`LoggingConfig::level`].
pub const ENV_LOG_LEVEL: &str = "OKRFLOW_LOG_LEVEL";
/// Environment variable overriding [`LoggingConfig::json`].
pub const ENV_LOG_JSON: &str = "OKRFLOW_LOG_JSON";

/// Configuration for reaching the transformation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL the stage endpoints are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers to include.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Ignore `HTTP_PROXY`-style environment settings.
    #[serde(default)]
    pub no_proxy: bool,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout() -> f64 {
    // model-backed stages routinely take tens of seconds
    120.0
}

fn default_user_agent() -> String {
    format!("okrflow/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
            no_proxy: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads defaults, then applies `OKRFLOW_*` environment overrides.
    pub fn from_env() -> Result<Self, OkrflowError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Loads a JSON configuration file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OkrflowError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), OkrflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_seconds = raw.trim().parse().map_err(|_| {
                OkrflowError::Config(format!("{ENV_TIMEOUT_SECS} must be a number, got '{raw}'"))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(raw) = lookup(ENV_LOG_JSON) {
            self.logging.json = matches!(raw.trim(), "1" | "true" | "yes");
        }
        self.validate()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Bypasses system proxy settings.
    #[must_use]
    pub fn without_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Full URL of a stage endpoint.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Checks the configuration for obvious mistakes.
    pub fn validate(&self) -> Result<(), OkrflowError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(OkrflowError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(OkrflowError::Config(format!(
                "timeout_seconds must be positive, got {}",
                self.timeout_seconds
            )));
        }
        Ok(())
    }
}

/// Logging output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
