//! Client configuration
//!
//! Values come from code (`Default` plus struct update syntax) or from the
//! environment via [`ClientConfig::from_env`].

use crate::error::{ClientError, Result};
use std::time::Duration;

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "LEARNLOG_API_URL";
/// Environment variable for the per-request transport timeout (ms)
pub const REQUEST_TIMEOUT_ENV: &str = "LEARNLOG_REQUEST_TIMEOUT_MS";
/// Environment variable for the submission timeout (ms)
pub const SUBMIT_TIMEOUT_ENV: &str = "LEARNLOG_SUBMIT_TIMEOUT_MS";
/// Environment variable for the cache staleness window (ms)
pub const STALE_AFTER_ENV: &str = "LEARNLOG_STALE_AFTER_MS";

/// Local development endpoint used when no base URL is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL for the REST API, including the version prefix
    pub base_url: String,
    /// Transport timeout per request (None = transport default)
    pub request_timeout: Option<Duration>,
    /// Upper bound on one submission attempt (None = wait indefinitely)
    pub submission_timeout: Option<Duration>,
    /// Age after which a cached view is revalidated on next read
    /// (None = only explicit invalidation marks it stale)
    pub stale_after: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
            submission_timeout: None,
            stale_after: Some(Duration::from_secs(30)),
        }
    }
}

impl ClientConfig {
    /// Build a config for the given base URL with default timeouts
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read configuration from the process environment.
    ///
    /// Missing variables fall back to defaults; malformed numbers are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup(API_URL_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout = parse_millis(&lookup, REQUEST_TIMEOUT_ENV)?;
        let submission_timeout = parse_millis(&lookup, SUBMIT_TIMEOUT_ENV)?;
        // 0 disables age-based staleness
        let stale_after = match parse_millis(&lookup, STALE_AFTER_ENV)? {
            Some(d) if d.is_zero() => None,
            Some(d) => Some(d),
            None => defaults.stale_after,
        };

        let config = Self {
            base_url,
            request_timeout,
            submission_timeout,
            stale_after,
        };
        config.validate()
    }

    /// Check the configuration and normalize the base URL
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            return Err(ClientError::Config("API base URL is empty".into()));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "API base URL must be http(s): {}",
                trimmed
            )));
        }
        self.base_url = trimmed;
        Ok(self)
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ClientError::Config(format!("{} must be milliseconds, got {:?}", key, raw))),
    }
}
