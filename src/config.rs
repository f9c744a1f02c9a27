//! Configuration management for the Label Studio MCP Server
//!
//! Handles the Label Studio endpoint, credentials and request settings.

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable holding the Label Studio base URL
pub const URL_ENV: &str = "LABEL_STUDIO_URL";

/// Environment variable holding the Label Studio API key
pub const API_KEY_ENV: &str = "LABEL_STUDIO_API_KEY";

/// Environment variable holding the request timeout in seconds
pub const TIMEOUT_ENV: &str = "LABEL_STUDIO_TIMEOUT_SECS";

/// Base URL used when `LABEL_STUDIO_URL` is not set
pub const DEFAULT_URL: &str = "http://localhost:8080";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the Label Studio MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Label Studio base URL, without a trailing slash
    pub base_url: String,

    /// API key; `None` leaves the server without a connection
    pub api_key: Option<String>,

    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
}

impl Config {
    /// Create a configuration from explicit values
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: normalize_url(&base_url.into()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Load the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(URL_ENV).unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var(API_KEY_ENV).ok();

        let mut config = Self::new(base_url, api_key);

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidConfig {
                message: format!("{} must be a whole number of seconds, got '{}'", TIMEOUT_ENV, raw),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Replace the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_url(&base_url.into());
        self
    }

    /// Replace the API key; a blank key leaves the connection unset
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|k| !k.trim().is_empty());
        self
    }

    /// Whether an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Data manager link for a project
    pub fn project_url(&self, project_id: i64) -> String {
        format!("{}/projects/{}/data", self.base_url, project_id)
    }

    /// Absolute URL for an API path such as `/api/projects/`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_URL, None)
    }
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
