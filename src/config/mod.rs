//! Configuration management
//!
//! This module handles the credentials and endpoints the SDK talks to.
//! Configuration can be built:
//! - directly from the three credentials (`Config::new`)
//! - from an esg.yml file
//! - from environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend (database, auth, storage) configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Analytics API configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    /// Content API configuration
    #[serde(default)]
    pub content: ContentConfig,
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend project (e.g. https://xyz.supabase.co)
    #[serde(default)]
    pub url: String,
    /// Public API key of the backend project
    #[serde(default)]
    pub api_key: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Analytics API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// API key sent with every analytics request
    #[serde(default)]
    pub api_key: String,
    /// Endpoint receiving the `?type=` report selector
    #[serde(default = "default_analytics_url")]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: default_analytics_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Content API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Endpoint serving initiative documents
    #[serde(default = "default_content_url")]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            url: default_content_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_analytics_url() -> String {
    "https://asia-south1-esgedu-740d2.cloudfunctions.net/analytics-api".to_string()
}

fn default_content_url() -> String {
    "https://asia-south1-esgedu-740d2.cloudfunctions.net/git-api".to_string()
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Build a configuration from the three credentials, keeping default
    /// endpoints and timeouts for everything else.
    pub fn new(
        analytics_api_key: impl Into<String>,
        backend_api_key: impl Into<String>,
        backend_url: impl Into<String>,
    ) -> Self {
        Self {
            backend: BackendConfig {
                url: backend_url.into(),
                api_key: backend_api_key.into(),
                ..BackendConfig::default()
            },
            analytics: AnalyticsConfig {
                api_key: analytics_api_key.into(),
                ..AnalyticsConfig::default()
            },
            content: ContentConfig::default(),
        }
    }

    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - ESG_BACKEND_URL
    /// - ESG_BACKEND_API_KEY
    /// - ESG_BACKEND_TIMEOUT_SECS
    /// - ESG_ANALYTICS_API_KEY
    /// - ESG_ANALYTICS_URL
    /// - ESG_ANALYTICS_TIMEOUT_SECS
    /// - ESG_CONTENT_URL
    /// - ESG_CONTENT_TIMEOUT_SECS
    pub fn load_with_env(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ESG_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var("ESG_BACKEND_API_KEY") {
            self.backend.api_key = key;
        }
        if let Some(secs) = env_u64("ESG_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = secs;
        }

        if let Ok(key) = std::env::var("ESG_ANALYTICS_API_KEY") {
            self.analytics.api_key = key;
        }
        if let Ok(url) = std::env::var("ESG_ANALYTICS_URL") {
            self.analytics.url = url;
        }
        if let Some(secs) = env_u64("ESG_ANALYTICS_TIMEOUT_SECS") {
            self.analytics.timeout_secs = secs;
        }

        if let Ok(url) = std::env::var("ESG_CONTENT_URL") {
            self.content.url = url;
        }
        if let Some(secs) = env_u64("ESG_CONTENT_TIMEOUT_SECS") {
            self.content.timeout_secs = secs;
        }
    }

    /// Check that every credential and endpoint is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("backend.url", &self.backend.url),
            ("backend.api_key", &self.backend.api_key),
            ("analytics.api_key", &self.analytics.api_key),
            ("analytics.url", &self.analytics.url),
            ("content.url", &self.content.url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{} must not be empty", name)));
            }
        }

        for (name, url) in [
            ("backend.url", &self.backend.url),
            ("analytics.url", &self.analytics.url),
            ("content.url", &self.content.url),
        ] {
            if reqwest::Url::parse(url).is_err() {
                return Err(ConfigError::ValidationError(format!(
                    "{} is not a valid URL: {}",
                    name, url
                )));
            }
        }

        Ok(())
    }
}

/// Read a numeric environment variable, ignoring unparseable values
fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse::<u64>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_VARS: [&str; 8] = [
    "ESG_BACKEND_URL",
    "ESG_BACKEND_API_KEY",
    "ESG_BACKEND_TIMEOUT_SECS",
    "ESG_ANALYTICS_API_KEY",
    "ESG_ANALYTICS_URL",
    "ESG_ANALYTICS_TIMEOUT_SECS",
    "ESG_CONTENT_URL",
    "ESG_CONTENT_TIMEOUT_SECS",
];
