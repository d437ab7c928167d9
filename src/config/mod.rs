//! Configuration management for ddlogs
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables (`DD_API_KEY`, `DD_APP_KEY`, `DD_SITE`)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Largest page size the logs search endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 5000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API configuration
    #[serde(default)]
    pub datadog: DatadogConfig,

    /// Pagination and pipeline configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatadogConfig {
    /// Datadog site (datadoghq.com, datadoghq.eu, us3.datadoghq.com, ...)
    #[serde(default = "default_site")]
    pub site: String,

    /// API key; usually supplied through `DD_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Application key; usually supplied through `DD_APP_KEY`
    #[serde(default)]
    pub app_key: Option<String>,

    /// Storage tier queried by every page request
    #[serde(default = "default_storage_tier")]
    pub storage_tier: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Full base URL override (e.g. a proxy); derived from `site` when absent
    #[serde(default)]
    pub api_url: Option<String>,
}

/// Pagination and pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Number of pages the fetcher may hold ahead of the writer
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,

    /// Size of the in-memory output buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Render the live progress line on stderr
    #[serde(default = "default_progress")]
    pub progress: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Flat columns: fixed fields followed by custom attributes
    Csv,

    /// A single pretty-printed JSON array preserving all nesting
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_site() -> String {
    "datadoghq.com".to_string()
}

fn default_storage_tier() -> String {
    "flex".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_page_size() -> u32 {
    1000
}

fn default_channel_capacity() -> usize {
    2
}

fn default_format() -> OutputFormat {
    OutputFormat::Csv
}

fn default_buffer_size() -> usize {
    256 * 1024
}

fn default_progress() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    false
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            api_key: None,
            app_key: None,
            storage_tier: default_storage_tier(),
            timeout: default_timeout(),
            api_url: None,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            buffer_size: default_buffer_size(),
            progress: default_progress(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// With an explicit path the file must exist. Without one, the default
    /// location is tried and defaults are used when nothing is there.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            ConfigError::InvalidFormat(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Overlay values taken from environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values using an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("DD_API_KEY") {
            self.datadog.api_key = Some(key);
        }
        if let Some(key) = get("DD_APP_KEY") {
            self.datadog.app_key = Some(key);
        }
        if let Some(site) = get("DD_SITE") {
            self.datadog.site = site;
        }
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ddlogs")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// Credentials are only checked by [`Config::validate_credentials`] so
    /// that `config --validate` works without secrets in the environment.
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.datadog.site.trim().is_empty() {
            return Err(ConfigError::MissingField("datadog.site".to_string()).into());
        }

        if self.fetch.page_size == 0 || self.fetch.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "fetch.page_size".to_string(),
                value: self.fetch.page_size.to_string(),
            }
            .into());
        }

        if self.fetch.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.channel_capacity".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.output.buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "output.buffer_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.datadog.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "datadog.timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Ensure both API credentials are present
    pub fn validate_credentials(&self) -> Result<()> {
        let missing = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());

        if missing(&self.datadog.api_key) {
            return Err(ConfigError::MissingField(
                "DD_API_KEY environment variable is required".to_string(),
            )
            .into());
        }
        if missing(&self.datadog.app_key) {
            return Err(ConfigError::MissingField(
                "DD_APP_KEY environment variable is required".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Copy of this configuration with credentials masked, for display
    pub fn redacted(&self) -> Config {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***".to_string());
        let mut config = self.clone();
        config.datadog.api_key = mask(&self.datadog.api_key);
        config.datadog.app_key = mask(&self.datadog.app_key);
        config
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.datadog.timeout)
    }
}

impl DatadogConfig {
    /// Base URL of the API, e.g. `https://api.datadoghq.com`
    pub fn base_url(&self) -> String {
        match &self.api_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://api.{}", self.site.trim()),
        }
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
