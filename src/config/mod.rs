//! Configuration management
//!
//! This module handles loading and parsing configuration for Stride.
//! Configuration can be loaded from:
//! - config.yml file (path overridable with `STRIDE_CONFIG`)
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "STRIDE_CONFIG";

/// Config file used when `STRIDE_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Backend selection
    #[serde(default)]
    pub backend: BackendConfig,
    /// Per-session view settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Store implementation (memory or sqlite)
    #[serde(default)]
    pub driver: BackendDriver,
    /// Database path or URL, used by the sqlite driver
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Simulated round-trip latency for the memory driver
    #[serde(default)]
    pub latency_ms: u64,
    /// Insert the demonstration posts when the store is empty
    #[serde(default = "default_true")]
    pub seed_demo: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            driver: BackendDriver::default(),
            url: default_backend_url(),
            latency_ms: 0,
            seed_demo: true,
        }
    }
}

fn default_backend_url() -> String {
    "data/stride.db".to_string()
}

fn default_true() -> bool {
    true
}

/// Backend driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendDriver {
    /// In-process store (default)
    #[default]
    Memory,
    /// SQLite database
    Sqlite,
}

impl BackendDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendDriver::Memory => "memory",
            BackendDriver::Sqlite => "sqlite",
        }
    }
}

impl FromStr for BackendDriver {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendDriver::Memory),
            "sqlite" => Ok(BackendDriver::Sqlite),
            _ => Err(()),
        }
    }
}

/// Light or dark rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }
}

impl FromStr for ThemeMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            _ => Err(()),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Author label attached to new comments
    #[serde(default = "default_author_label")]
    pub author_label: String,
    /// Initial theme
    #[serde(default)]
    pub theme: ThemeMode,
    /// Show demonstration content when a read fails
    #[serde(default = "default_true")]
    pub fallback_on_read_error: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            author_label: default_author_label(),
            theme: ThemeMode::default(),
            fallback_on_read_error: true,
        }
    }
}

fn default_author_label() -> String {
    "You".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "stride=info".to_string()
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
    /// Config file location: `STRIDE_CONFIG`, else `config.yml`
    pub fn default_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - STRIDE_BACKEND_DRIVER
    /// - STRIDE_BACKEND_URL
    /// - STRIDE_BACKEND_LATENCY_MS
    /// - STRIDE_BACKEND_SEED_DEMO
    /// - STRIDE_SESSION_AUTHOR_LABEL
    /// - STRIDE_SESSION_THEME
    /// - STRIDE_SESSION_FALLBACK
    /// - STRIDE_LOG_FILTER
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.author_label.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "session.author_label must not be empty".to_string(),
            ));
        }
        if self.backend.driver == BackendDriver::Sqlite && self.backend.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.url is required for the sqlite driver".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides. Invalid values are ignored.
    fn apply_env_overrides(&mut self) {
        // Backend configuration
        if let Ok(driver) = std::env::var("STRIDE_BACKEND_DRIVER") {
            if let Ok(driver) = driver.parse() {
                self.backend.driver = driver;
            }
        }
        if let Ok(url) = std::env::var("STRIDE_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Ok(latency) = std::env::var("STRIDE_BACKEND_LATENCY_MS") {
            if let Ok(latency) = latency.parse::<u64>() {
                self.backend.latency_ms = latency;
            }
        }
        if let Ok(seed) = std::env::var("STRIDE_BACKEND_SEED_DEMO") {
            if let Some(seed) = parse_bool(&seed) {
                self.backend.seed_demo = seed;
            }
        }

        // Session configuration
        if let Ok(label) = std::env::var("STRIDE_SESSION_AUTHOR_LABEL") {
            if !label.trim().is_empty() {
                self.session.author_label = label;
            }
        }
        if let Ok(theme) = std::env::var("STRIDE_SESSION_THEME") {
            if let Ok(theme) = theme.parse() {
                self.session.theme = theme;
            }
        }
        if let Ok(fallback) = std::env::var("STRIDE_SESSION_FALLBACK") {
            if let Some(fallback) = parse_bool(&fallback) {
                self.session.fallback_on_read_error = fallback;
            }
        }

        // Logging
        if let Ok(filter) = std::env::var("STRIDE_LOG_FILTER") {
            self.logging.filter = filter;
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
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
const ENV_VARS: &[&str] = &[
    "STRIDE_BACKEND_DRIVER",
    "STRIDE_BACKEND_URL",
    "STRIDE_BACKEND_LATENCY_MS",
    "STRIDE_BACKEND_SEED_DEMO",
    "STRIDE_SESSION_AUTHOR_LABEL",
    "STRIDE_SESSION_THEME",
    "STRIDE_SESSION_FALLBACK",
    "STRIDE_LOG_FILTER",
];

#[cfg(test)]
fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}
