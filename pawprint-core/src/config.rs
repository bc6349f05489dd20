//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/pawprint/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/pawprint/` (~/.config/pawprint/)
//! - Data: `$XDG_DATA_HOME/pawprint/` (~/.local/share/pawprint/)
//! - State/Logs: `$XDG_STATE_HOME/pawprint/` (~/.local/state/pawprint/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics client configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Analytics client configuration
///
/// When enabled, the session initializer constructs a live client for the
/// configured events API. When disabled or incomplete, initialization
/// degrades and tracking is a no-op.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Enable/disable event shipping
    #[serde(default)]
    pub enabled: bool,

    /// Events API base URL (e.g., `https://events.example.com`)
    pub server_url: Option<String>,

    /// API key sent as a Bearer token (optional)
    pub api_key: Option<String>,

    /// Client identifier attached to every session
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Session identifier reported to the server
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Referrer reported at session start
    #[serde(default)]
    pub referrer: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: None,
            api_key: None,
            client_id: default_client_id(),
            session_id: default_session_id(),
            referrer: String::new(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl ClientConfig {
    /// Check if the client is enabled and has the fields it needs
    pub fn is_ready(&self) -> bool {
        self.enabled && self.server_url.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.server_url.is_none() {
            return Err(Error::Config(
                "client.server_url is required when the client is enabled".to_string(),
            ));
        }
        if self.client_id.is_empty() {
            return Err(Error::Config(
                "client.client_id must not be empty".to_string(),
            ));
        }
        if self.session_id.is_empty() {
            return Err(Error::Config(
                "client.session_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_client_id() -> String {
    "pawprint".to_string()
}

fn default_session_id() -> String {
    "main".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/pawprint/config.toml` (~/.config/pawprint/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("pawprint").join("config.toml")
    }

    /// Returns the data directory path (for the device store)
    ///
    /// `$XDG_DATA_HOME/pawprint/` (~/.local/share/pawprint/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("pawprint")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/pawprint/` (~/.local/state/pawprint/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("pawprint")
    }

    /// Returns the device store file path
    ///
    /// `$XDG_DATA_HOME/pawprint/device.json` (~/.local/share/pawprint/device.json)
    pub fn device_store_path() -> PathBuf {
        Self::data_dir().join("device.json")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/pawprint/pawprint.log` (~/.local/state/pawprint/pawprint.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("pawprint.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
