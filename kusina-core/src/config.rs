//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/kusina/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/kusina/` (~/.config/kusina/)
//! - State/Logs/Session: `$XDG_STATE_HOME/kusina/` (~/.local/state/kusina/)

use crate::error::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};

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

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Hosted document store and auth settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Hosted object storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Report generation settings
    #[serde(default)]
    pub reports: ReportsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Document store (Firestore REST) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Project identifier
    pub project_id: Option<String>,

    /// Web API key used by the auth endpoints
    pub api_key: Option<String>,

    /// Database name within the project
    #[serde(default = "default_database")]
    pub database: String,

    /// Document API base URL
    #[serde(default = "default_store_url")]
    pub base_url: String,

    /// Sign-in API base URL
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Token refresh API base URL
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Max identifiers per membership ("in") query
    #[serde(default = "default_in_batch_size")]
    pub in_batch_size: usize,

    /// Membership batches fetched at the same time
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            api_key: None,
            database: default_database(),
            base_url: default_store_url(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            timeout_secs: default_store_timeout(),
            in_batch_size: default_in_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
        }
    }
}

impl StoreConfig {
    /// Check if the store is configured well enough to build a client
    pub fn is_ready(&self) -> bool {
        self.project_id.is_some() && self.api_key.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.project_id.is_none() {
            return Err(Error::Config("store.project_id is required".to_string()));
        }
        if self.api_key.is_none() {
            return Err(Error::Config("store.api_key is required".to_string()));
        }
        if self.in_batch_size == 0 {
            return Err(Error::Config(
                "store.in_batch_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(Error::Config(
                "store.max_concurrent_batches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_store_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_auth_url() -> String {
    "https://identitytoolkit.googleapis.com".to_string()
}

fn default_token_url() -> String {
    "https://securetoken.googleapis.com".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_in_batch_size() -> usize {
    10
}

fn default_max_concurrent_batches() -> usize {
    4
}

/// Object storage (Supabase Storage REST) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Project URL (e.g., `https://abc.supabase.co`)
    pub url: Option<String>,

    /// Service or anon key
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: default_storage_timeout(),
        }
    }
}

impl StorageConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() {
            return Err(Error::Config("storage.url is required".to_string()));
        }
        if self.api_key.is_none() {
            return Err(Error::Config("storage.api_key is required".to_string()));
        }
        Ok(())
    }
}

fn default_storage_timeout() -> u64 {
    60
}

/// Who gets credit for a like in engagement leaderboards
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LikeAttribution {
    /// Credit the owner of the liked content
    #[default]
    Owner,
    /// Credit the user who pressed like
    Actor,
}

/// Report generation configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    /// Number of entries in each leaderboard
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Fixed offset used to cut calendar days, in minutes east of UTC
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Order statuses that count towards revenue
    #[serde(default = "default_revenue_statuses")]
    pub revenue_statuses: Vec<String>,

    /// Like attribution rule for the engagement report
    #[serde(default)]
    pub like_attribution: LikeAttribution,

    /// Currency symbol used in terminal output
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            utc_offset_minutes: 0,
            revenue_statuses: default_revenue_statuses(),
            like_attribution: LikeAttribution::default(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl ReportsConfig {
    /// The configured day boundary offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            Error::Config(format!(
                "reports.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }
}

fn default_top_n() -> usize {
    5
}

fn default_revenue_statuses() -> Vec<String> {
    vec!["completed".to_string()]
}

fn default_currency_symbol() -> String {
    "₱".to_string()
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/kusina/config.toml` (~/.config/kusina/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("kusina").join("config.toml")
    }

    /// Returns the state directory path (for logs and the saved session)
    ///
    /// `$XDG_STATE_HOME/kusina/` (~/.local/state/kusina/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("kusina")
    }

    /// Returns the saved session path
    pub fn session_path() -> PathBuf {
        Self::state_dir().join("session.json")
    }
}
