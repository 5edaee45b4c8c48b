//! Configuration management
//!
//! Loads configuration from config.toml at startup.
//! Every value has a default, so running without a config file works.

use crate::server::Role;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
///
/// Loaded from config.toml (or `CONFIG_PATH`) at startup.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface both listeners bind to
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    #[serde(default = "default_primary_request_port")]
    pub primary_request_port: u16,

    #[serde(default = "default_secondary_request_port")]
    pub secondary_request_port: u16,

    #[serde(default = "default_primary_admin_port")]
    pub primary_admin_port: u16,

    #[serde(default = "default_secondary_admin_port")]
    pub secondary_admin_port: u16,

    /// How long a stopped listener waits for in-flight handlers
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,

    /// Fixed shuffle seed; unset means OS-seeded randomness
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Write rolling log files in addition to the console
    #[serde(default = "default_file_logging")]
    pub file_logging: bool,

    /// Root directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Default filter directive when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: default_bind_host(),
            primary_request_port: default_primary_request_port(),
            secondary_request_port: default_secondary_request_port(),
            primary_admin_port: default_primary_admin_port(),
            secondary_admin_port: default_secondary_admin_port(),
            drain_timeout_secs: default_drain_timeout_secs(),
            seed: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_logging: default_file_logging(),
            dir: default_log_dir(),
            level: default_log_level(),
        }
    }
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_primary_request_port() -> u16 {
    4545
}

fn default_secondary_request_port() -> u16 {
    4546
}

fn default_primary_admin_port() -> u16 {
    5050
}

fn default_secondary_admin_port() -> u16 {
    5051
}

fn default_drain_timeout_secs() -> u64 {
    5
}

fn default_file_logging() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServerConfig {
    /// Content endpoint port for `role`
    pub fn request_port(&self, role: Role) -> u16 {
        match role {
            Role::Primary => self.primary_request_port,
            Role::Secondary => self.secondary_request_port,
        }
    }

    /// Admin endpoint port for `role`
    pub fn admin_port(&self, role: Role) -> u16 {
        match role {
            Role::Primary => self.primary_admin_port,
            Role::Secondary => self.secondary_admin_port,
        }
    }

    pub fn request_addr(&self, role: Role) -> String {
        format!("{}:{}", self.bind_host, self.request_port(role))
    }

    pub fn admin_addr(&self, role: Role) -> String {
        format!("{}:{}", self.bind_host, self.admin_port(role))
    }

    #[inline]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Config {
    /// Load configuration from config.toml file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if file exists but cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    /// Parse error (invalid TOML)
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
