//! Configuration module for filebay.

use serde::Deserialize;
use std::path::Path;

use crate::{FilebayError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Largest accepted request body in bytes; one upload batch must fit.
    #[serde(default = "default_max_request_size")]
    pub max_request_size: u64,
    /// Whether to serve the front end under `/static`.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Directory holding the front end files.
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_request_size() -> u64 {
    512 * 1024 * 1024
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "./static".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            max_request_size: default_max_request_size(),
            serve_static: default_serve_static(),
            static_path: default_static_path(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filebay.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Upload and retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory that holds uploaded blobs.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Comma-separated list of allowed extensions (without the dot).
    #[serde(default = "default_allowed_types")]
    pub allowed_types: String,
    /// Days an active file is kept before the expiry sweep removes it.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Interval between expiry sweeps in seconds (0 disables the sweeper).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_upload_path() -> String {
    "./uploads".to_string()
}

fn default_max_size() -> u64 {
    100 * 1024 * 1024 // 100MB
}

fn default_allowed_types() -> String {
    "jpg,jpeg,png,gif,pdf,doc,docx,xls,xlsx,txt,zip,rar".to_string()
}

fn default_retention_days() -> i64 {
    7
}

fn default_sweep_interval() -> u64 {
    3600 // 1 hour
}

impl FilesConfig {
    /// Parse `allowed_types` into lower-cased, trimmed extensions.
    pub fn allowed_extensions(&self) -> Vec<String> {
        parse_extension_list(&self.allowed_types)
    }

    /// `retention_days` as a duration.
    pub fn retention(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_days(self.retention_days).ok_or_else(|| {
            FilebayError::Config(format!(
                "files.retention_days {} is out of range",
                self.retention_days
            ))
        })
    }
}

/// Split a comma-separated extension list into trimmed, lower-cased entries.
pub fn parse_extension_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_path: default_upload_path(),
            max_size: default_max_size(),
            allowed_types: default_allowed_types(),
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filebay.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Upload and retention configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilebayError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilebayError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEBAY_UPLOAD_PATH`: Override the upload directory
    /// - `FILEBAY_DATABASE_PATH`: Override the SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("FILEBAY_UPLOAD_PATH") {
            if !path.is_empty() {
                self.files.upload_path = path;
            }
        }

        if let Ok(path) = std::env::var("FILEBAY_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - `files.max_size` is zero
    /// - `files.allowed_types` has no entries
    /// - `files.retention_days` is not positive or too large for a duration
    pub fn validate(&self) -> Result<()> {
        if self.files.max_size == 0 {
            return Err(FilebayError::Config(
                "files.max_size must be greater than zero".to_string(),
            ));
        }

        if self.files.allowed_extensions().is_empty() {
            return Err(FilebayError::Config(
                "files.allowed_types must list at least one extension".to_string(),
            ));
        }

        if self.files.retention_days <= 0 {
            return Err(FilebayError::Config(
                "files.retention_days must be positive".to_string(),
            ));
        }
        self.files.retention()?;

        Ok(())
    }
}
