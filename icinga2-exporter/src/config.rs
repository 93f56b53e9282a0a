//! Configuration for the Icinga2 exporter.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Icinga2 API connection and metric naming settings.
    #[serde(default)]
    pub icinga2: Icinga2Config,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Icinga2 API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Icinga2Config {
    /// Base URL of the Icinga2 API (default: "https://localhost:5665").
    #[serde(default = "default_url")]
    pub url: String,

    /// API user name.
    #[serde(default)]
    pub user: String,

    /// API user password.
    #[serde(default)]
    pub passwd: String,

    /// Verify the API server's TLS certificate (default: false).
    #[serde(default)]
    pub verify_tls: bool,

    /// Metric name prefix, without the trailing underscore (default: "icinga2").
    #[serde(default = "default_metric_prefix")]
    pub metric_prefix: String,

    /// Timeout of each API request (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Also query the host object of the target for host metadata.
    #[serde(default)]
    pub enable_scrape_metadata: bool,

    /// `service` label value of host metadata metrics (default: "alive").
    #[serde(default = "default_host_alive_service")]
    pub host_alive_service: String,

    /// Host custom variable name to Prometheus label name.
    #[serde(default)]
    pub custom_vars: HashMap<String, String>,

    /// Check commands whose perfnames become a label value instead of
    /// part of the metric name.
    #[serde(default)]
    pub perfnametolabel: HashMap<String, PerfnameLabel>,
}

/// Label a check command's perfnames are moved into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfnameLabel {
    pub label_name: String,
}

fn default_url() -> String {
    "https://localhost:5665".to_string()
}

fn default_metric_prefix() -> String {
    "icinga2".to_string()
}

fn default_timeout() -> u64 {
    5
}

fn default_host_alive_service() -> String {
    "alive".to_string()
}

impl Default for Icinga2Config {
    fn default() -> Self {
        Self {
            url: default_url(),
            user: String::new(),
            passwd: String::new(),
            verify_tls: false,
            metric_prefix: default_metric_prefix(),
            timeout_secs: default_timeout(),
            enable_scrape_metadata: false,
            host_alive_service: default_host_alive_service(),
            custom_vars: HashMap::new(),
            perfnametolabel: HashMap::new(),
        }
    }
}

impl Icinga2Config {
    /// Metric prefix including the trailing underscore.
    pub fn prefix(&self) -> String {
        format!("{}_", self.metric_prefix)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on (default: "0.0.0.0:9638").
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path for metrics endpoint (default: "/metrics").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_listen() -> String {
    "0.0.0.0:9638".to_string()
}

fn default_path() -> String {
    "/metrics".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.icinga2.url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "Icinga2 url must start with http:// or https://: {}",
                url
            )));
        }

        if self.icinga2.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.icinga2.metric_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "metric_prefix must not be empty".to_string(),
            ));
        }

        for (command, mapping) in &self.icinga2.perfnametolabel {
            if mapping.label_name.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "perfnametolabel.{}.label_name must not be empty",
                    command
                )));
            }
        }

        if self.server.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation(format!(
                "Invalid listen address: {}",
                self.server.listen
            )));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Metrics path must start with /".to_string(),
            ));
        }

        if self.server.path == "/" || self.server.path == "/health" {
            return Err(ConfigError::Validation(format!(
                "Metrics path {} is reserved",
                self.server.path
            )));
        }

        Ok(())
    }
}
