//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Comma separated list of allowed CORS origins
    #[serde(default)]
    pub cors_origins: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Apply embedded migrations at startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_run_migrations() -> bool {
    true
}

/// Upstream SMS provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Send endpoint
    pub send_url: String,

    /// Delivery status endpoint
    #[serde(default)]
    pub status_url: Option<String>,

    /// Provider account balance endpoint
    #[serde(default)]
    pub balance_url: Option<String>,

    /// Upstream authentication key
    pub api_key: String,

    /// Upstream message type (0 = plain text)
    #[serde(default = "default_message_type")]
    pub message_type: String,

    /// Request delivery reports
    #[serde(default = "default_delivery_report")]
    pub delivery_report: bool,

    /// Upstream call timeout in seconds
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

fn default_message_type() -> String {
    "0".to_string()
}

fn default_delivery_report() -> bool {
    true
}

fn default_provider_timeout() -> u64 {
    30
}

/// Messaging rules
#[derive(Debug, Deserialize, Clone)]
pub struct MessagingConfig {
    /// Country calling code used to rewrite local numbers (leading `0`)
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Currency assigned to lazily created accounts
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_country_code() -> String {
    "234".to_string()
}

fn default_currency() -> String {
    "NGN".to_string()
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            currency: default_currency(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON formatted log lines
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("provider.message_type", "0")?
            .set_default("provider.delivery_report", true)?
            .set_default("provider.timeout_secs", 30)?
            .set_default("messaging.country_code", "234")?
            .set_default("messaging.currency", "NGN")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with KORA_ prefix
            .add_source(
                Environment::with_prefix("KORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("KORA").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
