use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub sync: SyncConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Chain client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Retries after a failed RPC call, 0 disables retrying
    pub max_retries: u32,
    /// Initial retry delay in seconds
    pub retry_delay_seconds: u64,
    /// Maximum retry delay in seconds
    pub max_retry_delay_seconds: u64,
}

/// Block synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval between catch-up passes in seconds
    pub poll_interval_seconds: u64,
    /// How many blocks behind the tip the first pass starts
    pub backfill_window: u64,
}

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ethereum-rpc.publicnode.com".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 2,
            max_retry_delay_seconds: 30,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 15,
            backfill_window: 10,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Same as [`AppConfig::load`] with an explicit file path
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; a missing file yields defaults
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("ETH_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        override_parsed("RPC_TIMEOUT_SECONDS", &mut self.rpc.timeout_seconds)?;
        override_parsed("RPC_MAX_RETRIES", &mut self.rpc.max_retries)?;
        override_parsed("RPC_RETRY_DELAY_SECONDS", &mut self.rpc.retry_delay_seconds)?;

        override_parsed("SYNC_POLL_INTERVAL", &mut self.sync.poll_interval_seconds)?;
        override_parsed("SYNC_BACKFILL_WINDOW", &mut self.sync.backfill_window)?;

        if let Ok(host) = env::var("API_HOST") {
            self.api.host = host;
        }
        override_parsed("API_PORT", &mut self.api.port)?;

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(invalid("rpc.timeout_seconds", self.rpc.timeout_seconds));
        }

        if self.rpc.max_retries > 20 {
            return Err(invalid("rpc.max_retries", self.rpc.max_retries));
        }

        if self.rpc.max_retry_delay_seconds < self.rpc.retry_delay_seconds {
            return Err(invalid("rpc.max_retry_delay_seconds", self.rpc.max_retry_delay_seconds));
        }

        if self.sync.poll_interval_seconds == 0 || self.sync.poll_interval_seconds > 3600 {
            return Err(invalid("sync.poll_interval_seconds", self.sync.poll_interval_seconds));
        }

        if self.api.port == 0 {
            return Err(invalid("api.port", self.api.port));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid("logging.level", &self.logging.level));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid("logging.format", &self.logging.format));
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default()).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

fn override_parsed<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError> {
    if let Ok(raw) = env::var(key) {
        *target = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        })?;
    }
    Ok(())
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
