//! Configuration management.
//!
//! Three layered sources: hardcoded defaults, an optional YAML file, and
//! `LIBRIS_`-prefixed environment variables with `__` as the nested-key
//! separator (e.g. `LIBRIS_SERVER__PORT=9090` overrides `server.port`).
//! Environment variables win over the file, which wins over defaults.
//!
//! The bare `REDIS_ADDR` / `REDIS_PASSWORD` variables from the original
//! deployment are honored as a final override for the cache section.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Network settings for the gateway listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Gateway behavior: rate limiting and read batching.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GatewaySettings {
    /// Requests allowed per client IP per window.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Fixed rate-limit window in seconds.
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,

    /// Read-batcher window in milliseconds.
    #[serde(default = "default_batch_window")]
    pub batch_window_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            rate_limit: default_rate_limit(),
            rate_limit_window_secs: default_rate_limit_window(),
            batch_window_ms: default_batch_window(),
        }
    }
}

fn default_rate_limit() -> u32 {
    100
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_batch_window() -> u64 {
    20
}

/// Authoritative-store settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type. Only "memory" is built in; the document-store
    /// driver is deployed as a separate concern.
    #[serde(default = "default_storage_backend")]
    pub backend: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
        }
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

/// Hint-cache settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    /// Cache backend type: "memory" or "redis".
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Redis address (`host:port`); required for the redis backend.
    pub redis_addr: Option<String>,

    /// Redis password, if the instance requires one.
    pub redis_password: Option<String>,

    /// Entry lifetime in seconds.
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_addr: None,
            redis_password: None,
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_ttl() -> u64 {
    60 * 60
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Loads configuration from a YAML file with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix("LIBRIS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut server_config: ServerConfig = config.try_deserialize()?;
        server_config.apply_legacy_env();
        server_config.validate()?;
        Ok(server_config)
    }

    /// Loads configuration from defaults and environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(
                Environment::with_prefix("LIBRIS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mut server_config: ServerConfig = config.try_deserialize()?;
        server_config.apply_legacy_env();
        server_config.validate()?;
        Ok(server_config)
    }

    /// Applies the original deployment's flat `REDIS_ADDR` /
    /// `REDIS_PASSWORD` variables on top of the structured sources.
    fn apply_legacy_env(&mut self) {
        if let Ok(addr) = std::env::var("REDIS_ADDR") {
            if !addr.is_empty() {
                self.cache.redis_addr = Some(addr);
            }
        }
        if let Ok(password) = std::env::var("REDIS_PASSWORD") {
            if !password.is_empty() {
                self.cache.redis_password = Some(password);
            }
        }
    }

    /// Validates the loaded configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.storage.backend != "memory" {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "storage.backend must be \"memory\", got: {}",
                    self.storage.backend
                ),
            });
        }

        let valid_cache_backends = ["memory", "redis"];
        if !valid_cache_backends.contains(&self.cache.backend.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "cache.backend must be one of: {:?}, got: {}",
                    valid_cache_backends, self.cache.backend
                ),
            });
        }

        if self.cache.backend == "redis"
            && self
                .cache
                .redis_addr
                .as_deref()
                .map_or(true, |s| s.trim().is_empty())
        {
            return Err(ConfigLoadError::Invalid {
                message: "cache.redis_addr is required when cache.backend is \"redis\""
                    .to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        if self.gateway.rate_limit == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "gateway.rate_limit must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}
