use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Configuration error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    LoadError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Common application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(length(min = 1))]
    pub service_name: String,
    #[validate(length(min = 1))]
    pub log_level: String,
    #[validate(range(min = 1, max = 65535))]
    pub metrics_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "mnas-mmed".to_string(),
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}

/// NAS task layer settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NasConfig {
    /// T3489 (ESM information) in seconds
    #[validate(range(min = 1, max = 3600))]
    pub t3489_sec: u64,
    /// Capacity of every task mailbox
    #[validate(range(min = 1))]
    pub mailbox_capacity: usize,
    /// How long a requester waits for a context reply
    #[validate(range(min = 1))]
    pub reply_timeout_ms: u64,
}

impl Default for NasConfig {
    fn default() -> Self {
        Self {
            t3489_sec: 4,
            mailbox_capacity: 1024,
            reply_timeout_ms: 5000,
        }
    }
}

impl NasConfig {
    pub fn t3489(&self) -> Duration {
        Duration::from_secs(self.t3489_sec)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MmeNasConfig {
    #[validate(nested)]
    pub app: AppConfig,
    #[serde(default)]
    #[validate(nested)]
    pub nas: NasConfig,
}

/// Load configuration from file
pub fn load_config<T>(path: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let config: T = config::Config::builder()
        .add_source(config::File::with_name(path))
        .add_source(config::Environment::with_prefix("MNAS").separator("__"))
        .build()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError(e.to_string()))?;

    config
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    Ok(config)
}

/// Load configuration from YAML string (for testing)
pub fn load_from_yaml<T>(yaml: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Validate,
{
    let config: T =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::LoadError(e.to_string()))?;
    config
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    Ok(config)
}
