//! Core configuration with layered loading.
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by the `PULSE_CONFIG` env var
//! 3. **Environment variables**: `PULSE_*` vars override specific fields
//!
//! Invalid configurations (e.g. a zero evaluation interval) return errors at
//! load time rather than failing silently later.
//!
//! # Example
//!
//! ```toml
//! [alerting]
//! evaluation_interval_seconds = 30
//! notify_on_close = false
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Alert evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertingConfig {
    /// Seconds between evaluation cycles. Must be greater than 0.
    /// Defaults to `30`.
    #[serde(default = "default_evaluation_interval_seconds")]
    pub evaluation_interval_seconds: u64,

    /// Whether to send a resolution notification when an incident closes.
    /// Defaults to `false`.
    #[serde(default)]
    pub notify_on_close: bool,
}

fn default_evaluation_interval_seconds() -> u64 {
    30
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_seconds: default_evaluation_interval_seconds(),
            notify_on_close: false,
        }
    }
}

/// Top-level configuration for the alerting core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Alert evaluation settings.
    #[serde(default)]
    pub alerting: AlertingConfig,
}

impl CoreConfig {
    /// Loads configuration from defaults, the optional `PULSE_CONFIG` file,
    /// and `PULSE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source cannot be read, deserialization
    /// fails, or validation rejects a field value.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Ok(path) = std::env::var("PULSE_CONFIG") {
            builder = builder.add_source(File::with_name(&path));
        }
        let config: Self = builder
            .add_source(Environment::with_prefix("PULSE").separator("__"))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field values beyond what deserialization enforces.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Message`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alerting.evaluation_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "alerting.evaluation_interval_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
