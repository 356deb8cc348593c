//! Configuration sections.

use ananke_telemetry::{level_directive, LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Process-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name bound to every log line and to the built-in `Logger`.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Render server-error messages to callers instead of a generic message.
    #[serde(default)]
    pub expose_internal_errors: bool,
}

fn default_service_name() -> String {
    "unknown".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            expose_internal_errors: false,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level name (`info`), Bunyan number (`30`) or filter directive.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Json,
        }
    }
}

impl LoggingConfig {
    /// Converts into the telemetry bootstrap configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the level cannot be parsed.
    pub fn to_log_config(&self, service_name: &str) -> Result<LogConfig, ConfigError> {
        let level = level_directive(&self.level)
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;

        Ok(LogConfig {
            level,
            format: self.format,
            service_name: service_name.to_string(),
            ..LogConfig::default()
        })
    }
}
