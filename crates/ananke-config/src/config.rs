//! Main configuration types.
//!
//! This module provides the top-level [`AnankeConfig`] struct.

use ananke_core::{HandlerOptions, MethodOptions};
use ananke_telemetry::LogConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingConfig, ServiceConfig};

/// Complete Ananke runtime configuration.
///
/// Handler and method options are keyed by the name the application
/// registers them under.
///
/// # Example
///
/// ```
/// use ananke_config::AnankeConfig;
///
/// let config: AnankeConfig = toml::from_str(r#"
///     [service]
///     name = "users"
///
///     [handlers.create-user]
///     requireAuth = true
///     validation = { name = "string().required()" }
///
///     [methods."hello.world"]
///     validation = { name = "string()" }
/// "#).unwrap();
///
/// assert!(config.handler("create-user").require_auth);
/// assert_eq!(config.method("hello.world").validation.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct AnankeConfig {
    /// Process-level settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Options per handler name.
    #[serde(default)]
    pub handlers: IndexMap<String, HandlerOptions>,

    /// Options per RPC method name.
    #[serde(default)]
    pub methods: IndexMap<String, MethodOptions>,
}

impl AnankeConfig {
    /// Returns the options of a handler, or defaults if none are configured.
    #[must_use]
    pub fn handler(&self, name: &str) -> HandlerOptions {
        self.handlers.get(name).cloned().unwrap_or_default()
    }

    /// Returns the options of an RPC method, or defaults if none are configured.
    #[must_use]
    pub fn method(&self, name: &str) -> MethodOptions {
        self.methods.get(name).cloned().unwrap_or_default()
    }

    /// Builds the telemetry bootstrap configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the log level cannot be parsed.
    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        self.logging.to_log_config(&self.service.name)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The service name is empty
    /// - The log level cannot be parsed
    /// - A handler names an empty authenticator or middleware
    /// - A validation key or expression is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.name.trim().is_empty() {
            return Err(ConfigError::invalid_value("service.name", "must not be empty"));
        }

        self.log_config()?;

        for (name, options) in &self.handlers {
            let section = format!("handlers.{name}");
            if options.authenticator.as_deref().is_some_and(|a| a.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    format!("{section}.authenticator"),
                    "must not be empty",
                ));
            }
            check_names(&section, "pre_middleware", &options.pre_middleware)?;
            check_names(&section, "post_middleware", &options.post_middleware)?;
            check_validation(&section, &options.validation)?;
        }

        for (name, options) in &self.methods {
            let section = format!("methods.{name}");
            if let Some(names) = &options.pre_middleware {
                check_names(&section, "pre_middleware", names)?;
            }
            if let Some(names) = &options.post_middleware {
                check_names(&section, "post_middleware", names)?;
            }
            check_validation(&section, &options.validation)?;
        }

        Ok(())
    }
}

fn check_names(section: &str, field: &str, names: &[String]) -> Result<(), ConfigError> {
    if names.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::invalid_value(
            format!("{section}.{field}"),
            "middleware names must not be empty",
        ));
    }
    Ok(())
}

fn check_validation(section: &str, validation: &IndexMap<String, String>) -> Result<(), ConfigError> {
    for (field, expression) in validation {
        if field.trim().is_empty() || expression.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                format!("{section}.validation"),
                format!("empty rule for field `{field}`"),
            ));
        }
    }
    Ok(())
}
