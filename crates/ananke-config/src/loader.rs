//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use ananke_telemetry::LogFormat;

use crate::{AnankeConfig, ConfigError};

/// Configuration loader with layered approach.
///
/// The loader applies configuration in layers, with later layers overriding
/// earlier ones:
/// 1. Default values (built into the code)
/// 2. Configuration file or string (TOML or JSON)
/// 3. Environment variables, optionally seeded from a `.env` file
///
/// # Example
///
/// ```no_run
/// use ananke_config::ConfigLoader;
///
/// # fn main() -> Result<(), ananke_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_file("ananke.toml")?
///     .with_dotenv()?
///     .with_env_prefix("ANANKE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: AnankeConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: AnankeConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    ///
    /// This is called automatically by `new()`, but can be chained for clarity.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = AnankeConfig::default();
        self
    }

    /// Load configuration from a file.
    ///
    /// Supports TOML (.toml) and JSON (.json) formats.
    /// The file format is determined by the file extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");

        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or `format` is neither
    /// `"toml"` nor `"json"`.
    ///
    /// # Example
    ///
    /// ```
    /// use ananke_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(r#"{ "service": { "name": "users" } }"#, "json")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.service.name, "users");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// Environment variables use the format `PREFIX__SECTION__KEY`.
    /// For example, with prefix "ANANKE":
    /// - `ANANKE__SERVICE__NAME=users`
    /// - `ANANKE__LOGGING__LEVEL=20`
    /// - `ANANKE__HANDLERS__CREATE_USER__REQUIRE_AUTH=true`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment.
    ///
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Loaded .env file");
                Ok(self)
            }
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::validation_error(format!(
                "failed to load .env file: {e}"
            ))),
        }
    }

    /// Finalize and return the loaded configuration.
    ///
    /// Applies environment variable overrides (if a prefix was set) and
    /// validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Environment variable parsing fails
    /// - Configuration validation fails
    pub fn load(mut self) -> Result<AnankeConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars().collect();
            self.apply_env_overrides(&prefix, vars)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Finalize without validation.
    #[must_use]
    pub fn load_unvalidated(self) -> AnankeConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<AnankeConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_overrides(
        &mut self,
        prefix: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if key.starts_with(&marker) {
                self.apply_env_var(&key, &value, prefix)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();

        match parts.as_slice() {
            ["SERVICE", "NAME"] => {
                self.config.service.name = value.to_string();
            }
            ["SERVICE", "EXPOSE_INTERNAL_ERRORS"] => {
                self.config.service.expose_internal_errors = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }

            ["LOGGING", "LEVEL"] => {
                self.config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            ["HANDLERS", name, field] => {
                let handler_key = self.handler_key(name);
                let options = self.config.handlers.entry(handler_key).or_default();
                match *field {
                    "REQUIRE_AUTH" => {
                        options.require_auth = parse_bool(value)
                            .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
                    }
                    "AUTHENTICATOR" => {
                        options.authenticator = if value.is_empty() {
                            None
                        } else {
                            Some(value.to_string())
                        };
                    }
                    "PRE_MIDDLEWARE" => options.pre_middleware = parse_list(value),
                    "POST_MIDDLEWARE" => options.post_middleware = parse_list(value),
                    _ => tracing::warn!(var = key, "Ignoring unknown handler setting"),
                }
            }

            _ => tracing::warn!(var = key, "Ignoring unknown configuration variable"),
        }

        Ok(())
    }

    // Environment names are upper snake case; match them against configured
    // handlers ignoring case and `-`/`_`, else derive a lower kebab-case name.
    fn handler_key(&self, env_name: &str) -> String {
        let normalized = |name: &str| name.to_ascii_lowercase().replace('_', "-");
        let wanted = normalized(env_name);
        self.config
            .handlers
            .keys()
            .find(|name| normalized(name) == wanted)
            .cloned()
            .unwrap_or(wanted)
    }
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated list, dropping blanks.
fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.service.name, "unknown");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_loader_with_string_toml() {
        let toml = r#"
            [service]
            name = "users"
            expose_internal_errors = true

            [logging]
            level = "debug"
            format = "pretty"

            [handlers.create-user]
            requireAuth = true
            authenticator = "bearer"
            preMiddleware = ["audit"]
            validation = { name = "string().required()" }
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.service.name, "users");
        assert!(config.service.expose_internal_errors);
        assert_eq!(config.logging.format, LogFormat::Pretty);

        let handler = config.handler("create-user");
        assert!(handler.require_auth);
        assert_eq!(handler.authenticator.as_deref(), Some("bearer"));
        assert_eq!(handler.pre_middleware, vec!["audit"]);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{ "methods": { "hello.world": { "requireAuth": true } } }"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert!(config.method("hello.world").require_auth);
    }

    #[test]
    fn test_loader_with_unsupported_format() {
        let result = ConfigLoader::new().with_string("name: x", "yaml");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_fields() {
        let result = ConfigLoader::new().with_string("[service]\nport = 80\n", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/ananke.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/ananke.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, AnankeConfig::default());
    }

    #[test]
    fn test_loader_with_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[service]\nname = \"billing\"").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.service.name, "billing");
    }

    #[test]
    fn test_loader_with_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("auth, audit,,"), vec!["auth", "audit"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_apply_env_var_service() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__SERVICE__NAME", "orders", "TEST").unwrap();
        loader
            .apply_env_var("TEST__SERVICE__EXPOSE_INTERNAL_ERRORS", "yes", "TEST")
            .unwrap();
        assert_eq!(loader.config.service.name, "orders");
        assert!(loader.config.service.expose_internal_errors);
    }

    #[test]
    fn test_apply_env_var_invalid_boolean() {
        let mut loader = ConfigLoader::new();
        let result = loader.apply_env_var("TEST__SERVICE__EXPOSE_INTERNAL_ERRORS", "maybe", "TEST");
        assert!(matches!(result, Err(ConfigError::EnvParseError { .. })));
    }

    #[test]
    fn test_apply_env_var_log_format() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("TEST__LOGGING__FORMAT", "PRETTY", "TEST").unwrap();
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);

        let result = loader.apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST");
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_env_var_matches_existing_handler() {
        let mut loader = ConfigLoader::new()
            .with_string("[handlers.create-user]\nrequireAuth = false\n", "toml")
            .unwrap();
        loader
            .apply_env_var("TEST__HANDLERS__CREATE_USER__REQUIRE_AUTH", "true", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__HANDLERS__CREATE_USER__PRE_MIDDLEWARE", "auth,audit", "TEST")
            .unwrap();

        assert_eq!(loader.config.handlers.len(), 1);
        let handler = loader.config.handler("create-user");
        assert!(handler.require_auth);
        assert_eq!(handler.pre_middleware, vec!["auth", "audit"]);
    }

    #[test]
    fn test_apply_env_var_creates_handler() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__HANDLERS__PING__AUTHENTICATOR", "bearer", "TEST")
            .unwrap();
        assert_eq!(
            loader.config.handler("ping").authenticator.as_deref(),
            Some("bearer")
        );
    }

    #[test]
    fn test_env_overrides_only_apply_to_prefixed_vars() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_overrides(
                "TEST",
                vec![
                    ("TEST__SERVICE__NAME".to_string(), "from-env".to_string()),
                    ("TESTING__SERVICE__NAME".to_string(), "ignored".to_string()),
                    ("OTHER".to_string(), "ignored".to_string()),
                ],
            )
            .unwrap();
        assert_eq!(loader.config.service.name, "from-env");
    }
}
