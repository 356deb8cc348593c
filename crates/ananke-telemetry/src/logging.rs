//! Structured logging for Ananke.
//!
//! Logs go through `tracing`. [`init_logging`] installs a
//! `tracing-subscriber` formatter, JSON by default, filtered by an
//! `EnvFilter` built from the configured level.
//!
//! The level may be given the way function deployments usually set it: as a
//! Bunyan numeric level (`LOG_LEVEL=30`) or as a level name
//! (`LOG_LEVEL=debug`). Any other value is used as a filter directive, e.g.
//! `ananke_runtime=debug,info`.
//!
//! # Example
//!
//! ```rust,ignore
//! use ananke_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env())?;
//! tracing::info!(handler = "createUser", "handler ready");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Environment variable holding the service name.
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";

/// Environment variable holding the log level.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line, human-readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"ananke_runtime=debug,info"`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to include span close events (with their timings).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include the target (module path).
    pub include_target: bool,

    /// Service name bound to every log line.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
            service_name: "unknown".to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Reads `SERVICE_NAME` and `LOG_LEVEL` from the process environment.
    ///
    /// An unparsable `LOG_LEVEL` falls back to `info`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(SERVICE_NAME_ENV).filter(|name| !name.is_empty()) {
            config.service_name = name;
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.level = level_directive(&level).unwrap_or_else(|_| "info".to_string());
        }
        config
    }

    /// Sets the level, accepting Bunyan numbers and level names.
    pub fn with_level(mut self, level: &str) -> TelemetryResult<Self> {
        self.level = level_directive(level)?;
        Ok(self)
    }
}

/// Converts a Bunyan numeric level or a level name into a filter directive.
///
/// | Bunyan | Name |
/// |---|---|
/// | 10 | trace |
/// | 20 | debug |
/// | 30 | info |
/// | 40 | warn |
/// | 50, 60 | error |
pub fn level_directive(level: &str) -> TelemetryResult<String> {
    let level = level.trim();
    if level.is_empty() {
        return Err(TelemetryError::InvalidConfig("empty log level".to_string()));
    }

    if let Ok(number) = level.parse::<u32>() {
        let name = match number {
            0..=10 => "trace",
            11..=20 => "debug",
            21..=30 => "info",
            31..=40 => "warn",
            _ => "error",
        };
        return Ok(name.to_string());
    }

    let directive = match level.to_ascii_lowercase().as_str() {
        "trace" => "trace".to_string(),
        "debug" => "debug".to_string(),
        "info" => "info".to_string(),
        "warn" | "warning" => "warn".to_string(),
        "error" | "fatal" => "error".to_string(),
        "off" | "silent" => "off".to_string(),
        _ => {
            create_env_filter(level)?;
            level.to_string()
        }
    };
    Ok(directive)
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);

            tracing_subscriber::registry()
                .with(fmt_layer)
                .try_init()
                .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
        }
    }

    tracing::debug!(service = %config.service_name, level = %config.level, "logging initialized");
    Ok(())
}

/// Creates an env filter from a directive string.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

/// Standard log field names.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// Handler name field name.
    pub const HANDLER: &str = "handler";

    /// RPC method field name.
    pub const METHOD: &str = "method";

    /// HTTP status code field name.
    pub const STATUS: &str = "status";

    /// Service name field name.
    pub const SERVICE: &str = "service";
}
