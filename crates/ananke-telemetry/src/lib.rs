//! Observability for Ananke handlers.
//!
//! - **Logging**: structured `tracing` output (JSON or pretty), configured
//!   from `SERVICE_NAME` and `LOG_LEVEL`
//! - **Metrics**: invocation counters and latency histograms via the
//!   `metrics` facade

#![doc(html_root_url = "https://docs.rs/ananke-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, level_directive, LogConfig, LogFormat};
pub use crate::metrics::{describe_metrics, record_invocation, InvocationOutcome};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
