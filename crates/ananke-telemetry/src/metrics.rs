//! Invocation metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is up to the
//! deployment. Without a recorder every call is a no-op.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `ananke_invocations_total` | Counter | `handler`, `outcome` |
//! | `ananke_invocation_duration_seconds` | Histogram | `handler` |

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Invocation counter name.
pub const INVOCATIONS_TOTAL: &str = "ananke_invocations_total";

/// Invocation duration histogram name.
pub const INVOCATION_DURATION_SECONDS: &str = "ananke_invocation_duration_seconds";

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The runner succeeded.
    Success,
    /// The caller sent something invalid (4xx).
    ClientError,
    /// The runtime or runner failed (5xx).
    ServerError,
}

impl InvocationOutcome {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            500..=599 => Self::ServerError,
            400..=499 => Self::ClientError,
            _ => Self::Success,
        }
    }

    /// Returns the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }
}

/// Registers descriptions for the standard metrics.
pub fn describe_metrics() {
    describe_counter!(INVOCATIONS_TOTAL, "Total number of handler invocations by outcome");
    describe_histogram!(INVOCATION_DURATION_SECONDS, "Handler invocation duration in seconds");
}

/// Records a completed invocation.
pub fn record_invocation(handler: &str, outcome: InvocationOutcome, duration: Duration) {
    counter!(
        INVOCATIONS_TOTAL,
        "handler" => handler.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    histogram!(
        INVOCATION_DURATION_SECONDS,
        "handler" => handler.to_string()
    )
    .record(duration.as_secs_f64());
}
