//! The built-in process logger context entry.

use std::sync::Arc;

/// Environment variable naming the service in every log line.
pub const SERVICE_NAME_ENV: &str = "SERVICE_NAME";

/// Process logger stored in every [`Context`](crate::Context) under
/// [`LOGGER_KEY`](crate::LOGGER_KEY).
///
/// Log output itself goes through `tracing`; the logger binds the service
/// name and hands out per-request child spans.
///
/// # Example
///
/// ```
/// use ananke_core::Logger;
///
/// let logger = Logger::new("billing");
/// let span = logger.child("0190a4c6-8f3e-7000-8000-000000000000");
/// let _guard = span.enter();
/// tracing::debug!("inside the request span");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    service: Arc<str>,
}

impl Logger {
    /// Creates a logger for the named service.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: Arc::from(service.into()),
        }
    }

    /// Creates a logger named by `SERVICE_NAME`, or `"unknown"`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var(SERVICE_NAME_ENV).unwrap_or_else(|_| "unknown".to_string()))
    }

    /// Returns the service name.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Creates a child span bound to a request id.
    #[must_use]
    pub fn child(&self, request_id: &str) -> tracing::Span {
        tracing::info_span!("request", service = %self.service, request_id = %request_id)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::from_env()
    }
}
