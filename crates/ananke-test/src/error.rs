//! Test error types.

use std::fmt;

/// Errors that can occur while inspecting test results.
#[derive(Debug)]
pub enum TestError {
    /// JSON serialization/deserialization failed
    Json(serde_json::Error),
    /// A response did not have the expected shape
    Shape(String),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Shape(msg) => write!(f, "Unexpected response shape: {msg}"),
        }
    }
}

impl std::error::Error for TestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Shape(_) => None,
        }
    }
}

impl From<serde_json::Error> for TestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
