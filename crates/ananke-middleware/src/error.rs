//! Middleware resolution errors.

use ananke_core::AnankeError;
use thiserror::Error;

/// Errors raised while resolving middleware references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareError {
    /// No pre-middleware is registered under the name.
    #[error("pre-middleware `{0}` is not registered")]
    UnknownPre(String),

    /// No post-middleware is registered under the name.
    #[error("post-middleware `{0}` is not registered")]
    UnknownPost(String),
}

impl From<MiddlewareError> for AnankeError {
    fn from(error: MiddlewareError) -> Self {
        AnankeError::internal_with_source(error.to_string(), error)
    }
}
