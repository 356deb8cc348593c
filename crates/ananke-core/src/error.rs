//! Error types for Ananke.
//!
//! This module provides the [`AnankeError`] type, the Boom-style error used
//! uniformly across every handler variant. Each error carries an HTTP status
//! code and is classified by [`ErrorOrigin`]: client errors (4xx) are logged
//! at debug severity, server errors (5xx) at error severity. Both are rendered
//! to the caller through [`AnankeError::normalize`].
//!
//! | Variant | Status | Origin |
//! |---|---|---|
//! | `BadRequest` | 400 | client |
//! | `Unauthorized` | 401 | client |
//! | `Forbidden` | 403 | client |
//! | `NotFound` | 404 | client |
//! | `ContextResolution` | 500 | server |
//! | `Internal` | 500 | server |
//! | `Status` | any | by status |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ContextLookupError;
use crate::resolver::ContextResolutionError;

/// Result type alias using [`AnankeError`].
pub type AnankeResult<T> = Result<T, AnankeError>;

/// Message rendered in place of server error details when they are not exposed.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal server error occurred";

/// Where an error originated, which controls log severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOrigin {
    /// The caller sent something invalid (4xx).
    Client,
    /// The runtime or application failed (5xx).
    Server,
}

/// Standard error type for Ananke.
///
/// # Example
///
/// ```
/// use ananke_core::{AnankeError, ErrorOrigin};
///
/// let error = AnankeError::unauthorized("REST endpoint POST /users requires authentication");
/// assert_eq!(error.status_code().as_u16(), 401);
/// assert_eq!(error.origin(), ErrorOrigin::Client);
/// ```
#[derive(Error, Debug)]
pub enum AnankeError {
    /// Malformed or missing input fields.
    #[error("{message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
        /// One entry per failing field.
        details: Vec<String>,
    },

    /// Authentication required but absent.
    #[error("{message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
    },

    /// Authenticated but not permitted.
    #[error("{message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// Unknown resource, e.g. an unregistered RPC method.
    #[error("{message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// The process context could not be built.
    #[error(transparent)]
    ContextResolution(#[from] ContextResolutionError),

    /// Unexpected failure.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (never rendered unless exposure is enabled).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Any other status code raised by application code.
    #[error("{message}")]
    Status {
        /// The HTTP status code.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
    },
}

impl AnankeError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Creates a bad request error listing every failing field.
    #[must_use]
    pub fn bad_request_with_details(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details,
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an error with an arbitrary status code.
    ///
    /// Non-error statuses are coerced to 500, matching how Boom treats them.
    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        let status = if status.is_client_error() || status.is_server_error() {
            status
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// Coerces any error into an [`AnankeError`].
    ///
    /// An `AnankeError` wrapped inside the `anyhow::Error` is recovered as-is;
    /// anything else becomes an internal error.
    pub fn boomify(error: anyhow::Error) -> Self {
        match error.downcast::<Self>() {
            Ok(error) => error,
            Err(error) => match error.downcast::<ContextResolutionError>() {
                Ok(error) => Self::ContextResolution(error),
                Err(error) => Self::Internal {
                    message: error.to_string(),
                    source: Some(error),
                },
            },
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::ContextResolution(_) | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Status { status, .. } => *status,
        }
    }

    /// Classifies the error as client- or server-origin.
    #[must_use]
    pub fn origin(&self) -> ErrorOrigin {
        if self.status_code().is_server_error() {
            ErrorOrigin::Server
        } else {
            ErrorOrigin::Client
        }
    }

    /// Returns `true` for 5xx errors.
    #[must_use]
    pub fn is_server(&self) -> bool {
        self.origin() == ErrorOrigin::Server
    }

    /// Returns the per-field details of a bad request.
    #[must_use]
    pub fn details(&self) -> &[String] {
        match self {
            Self::BadRequest { details, .. } => details,
            _ => &[],
        }
    }

    /// Converts this error into the payload rendered to callers.
    ///
    /// Server-origin messages are replaced with a generic message unless
    /// `expose_internal` is set.
    #[must_use]
    pub fn normalize(&self, expose_internal: bool) -> NormalizedError {
        let status = self.status_code();
        let message = if self.is_server() && !expose_internal {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        let details = match self.details() {
            [] => None,
            details => Some(details.to_vec()),
        };

        NormalizedError {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message,
            details,
        }
    }
}

impl From<anyhow::Error> for AnankeError {
    fn from(error: anyhow::Error) -> Self {
        Self::boomify(error)
    }
}

impl From<ContextLookupError> for AnankeError {
    fn from(error: ContextLookupError) -> Self {
        Self::internal_with_source(error.to_string(), error)
    }
}

/// Serializable error payload, shaped like a Boom `output.payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    /// Numeric HTTP status code.
    pub status_code: u16,
    /// Canonical reason phrase of the status code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Per-field validation messages, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}
