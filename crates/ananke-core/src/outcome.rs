//! The result of a runner, as seen by post-middleware.

use serde_json::Value;

use crate::error::AnankeError;

/// Either a runner's JSON result or the error it raised.
///
/// Post-middleware receives an `Outcome` so it can rewrite successes and
/// failures alike.
#[derive(Debug)]
pub enum Outcome {
    /// The runner produced a value.
    Success(Value),
    /// The runner, or an earlier stage, failed.
    Failure(AnankeError),
}

impl Outcome {
    /// Returns `true` for a success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&AnankeError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    /// Converts into a standard result.
    pub fn into_result(self) -> Result<Value, AnankeError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(error) => Err(error),
        }
    }
}

impl From<AnankeError> for Outcome {
    fn from(error: AnankeError) -> Self {
        Self::Failure(error)
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Self::Success(value)
    }
}

impl From<Result<Value, AnankeError>> for Outcome {
    fn from(result: Result<Value, AnankeError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_conversions() {
        let success: Outcome = serde_json::json!({ "ok": true }).into();
        assert!(success.is_success());
        assert!(success.error().is_none());
        assert_eq!(success.into_result().unwrap()["ok"], true);

        let failure: Outcome = AnankeError::not_found("missing").into();
        assert!(!failure.is_success());
        assert_eq!(failure.error().map(|e| e.status_code().as_u16()), Some(404));
        assert!(failure.into_result().is_err());
    }
}
