//! Inspection and assertion helpers for gateway responses.

use ananke_core::GatewayResponse;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// Extension methods for [`GatewayResponse`].
pub trait ResponseExt {
    /// Returns the status code.
    fn status(&self) -> StatusCode;

    /// Looks up a header, ignoring ASCII case.
    fn header(&self, name: &str) -> Option<&str>;

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body is not valid JSON for `T`.
    fn json_body<T: DeserializeOwned>(&self) -> Result<T, TestError>;

    /// Deserializes the body as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body is not valid JSON.
    fn json_value(&self) -> Result<Value, TestError> {
        self.json_body()
    }

    /// Returns the `message` of a normalized error body.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Shape`] if the body carries no message.
    fn error_message(&self) -> Result<String, TestError> {
        self.json_value()?["message"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TestError::Shape("body has no `message`".to_string()))
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    fn assert_status_code(&self, expected: u16) -> &Self;

    /// Asserts a 2xx status.
    ///
    /// # Panics
    ///
    /// Panics if the status is not 2xx.
    fn assert_success(&self) -> &Self;
}

impl ResponseExt for GatewayResponse {
    fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn json_body<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        serde_json::from_str(&self.body).map_err(TestError::Json)
    }

    fn assert_status_code(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status_code, expected,
            "Expected status {}, got {} with body {}",
            expected, self.status_code, self.body
        );
        self
    }

    fn assert_success(&self) -> &Self {
        assert!(
            self.status().is_success(),
            "Expected success status, got {} with body {}",
            self.status_code,
            self.body
        );
        self
    }
}
