//! Terminal response artifact of HTTP-flavored handlers.

use std::collections::BTreeMap;

use http::StatusCode;
use serde_json::Value;

use crate::error::AnankeError;
use crate::event::GatewayResponse;

/// Headers added to every gateway response.
pub const CORS_HEADERS: [(&str, &str); 2] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Credentials", "true"),
];

/// A handled request's body, headers and status, before rendering.
///
/// # Example
///
/// ```
/// use ananke_core::Responder;
/// use serde_json::json;
///
/// let response = Responder::ok(json!({ "id": 7 })).to_gateway();
/// assert_eq!(response.status_code, 200);
/// assert_eq!(response.body, r#"{"id":7}"#);
/// assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Responder {
    /// Response payload.
    pub body: Value,
    /// Extra response headers; these win over the CORS defaults.
    pub headers: BTreeMap<String, String>,
    /// HTTP status code.
    pub status_code: StatusCode,
}

impl Responder {
    /// Creates a responder.
    #[must_use]
    pub fn new(body: Value, status_code: StatusCode) -> Self {
        Self {
            body,
            headers: BTreeMap::new(),
            status_code,
        }
    }

    /// Creates a 200 responder.
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(body, StatusCode::OK)
    }

    /// Creates a responder rendering a normalized error.
    #[must_use]
    pub fn from_error(error: &AnankeError, expose_internal: bool) -> Self {
        let normalized = error.normalize(expose_internal);
        let body = serde_json::to_value(&normalized).unwrap_or(Value::Null);
        Self::new(body, error.status_code())
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Renders the gateway proxy response.
    ///
    /// String bodies pass through untouched; any other value is serialized
    /// to JSON text.
    #[must_use]
    pub fn to_gateway(&self) -> GatewayResponse {
        let mut headers: BTreeMap<String, String> = CORS_HEADERS
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        headers.extend(self.headers.clone());

        let body = match &self.body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };

        GatewayResponse {
            status_code: self.status_code.as_u16(),
            headers,
            body,
        }
    }
}

impl From<Responder> for GatewayResponse {
    fn from(responder: Responder) -> Self {
        responder.to_gateway()
    }
}
