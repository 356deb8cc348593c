//! The value pre-middleware and runners operate on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON-RPC protocol version every envelope must declare.
pub const JSONRPC_VERSION: &str = "2.0";

/// A single JSON-RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Caller-chosen call id, echoed in the response.
    pub id: String,
    /// Protocol version, always `"2.0"` once validated.
    pub jsonrpc: String,
    /// Name of the method to invoke.
    pub method: String,
    /// Call params; absent params default to `{}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Envelope {
    /// Creates an envelope for the given method.
    #[must_use]
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Value) -> Self {
        Self {
            id: id.into(),
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Returns the params, or an empty object.
    #[must_use]
    pub fn params_or_default(&self) -> Value {
        self.params
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

/// The request value threaded through pre-middleware into a runner.
///
/// For REST calls `payload` is the validated body; for RPC calls it is the
/// validated params of one envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Validated input.
    pub payload: Value,
    /// Transport headers.
    pub headers: HashMap<String, String>,
    /// Transport request context.
    pub transport: Value,
    /// Authenticated principal, if any.
    pub principal_id: Option<String>,
    /// The envelope being served, for RPC calls.
    pub envelope: Option<Envelope>,
}

impl Request {
    /// Creates a request around a payload.
    #[must_use]
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Sets the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the transport request context.
    #[must_use]
    pub fn with_transport(mut self, transport: Value) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the principal.
    #[must_use]
    pub fn with_principal(mut self, principal_id: Option<String>) -> Self {
        self.principal_id = principal_id;
        self
    }

    /// Sets the RPC envelope.
    #[must_use]
    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    /// Returns the principal id set on the transport identity, if any.
    ///
    /// Reads `authorizer.principalId` from the request context, which is
    /// where an upstream authorizer leaves it.
    #[must_use]
    pub fn transport_principal(&self) -> Option<&str> {
        self.transport
            .pointer("/authorizer/principalId")
            .and_then(Value::as_str)
            .filter(|principal| !principal.is_empty())
    }

    /// Returns the principal, preferring one set by middleware.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal_id
            .as_deref()
            .filter(|principal| !principal.is_empty())
            .or_else(|| self.transport_principal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_params_default() {
        let envelope: Envelope = serde_json::from_value(json!({
            "id": "1",
            "jsonrpc": "2.0",
            "method": "hello.world"
        }))
        .unwrap();
        assert_eq!(envelope.params_or_default(), json!({}));
    }

    #[test]
    fn test_principal_prefers_middleware_value() {
        let request = Request::new(json!({}))
            .with_transport(json!({ "authorizer": { "principalId": "from-gateway" } }));
        assert_eq!(request.principal(), Some("from-gateway"));

        let request = request.with_principal(Some("from-middleware".to_string()));
        assert_eq!(request.principal(), Some("from-middleware"));
    }

    #[test]
    fn test_empty_principal_is_anonymous() {
        let request = Request::new(json!({})).with_principal(Some(String::new()));
        assert_eq!(request.principal(), None);
    }
}
