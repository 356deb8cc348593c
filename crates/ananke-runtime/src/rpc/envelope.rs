//! Wire shapes of the JSON-RPC protocol.

use ananke_core::{AnankeError, Envelope, JSONRPC_VERSION};
use ananke_validation::{compile, compile_map, CompileError, ParamsValidator, Schema};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Rules every envelope must satisfy.
const ENVELOPE_RULES: [(&str, &str); 4] = [
    ("id", "string().uuid().required()"),
    ("jsonrpc", "string().valid('2.0').required()"),
    ("method", "string().required()"),
    ("params", "alternatives().try(array(), object())"),
];

/// Builds the validator accepting one envelope or an array of envelopes.
pub(crate) fn envelope_validator() -> Result<ParamsValidator, CompileError> {
    let rules: IndexMap<String, String> = ENVELOPE_RULES
        .iter()
        .map(|(field, rule)| ((*field).to_string(), (*rule).to_string()))
        .collect();
    let envelope = compile_map(&rules)?;
    let batch = compile("array()")?.items([envelope.clone()]);
    Ok(ParamsValidator::from_schema(Schema::alternatives([envelope, batch])))
}

/// A parsed request body.
#[derive(Debug)]
pub(crate) enum Batch {
    Single(Envelope),
    Many(Vec<Envelope>),
}

impl Batch {
    pub(crate) fn parse(validator: &ParamsValidator, body: &Value) -> Result<Self, AnankeError> {
        let value = validator.check(body)?;
        let batch = if value.is_array() {
            Self::Many(serde_json::from_value(value).map_err(invalid_envelope)?)
        } else {
            Self::Single(serde_json::from_value(value).map_err(invalid_envelope)?)
        };
        Ok(batch)
    }

    pub(crate) fn into_envelopes(self) -> Vec<Envelope> {
        match self {
            Self::Single(envelope) => vec![envelope],
            Self::Many(envelopes) => envelopes,
        }
    }
}

fn invalid_envelope(error: serde_json::Error) -> AnankeError {
    AnankeError::bad_request(format!("Invalid RPC envelope: {error}"))
}

/// The error member of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RpcError {
    pub(crate) code: u16,
    pub(crate) message: String,
}

/// One call's response: `{id, jsonrpc, result}` or `{id, jsonrpc, error}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RpcResponse {
    pub(crate) id: Value,
    pub(crate) jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) error: Option<RpcError>,
}

impl RpcResponse {
    pub(crate) fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION,
            result: Some(result),
            error: None,
        }
    }

    pub(crate) fn failure(id: Value, error: &AnankeError, expose_internal: bool) -> Self {
        let normalized = error.normalize(expose_internal);
        Self {
            id,
            jsonrpc: JSONRPC_VERSION,
            result: None,
            error: Some(RpcError {
                code: normalized.status_code,
                message: normalized.message,
            }),
        }
    }

    pub(crate) fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ID: &str = "11111111-1111-1111-1111-111111111111";

    fn validator() -> ParamsValidator {
        envelope_validator().unwrap()
    }

    #[test]
    fn test_single_envelope() {
        let body = json!({ "id": ID, "jsonrpc": "2.0", "method": "hello.world", "params": { "name": "Ada" } });
        match Batch::parse(&validator(), &body).unwrap() {
            Batch::Single(envelope) => {
                assert_eq!(envelope.method, "hello.world");
                assert_eq!(envelope.params, Some(json!({ "name": "Ada" })));
            }
            Batch::Many(_) => panic!("expected a single envelope"),
        }
    }

    #[test]
    fn test_batch_keeps_order() {
        let body = json!([
            { "id": ID, "jsonrpc": "2.0", "method": "a" },
            { "id": ID, "jsonrpc": "2.0", "method": "b", "params": [1, 2] },
        ]);
        let envelopes = Batch::parse(&validator(), &body).unwrap().into_envelopes();
        let methods: Vec<&str> = envelopes.iter().map(|e| e.method.as_str()).collect();
        assert_eq!(methods, ["a", "b"]);
        assert!(envelopes[0].params.is_none());
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let envelopes = Batch::parse(&validator(), &json!([])).unwrap().into_envelopes();
        assert!(envelopes.is_empty());
    }

    #[test]
    fn test_invalid_envelopes_are_rejected() {
        let validator = validator();
        for body in [
            json!({ "id": "not-a-uuid", "jsonrpc": "2.0", "method": "a" }),
            json!({ "id": ID, "jsonrpc": "1.0", "method": "a" }),
            json!({ "id": ID, "jsonrpc": "2.0" }),
            json!({ "id": ID, "jsonrpc": "2.0", "method": "a", "params": "x" }),
            json!("hello"),
        ] {
            let error = Batch::parse(&validator, &body).unwrap_err();
            assert_eq!(error.status_code().as_u16(), 400, "{body}");
        }
    }

    #[test]
    fn test_response_shapes() {
        let ok = RpcResponse::success(json!(ID), json!("Hello world Ada")).into_value();
        assert_eq!(ok, json!({ "id": ID, "jsonrpc": "2.0", "result": "Hello world Ada" }));

        let failed = RpcResponse::failure(
            json!(ID),
            &AnankeError::not_found("Method nope does not exist"),
            false,
        )
        .into_value();
        assert_eq!(
            failed,
            json!({ "id": ID, "jsonrpc": "2.0", "error": { "code": 404, "message": "Method nope does not exist" } })
        );
    }
}
