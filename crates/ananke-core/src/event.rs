//! Inbound and outbound transport shapes.
//!
//! These mirror the API-gateway proxy event, the queue batch event and the
//! gateway proxy response. Unknown fields are ignored so real transport
//! payloads deserialize without loss of the fields the runtime needs.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An HTTP-flavored invocation event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayEvent {
    /// Stringified JSON body, if any.
    pub body: Option<String>,
    /// Request headers as delivered by the gateway.
    pub headers: HashMap<String, String>,
    /// HTTP method, e.g. `POST`.
    pub http_method: String,
    /// Request path.
    pub path: String,
    /// Transport-specific request context (identity, stage, ...).
    pub request_context: Value,
}

impl GatewayEvent {
    /// Looks up a header, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the `Authorization` header, if present.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.header("Authorization")
    }

    /// Parses the body as JSON.
    ///
    /// A missing or blank body parses as an empty object.
    pub fn json_body(&self) -> Result<Value, serde_json::Error> {
        match self.body.as_deref().map(str::trim) {
            None | Some("") => Ok(Value::Object(serde_json::Map::new())),
            Some(body) => serde_json::from_str(body),
        }
    }
}

/// The gateway proxy response every HTTP-flavored handler returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers, always including the CORS defaults.
    pub headers: BTreeMap<String, String>,
    /// Textual body.
    pub body: String,
}

/// A batch of queue messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEvent {
    /// The messages of the batch.
    #[serde(rename = "Records", default)]
    pub records: Vec<QueueRecord>,
}

/// A single queue message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueRecord {
    /// Transport message id.
    pub message_id: String,
    /// Stringified JSON body.
    pub body: String,
    /// ARN of the originating queue; the queue name is its last segment.
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    /// Handle used to delete the message.
    pub receipt_handle: String,
}

impl QueueRecord {
    /// Returns the queue name derived from the source ARN.
    #[must_use]
    pub fn queue_name(&self) -> &str {
        self.event_source_arn
            .rsplit(':')
            .next()
            .unwrap_or(&self.event_source_arn)
    }
}
