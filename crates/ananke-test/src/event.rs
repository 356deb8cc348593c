//! Builders for inbound events.

use std::collections::HashMap;

use ananke_core::{GatewayEvent, QueueEvent, QueueRecord, JSONRPC_VERSION};
use serde::Serialize;
use serde_json::{json, Value};

/// Builder for [`GatewayEvent`]s.
#[must_use]
#[derive(Debug, Clone)]
pub struct GatewayEventBuilder {
    http_method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Option<String>,
    request_context: Value,
}

impl GatewayEventBuilder {
    /// Creates a builder for the given method and path.
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            request_context: json!({}),
        }
    }

    /// Creates a `GET` event.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Creates a `POST` event.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    /// Sets a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the `Authorization` header.
    pub fn authorization(self, value: impl Into<String>) -> Self {
        self.header("Authorization", value)
    }

    /// Sets a raw body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Self {
        let body = serde_json::to_string(body).expect("serializable body");
        self.body(body)
    }

    /// Sets the principal a gateway authorizer resolved upstream.
    pub fn authorizer_principal(mut self, principal_id: impl Into<String>) -> Self {
        self.request_context["authorizer"] = json!({ "principalId": principal_id.into() });
        self
    }

    /// Sets the raw request context.
    pub fn request_context(mut self, request_context: Value) -> Self {
        self.request_context = request_context;
        self
    }

    /// Builds the event.
    pub fn build(self) -> GatewayEvent {
        GatewayEvent {
            body: self.body,
            headers: self.headers,
            http_method: self.http_method,
            path: self.path,
            request_context: self.request_context,
        }
    }
}

/// Builds one RPC envelope as a JSON value.
#[must_use]
pub fn rpc_call(id: &str, method: &str, params: Value) -> Value {
    json!({ "id": id, "jsonrpc": JSONRPC_VERSION, "method": method, "params": params })
}

/// Builder for [`QueueEvent`]s whose messages all come from one queue.
#[must_use]
#[derive(Debug, Clone)]
pub struct QueueEventBuilder {
    event_source_arn: String,
    records: Vec<QueueRecord>,
}

impl QueueEventBuilder {
    /// Creates a builder for the queue identified by `event_source_arn`.
    pub fn new(event_source_arn: impl Into<String>) -> Self {
        Self {
            event_source_arn: event_source_arn.into(),
            records: Vec::new(),
        }
    }

    /// Appends a message with a raw body.
    ///
    /// Message ids and receipt handles are numbered from 1.
    pub fn message(mut self, body: impl Into<String>) -> Self {
        let n = self.records.len() + 1;
        self.records.push(QueueRecord {
            message_id: format!("message-{n}"),
            body: body.into(),
            event_source_arn: self.event_source_arn.clone(),
            receipt_handle: format!("receipt-{n}"),
        });
        self
    }

    /// Appends a message with a JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the value cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Self {
        let body = serde_json::to_string(body).expect("serializable body");
        self.message(body)
    }

    /// Builds the event.
    pub fn build(self) -> QueueEvent {
        QueueEvent {
            records: self.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_event_builder() {
        let event = GatewayEventBuilder::post("/users")
            .authorization("Bearer abc")
            .json(&json!({ "name": "Ada" }))
            .authorizer_principal("user-1")
            .build();

        assert_eq!(event.http_method, "POST");
        assert_eq!(event.path, "/users");
        assert_eq!(event.authorization(), Some("Bearer abc"));
        assert_eq!(event.json_body().unwrap()["name"], "Ada");
        assert_eq!(event.request_context["authorizer"]["principalId"], "user-1");
    }

    #[test]
    fn test_queue_event_builder_numbers_messages() {
        let event = QueueEventBuilder::new("arn:aws:sqs:eu-west-1:1:jobs")
            .message("{}")
            .json(&json!({ "a": 1 }))
            .build();

        assert_eq!(event.records.len(), 2);
        assert_eq!(event.records[1].message_id, "message-2");
        assert_eq!(event.records[1].receipt_handle, "receipt-2");
        assert_eq!(event.records[1].queue_name(), "jobs");
    }

    #[test]
    fn test_rpc_call_shape() {
        let call = rpc_call("id-1", "users.get", json!({ "id": 1 }));
        assert_eq!(call["jsonrpc"], "2.0");
        assert_eq!(call["method"], "users.get");
    }
}
