//! # Ananke
//!
//! **Request-dispatch runtime for function-as-a-service handlers**
//!
//! Ananke takes a single inbound event (an HTTP payload, a batch of RPC
//! calls or a batch of queue messages) and:
//!
//! - resolves a shared dependency [`Context`](prelude::Context) once per process
//! - validates input against compact string rules (`"string().required()"`)
//! - authenticates callers through named authenticators
//! - runs ordered pre- and post-middleware
//! - normalizes every success and failure into the transport's response shape
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use ananke::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let methods = MethodTable::new()
//!     .method_with_options(
//!         "hello.world",
//!         MethodOptions::new().validate("name", "string().required()"),
//!         |request: Request, _ctx: Context, _event: Arc<GatewayEvent>| async move {
//!             let name = request.payload["name"].as_str().unwrap_or_default().to_string();
//!             Ok::<_, AnankeError>(format!("Hello world {name}"))
//!         },
//!     )
//!     .unwrap();
//!
//! let rpc = Rpc::new(
//!     Runtime::builder().build(),
//!     "api",
//!     HandlerOptions::default(),
//!     Arc::new(MethodRegistry::new(methods)),
//! )
//! .unwrap();
//!
//! let body = serde_json::json!({
//!     "id": "11111111-1111-1111-1111-111111111111",
//!     "jsonrpc": "2.0",
//!     "method": "hello.world",
//!     "params": { "name": "Ada" }
//! });
//! let response = rpc
//!     .exec(GatewayEvent { body: Some(body.to_string()), ..Default::default() })
//!     .await;
//!
//! let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
//! assert_eq!(body["result"], "Hello world Ada");
//! # });
//! ```
//!
//! ## Architecture
//!
//! ```text
//! event → context → validation → authentication → pre middleware → runner
//!                                                                    ↓
//! response ← normalization ← post middleware ←──────────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/ananke/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use ananke_core as core;

// Re-export configuration
pub use ananke_config as config;

// Re-export middleware types
pub use ananke_middleware as middleware;

// Re-export handler variants
pub use ananke_runtime as runtime;

// Re-export logging and metrics
pub use ananke_telemetry as telemetry;

// Re-export the validation compiler
pub use ananke_validation as validation;

/// Commonly used types.
///
/// ```
/// use ananke::prelude::*;
/// ```
pub mod prelude {
    pub use ananke_core::{
        AnankeError, AnankeResult, Context, ContextResolver, GatewayEvent, GatewayResponse,
        HandlerOptions, Logger, MessageHelper, MethodOptions, Outcome, QueueClient, QueueEvent,
        Request, Responder,
    };

    pub use ananke_config::{AnankeConfig, ConfigLoader};

    pub use ananke_middleware::MiddlewareRegistry;

    pub use ananke_runtime::{
        Authenticator, AuthenticatorRegistry, FnAuthenticator, Generic, Handler, MethodRegistry,
        MethodTable, Queue, QueueMessage, QueueReport, Rest, Rpc, Runtime,
    };

    pub use ananke_telemetry::{init_logging, LogConfig};
}
