//! # Ananke Runtime
//!
//! Handler variants and the dispatch engine of the Ananke function runtime.
//!
//! A process builds one [`Runtime`] (shared context, middleware and
//! authenticator registries, queue client) and wraps application functions
//! in one of the [`Handler`] variants:
//!
//! | Variant | Event | Output |
//! |---|---|---|
//! | [`Generic`] | any | the runner's result |
//! | [`Rest`] | [`GatewayEvent`](ananke_core::GatewayEvent) | [`GatewayResponse`](ananke_core::GatewayResponse) |
//! | [`Rpc`] | [`GatewayEvent`](ananke_core::GatewayEvent) | [`GatewayResponse`](ananke_core::GatewayResponse) |
//! | [`Queue`] | [`QueueEvent`](ananke_core::QueueEvent) | [`QueueReport`] |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use ananke_core::{AnankeError, Context, ContextResolver, GatewayEvent, HandlerOptions, Logger, Request};
//! use ananke_runtime::{Handler, Rest, Runtime};
//!
//! # tokio_test::block_on(async {
//! let runtime = Runtime::builder()
//!     .context(
//!         ContextResolver::builder(Logger::new("users"))
//!             .value("Greeting", Arc::new("Hello".to_string()))
//!             .build(),
//!     )
//!     .build();
//!
//! let rest = Rest::new(
//!     runtime,
//!     "greet",
//!     HandlerOptions::new().validate("name", "string().required()"),
//!     |request: Request, ctx: Context, _event: Arc<GatewayEvent>| async move {
//!         let greeting: Arc<String> = ctx.require("Greeting")?;
//!         Ok::<_, AnankeError>(format!("{greeting} {}", request.payload["name"].as_str().unwrap_or_default()))
//!     },
//! )
//! .unwrap();
//!
//! let response = rest
//!     .exec(GatewayEvent { body: Some(r#"{"name":"Ada"}"#.into()), ..Default::default() })
//!     .await;
//! assert_eq!(response.body, "Hello Ada");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/ananke-runtime/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod auth;
mod generic;
mod handler;
mod http;
mod queue;
mod rest;
mod rpc;
mod runtime;

pub use auth::{Authenticator, AuthenticatorRegistry, FnAuthenticator};
pub use generic::Generic;
pub use handler::{http_runner, Handler, HttpRunner};
pub use queue::{MessageResult, Queue, QueueMessage, QueueReport};
pub use rest::Rest;
pub use rpc::{Method, MethodRegistry, MethodTable, Rpc};
pub use runtime::{Runtime, RuntimeBuilder};
