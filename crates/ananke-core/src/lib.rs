//! # Ananke Core
//!
//! Core types shared by every crate of the Ananke function runtime.
//!
//! This crate provides the foundational types used throughout Ananke:
//!
//! - [`AnankeError`] - Boom-style error taxonomy with HTTP status codes
//! - [`NormalizedError`] - Serializable error payload rendered to callers
//! - [`Context`] - Named map of process-wide dependencies
//! - [`ContextResolver`] - Memoized, ordered construction of the [`Context`]
//! - [`HandlerOptions`] / [`MethodOptions`] - Per-handler and per-method settings
//! - [`Request`] / [`Envelope`] - The request object threaded through middleware
//! - [`GatewayEvent`] / [`QueueEvent`] - Inbound transport event shapes
//! - [`Responder`] / [`GatewayResponse`] - Outbound response envelope
//! - [`QueueClient`] / [`MessageHelper`] - Queue acknowledgment seam

#![doc(html_root_url = "https://docs.rs/ananke-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod event;
mod logger;
mod options;
mod outcome;
pub mod queue;
mod request;
mod resolver;
mod responder;

pub use context::{Context, ContextLookupError, RequestId, LOGGER_KEY};
pub use error::{AnankeError, AnankeResult, ErrorOrigin, NormalizedError, INTERNAL_ERROR_MESSAGE};
pub use event::{GatewayEvent, GatewayResponse, QueueEvent, QueueRecord};
pub use logger::Logger;
pub use options::{HandlerOptions, MethodOptions};
pub use outcome::Outcome;
pub use queue::{MessageHelper, QueueClient};
pub use request::{Envelope, Request, JSONRPC_VERSION};
pub use resolver::{ContextResolutionError, ContextResolver, ContextResolverBuilder};
pub use responder::{Responder, CORS_HEADERS};

use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
///
/// Used at every dyn-compatible seam of the runtime (producers, middleware,
/// runners, authenticators, queue clients).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
