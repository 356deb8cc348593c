//! # Ananke Middleware
//!
//! Ordered pre- and post-processing steps for Ananke handlers.
//!
//! - Pre-middleware folds the [`Request`](ananke_core::Request) before the
//!   runner is invoked; any error aborts the invocation.
//! - Post-middleware folds the runner's [`Outcome`](ananke_core::Outcome).
//!   Errors are carried as values, so a failing request still runs through
//!   the post chain before it is rendered.
//!
//! Steps always run strictly in declared order: step `n + 1` sees the output
//! of step `n`.
//!
//! ```text
//! request ─▶ pre[0] ─▶ pre[1] ─▶ … ─▶ runner ─▶ post[0] ─▶ post[1] ─▶ … ─▶ response
//! ```

#![doc(html_root_url = "https://docs.rs/ananke-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod chain;
mod error;
mod middleware;
mod registry;

pub use chain::MiddlewareChain;
pub use error::MiddlewareError;
pub use middleware::{
    reduce, reduce_carrying_errors, BoxedMiddleware, FnMiddleware, Middleware, PostMiddleware,
    PreMiddleware,
};
pub use registry::{MiddlewareRef, MiddlewareRegistry};
