//! # Ananke Test
//!
//! Test utilities for the Ananke function runtime: build the events a
//! transport would deliver, capture queue acknowledgments in memory and
//! inspect gateway responses without a real gateway or queue.
//!
//! ## Example
//!
//! ```
//! use ananke_test::{GatewayEventBuilder, ResponseExt};
//! use ananke_core::Responder;
//! use serde_json::json;
//!
//! let event = GatewayEventBuilder::post("/users")
//!     .header("Authorization", "Bearer token")
//!     .json(&json!({ "name": "Ada" }))
//!     .build();
//! assert_eq!(event.authorization(), Some("Bearer token"));
//!
//! let response = Responder::ok(json!({ "id": 1 })).to_gateway();
//! response.assert_status_code(200);
//! assert_eq!(response.json_value().unwrap()["id"], 1);
//! ```

#![doc(html_root_url = "https://docs.rs/ananke-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod event;
mod queue;
mod response;

pub use error::TestError;
pub use event::{rpc_call, GatewayEventBuilder, QueueEventBuilder};
pub use queue::MemoryQueueClient;
pub use response::ResponseExt;
