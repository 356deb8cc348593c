//! Layered configuration for Ananke.
//!
//! This crate provides a strongly-typed configuration system with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides (`PREFIX__SECTION__KEY`)
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! Handler and method options live in the `[handlers.<name>]` and
//! `[methods."<name>"]` tables and accept both snake_case and camelCase keys.
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! name = "users"
//! expose_internal_errors = false
//!
//! [logging]
//! level = "30"          # Bunyan number or level name
//! format = "json"       # json | pretty
//!
//! [handlers.create-user]
//! requireAuth = true
//! authenticator = "bearer"
//! preMiddleware = ["audit"]
//! validation = { name = "string().required()" }
//!
//! [methods."hello.world"]
//! validation = { name = "string().required()" }
//! ```

#![doc(html_root_url = "https://docs.rs/ananke-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod sections;

pub use config::AnankeConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use sections::{LoggingConfig, ServiceConfig};
