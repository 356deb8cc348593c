//! The resolved dependency context and request identifiers.
//!
//! A [`Context`] is a named map of process-wide dependencies (logger, config,
//! database handles, auth helpers, ...). It is built once per process by the
//! [`ContextResolver`](crate::ContextResolver) and then shared, read-only, by
//! every invocation.
//!
//! # Example
//!
//! ```
//! use ananke_core::Context;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let ctx = Context::new().with("Database", Arc::new(Database { url: "mysql://db".into() }));
//!
//! let db: Arc<Database> = ctx.get("Database").unwrap();
//! assert_eq!(db.url, "mysql://db");
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logger::Logger;

/// Key under which the built-in process logger is stored.
pub const LOGGER_KEY: &str = "Logger";

type Entry = Arc<dyn Any + Send + Sync>;

/// Error when a context entry cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to read context entry `{key}`: {reason}")]
pub struct ContextLookupError {
    /// The key that was requested.
    pub key: String,
    /// The reason for the failure.
    pub reason: String,
}

impl ContextLookupError {
    fn missing(key: &str) -> Self {
        Self {
            key: key.to_string(),
            reason: "entry not registered".to_string(),
        }
    }

    fn mismatched<T>(key: &str) -> Self {
        Self {
            key: key.to_string(),
            reason: format!("entry is not a {}", std::any::type_name::<T>()),
        }
    }
}

/// Named map of shared dependencies.
///
/// Entries keep their insertion order, which is the order producers ran in.
/// Cloning a `Context` is cheap: entries live behind an `Arc` and are only
/// copied when a clone is extended.
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<IndexMap<String, Entry>>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context extended with one more entry.
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: Arc<T>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts an entry, replacing any previous value under the same key.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: Arc<T>) {
        self.insert_erased(key.into(), value);
    }

    pub(crate) fn insert_erased(&mut self, key: String, value: Entry) {
        Arc::make_mut(&mut self.entries).insert(key, value);
    }

    /// Reads an entry by key.
    ///
    /// Returns `None` when the key is missing or holds another type.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .get(key)
            .and_then(|entry| Arc::clone(entry).downcast::<T>().ok())
    }

    /// Reads an entry or returns an error describing why it is unavailable.
    pub fn require<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>, ContextLookupError> {
        let entry = self
            .entries
            .get(key)
            .ok_or_else(|| ContextLookupError::missing(key))?;

        Arc::clone(entry)
            .downcast::<T>()
            .map_err(|_| ContextLookupError::mismatched::<T>(key))
    }

    /// Returns the process logger, or a logger for an unknown service.
    #[must_use]
    pub fn logger(&self) -> Logger {
        self.get::<Logger>(LOGGER_KEY)
            .map_or_else(Logger::from_env, |logger| logger.as_ref().clone())
    }

    /// Returns `true` if an entry is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `true` if the entry under `key` holds a `T`.
    #[must_use]
    pub fn holds<T: 'static>(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is::<T>())
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the context has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if both handles share the same underlying entries.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A unique identifier for each invocation, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID, e.g. an RPC envelope id.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
