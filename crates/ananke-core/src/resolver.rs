//! One-time, process-wide context resolution.
//!
//! A [`ContextResolver`] owns an ordered list of producers. The first call to
//! [`ContextResolver::resolve`] runs them one after another, each receiving
//! the context built so far, and memoizes the outcome. Every later or
//! concurrent call observes the same outcome, including a failure.
//!
//! # Example
//!
//! ```
//! use ananke_core::{ContextResolver, Logger};
//!
//! # tokio_test::block_on(async {
//! struct Config {
//!     database_url: String,
//! }
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let resolver = ContextResolver::builder(Logger::new("billing"))
//!     .inject("Config", |_ctx| async {
//!         Ok::<_, std::convert::Infallible>(Config {
//!             database_url: "mysql://db".to_string(),
//!         })
//!     })
//!     .inject("Database", |ctx| async move {
//!         let config = ctx.require::<Config>("Config")?;
//!         Ok::<_, anyhow::Error>(Database {
//!             url: config.database_url.clone(),
//!         })
//!     })
//!     .build();
//!
//! let ctx = resolver.resolve().await.unwrap();
//! assert_eq!(ctx.require::<Database>("Database").unwrap().url, "mysql://db");
//! # });
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::context::{Context, LOGGER_KEY};
use crate::logger::Logger;
use crate::BoxFuture;

type Value = Arc<dyn Any + Send + Sync>;
type Producer = Arc<dyn Fn(Context) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;

/// Error raised when a context producer fails.
///
/// Cached for the lifetime of the resolver, so it is cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Context could not be resolved: `{key}` failed: {reason}")]
pub struct ContextResolutionError {
    /// Key of the producer that failed.
    pub key: String,
    /// Rendered cause chain of the failure.
    pub reason: String,
}

struct ContextEntry {
    key: String,
    producer: Producer,
}

/// Builds and memoizes a [`Context`].
pub struct ContextResolver {
    logger: Logger,
    entries: Vec<ContextEntry>,
    resolved: OnceCell<Result<Context, ContextResolutionError>>,
}

impl ContextResolver {
    /// Starts a resolver whose first entry is `logger`.
    #[must_use]
    pub fn builder(logger: Logger) -> ContextResolverBuilder {
        ContextResolverBuilder {
            logger,
            entries: Vec::new(),
        }
    }

    /// Returns a resolver that only supplies the process logger.
    #[must_use]
    pub fn empty(logger: Logger) -> Self {
        Self::builder(logger).build()
    }

    /// Resolves the context, running producers on the first call only.
    ///
    /// Concurrent first callers await the same in-flight resolution.
    pub async fn resolve(&self) -> Result<Context, ContextResolutionError> {
        self.resolved.get_or_init(|| self.run()).await.clone()
    }

    /// Returns `true` once resolution has completed, successfully or not.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }

    /// Returns the entry keys in resolution order, logger first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(LOGGER_KEY).chain(self.entries.iter().map(|entry| entry.key.as_str()))
    }

    /// Returns the process logger.
    #[must_use]
    pub const fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn run(&self) -> Result<Context, ContextResolutionError> {
        let mut ctx = Context::new().with(LOGGER_KEY, Arc::new(self.logger.clone()));

        for entry in &self.entries {
            tracing::debug!(key = %entry.key, "resolving context entry");
            match (entry.producer)(ctx.clone()).await {
                Ok(value) => ctx.insert_erased(entry.key.clone(), value),
                Err(error) => {
                    let error = ContextResolutionError {
                        key: entry.key.clone(),
                        reason: format!("{error:#}"),
                    };
                    tracing::error!(key = %entry.key, error = %error, "context resolution failed");
                    return Err(error);
                }
            }
        }

        tracing::debug!(entries = ctx.len(), "context resolved");
        Ok(ctx)
    }
}

impl fmt::Debug for ContextResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextResolver")
            .field("service", &self.logger.service())
            .field("keys", &self.keys().collect::<Vec<_>>())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

/// Builder for [`ContextResolver`].
pub struct ContextResolverBuilder {
    logger: Logger,
    entries: Vec<ContextEntry>,
}

impl ContextResolverBuilder {
    /// Registers a producer under `key`.
    ///
    /// Producers run in registration order and see every earlier entry.
    #[must_use]
    pub fn inject<F, Fut, T, E>(mut self, key: impl Into<String>, producer: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + Sync + 'static,
        E: Into<anyhow::Error>,
    {
        let producer: Producer = Arc::new(move |ctx| {
            let fut = producer(ctx);
            Box::pin(async move {
                let value = fut.await.map_err(Into::into)?;
                Ok(Arc::new(value) as Value)
            })
        });
        self.entries.push(ContextEntry {
            key: key.into(),
            producer,
        });
        self
    }

    /// Registers an already-built value under `key`.
    #[must_use]
    pub fn value<T: Send + Sync + 'static>(mut self, key: impl Into<String>, value: Arc<T>) -> Self {
        let producer: Producer = Arc::new(move |_| {
            let value: Value = Arc::clone(&value) as Value;
            Box::pin(async move { Ok(value) })
        });
        self.entries.push(ContextEntry {
            key: key.into(),
            producer,
        });
        self
    }

    /// Builds the resolver.
    #[must_use]
    pub fn build(self) -> ContextResolver {
        ContextResolver {
            logger: self.logger,
            entries: self.entries,
            resolved: OnceCell::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Config {
        region: String,
    }

    #[derive(Debug)]
    struct Database {
        region: String,
    }

    #[tokio::test]
    async fn test_logger_is_first_entry() {
        let resolver = ContextResolver::empty(Logger::new("orders"));
        let ctx = resolver.resolve().await.unwrap();

        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec![LOGGER_KEY]);
        assert_eq!(ctx.logger().service(), "orders");
    }

    #[tokio::test]
    async fn test_producers_see_earlier_entries() {
        let resolver = ContextResolver::builder(Logger::new("orders"))
            .inject("Config", |_| async {
                Ok::<_, anyhow::Error>(Config {
                    region: "eu-west-1".to_string(),
                })
            })
            .inject("Database", |ctx| async move {
                let config = ctx.require::<Config>("Config")?;
                Ok::<_, anyhow::Error>(Database {
                    region: config.region.clone(),
                })
            })
            .build();

        let ctx = resolver.resolve().await.unwrap();
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["Logger", "Config", "Database"]);
        assert_eq!(ctx.require::<Database>("Database").unwrap().region, "eu-west-1");
    }

    #[tokio::test]
    async fn test_concurrent_resolution_runs_producers_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = Arc::new(
            ContextResolver::builder(Logger::new("orders"))
                .inject("Config", move |_| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, anyhow::Error>(7_u32)
                    }
                })
                .build(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                tokio::spawn(async move { resolver.resolve().await })
            })
            .collect();

        let mut contexts = Vec::new();
        for handle in futures_util::future::join_all(handles).await {
            contexts.push(handle.unwrap().unwrap());
        }
        contexts.push(resolver.resolve().await.unwrap());

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(contexts.windows(2).all(|pair| pair[0].ptr_eq(&pair[1])));
    }

    #[tokio::test]
    async fn test_failure_is_sticky() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = ContextResolver::builder(Logger::new("orders"))
            .inject("Database", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u8, _>(anyhow::anyhow!("connection refused")) }
            })
            .inject("Never", |_| async { Ok::<_, anyhow::Error>(1_u8) })
            .build();

        let first = resolver.resolve().await.unwrap_err();
        assert_eq!(first.key, "Database");
        assert!(first.reason.contains("connection refused"));
        assert!(first.to_string().starts_with("Context could not be resolved"));

        let second = resolver.resolve().await.unwrap_err();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(resolver.is_resolved());
    }

    #[tokio::test]
    async fn test_prebuilt_values() {
        let resolver = ContextResolver::builder(Logger::new("orders"))
            .value("Config", Arc::new(Config { region: "x".into() }))
            .build();

        let ctx = resolver.resolve().await.unwrap();
        assert_eq!(ctx.require::<Config>("Config").unwrap().region, "x");
        assert_eq!(resolver.keys().collect::<Vec<_>>(), vec!["Logger", "Config"]);
    }
}
