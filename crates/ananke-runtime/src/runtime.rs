//! The process-scoped runtime every handler holds a handle to.
//!
//! A [`Runtime`] owns the shared context resolver, the middleware and
//! authenticator registries, the queue client and the error exposure policy.
//! It is built once by the process entry point and cloned into handlers;
//! clones share the same state, so the context resolves at most once per
//! process no matter how many handlers exist.

use std::fmt;
use std::sync::Arc;

use ananke_config::AnankeConfig;
use ananke_core::{AnankeError, BoxFuture, ContextResolver, Logger, QueueClient};
use ananke_middleware::MiddlewareRegistry;

use crate::auth::{Authenticator, AuthenticatorRegistry};

/// Shared, process-wide state.
///
/// # Example
///
/// ```
/// use ananke_core::{ContextResolver, Logger};
/// use ananke_runtime::Runtime;
///
/// let runtime = Runtime::builder()
///     .context(ContextResolver::empty(Logger::new("users")))
///     .expose_internal_errors(true)
///     .build();
///
/// assert!(runtime.expose_internal_errors());
/// assert_eq!(runtime.logger().service(), "users");
/// ```
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    resolver: Arc<ContextResolver>,
    middleware: Arc<MiddlewareRegistry>,
    authenticators: Arc<AuthenticatorRegistry>,
    queue_client: Arc<dyn QueueClient>,
    expose_internal_errors: bool,
}

impl Runtime {
    /// Creates a runtime builder.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Returns the shared context resolver.
    #[must_use]
    pub fn resolver(&self) -> &Arc<ContextResolver> {
        &self.inner.resolver
    }

    /// Returns the process logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        self.inner.resolver.logger()
    }

    /// Returns the middleware registry.
    #[must_use]
    pub fn middleware(&self) -> &Arc<MiddlewareRegistry> {
        &self.inner.middleware
    }

    /// Returns the authenticator registry.
    #[must_use]
    pub fn authenticators(&self) -> &Arc<AuthenticatorRegistry> {
        &self.inner.authenticators
    }

    /// Returns the queue client used by message helpers.
    #[must_use]
    pub fn queue_client(&self) -> &Arc<dyn QueueClient> {
        &self.inner.queue_client
    }

    /// Returns `true` if server-error messages are rendered to callers.
    #[must_use]
    pub fn expose_internal_errors(&self) -> bool {
        self.inner.expose_internal_errors
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("service", &self.logger().service())
            .field("authenticators", &self.inner.authenticators.names().collect::<Vec<_>>())
            .field("expose_internal_errors", &self.inner.expose_internal_errors)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    resolver: Option<ContextResolver>,
    middleware: Option<MiddlewareRegistry>,
    authenticators: AuthenticatorRegistry,
    queue_client: Option<Arc<dyn QueueClient>>,
    expose_internal_errors: bool,
}

impl RuntimeBuilder {
    /// Applies process settings from configuration.
    ///
    /// Sets the error exposure policy and, unless a resolver was already
    /// given, an empty context whose logger carries the configured service
    /// name.
    #[must_use]
    pub fn config(mut self, config: &AnankeConfig) -> Self {
        self.expose_internal_errors = config.service.expose_internal_errors;
        if self.resolver.is_none() {
            self.resolver = Some(ContextResolver::empty(Logger::new(config.service.name.clone())));
        }
        self
    }

    /// Sets the shared context resolver.
    #[must_use]
    pub fn context(mut self, resolver: ContextResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Sets the middleware registry.
    #[must_use]
    pub fn middleware(mut self, registry: MiddlewareRegistry) -> Self {
        self.middleware = Some(registry);
        self
    }

    /// Registers an authenticator under `name`.
    #[must_use]
    pub fn authenticator(mut self, name: impl Into<String>, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators = self.authenticators.register(name, authenticator);
        self
    }

    /// Sets the queue client used by message helpers.
    #[must_use]
    pub fn queue_client(mut self, client: Arc<dyn QueueClient>) -> Self {
        self.queue_client = Some(client);
        self
    }

    /// Renders server-error messages to callers instead of a generic one.
    #[must_use]
    pub fn expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    /// Builds the runtime.
    #[must_use]
    pub fn build(self) -> Runtime {
        let resolver = self
            .resolver
            .unwrap_or_else(|| ContextResolver::empty(Logger::from_env()));

        Runtime {
            inner: Arc::new(RuntimeInner {
                resolver: Arc::new(resolver),
                middleware: Arc::new(self.middleware.unwrap_or_default()),
                authenticators: Arc::new(self.authenticators),
                queue_client: self
                    .queue_client
                    .unwrap_or_else(|| Arc::new(UnconfiguredQueueClient)),
                expose_internal_errors: self.expose_internal_errors,
            }),
        }
    }
}

/// Stand-in used when no queue client was configured.
struct UnconfiguredQueueClient;

impl QueueClient for UnconfiguredQueueClient {
    fn queue_url<'a>(&'a self, queue_name: &'a str) -> BoxFuture<'a, Result<String, AnankeError>> {
        Box::pin(async move {
            Err(AnankeError::internal(format!(
                "No queue client configured to look up queue {queue_name}"
            )))
        })
    }

    fn delete_message<'a>(
        &'a self,
        _queue_url: &'a str,
        _receipt_handle: &'a str,
    ) -> BoxFuture<'a, Result<(), AnankeError>> {
        Box::pin(async { Err(AnankeError::internal("No queue client configured")) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let runtime = Runtime::builder().build();
        assert!(!runtime.expose_internal_errors());
        assert!(runtime.authenticators().is_empty());
        assert!(!runtime.resolver().is_resolved());
    }

    #[test]
    fn test_config_sets_service_and_exposure() {
        let mut config = AnankeConfig::default();
        config.service.name = "billing".to_string();
        config.service.expose_internal_errors = true;

        let runtime = Runtime::builder().config(&config).build();
        assert_eq!(runtime.logger().service(), "billing");
        assert!(runtime.expose_internal_errors());
    }

    #[test]
    fn test_explicit_context_wins_over_config() {
        let runtime = Runtime::builder()
            .context(ContextResolver::empty(Logger::new("explicit")))
            .config(&AnankeConfig::default())
            .build();
        assert_eq!(runtime.logger().service(), "explicit");
    }

    #[test]
    fn test_clones_share_state() {
        let runtime = Runtime::builder().build();
        let clone = runtime.clone();
        assert!(Arc::ptr_eq(runtime.resolver(), clone.resolver()));
    }

    #[tokio::test]
    async fn test_unconfigured_queue_client_fails() {
        let runtime = Runtime::builder().build();
        let error = runtime.queue_client().queue_url("orders").await.unwrap_err();
        assert!(error.is_server());
    }
}
