//! Lazily discovered, process-lifetime method registry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ananke_core::{AnankeError, BoxFuture, Envelope};
use tokio::sync::OnceCell;

use crate::rpc::method::{Method, MethodTable};

type Discovery = Arc<dyn Fn() -> BoxFuture<'static, Result<MethodTable, AnankeError>> + Send + Sync>;

/// Resolves RPC methods by name.
///
/// The table is discovered on first use and cached for the registry's
/// lifetime. A failed discovery is not cached: the next request retries.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, Envelope, GatewayEvent, Request};
/// use ananke_runtime::{MethodRegistry, MethodTable};
///
/// # tokio_test::block_on(async {
/// let registry = MethodRegistry::discover(|| async {
///     MethodTable::new()
///         .method("ping", |_: Request, _: Context, _: Arc<GatewayEvent>| async {
///             Ok::<_, AnankeError>("pong")
///         })
///         .map_err(AnankeError::from)
/// });
///
/// let method = registry
///     .resolve_method(&Envelope::new("id", "ping", serde_json::json!({})))
///     .await;
/// assert_eq!(method.name(), "ping");
/// # });
/// ```
pub struct MethodRegistry {
    discovery: Option<Discovery>,
    table: OnceCell<Arc<MethodTable>>,
}

impl MethodRegistry {
    /// Creates a registry over an already-built table.
    #[must_use]
    pub fn new(table: MethodTable) -> Self {
        Self {
            discovery: None,
            table: OnceCell::new_with(Some(Arc::new(table))),
        }
    }

    /// Creates a registry whose table is built by `discovery` on first use.
    pub fn discover<F, Fut>(discovery: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MethodTable, AnankeError>> + Send + 'static,
    {
        Self {
            discovery: Some(Arc::new(move || Box::pin(discovery()))),
            table: OnceCell::new(),
        }
    }

    /// Returns the method table, discovering it on first call.
    pub async fn collect(&self) -> Result<Arc<MethodTable>, AnankeError> {
        self.table
            .get_or_try_init(|| async {
                let discovery = self
                    .discovery
                    .as_ref()
                    .ok_or_else(|| AnankeError::internal("RPC method registry has no discovery"))?;
                let table = discovery().await?;
                tracing::debug!(methods = table.len(), "collected RPC methods");
                Ok::<_, AnankeError>(Arc::new(table))
            })
            .await
            .map(Arc::clone)
    }

    /// Resolves the method an envelope calls.
    ///
    /// Never fails: an unknown name resolves to a method answering
    /// `NotFound`, and a failed discovery to one answering with that failure.
    pub async fn resolve_method(&self, envelope: &Envelope) -> Method {
        match self.collect().await {
            Ok(table) => table
                .get(&envelope.method)
                .cloned()
                .unwrap_or_else(|| Method::not_found(&envelope.method)),
            Err(error) => {
                tracing::error!(error = %error, "RPC methods could not be collected");
                let reason = error.to_string();
                Method::failing(&envelope.method, move |_| {
                    AnankeError::internal(format!("RPC methods could not be collected: {reason}"))
                })
            }
        }
    }

    /// Returns `true` once the table has been collected.
    #[must_use]
    pub fn is_collected(&self) -> bool {
        self.table.initialized()
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("table", &self.table.get())
            .finish_non_exhaustive()
    }
}
