//! Per-handler middleware chains.
//!
//! A chain holds the handler's configured references and resolves them
//! against the registry the first time they are needed. The resolved lists
//! are cached for the chain's lifetime.

use std::sync::Arc;

use ananke_core::{AnankeError, Context, Outcome, Request};
use tokio::sync::OnceCell;

use crate::error::MiddlewareError;
use crate::middleware::{reduce, reduce_carrying_errors, PostMiddleware, PreMiddleware};
use crate::registry::{MiddlewareRef, MiddlewareRegistry};

/// Lazily resolved pre- and post-middleware of one handler.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, Request};
/// use ananke_middleware::{MiddlewareChain, MiddlewareRegistry};
///
/// # tokio_test::block_on(async {
/// let registry = Arc::new(MiddlewareRegistry::new().pre_fn("stamp", |mut request: Request, _ctx: Context| async move {
///     request.payload["stamped"] = true.into();
///     Ok::<_, AnankeError>(request)
/// }));
///
/// let chain = MiddlewareChain::new(registry).pre("stamp");
/// let request = chain
///     .run_pre(Request::new(serde_json::json!({})), &Context::new())
///     .await
///     .unwrap();
/// assert_eq!(request.payload["stamped"], true);
/// # });
/// ```
pub struct MiddlewareChain {
    registry: Arc<MiddlewareRegistry>,
    pre_refs: Vec<MiddlewareRef<Request>>,
    post_refs: Vec<MiddlewareRef<Outcome>>,
    pre: OnceCell<Arc<[PreMiddleware]>>,
    post: OnceCell<Arc<[PostMiddleware]>>,
}

impl MiddlewareChain {
    /// Creates an empty chain over `registry`.
    pub fn new(registry: Arc<MiddlewareRegistry>) -> Self {
        Self {
            registry,
            pre_refs: Vec::new(),
            post_refs: Vec::new(),
            pre: OnceCell::new(),
            post: OnceCell::new(),
        }
    }

    /// Creates a chain from configured names.
    pub fn from_names(registry: Arc<MiddlewareRegistry>, pre: &[String], post: &[String]) -> Self {
        let mut chain = Self::new(registry);
        chain.pre_refs = pre.iter().cloned().map(MiddlewareRef::Named).collect();
        chain.post_refs = post.iter().cloned().map(MiddlewareRef::Named).collect();
        chain
    }

    /// Appends a pre-middleware reference.
    #[must_use]
    pub fn pre(mut self, reference: impl Into<MiddlewareRef<Request>>) -> Self {
        self.pre_refs.push(reference.into());
        self
    }

    /// Appends a post-middleware reference.
    #[must_use]
    pub fn post(mut self, reference: impl Into<MiddlewareRef<Outcome>>) -> Self {
        self.post_refs.push(reference.into());
        self
    }

    /// Returns the registry references resolve against.
    pub fn registry(&self) -> &Arc<MiddlewareRegistry> {
        &self.registry
    }

    /// Resolves the pre-middleware list once.
    ///
    /// A failed resolution is not cached.
    pub async fn pre_middleware(&self) -> Result<Arc<[PreMiddleware]>, MiddlewareError> {
        self.pre
            .get_or_try_init(|| async {
                let resolved = self
                    .pre_refs
                    .iter()
                    .map(|reference| self.registry.lookup_pre(reference))
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!(count = resolved.len(), "resolved pre-middleware");
                Ok::<_, MiddlewareError>(Arc::from(resolved))
            })
            .await
            .map(Arc::clone)
    }

    /// Resolves the post-middleware list once.
    ///
    /// A failed resolution is not cached.
    pub async fn post_middleware(&self) -> Result<Arc<[PostMiddleware]>, MiddlewareError> {
        self.post
            .get_or_try_init(|| async {
                let resolved = self
                    .post_refs
                    .iter()
                    .map(|reference| self.registry.lookup_post(reference))
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!(count = resolved.len(), "resolved post-middleware");
                Ok::<_, MiddlewareError>(Arc::from(resolved))
            })
            .await
            .map(Arc::clone)
    }

    /// Folds a request through the pre-middleware.
    pub async fn run_pre(&self, request: Request, ctx: &Context) -> Result<Request, AnankeError> {
        let steps = self.pre_middleware().await?;
        reduce(&steps, request, ctx).await
    }

    /// Folds an outcome through the post-middleware, carrying errors.
    pub async fn run_post(&self, outcome: Outcome, ctx: &Context) -> Outcome {
        match self.post_middleware().await {
            Ok(steps) => reduce_carrying_errors(&steps, outcome, ctx).await,
            Err(error) => Outcome::Failure(error.into()),
        }
    }

    /// Returns `true` once both lists have been resolved.
    pub fn is_resolved(&self) -> bool {
        self.pre.initialized() && self.post.initialized()
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("pre", &self.pre_refs)
            .field("post", &self.post_refs)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::FnMiddleware;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<MiddlewareRegistry> {
        Arc::new(
            MiddlewareRegistry::new()
                .pre_fn("double", |mut request: Request, _ctx: Context| async move {
                    let n = request.payload["n"].as_i64().unwrap_or(0);
                    request.payload["n"] = json!(n * 2);
                    Ok::<_, AnankeError>(request)
                })
                .pre_fn("increment", |mut request: Request, _ctx: Context| async move {
                    let n = request.payload["n"].as_i64().unwrap_or(0);
                    request.payload["n"] = json!(n + 1);
                    Ok::<_, AnankeError>(request)
                })
                .post_fn("wrap", |outcome: Outcome, _ctx: Context| async move {
                    Ok::<_, AnankeError>(match outcome {
                        Outcome::Success(value) => Outcome::Success(json!({ "data": value })),
                        failure => failure,
                    })
                }),
        )
    }

    #[tokio::test]
    async fn test_named_chain_runs_in_declared_order() {
        let chain = MiddlewareChain::from_names(
            registry(),
            &["double".to_string(), "increment".to_string()],
            &[],
        );
        let request = chain
            .run_pre(Request::new(json!({ "n": 3 })), &Context::new())
            .await
            .unwrap();
        // increment(double(3)), never double(3) and increment(3) side by side
        assert_eq!(request.payload["n"], 7);

        let chain = MiddlewareChain::from_names(
            registry(),
            &["increment".to_string(), "double".to_string()],
            &[],
        );
        let request = chain
            .run_pre(Request::new(json!({ "n": 3 })), &Context::new())
            .await
            .unwrap();
        assert_eq!(request.payload["n"], 8);
    }

    #[tokio::test]
    async fn test_post_chain_wraps_success() {
        let chain = MiddlewareChain::from_names(registry(), &[], &["wrap".to_string()]);
        let outcome = chain.run_post(Outcome::Success(json!(1)), &Context::new()).await;
        assert_eq!(outcome.into_result().unwrap(), json!({ "data": 1 }));
    }

    #[tokio::test]
    async fn test_unknown_name_is_an_internal_error_and_not_cached() {
        let chain = MiddlewareChain::from_names(registry(), &["missing".to_string()], &[]);
        let error = chain
            .run_pre(Request::new(json!({})), &Context::new())
            .await
            .unwrap_err();
        assert!(error.is_server());
        assert!(!chain.pre.initialized());

        let outcome = MiddlewareChain::from_names(registry(), &[], &["missing".to_string()])
            .run_post(Outcome::Success(json!(1)), &Context::new())
            .await;
        assert!(outcome.error().is_some_and(AnankeError::is_server));
    }

    #[tokio::test]
    async fn test_resolution_happens_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let direct: PreMiddleware = Arc::new(FnMiddleware::new(
            "count",
            move |request: Request, _ctx: Context| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, AnankeError>(request) }
            },
        ));

        let chain = MiddlewareChain::new(registry())
            .pre(MiddlewareRef::Direct(direct))
            .pre("increment");

        let first = chain.pre_middleware().await.unwrap();
        let second = chain.pre_middleware().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 2);

        chain.run_pre(Request::new(json!({})), &Context::new()).await.unwrap();
        chain.run_pre(Request::new(json!({})), &Context::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
