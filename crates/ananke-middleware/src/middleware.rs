//! Core middleware trait and types.
//!
//! A middleware is a named async step `(value, context) -> value`. Steps are
//! folded strictly in declared order: each one sees the output of the one
//! before it. Returning an error aborts the fold.
//!
//! # Example
//!
//! ```
//! use ananke_core::{Context, Request};
//! use ananke_middleware::{FnMiddleware, Middleware};
//!
//! # tokio_test::block_on(async {
//! let tag = FnMiddleware::new("tag", |mut request: Request, _ctx: Context| async move {
//!     request.payload["tagged"] = true.into();
//!     Ok::<_, ananke_core::AnankeError>(request)
//! });
//!
//! let request = tag.call(Request::new(serde_json::json!({})), &Context::new()).await.unwrap();
//! assert_eq!(request.payload["tagged"], true);
//! # });
//! ```

use std::future::Future;
use std::sync::Arc;

use ananke_core::{AnankeError, BoxFuture, Context, Outcome, Request};

/// A single middleware step over values of type `T`.
pub trait Middleware<T>: Send + Sync + 'static {
    /// Returns the name used for registration and logging.
    fn name(&self) -> &str;

    /// Transforms the carried value.
    fn call<'a>(&'a self, value: T, ctx: &'a Context) -> BoxFuture<'a, Result<T, AnankeError>>;
}

/// A type-erased middleware step.
pub type BoxedMiddleware<T> = Arc<dyn Middleware<T>>;

/// Middleware run before the runner, over the request.
pub type PreMiddleware = BoxedMiddleware<Request>;

/// Middleware run after the runner, over its outcome.
pub type PostMiddleware = BoxedMiddleware<Outcome>;

/// A middleware created from an async function.
///
/// The function receives the value and a clone of the context, and may fail
/// with anything convertible into an [`AnankeError`].
pub struct FnMiddleware<F> {
    name: String,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<T, F, Fut, E> Middleware<T> for FnMiddleware<F>
where
    T: Send + 'static,
    F: Fn(T, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Into<AnankeError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call<'a>(&'a self, value: T, ctx: &'a Context) -> BoxFuture<'a, Result<T, AnankeError>> {
        let fut = (self.func)(value, ctx.clone());
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Folds `initial` through `steps` in order.
///
/// The first error aborts the fold and is returned.
pub async fn reduce<T: Send + 'static>(
    steps: &[BoxedMiddleware<T>],
    initial: T,
    ctx: &Context,
) -> Result<T, AnankeError> {
    let mut value = initial;
    for step in steps {
        tracing::trace!(middleware = step.name(), "running middleware");
        value = step.call(value, ctx).await?;
    }
    Ok(value)
}

/// Folds `initial` through `steps` in order, carrying errors as values.
///
/// When a step fails, its error becomes the value handed to the next step,
/// so error-handling middleware further down the chain still runs.
pub async fn reduce_carrying_errors<T>(steps: &[BoxedMiddleware<T>], initial: T, ctx: &Context) -> T
where
    T: From<AnankeError> + Send + 'static,
{
    let mut value = initial;
    for step in steps {
        tracing::trace!(middleware = step.name(), "running middleware");
        value = match step.call(value, ctx).await {
            Ok(next) => next,
            Err(error) => {
                tracing::debug!(middleware = step.name(), error = %error, "middleware failed");
                T::from(error)
            }
        };
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn append(name: &'static str) -> PreMiddleware {
        Arc::new(FnMiddleware::new(name, move |mut request: Request, _ctx: Context| async move {
            let seen = request.payload["seen"].as_array().cloned().unwrap_or_default();
            let mut seen = seen;
            seen.push(json!(name));
            request.payload["seen"] = Value::Array(seen);
            Ok::<_, AnankeError>(request)
        }))
    }

    fn failing(name: &'static str) -> PreMiddleware {
        Arc::new(FnMiddleware::new(name, |_request: Request, _ctx: Context| async {
            Err::<Request, _>(AnankeError::forbidden("nope"))
        }))
    }

    #[tokio::test]
    async fn test_reduce_is_a_left_fold() {
        let steps = vec![append("f1"), append("f2")];
        let request = reduce(&steps, Request::new(json!({})), &Context::new())
            .await
            .unwrap();
        assert_eq!(request.payload["seen"], json!(["f1", "f2"]));
    }

    #[tokio::test]
    async fn test_reduce_aborts_on_error() {
        let steps = vec![append("f1"), failing("guard"), append("f3")];
        let error = reduce(&steps, Request::new(json!({})), &Context::new())
            .await
            .unwrap_err();
        assert_eq!(error.status_code().as_u16(), 403);
    }

    #[tokio::test]
    async fn test_reduce_carrying_errors_hands_error_on() {
        let fail: PostMiddleware = Arc::new(FnMiddleware::new(
            "fail",
            |_outcome: Outcome, _ctx: Context| async {
                Err::<Outcome, _>(AnankeError::internal("post failed"))
            },
        ));
        let recover: PostMiddleware = Arc::new(FnMiddleware::new(
            "recover",
            |outcome: Outcome, _ctx: Context| async move {
                Ok::<_, AnankeError>(match outcome {
                    Outcome::Failure(error) => Outcome::Success(json!({ "recovered": error.to_string() })),
                    success => success,
                })
            },
        ));

        let outcome = reduce_carrying_errors(
            &[fail, recover],
            Outcome::Success(json!(1)),
            &Context::new(),
        )
        .await;
        assert_eq!(outcome.into_result().unwrap()["recovered"], "post failed");
    }

    #[tokio::test]
    async fn test_empty_chain_is_identity() {
        let value = reduce::<Request>(&[], Request::new(json!({ "a": 1 })), &Context::new())
            .await
            .unwrap();
        assert_eq!(value.payload, json!({ "a": 1 }));
    }

    proptest! {
        #[test]
        fn prop_reduce_preserves_declared_order(names in proptest::collection::vec("[a-z]{1,6}", 0..8)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let steps: Vec<PreMiddleware> = names
                .iter()
                .map(|name| {
                    let name = name.clone();
                    Arc::new(FnMiddleware::new(name.clone(), move |mut request: Request, _ctx: Context| {
                        let name = name.clone();
                        async move {
                            let mut seen = request.payload["seen"].as_array().cloned().unwrap_or_default();
                            seen.push(json!(name));
                            request.payload["seen"] = Value::Array(seen);
                            Ok::<_, AnankeError>(request)
                        }
                    })) as PreMiddleware
                })
                .collect();

            let request = runtime
                .block_on(reduce(&steps, Request::new(json!({ "seen": [] })), &Context::new()))
                .unwrap();
            let expected: Vec<Value> = names.iter().map(|name| json!(name)).collect();
            prop_assert_eq!(request.payload["seen"].clone(), Value::Array(expected));
        }
    }
}
