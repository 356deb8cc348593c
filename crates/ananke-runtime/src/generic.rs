//! The generic variant: a direct call-through with the resolved context.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use ananke_core::{AnankeError, BoxFuture, Context, ContextResolver, HandlerOptions};

use crate::handler::{Handler, HandlerCore};
use crate::runtime::Runtime;

type GenericRunner<Ev, Out> =
    Arc<dyn Fn(Ev, Context, Arc<HandlerOptions>) -> BoxFuture<'static, Result<Out, AnankeError>> + Send + Sync>;

/// Runs application code with the event, the context and the handler options.
///
/// No HTTP shaping, validation or middleware is applied.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, HandlerOptions};
/// use ananke_runtime::{Generic, Handler, Runtime};
///
/// # tokio_test::block_on(async {
/// let handler = Generic::new(
///     Runtime::builder().build(),
///     "double",
///     HandlerOptions::default(),
///     |n: u32, _ctx: Context, _options: Arc<HandlerOptions>| async move {
///         Ok::<_, AnankeError>(n * 2)
///     },
/// );
///
/// assert_eq!(handler.exec(21).await.unwrap(), 42);
/// # });
/// ```
pub struct Generic<Ev, Out> {
    core: HandlerCore,
    runner: GenericRunner<Ev, Out>,
}

impl<Ev, Out> Generic<Ev, Out>
where
    Ev: Send + 'static,
    Out: Send + 'static,
{
    /// Creates a generic handler.
    pub fn new<F, Fut, E>(runtime: Runtime, name: impl Into<String>, options: HandlerOptions, runner: F) -> Self
    where
        F: Fn(Ev, Context, Arc<HandlerOptions>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, E>> + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        let runner: GenericRunner<Ev, Out> = Arc::new(move |event, ctx, options| {
            let fut = runner(event, ctx, options);
            Box::pin(async move { fut.await.map_err(Into::into) })
        });
        Self {
            core: HandlerCore::new(runtime, name, options),
            runner,
        }
    }

    /// Uses `resolver` instead of the runtime's shared context.
    #[must_use]
    pub fn with_context(mut self, resolver: Arc<ContextResolver>) -> Self {
        self.core.set_context(resolver);
        self
    }
}

impl<Ev, Out> Handler for Generic<Ev, Out>
where
    Ev: Send + 'static,
    Out: Send + 'static,
{
    type Event = Ev;
    type Output = Result<Out, AnankeError>;

    async fn exec(&self, event: Ev) -> Result<Out, AnankeError> {
        let started = Instant::now();
        let result = match self.core.context().await {
            Ok(ctx) => (self.runner)(event, ctx, Arc::clone(self.core.options())).await,
            Err(error) => Err(error),
        };

        let status = match &result {
            Ok(_) => 200,
            Err(error) => {
                self.core.log_failure(error);
                error.status_code().as_u16()
            }
        };
        self.core.record(started, status);
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ananke_core::Logger;

    use super::*;

    #[tokio::test]
    async fn test_runner_sees_context_and_options() {
        let resolver = ContextResolver::builder(Logger::new("jobs"))
            .value("Region", Arc::new("eu-west-1".to_string()))
            .build();
        let runtime = Runtime::builder().context(resolver).build();

        let handler = Generic::new(
            runtime,
            "report",
            HandlerOptions::new().require_auth(true),
            |prefix: String, ctx: Context, options: Arc<HandlerOptions>| async move {
                let region: Arc<String> = ctx.require("Region")?;
                Ok::<_, AnankeError>(format!("{prefix}:{region}:{}", options.require_auth))
            },
        );

        assert_eq!(handler.exec("run".to_string()).await.unwrap(), "run:eu-west-1:true");
    }

    #[tokio::test]
    async fn test_context_failure_is_sticky() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let resolver = ContextResolver::builder(Logger::new("jobs"))
            .inject("Database", move |_ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(anyhow::anyhow!("connection refused")) }
            })
            .build();
        let runtime = Runtime::builder().context(resolver).build();

        let handler = Generic::new(
            runtime,
            "report",
            HandlerOptions::default(),
            |_: (), _ctx: Context, _options: Arc<HandlerOptions>| async { Ok::<_, AnankeError>(()) },
        );

        for _ in 0..3 {
            let error = handler.exec(()).await.unwrap_err();
            assert!(matches!(error, AnankeError::ContextResolution(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
