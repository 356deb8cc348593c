//! The capability every handler variant implements, and the pieces they share.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use ananke_core::{
    AnankeError, BoxFuture, Context, ContextResolver, GatewayEvent, HandlerOptions, Logger,
    Request,
};
use ananke_telemetry::{record_invocation, InvocationOutcome};
use serde::Serialize;
use serde_json::Value;

use crate::runtime::Runtime;

/// A handler turns one inbound event into one outbound result.
///
/// Variants share behavior by holding the runtime and helper components,
/// not by inheriting from each other.
pub trait Handler: Send + Sync + 'static {
    /// The inbound event.
    type Event: Send;
    /// What the invoker receives back.
    type Output: Send;

    /// Handles one event.
    fn exec(&self, event: Self::Event) -> impl Future<Output = Self::Output> + Send;
}

/// A type-erased REST runner or RPC method.
pub type HttpRunner =
    Arc<dyn Fn(Request, Context, Arc<GatewayEvent>) -> BoxFuture<'static, Result<Value, AnankeError>> + Send + Sync>;

/// Erases an async function into an [`HttpRunner`].
///
/// The function may return any serializable value and any error that
/// converts into an [`AnankeError`], including `anyhow::Error`.
pub fn http_runner<F, Fut, T, E>(func: F) -> HttpRunner
where
    F: Fn(Request, Context, Arc<GatewayEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Serialize + Send + 'static,
    E: Into<AnankeError> + 'static,
{
    Arc::new(move |request, ctx, event| {
        let fut = func(request, ctx, event);
        Box::pin(async move { to_json(fut.await.map_err(Into::into)?) })
    })
}

pub(crate) fn to_json<T: Serialize>(value: T) -> Result<Value, AnankeError> {
    serde_json::to_value(value)
        .map_err(|e| AnankeError::internal_with_source("Result could not be serialized", e))
}

/// State every handler variant holds: its name, options, the runtime and an
/// optional context override.
#[derive(Clone)]
pub(crate) struct HandlerCore {
    name: Arc<str>,
    runtime: Runtime,
    options: Arc<HandlerOptions>,
    context: Option<Arc<ContextResolver>>,
}

impl HandlerCore {
    pub(crate) fn new(runtime: Runtime, name: impl Into<String>, options: HandlerOptions) -> Self {
        Self {
            name: Arc::from(name.into()),
            runtime,
            options: Arc::new(options),
            context: None,
        }
    }

    pub(crate) fn set_context(&mut self, resolver: Arc<ContextResolver>) {
        self.context = Some(resolver);
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) const fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn options(&self) -> &Arc<HandlerOptions> {
        &self.options
    }

    fn resolver(&self) -> &Arc<ContextResolver> {
        self.context.as_ref().unwrap_or_else(|| self.runtime.resolver())
    }

    pub(crate) fn logger(&self) -> &Logger {
        self.resolver().logger()
    }

    pub(crate) fn expose_internal(&self) -> bool {
        self.runtime.expose_internal_errors()
    }

    /// Resolves the handler's context; failures are sticky per resolver.
    pub(crate) async fn context(&self) -> Result<Context, AnankeError> {
        self.resolver().resolve().await.map_err(|error| {
            tracing::error!(handler = %self.name, error = %error, "Context could not be resolved");
            AnankeError::from(error)
        })
    }

    /// Logs a failed request by origin: server errors at error, client
    /// errors at debug severity.
    pub(crate) fn log_failure(&self, error: &AnankeError) {
        if error.is_server() {
            tracing::error!(
                handler = %self.name,
                status = error.status_code().as_u16(),
                error = %error,
                "Finished request with server error"
            );
        } else {
            tracing::debug!(
                handler = %self.name,
                status = error.status_code().as_u16(),
                error = %error,
                "Finished request with client error"
            );
        }
    }

    pub(crate) fn record(&self, started: Instant, status: u16) {
        record_invocation(&self.name, InvocationOutcome::from_status(status), started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_http_runner_serializes_results() {
        let runner = http_runner(|request: Request, _ctx: Context, _event: Arc<GatewayEvent>| async move {
            Ok::<_, AnankeError>(vec![request.payload])
        });

        let value = runner(
            Request::new(serde_json::json!(1)),
            Context::new(),
            Arc::new(GatewayEvent::default()),
        )
        .await
        .unwrap();
        assert_eq!(value, serde_json::json!([1]));
    }

    #[tokio::test]
    async fn test_http_runner_boomifies_anyhow_errors() {
        let runner = http_runner(|_request: Request, _ctx: Context, _event: Arc<GatewayEvent>| async move {
            Err::<Value, _>(anyhow::anyhow!("boom"))
        });

        let error = runner(Request::default(), Context::new(), Arc::new(GatewayEvent::default()))
            .await
            .unwrap_err();
        assert!(error.is_server());
    }

    #[tokio::test]
    async fn test_context_override_wins() {
        let runtime = Runtime::builder()
            .context(ContextResolver::empty(Logger::new("shared")))
            .build();
        let mut core = HandlerCore::new(runtime, "users", HandlerOptions::default());
        assert_eq!(core.logger().service(), "shared");

        core.set_context(Arc::new(ContextResolver::empty(Logger::new("own"))));
        let ctx = core.context().await.unwrap();
        assert_eq!(ctx.logger().service(), "own");
        assert_eq!(core.logger().service(), "own");
    }
}
