//! The REST variant: one HTTP request, one response.
//!
//! ```text
//! received ─▶ validating ─▶ context ─▶ authenticating ─▶ pre ─▶ runner ─▶ post ─▶ responding
//!     └──────────────── any failure ─▶ post (carrying the error) ─▶ normalize ─┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use ananke_core::{
    AnankeError, Context, ContextResolver, GatewayEvent, GatewayResponse, HandlerOptions, Outcome,
    Request, RequestId, Responder,
};
use ananke_validation::{CompileError, ParamsValidator};
use serde::Serialize;
use serde_json::Value;
use tracing::Instrument;

use crate::handler::{http_runner, Handler, HttpRunner};
use crate::http::HttpCore;
use crate::runtime::Runtime;

/// Handles a single HTTP request.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, GatewayEvent, HandlerOptions, Request};
/// use ananke_runtime::{Handler, Rest, Runtime};
///
/// # tokio_test::block_on(async {
/// let rest = Rest::new(
///     Runtime::builder().build(),
///     "create-user",
///     HandlerOptions::new().validate("name", "string().required()"),
///     |request: Request, _ctx: Context, _event: Arc<GatewayEvent>| async move {
///         Ok::<_, AnankeError>(request.payload)
///     },
/// )
/// .unwrap();
///
/// let response = rest
///     .exec(GatewayEvent {
///         body: Some(r#"{"name":"Ada","extra":1}"#.to_string()),
///         http_method: "POST".to_string(),
///         path: "/users".to_string(),
///         ..Default::default()
///     })
///     .await;
///
/// assert_eq!(response.status_code, 200);
/// assert_eq!(response.body, r#"{"name":"Ada"}"#);
/// # });
/// ```
pub struct Rest {
    http: HttpCore,
    validator: ParamsValidator,
    runner: HttpRunner,
}

impl Rest {
    /// Creates a REST handler.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if a validation rule is malformed.
    pub fn new<F, Fut, T, E>(
        runtime: Runtime,
        name: impl Into<String>,
        options: HandlerOptions,
        runner: F,
    ) -> Result<Self, CompileError>
    where
        F: Fn(Request, Context, Arc<GatewayEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        let validator = ParamsValidator::new(&options.validation)?;
        Ok(Self {
            http: HttpCore::new(runtime, name, options),
            validator,
            runner: http_runner(runner),
        })
    }

    /// Uses `resolver` instead of the runtime's shared context.
    #[must_use]
    pub fn with_context(mut self, resolver: Arc<ContextResolver>) -> Self {
        self.http.set_context(resolver);
        self
    }

    async fn handle(&self, event: Arc<GatewayEvent>) -> Responder {
        tracing::debug!(path = %event.path, method = %event.http_method, "Starting REST request");

        let validated = event
            .json_body()
            .map_err(|e| AnankeError::bad_request(format!("Request body is not valid JSON: {e}")))
            .and_then(|body| self.validator.check(&body));

        let ctx = match self.http.core.context().await {
            Ok(ctx) => ctx,
            Err(error) => return self.http.fail(&error),
        };

        let outcome = match validated {
            Ok(payload) => Outcome::from(self.invoke(payload, &ctx, &event).await),
            Err(error) => Outcome::Failure(error),
        };

        match self.http.chain.run_post(outcome, &ctx).await {
            Outcome::Success(value) => {
                tracing::debug!(path = %event.path, method = %event.http_method, "Finished request successfully");
                Responder::ok(value)
            }
            Outcome::Failure(error) => self.http.fail(&error),
        }
    }

    async fn invoke(
        &self,
        payload: Value,
        ctx: &Context,
        event: &Arc<GatewayEvent>,
    ) -> Result<Value, AnankeError> {
        let principal = self.http.principal(ctx, event).await?;
        let request = HttpCore::request(payload, principal, event);
        let request = self.http.chain.run_pre(request, ctx).await?;

        if self.http.options().require_auth && request.principal().is_none() {
            return Err(AnankeError::unauthorized(format!(
                "REST endpoint {} {} requires authentication",
                event.http_method.to_uppercase(),
                event.path
            )));
        }

        (self.runner)(request, ctx.clone(), Arc::clone(event)).await
    }
}

impl Handler for Rest {
    type Event = GatewayEvent;
    type Output = GatewayResponse;

    async fn exec(&self, event: GatewayEvent) -> GatewayResponse {
        let started = Instant::now();
        let request_id = RequestId::new().to_string();
        let span = self.http.core.logger().child(&request_id);

        let responder = self.handle(Arc::new(event)).instrument(span).await;

        self.http.core.record(started, responder.status_code.as_u16());
        responder.to_gateway()
    }
}
