//! The RPC variant: JSON-RPC style envelopes, dispatched to registered methods.
//!
//! A body holds one envelope or an array of them. Every envelope is served
//! independently and concurrently; a failing call becomes an error object in
//! its slot of the response, never an aborted batch.
//!
//! | Body | Response body |
//! |---|---|
//! | one envelope | one response object |
//! | array of one envelope | one response object |
//! | array of `n` envelopes | array of `n` responses, in input order |
//! | `[]` | `[]` |
//! | invalid | one error object with `id: null`, status 400 |

mod envelope;
mod method;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ananke_core::{
    AnankeError, Context, ContextResolver, Envelope, GatewayEvent, GatewayResponse, HandlerOptions,
    Outcome, Request, Responder,
};
use ananke_middleware::MiddlewareChain;
use ananke_validation::{CompileError, ParamsValidator};
use futures_util::future::join_all;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::Instrument;

pub use method::{Method, MethodTable};
pub use registry::MethodRegistry;

use self::envelope::{envelope_validator, Batch, RpcResponse};
use crate::handler::Handler;
use crate::http::HttpCore;
use crate::runtime::Runtime;

/// Dispatches RPC envelopes to the methods of a [`MethodRegistry`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, GatewayEvent, HandlerOptions, Request};
/// use ananke_runtime::{Handler, MethodRegistry, MethodTable, Rpc, Runtime};
///
/// # tokio_test::block_on(async {
/// let methods = MethodTable::new()
///     .method("hello.world", |request: Request, _: Context, _: Arc<GatewayEvent>| async move {
///         let name = request.payload["name"].as_str().unwrap_or_default().to_string();
///         Ok::<_, AnankeError>(format!("Hello world {name}"))
///     })
///     .unwrap();
///
/// let rpc = Rpc::new(
///     Runtime::builder().build(),
///     "api",
///     HandlerOptions::default(),
///     Arc::new(MethodRegistry::new(methods)),
/// )
/// .unwrap();
///
/// let response = rpc
///     .exec(GatewayEvent {
///         body: Some(r#"{"id":"11111111-1111-1111-1111-111111111111","jsonrpc":"2.0","method":"hello.world","params":{}}"#.to_string()),
///         ..Default::default()
///     })
///     .await;
///
/// assert_eq!(response.status_code, 200);
/// # });
/// ```
pub struct Rpc {
    http: HttpCore,
    registry: Arc<MethodRegistry>,
    envelope: ParamsValidator,
    chains: Mutex<HashMap<String, Arc<MiddlewareChain>>>,
}

impl Rpc {
    /// Creates an RPC handler.
    ///
    /// Handler options supply the authenticator and the default middleware;
    /// a method's own middleware lists replace the defaults when present.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if the envelope rules fail to compile.
    pub fn new(
        runtime: Runtime,
        name: impl Into<String>,
        options: HandlerOptions,
        registry: Arc<MethodRegistry>,
    ) -> Result<Self, CompileError> {
        Ok(Self {
            http: HttpCore::new(runtime, name, options),
            registry,
            envelope: envelope_validator()?,
            chains: Mutex::new(HashMap::new()),
        })
    }

    /// Uses `resolver` instead of the runtime's shared context.
    #[must_use]
    pub fn with_context(mut self, resolver: Arc<ContextResolver>) -> Self {
        self.http.set_context(resolver);
        self
    }

    /// Returns the method registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }

    /// The middleware chain of a method, cached per method name.
    ///
    /// Only registered methods reach this, so the cache is bounded by the table.
    fn chain(&self, method: &Method) -> Arc<MiddlewareChain> {
        let options = method.options();
        if options.pre_middleware.is_none() && options.post_middleware.is_none() {
            return Arc::clone(&self.http.chain);
        }

        let mut chains = self.chains.lock();
        let chain = chains.entry(method.name().to_string()).or_insert_with(|| {
            let defaults = self.http.options();
            Arc::new(MiddlewareChain::from_names(
                Arc::clone(self.http.core.runtime().middleware()),
                options.pre_middleware.as_ref().unwrap_or(&defaults.pre_middleware),
                options.post_middleware.as_ref().unwrap_or(&defaults.post_middleware),
            ))
        });
        Arc::clone(chain)
    }

    async fn handle(&self, event: Arc<GatewayEvent>) -> Responder {
        let batch = event
            .json_body()
            .map_err(|e| AnankeError::bad_request(format!("Request body is not valid JSON: {e}")))
            .and_then(|body| Batch::parse(&self.envelope, &body));

        let batch = match batch {
            Ok(batch) => batch,
            Err(error) => {
                self.http.core.log_failure(&error);
                let body = RpcResponse::failure(Value::Null, &error, self.http.core.expose_internal());
                return Responder::new(body.into_value(), StatusCode::BAD_REQUEST);
            }
        };

        let single = matches!(batch, Batch::Single(_));
        let envelopes = batch.into_envelopes();

        let ctx = self.http.core.context().await.map_err(Arc::new);

        let mut results = join_all(envelopes.into_iter().map(|envelope| {
            let ctx = ctx.clone();
            let event = Arc::clone(&event);
            async move {
                match ctx {
                    Ok(ctx) => self.call(envelope, &ctx, &event).await,
                    Err(error) => {
                        RpcResponse::failure(Value::String(envelope.id), &error, self.http.core.expose_internal())
                            .into_value()
                    }
                }
            }
        }))
        .await;

        if single || results.len() == 1 {
            Responder::ok(results.pop().unwrap_or(Value::Null))
        } else {
            Responder::ok(Value::Array(results))
        }
    }

    async fn call(&self, envelope: Envelope, ctx: &Context, event: &Arc<GatewayEvent>) -> Value {
        let span = ctx.logger().child(&envelope.id);
        async {
            tracing::debug!(method = %envelope.method, "Starting RPC request");
            let id = Value::String(envelope.id.clone());

            let method = self.registry.resolve_method(&envelope).await;
            let outcome = if method.is_stand_in() {
                // No authentication or middleware for a method that cannot run.
                let request = Request::new(Value::Null).with_envelope(envelope);
                Outcome::from(method.call(request, ctx.clone(), Arc::clone(event)).await)
            } else {
                let chain = self.chain(&method);
                let outcome = Outcome::from(self.invoke(&method, &chain, envelope, ctx, event).await);
                chain.run_post(outcome, ctx).await
            };

            match outcome {
                Outcome::Success(result) => {
                    tracing::debug!("Finished request successfully");
                    RpcResponse::success(id, result).into_value()
                }
                Outcome::Failure(error) => {
                    self.http.core.log_failure(&error);
                    RpcResponse::failure(id, &error, self.http.core.expose_internal()).into_value()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn invoke(
        &self,
        method: &Method,
        chain: &MiddlewareChain,
        envelope: Envelope,
        ctx: &Context,
        event: &Arc<GatewayEvent>,
    ) -> Result<Value, AnankeError> {
        let params = method.validate(&envelope.params_or_default())?;
        let principal = self.http.principal(ctx, event).await?;
        let request = HttpCore::request(params, principal, event).with_envelope(envelope);
        let request = chain.run_pre(request, ctx).await?;

        if method.options().require_auth && request.principal().is_none() {
            return Err(AnankeError::unauthorized(format!(
                "RPC method {} requires authentication",
                method.name()
            )));
        }

        method.call(request, ctx.clone(), Arc::clone(event)).await
    }
}

impl Handler for Rpc {
    type Event = GatewayEvent;
    type Output = GatewayResponse;

    async fn exec(&self, event: GatewayEvent) -> GatewayResponse {
        let started = Instant::now();
        let responder = self.handle(Arc::new(event)).await;
        self.http.core.record(started, responder.status_code.as_u16());
        responder.to_gateway()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use ananke_core::{MethodOptions, Request};
    use ananke_middleware::MiddlewareRegistry;
    use serde_json::json;

    use super::*;

    const ID_1: &str = "11111111-1111-1111-1111-111111111111";
    const ID_2: &str = "22222222-2222-2222-2222-222222222222";

    fn methods() -> MethodTable {
        MethodTable::new()
            .method_with_options(
                "hello.world",
                MethodOptions::new().validate("name", "string().required()"),
                |request: Request, _: Context, _: Arc<GatewayEvent>| async move {
                    Ok::<_, AnankeError>(format!(
                        "Hello world {}",
                        request.payload["name"].as_str().unwrap_or_default()
                    ))
                },
            )
            .unwrap()
            .method("slow", |_: Request, _: Context, _: Arc<GatewayEvent>| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, AnankeError>("slow")
            })
            .unwrap()
            .method_with_options(
                "secret",
                MethodOptions::new().require_auth(true),
                |_: Request, _: Context, _: Arc<GatewayEvent>| async { Ok::<_, AnankeError>("secret") },
            )
            .unwrap()
            .method_with_options(
                "audited",
                MethodOptions::new().pre_middleware(["stamp"]),
                |request: Request, _: Context, _: Arc<GatewayEvent>| async move {
                    Ok::<_, AnankeError>(request.payload)
                },
            )
            .unwrap()
            .method_with_options(
                "open",
                MethodOptions::new()
                    .pre_middleware(Vec::<String>::new())
                    .post_middleware(Vec::<String>::new()),
                |_: Request, _: Context, _: Arc<GatewayEvent>| async { Ok::<_, AnankeError>("open") },
            )
            .unwrap()
    }

    fn rpc(runtime: Runtime) -> Rpc {
        Rpc::new(runtime, "api", HandlerOptions::default(), Arc::new(MethodRegistry::new(methods()))).unwrap()
    }

    fn event(body: &Value) -> GatewayEvent {
        GatewayEvent {
            body: Some(body.to_string()),
            http_method: "POST".to_string(),
            path: "/rpc".to_string(),
            ..Default::default()
        }
    }

    fn call(id: &str, method: &str, params: Value) -> Value {
        json!({ "id": id, "jsonrpc": "2.0", "method": method, "params": params })
    }

    async fn exec(rpc: &Rpc, body: &Value) -> (u16, Value) {
        let response = rpc.exec(event(body)).await;
        (response.status_code, serde_json::from_str(&response.body).unwrap())
    }

    #[tokio::test]
    async fn test_single_envelope_is_a_bare_object() {
        let (status, body) = exec(
            &rpc(Runtime::builder().build()),
            &call(ID_1, "hello.world", json!({ "name": "Ada" })),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "id": ID_1, "jsonrpc": "2.0", "result": "Hello world Ada" }));
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order() {
        let (_, body) = exec(
            &rpc(Runtime::builder().build()),
            &json!([
                call(ID_1, "slow", json!({})),
                call(ID_2, "hello.world", json!({ "name": "Bo" })),
            ]),
        )
        .await;
        assert_eq!(body[0]["id"], ID_1);
        assert_eq!(body[0]["result"], "slow");
        assert_eq!(body[1]["id"], ID_2);
        assert_eq!(body[1]["result"], "Hello world Bo");
    }

    #[tokio::test]
    async fn test_one_element_batch_unwraps() {
        let (_, body) = exec(
            &rpc(Runtime::builder().build()),
            &json!([call(ID_1, "hello.world", json!({ "name": "Ada" }))]),
        )
        .await;
        assert!(body.is_object());
        assert_eq!(body["result"], "Hello world Ada");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (status, body) = exec(&rpc(Runtime::builder().build()), &json!([])).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_failures_stay_in_their_slot() {
        let (status, body) = exec(
            &rpc(Runtime::builder().build()),
            &json!([
                call(ID_1, "missing", json!({})),
                call(ID_2, "hello.world", json!({})),
                call(ID_1, "hello.world", json!({ "name": "Cy" })),
            ]),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(
            body[0]["error"],
            json!({ "code": 404, "message": "Method missing does not exist" })
        );
        assert_eq!(body[1]["error"]["code"], 400);
        assert_eq!(body[2]["result"], "Hello world Cy");
    }

    #[tokio::test]
    async fn test_invalid_body_is_400_with_null_id() {
        let (status, body) = exec(
            &rpc(Runtime::builder().build()),
            &json!({ "id": "nope", "jsonrpc": "2.0", "method": "hello.world" }),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["id"], Value::Null);
        assert_eq!(body["error"]["code"], 400);
    }

    #[tokio::test]
    async fn test_method_require_auth() {
        let (_, body) = exec(&rpc(Runtime::builder().build()), &call(ID_1, "secret", json!({}))).await;
        assert_eq!(body["error"]["code"], 401);
        assert_eq!(body["error"]["message"], "RPC method secret requires authentication");
    }

    #[tokio::test]
    async fn test_authenticator_runs_for_each_envelope() {
        let runtime = Runtime::builder()
            .authenticator(
                "bearer",
                Arc::new(crate::FnAuthenticator::new(
                    |header: Option<String>, _: Context, _: Arc<GatewayEvent>| async move {
                        Ok::<_, AnankeError>(header)
                    },
                )),
            )
            .build();
        let rpc = Rpc::new(
            runtime,
            "api",
            HandlerOptions::new().authenticator("bearer"),
            Arc::new(MethodRegistry::new(methods())),
        )
        .unwrap();

        let mut event = event(&json!([call(ID_1, "secret", json!({})), call(ID_2, "secret", json!({}))]));
        event
            .headers
            .insert("Authorization".to_string(), "user-1".to_string());
        let response = rpc.exec(event).await;
        let body: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(body[0]["result"], "secret");
        assert_eq!(body[1]["result"], "secret");
    }

    #[tokio::test]
    async fn test_method_middleware_overrides_handler_defaults() {
        let registry = MiddlewareRegistry::new()
            .pre_fn("stamp", |mut request: Request, _: Context| async move {
                request.payload = json!({ "stamped": true });
                Ok::<_, AnankeError>(request)
            })
            .pre_fn("deny", |_: Request, _: Context| async {
                Err::<Request, _>(AnankeError::forbidden("denied"))
            });
        let rpc = Rpc::new(
            Runtime::builder().middleware(registry).build(),
            "api",
            HandlerOptions::new().pre_middleware("deny"),
            Arc::new(MethodRegistry::new(methods())),
        )
        .unwrap();

        let (_, body) = exec(&rpc, &call(ID_1, "audited", json!({}))).await;
        assert_eq!(body["result"], json!({ "stamped": true }));

        let (_, body) = exec(&rpc, &call(ID_1, "hello.world", json!({ "name": "Ada" }))).await;
        assert_eq!(body["error"]["code"], 403);

        // Unknown methods skip middleware entirely.
        let (_, body) = exec(&rpc, &call(ID_1, "missing", json!({}))).await;
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn test_unknown_method_answers_before_authentication() {
        let runtime = Runtime::builder()
            .authenticator(
                "bearer",
                Arc::new(crate::FnAuthenticator::new(
                    |_: Option<String>, _: Context, _: Arc<GatewayEvent>| async {
                        Err::<Option<String>, _>(AnankeError::unauthorized("bad token"))
                    },
                )),
            )
            .build();
        let rpc = Rpc::new(
            runtime,
            "api",
            HandlerOptions::new().authenticator("bearer"),
            Arc::new(MethodRegistry::new(methods())),
        )
        .unwrap();

        let (status, body) = exec(
            &rpc,
            &json!([call(ID_1, "nope", json!({})), call(ID_2, "hello.world", json!({ "name": "Ada" }))]),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body[0]["error"], json!({ "code": 404, "message": "Method nope does not exist" }));
        assert_eq!(body[1]["error"], json!({ "code": 401, "message": "bad token" }));
    }

    #[tokio::test]
    async fn test_unknown_method_ignores_missing_authenticator() {
        let rpc = Rpc::new(
            Runtime::builder().build(),
            "api",
            HandlerOptions::new().authenticator("unregistered"),
            Arc::new(MethodRegistry::new(methods())),
        )
        .unwrap();

        let (_, body) = exec(&rpc, &call(ID_1, "nope", json!({}))).await;
        assert_eq!(body["error"]["code"], 404);
        assert_eq!(body["error"]["message"], "Method nope does not exist");
    }

    #[tokio::test]
    async fn test_chains_are_cached_per_registered_method() {
        let rpc = rpc(Runtime::builder().build());
        let registry = Arc::clone(rpc.registry());

        let open = registry.resolve_method(&Envelope::new(ID_1, "open", json!({}))).await;
        assert!(Arc::ptr_eq(&rpc.chain(&open), &rpc.chain(&open)));

        let audited = registry.resolve_method(&Envelope::new(ID_1, "audited", json!({}))).await;
        assert!(Arc::ptr_eq(&rpc.chain(&audited), &rpc.chain(&audited)));

        let hello = registry.resolve_method(&Envelope::new(ID_1, "hello.world", json!({}))).await;
        assert!(Arc::ptr_eq(&rpc.chain(&hello), &rpc.http.chain));
        assert_eq!(rpc.chains.lock().len(), 2);

        for name in ["missing", "also.missing"] {
            let (_, body) = exec(&rpc, &call(ID_1, name, json!({}))).await;
            assert_eq!(body["error"]["code"], 404);
        }
        assert_eq!(rpc.chains.lock().len(), 2);
    }
}
