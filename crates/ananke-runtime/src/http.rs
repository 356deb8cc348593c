//! Pieces shared by the HTTP-flavored variants (REST and RPC).

use std::sync::Arc;

use ananke_core::{AnankeError, Context, ContextResolver, GatewayEvent, HandlerOptions, Request, Responder};
use ananke_middleware::MiddlewareChain;
use serde_json::Value;

use crate::handler::HandlerCore;
use crate::runtime::Runtime;

/// Handler state plus the handler-level middleware chain.
pub(crate) struct HttpCore {
    pub(crate) core: HandlerCore,
    pub(crate) chain: Arc<MiddlewareChain>,
}

impl HttpCore {
    pub(crate) fn new(runtime: Runtime, name: impl Into<String>, options: HandlerOptions) -> Self {
        let chain = MiddlewareChain::from_names(
            Arc::clone(runtime.middleware()),
            &options.pre_middleware,
            &options.post_middleware,
        );
        Self {
            core: HandlerCore::new(runtime, name, options),
            chain: Arc::new(chain),
        }
    }

    pub(crate) fn set_context(&mut self, resolver: Arc<ContextResolver>) {
        self.core.set_context(resolver);
    }

    pub(crate) fn options(&self) -> &HandlerOptions {
        self.core.options()
    }

    /// Runs the configured authenticator, if any, against the event.
    pub(crate) async fn principal(
        &self,
        ctx: &Context,
        event: &Arc<GatewayEvent>,
    ) -> Result<Option<String>, AnankeError> {
        match self.options().authenticator.as_deref() {
            Some(name) => {
                self.core
                    .runtime()
                    .authenticators()
                    .resolve_principal(name, ctx, event)
                    .await
            }
            None => Ok(None),
        }
    }

    /// Builds the request threaded through pre-middleware.
    pub(crate) fn request(payload: Value, principal: Option<String>, event: &GatewayEvent) -> Request {
        Request::new(payload)
            .with_headers(event.headers.clone())
            .with_transport(event.request_context.clone())
            .with_principal(principal)
    }

    /// Logs and renders a failure.
    pub(crate) fn fail(&self, error: &AnankeError) -> Responder {
        self.core.log_failure(error);
        Responder::from_error(error, self.core.expose_internal())
    }
}
