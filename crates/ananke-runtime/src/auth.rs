//! Principal resolution.
//!
//! An [`Authenticator`] turns the raw `Authorization` header into a
//! principal id. The runtime only decides where it is invoked and what
//! happens when it fails; the authentication scheme itself is up to the
//! application.

use std::future::Future;
use std::sync::Arc;

use ananke_core::{AnankeError, BoxFuture, Context, GatewayEvent};
use indexmap::IndexMap;

/// Resolves the principal of an HTTP-flavored request.
///
/// Returning `Ok(None)` (or an empty id) means the caller is anonymous.
pub trait Authenticator: Send + Sync + 'static {
    /// Authenticates a request.
    fn authenticate<'a>(
        &'a self,
        authorization: Option<&'a str>,
        ctx: &'a Context,
        event: &'a Arc<GatewayEvent>,
    ) -> BoxFuture<'a, Result<Option<String>, AnankeError>>;
}

/// An authenticator backed by an async function.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, GatewayEvent};
/// use ananke_runtime::FnAuthenticator;
///
/// let bearer = FnAuthenticator::new(
///     |header: Option<String>, _ctx: Context, _event: Arc<GatewayEvent>| async move {
///         Ok::<_, AnankeError>(header.and_then(|h| h.strip_prefix("Bearer ").map(String::from)))
///     },
/// );
/// # let _ = bearer;
/// ```
pub struct FnAuthenticator<F> {
    func: F,
}

impl<F> FnAuthenticator<F> {
    /// Wraps an async function.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut, E> Authenticator for FnAuthenticator<F>
where
    F: Fn(Option<String>, Context, Arc<GatewayEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<String>, E>> + Send + 'static,
    E: Into<AnankeError> + 'static,
{
    fn authenticate<'a>(
        &'a self,
        authorization: Option<&'a str>,
        ctx: &'a Context,
        event: &'a Arc<GatewayEvent>,
    ) -> BoxFuture<'a, Result<Option<String>, AnankeError>> {
        let fut = (self.func)(
            authorization.map(ToString::to_string),
            ctx.clone(),
            Arc::clone(event),
        );
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

/// Authenticators registered by name.
#[derive(Clone, Default)]
pub struct AuthenticatorRegistry {
    entries: IndexMap<String, Arc<dyn Authenticator>>,
}

impl AuthenticatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an authenticator.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, authenticator: Arc<dyn Authenticator>) -> Self {
        self.entries.insert(name.into(), authenticator);
        self
    }

    /// Registers an async function as authenticator.
    #[must_use]
    pub fn register_fn<F, Fut, E>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Option<String>, Context, Arc<GatewayEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, E>> + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        self.register(name, Arc::new(FnAuthenticator::new(func)))
    }

    /// Looks up an authenticator.
    ///
    /// An unknown name is a configuration defect and yields an internal error.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Authenticator>, AnankeError> {
        self.entries
            .get(name)
            .ok_or_else(|| AnankeError::internal(format!("Authenticator {name} does not exist")))
    }

    /// Runs the named authenticator against an event.
    ///
    /// Empty principal ids are treated as anonymous.
    pub async fn resolve_principal(
        &self,
        name: &str,
        ctx: &Context,
        event: &Arc<GatewayEvent>,
    ) -> Result<Option<String>, AnankeError> {
        let authenticator = self.get(name)?;
        let principal = authenticator
            .authenticate(event.authorization(), ctx, event)
            .await?;
        Ok(principal.filter(|id| !id.is_empty()))
    }

    /// Returns the registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn registry() -> AuthenticatorRegistry {
        AuthenticatorRegistry::new().register_fn(
            "bearer",
            |header: Option<String>, _ctx: Context, _event: Arc<GatewayEvent>| async move {
                match header.as_deref() {
                    Some("Bearer bad") => Err(AnankeError::unauthorized("Invalid token")),
                    Some(value) => Ok(value.strip_prefix("Bearer ").map(String::from)),
                    None => Ok(None),
                }
            },
        )
    }

    fn event(header: Option<&str>) -> Arc<GatewayEvent> {
        let mut headers = HashMap::new();
        if let Some(value) = header {
            headers.insert("authorization".to_string(), value.to_string());
        }
        Arc::new(GatewayEvent {
            headers,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_header_lookup_ignores_case() {
        let principal = registry()
            .resolve_principal("bearer", &Context::new(), &event(Some("Bearer user-1")))
            .await
            .unwrap();
        assert_eq!(principal.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let principal = registry()
            .resolve_principal("bearer", &Context::new(), &event(None))
            .await
            .unwrap();
        assert!(principal.is_none());
    }

    #[tokio::test]
    async fn test_empty_principal_is_anonymous() {
        let principal = registry()
            .resolve_principal("bearer", &Context::new(), &event(Some("Bearer ")))
            .await
            .unwrap();
        assert!(principal.is_none());
    }

    #[tokio::test]
    async fn test_authenticator_errors_propagate() {
        let error = registry()
            .resolve_principal("bearer", &Context::new(), &event(Some("Bearer bad")))
            .await
            .unwrap_err();
        assert_eq!(error.status_code().as_u16(), 401);
    }

    #[tokio::test]
    async fn test_unknown_authenticator_is_internal() {
        let error = registry()
            .resolve_principal("missing", &Context::new(), &event(None))
            .await
            .unwrap_err();
        assert!(error.is_server());
        assert!(error.to_string().contains("missing"));
    }
}
