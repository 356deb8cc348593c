//! Named middleware registration.
//!
//! Handlers name their middleware in configuration; the registry maps those
//! names to statically linked implementations.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ananke_core::{AnankeError, Context, Outcome, Request};
use indexmap::IndexMap;

use crate::error::MiddlewareError;
use crate::middleware::{BoxedMiddleware, FnMiddleware, PostMiddleware, PreMiddleware};

/// A middleware given either by name or directly.
pub enum MiddlewareRef<T> {
    /// Looked up in the [`MiddlewareRegistry`] on first use.
    Named(String),
    /// Used as-is.
    Direct(BoxedMiddleware<T>),
}

impl<T> Clone for MiddlewareRef<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Named(name) => Self::Named(name.clone()),
            Self::Direct(middleware) => Self::Direct(Arc::clone(middleware)),
        }
    }
}

impl<T: 'static> fmt::Debug for MiddlewareRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Direct(middleware) => f.debug_tuple("Direct").field(&middleware.name()).finish(),
        }
    }
}

impl<T> From<&str> for MiddlewareRef<T> {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl<T> From<String> for MiddlewareRef<T> {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Maps names to pre- and post-middleware.
///
/// # Example
///
/// ```
/// use ananke_core::{AnankeError, Context, Request};
/// use ananke_middleware::MiddlewareRegistry;
///
/// let registry = MiddlewareRegistry::new().pre_fn("auth", |request: Request, _ctx: Context| async move {
///     Ok::<_, AnankeError>(request.with_principal(Some("user-1".into())))
/// });
///
/// assert!(registry.has_pre("auth"));
/// assert!(registry.resolve_pre(&["auth".to_string()]).is_ok());
/// assert!(registry.resolve_pre(&["missing".to_string()]).is_err());
/// ```
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    pre: IndexMap<String, PreMiddleware>,
    post: IndexMap<String, PostMiddleware>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pre-middleware under its own name.
    #[must_use]
    pub fn pre(mut self, middleware: PreMiddleware) -> Self {
        self.pre.insert(middleware.name().to_string(), middleware);
        self
    }

    /// Registers an async function as pre-middleware.
    #[must_use]
    pub fn pre_fn<F, Fut, E>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Request, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Request, E>> + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        self.pre(Arc::new(FnMiddleware::new(name, func)))
    }

    /// Registers a post-middleware under its own name.
    #[must_use]
    pub fn post(mut self, middleware: PostMiddleware) -> Self {
        self.post.insert(middleware.name().to_string(), middleware);
        self
    }

    /// Registers an async function as post-middleware.
    #[must_use]
    pub fn post_fn<F, Fut, E>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Outcome, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Outcome, E>> + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        self.post(Arc::new(FnMiddleware::new(name, func)))
    }

    /// Returns `true` if a pre-middleware is registered under `name`.
    pub fn has_pre(&self, name: &str) -> bool {
        self.pre.contains_key(name)
    }

    /// Returns `true` if a post-middleware is registered under `name`.
    pub fn has_post(&self, name: &str) -> bool {
        self.post.contains_key(name)
    }

    /// Resolves pre-middleware names, in order.
    pub fn resolve_pre(&self, names: &[String]) -> Result<Vec<PreMiddleware>, MiddlewareError> {
        names
            .iter()
            .map(|name| {
                self.pre
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MiddlewareError::UnknownPre(name.clone()))
            })
            .collect()
    }

    /// Resolves post-middleware names, in order.
    pub fn resolve_post(&self, names: &[String]) -> Result<Vec<PostMiddleware>, MiddlewareError> {
        names
            .iter()
            .map(|name| {
                self.post
                    .get(name)
                    .cloned()
                    .ok_or_else(|| MiddlewareError::UnknownPost(name.clone()))
            })
            .collect()
    }

    pub(crate) fn lookup_pre(&self, reference: &MiddlewareRef<Request>) -> Result<PreMiddleware, MiddlewareError> {
        match reference {
            MiddlewareRef::Named(name) => self
                .pre
                .get(name)
                .cloned()
                .ok_or_else(|| MiddlewareError::UnknownPre(name.clone())),
            MiddlewareRef::Direct(middleware) => Ok(Arc::clone(middleware)),
        }
    }

    pub(crate) fn lookup_post(&self, reference: &MiddlewareRef<Outcome>) -> Result<PostMiddleware, MiddlewareError> {
        match reference {
            MiddlewareRef::Named(name) => self
                .post
                .get(name)
                .cloned()
                .ok_or_else(|| MiddlewareError::UnknownPost(name.clone())),
            MiddlewareRef::Direct(middleware) => Ok(Arc::clone(middleware)),
        }
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("pre", &self.pre.keys().collect::<Vec<_>>())
            .field("post", &self.post.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_ref_debug_names_the_middleware() {
        let registry = MiddlewareRegistry::new().pre_fn("auth", |request: Request, _ctx: Context| async move {
            Ok::<_, AnankeError>(request)
        });
        let direct = registry.resolve_pre(&["auth".to_string()]).unwrap().remove(0);

        let named: MiddlewareRef<Request> = "auth".into();
        assert_eq!(format!("{named:?}"), r#"Named("auth")"#);
        assert_eq!(format!("{:?}", MiddlewareRef::Direct(direct)), r#"Direct("auth")"#);
    }

    #[test]
    fn test_lookup_unknown_name_fails() {
        let registry = MiddlewareRegistry::new();
        assert!(registry.lookup_post(&"missing".into()).is_err());
    }
}
