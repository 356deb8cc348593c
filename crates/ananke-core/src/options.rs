//! Handler and RPC method options.
//!
//! Options are immutable per handler instance and usually come from
//! configuration. Keys are accepted both in snake_case and in the camelCase
//! spelling used by function manifests (`requireAuth`, `preMiddleware`, ...).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Options for a single handler.
///
/// # Example
///
/// ```
/// use ananke_core::HandlerOptions;
///
/// let options = HandlerOptions::new()
///     .require_auth(true)
///     .authenticator("authenticator")
///     .pre_middleware("auth")
///     .validate("name", "string().required()");
///
/// assert!(options.require_auth);
/// assert_eq!(options.validation["name"], "string().required()");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandlerOptions {
    /// Reject requests without a resolved principal.
    #[serde(alias = "requireAuth", alias = "auth")]
    pub require_auth: bool,

    /// Name of the registered authenticator used to resolve principals.
    pub authenticator: Option<String>,

    /// Names of pre-middleware, in execution order.
    #[serde(alias = "preMiddleware")]
    pub pre_middleware: Vec<String>,

    /// Names of post-middleware, in execution order.
    #[serde(alias = "postMiddleware")]
    pub post_middleware: Vec<String>,

    /// Validation expressions keyed by field path.
    pub validation: IndexMap<String, String>,
}

impl HandlerOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a principal is required.
    #[must_use]
    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    /// Sets the authenticator name.
    #[must_use]
    pub fn authenticator(mut self, name: impl Into<String>) -> Self {
        self.authenticator = Some(name.into());
        self
    }

    /// Appends a pre-middleware name.
    #[must_use]
    pub fn pre_middleware(mut self, name: impl Into<String>) -> Self {
        self.pre_middleware.push(name.into());
        self
    }

    /// Appends a post-middleware name.
    #[must_use]
    pub fn post_middleware(mut self, name: impl Into<String>) -> Self {
        self.post_middleware.push(name.into());
        self
    }

    /// Adds a validation expression for a field.
    #[must_use]
    pub fn validate(mut self, field: impl Into<String>, expression: impl Into<String>) -> Self {
        self.validation.insert(field.into(), expression.into());
        self
    }
}

/// Options exposed by an RPC method.
///
/// Middleware lists override the handler's lists only when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MethodOptions {
    /// Reject calls without a resolved principal.
    #[serde(alias = "requireAuth", alias = "auth")]
    pub require_auth: bool,

    /// Pre-middleware replacing the handler's list.
    #[serde(alias = "preMiddleware")]
    pub pre_middleware: Option<Vec<String>>,

    /// Post-middleware replacing the handler's list.
    #[serde(alias = "postMiddleware")]
    pub post_middleware: Option<Vec<String>>,

    /// Validation expressions for the call params, keyed by field path.
    pub validation: IndexMap<String, String>,
}

impl MethodOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a principal is required.
    #[must_use]
    pub fn require_auth(mut self, require_auth: bool) -> Self {
        self.require_auth = require_auth;
        self
    }

    /// Replaces the pre-middleware list.
    #[must_use]
    pub fn pre_middleware<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_middleware = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the post-middleware list.
    #[must_use]
    pub fn post_middleware<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.post_middleware = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a validation expression for a param.
    #[must_use]
    pub fn validate(mut self, field: impl Into<String>, expression: impl Into<String>) -> Self {
        self.validation.insert(field.into(), expression.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_options_camel_case_aliases() {
        let json = serde_json::json!({
            "requireAuth": true,
            "authenticator": "functions/authenticator",
            "preMiddleware": ["auth"],
            "postMiddleware": ["error"],
            "validation": { "name": "string().required()" }
        });

        let options: HandlerOptions = serde_json::from_value(json).expect("valid options");
        assert!(options.require_auth);
        assert_eq!(options.authenticator.as_deref(), Some("functions/authenticator"));
        assert_eq!(options.pre_middleware, vec!["auth"]);
        assert_eq!(options.post_middleware, vec!["error"]);
        assert_eq!(options.validation.len(), 1);
    }

    #[test]
    fn test_handler_options_reject_unknown_keys() {
        let json = serde_json::json!({ "requireAuthh": true });
        assert!(serde_json::from_value::<HandlerOptions>(json).is_err());
    }

    #[test]
    fn test_validation_keeps_declared_order() {
        let options = HandlerOptions::new()
            .validate("b", "string()")
            .validate("a", "number()");
        let keys: Vec<&String> = options.validation.keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_method_options_override_only_when_present() {
        let options: MethodOptions = serde_json::from_value(serde_json::json!({
            "auth": true
        }))
        .expect("valid options");
        assert!(options.require_auth);
        assert!(options.pre_middleware.is_none());

        let options = MethodOptions::new().pre_middleware(["auth"]);
        assert_eq!(options.pre_middleware, Some(vec!["auth".to_string()]));
    }
}
