//! RPC methods and the explicit table they are registered in.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use ananke_core::{AnankeError, Context, GatewayEvent, MethodOptions, Request};
use ananke_validation::{CompileError, ParamsValidator, Schema};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::handler::{http_runner, HttpRunner};

/// A callable RPC method: its runner, options and compiled param validator.
#[derive(Clone)]
pub struct Method {
    name: Arc<str>,
    runner: HttpRunner,
    options: Arc<MethodOptions>,
    validator: ParamsValidator,
    stand_in: bool,
}

impl Method {
    /// Creates a method, compiling its validation rules.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if a validation rule is malformed.
    pub fn new(name: impl Into<String>, options: MethodOptions, runner: HttpRunner) -> Result<Self, CompileError> {
        let validator = ParamsValidator::new(&options.validation)?;
        Ok(Self {
            name: Arc::from(name.into()),
            runner,
            options: Arc::new(options),
            validator,
            stand_in: false,
        })
    }

    /// A stand-in whose invocation always fails with the error `make_error` builds.
    ///
    /// Dispatch calls it before authentication and middleware, so the failure
    /// is the only thing the caller sees.
    pub(crate) fn failing(name: &str, make_error: impl Fn(&str) -> AnankeError + Send + Sync + 'static) -> Self {
        let method = name.to_string();
        let runner: HttpRunner = Arc::new(move |_request, _ctx, _event| {
            let error = make_error(&method);
            Box::pin(async move { Err(error) })
        });

        Self {
            name: Arc::from(name),
            runner,
            options: Arc::new(MethodOptions::new()),
            validator: ParamsValidator::from_schema(Schema::any()),
            stand_in: true,
        }
    }

    /// A stand-in for an unregistered method name.
    pub(crate) fn not_found(name: &str) -> Self {
        Self::failing(name, |method| {
            AnankeError::not_found(format!("Method {method} does not exist"))
        })
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the method options.
    #[must_use]
    pub fn options(&self) -> &MethodOptions {
        &self.options
    }

    /// Returns `true` for the stand-in of an unknown or undiscoverable method.
    #[must_use]
    pub(crate) const fn is_stand_in(&self) -> bool {
        self.stand_in
    }

    /// Validates call params against the method's rules.
    pub fn validate(&self, params: &Value) -> Result<Value, AnankeError> {
        self.validator.check(params)
    }

    /// Invokes the runner.
    pub async fn call(&self, request: Request, ctx: Context, event: Arc<GatewayEvent>) -> Result<Value, AnankeError> {
        (self.runner)(request, ctx, event).await
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Name → method mapping, built at startup.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use ananke_core::{AnankeError, Context, GatewayEvent, Request};
/// use ananke_runtime::MethodTable;
///
/// # fn main() -> Result<(), ananke_validation::CompileError> {
/// let table = MethodTable::new().method(
///     "hello.world",
///     |request: Request, _ctx: Context, _event: Arc<GatewayEvent>| async move {
///         Ok::<_, AnankeError>(format!("Hello world {}", request.payload["name"].as_str().unwrap_or("")))
///     },
/// )?;
///
/// assert!(table.get("hello.world").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: IndexMap<String, Method>,
}

impl MethodTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method with default options.
    ///
    /// # Errors
    ///
    /// Never fails for default options; kept fallible to chain with
    /// [`MethodTable::method_with_options`].
    pub fn method<F, Fut, T, E>(self, name: impl Into<String>, runner: F) -> Result<Self, CompileError>
    where
        F: Fn(Request, Context, Arc<GatewayEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        self.method_with_options(name, MethodOptions::default(), runner)
    }

    /// Registers a method with options, compiling its validation rules.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if a validation rule is malformed.
    pub fn method_with_options<F, Fut, T, E>(
        mut self,
        name: impl Into<String>,
        options: MethodOptions,
        runner: F,
    ) -> Result<Self, CompileError>
    where
        F: Fn(Request, Context, Arc<GatewayEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize + Send + 'static,
        E: Into<AnankeError> + 'static,
    {
        let name = name.into();
        let method = Method::new(name.clone(), options, http_runner(runner))?;
        self.methods.insert(name, method);
        Ok(self)
    }

    /// Adds an already-built method.
    #[must_use]
    pub fn insert(mut self, method: Method) -> Self {
        self.methods.insert(method.name().to_string(), method);
        self
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Returns the registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Returns the number of methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
