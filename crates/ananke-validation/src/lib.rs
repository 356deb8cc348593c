//! # Ananke Validation
//!
//! Compiles validation rules written as chained builder expressions, such
//! as `"string().required()"` or `"array().items(string().min(2))"`, into
//! executable [`Schema`]s.
//!
//! Compilation parses the string, flattens the call chain into ordered
//! steps and replays them against a fixed builder vocabulary. Unknown
//! builder names are rejected with a [`CompileError`] naming the token.
//!
//! Validation follows the runtime's defaults: numeric and boolean strings
//! are converted, every failure is collected, and object keys the schema
//! does not declare are stripped.
//!
//! ## Example
//!
//! ```
//! use ananke_validation::{compile_map, ParamsValidator};
//! use indexmap::IndexMap;
//! use serde_json::json;
//!
//! let mut rules = IndexMap::new();
//! rules.insert("name".to_string(), "string().required()".to_string());
//!
//! let validator = ParamsValidator::new(&rules).unwrap();
//!
//! let errors = validator.validate(&json!({})).unwrap_err();
//! assert_eq!(errors.messages(), ["\"name\" is required"]);
//!
//! let value = validator.validate(&json!({ "name": "x", "extra": true })).unwrap();
//! assert_eq!(value, json!({ "name": "x" }));
//! # let _ = compile_map(&rules);
//! ```

#![doc(html_root_url = "https://docs.rs/ananke-validation/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod compiler;
mod error;
mod lexer;
mod parser;
mod schema;
mod validate;

use std::sync::Arc;

use ananke_core::AnankeError;
use indexmap::IndexMap;
use serde_json::Value;

pub use compiler::{compile, compile_map};
pub use error::{CompileError, ValidationError, ValidationErrors, INVALID_PARAMETERS_MESSAGE};
pub use schema::{Presence, Schema};
pub use validate::ValidateOptions;

/// A compiled `{field: expression}` map, ready to validate request params.
///
/// Cheap to clone; handlers build one at registration time and share it.
#[derive(Debug, Clone)]
pub struct ParamsValidator {
    schema: Arc<Schema>,
}

impl ParamsValidator {
    /// Compiles a validation map.
    pub fn new(rules: &IndexMap<String, String>) -> Result<Self, CompileError> {
        let schema = compile_map(rules)?;
        tracing::trace!(fields = rules.len(), "compiled validation map");
        Ok(Self {
            schema: Arc::new(schema),
        })
    }

    /// Wraps an already-built schema.
    pub fn from_schema(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
        }
    }

    /// Returns the compiled schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates `params`, returning the converted and stripped value.
    pub fn validate(&self, params: &Value) -> Result<Value, ValidationErrors> {
        self.schema.validate(params)
    }

    /// Validates `params`, mapping failures to a 400 [`AnankeError`].
    pub fn check(&self, params: &Value) -> Result<Value, AnankeError> {
        self.validate(params).map_err(AnankeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_required_field_round_trip() {
        let mut rules = IndexMap::new();
        rules.insert("name".to_string(), "string().required()".to_string());
        let validator = ParamsValidator::new(&rules).unwrap();

        let error = validator.check(&json!({})).unwrap_err();
        assert_eq!(error.status_code().as_u16(), 400);
        assert_eq!(error.details(), ["\"name\" is required"]);

        assert_eq!(
            validator.check(&json!({ "name": "x", "other": 1 })).unwrap(),
            json!({ "name": "x" })
        );
    }

    #[test]
    fn test_empty_map_strips_everything() {
        let validator = ParamsValidator::new(&IndexMap::new()).unwrap();
        assert_eq!(validator.validate(&json!({ "a": 1 })).unwrap(), json!({}));
    }

    #[test]
    fn test_optional_joi_prefix() {
        let schema = compile("Joi.string().required()").unwrap();
        assert_eq!(schema.type_name(), "string");
        assert_eq!(schema.presence(), Presence::Required);
    }

    #[test]
    fn test_property_access_invokes_member() {
        let schema = compile("string().required").unwrap();
        assert_eq!(schema.presence(), Presence::Required);
    }

    #[test]
    fn test_unknown_members_fail_to_compile() {
        let error = compile("string().requird()").unwrap_err();
        assert!(matches!(error, CompileError::UnknownMember { ref member, .. } if member == "requird"));

        assert!(matches!(
            compile("strin()").unwrap_err(),
            CompileError::UnknownMember { .. }
        ));
        // Rules are scoped to their schema type.
        assert!(compile("number().email()").is_err());
        assert!(compile("string().min('a')").is_err());
        assert!(compile("Joi").is_err());
    }

    #[test]
    fn test_nested_schemas_compile_recursively() {
        let schema = compile("alternatives().try(array().items(number()), object().unknown())").unwrap();
        assert!(schema.validate(&json!(["1", 2])).is_ok());
        assert_eq!(schema.validate(&json!(["1"])).unwrap(), json!([1]));
        assert!(schema.validate(&json!(["a"])).is_err());
    }

    #[test]
    fn test_metadata_members() {
        let schema = compile("string().description('User name').example('Ada')").unwrap();
        assert_eq!(schema.description(), Some("User name"));
        assert_eq!(schema.examples(), [json!("Ada")]);
    }

    proptest! {
        #[test]
        fn prop_valid_strings_pass_and_extras_are_stripped(
            name in "[a-zA-Z0-9]{1,16}",
            extra in "[a-z]{1,8}",
        ) {
            let mut rules = IndexMap::new();
            rules.insert("name".to_string(), "string().required()".to_string());
            let validator = ParamsValidator::new(&rules).unwrap();

            let mut input = serde_json::Map::new();
            input.insert("name".to_string(), json!(name.clone()));
            if extra != "name" {
                input.insert(extra.clone(), json!(true));
            }

            let value = validator.validate(&Value::Object(input)).unwrap();
            prop_assert_eq!(value, json!({ "name": name }));
        }
    }
}
