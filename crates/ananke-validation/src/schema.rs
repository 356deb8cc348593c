//! Compiled validation schemas.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationErrors;
use crate::validate::{ValidateOptions, Validator};

/// Whether a value must, may or must not be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Presence {
    /// The value may be absent.
    #[default]
    Optional,
    /// The value must be present.
    Required,
    /// The value must be absent.
    Forbidden,
}

#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Any,
    String,
    Number,
    Boolean,
    Array {
        items: Vec<Schema>,
    },
    Object {
        keys: Option<IndexMap<String, Schema>>,
        unknown: bool,
    },
    Alternatives(Vec<Schema>),
}

/// Built-in string formats backed by a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Email,
    Uri,
    IsoDate,
}

#[derive(Debug, Clone)]
pub(crate) enum Rule {
    Min(f64),
    Max(f64),
    Length(f64),
    Greater(f64),
    Less(f64),
    Multiple(f64),
    Integer,
    Positive,
    Negative,
    Port,
    Format(Format, Regex),
    Pattern(Regex, String),
    Uuid,
    Alphanum,
    Token,
    Hex,
    Lowercase,
    Uppercase,
    Trim,
    Unique,
}

/// An executable validation schema.
///
/// Schemas are usually compiled from strings with
/// [`compile`](crate::compile), but can also be assembled directly.
///
/// # Example
///
/// ```
/// use ananke_validation::Schema;
/// use serde_json::json;
///
/// let schema = Schema::object()
///     .key("name", Schema::string().required())
///     .key("age", Schema::number());
///
/// let value = schema.validate(&json!({ "name": "Ada", "age": "36", "extra": 1 })).unwrap();
/// assert_eq!(value, json!({ "name": "Ada", "age": 36 }));
/// ```
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) kind: Kind,
    pub(crate) presence: Presence,
    pub(crate) allow: Vec<Value>,
    pub(crate) valid: Vec<Value>,
    pub(crate) invalid: Vec<Value>,
    pub(crate) empty: Vec<Value>,
    pub(crate) default: Option<Value>,
    pub(crate) label: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) examples: Vec<Value>,
    pub(crate) rules: Vec<Rule>,
}

impl Schema {
    pub(crate) const fn new(kind: Kind) -> Self {
        Self {
            kind,
            presence: Presence::Optional,
            allow: Vec::new(),
            valid: Vec::new(),
            invalid: Vec::new(),
            empty: Vec::new(),
            default: None,
            label: None,
            description: None,
            examples: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Accepts any value.
    pub const fn any() -> Self {
        Self::new(Kind::Any)
    }

    /// Accepts strings.
    pub const fn string() -> Self {
        Self::new(Kind::String)
    }

    /// Accepts numbers and numeric strings.
    pub const fn number() -> Self {
        Self::new(Kind::Number)
    }

    /// Accepts booleans and `"true"`/`"false"`.
    pub const fn boolean() -> Self {
        Self::new(Kind::Boolean)
    }

    /// Accepts arrays.
    pub const fn array() -> Self {
        Self::new(Kind::Array { items: Vec::new() })
    }

    /// Accepts objects with any keys until [`Schema::key`] declares some.
    pub const fn object() -> Self {
        Self::new(Kind::Object {
            keys: None,
            unknown: false,
        })
    }

    /// Accepts values matching any of the given schemas.
    pub fn alternatives(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self::new(Kind::Alternatives(schemas.into_iter().collect()))
    }

    /// Marks the value as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    /// Marks the value as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Declares a key of an object schema.
    ///
    /// Has no effect on other schema types.
    #[must_use]
    pub fn key(mut self, name: impl Into<String>, schema: Schema) -> Self {
        if let Kind::Object { keys, .. } = &mut self.kind {
            keys.get_or_insert_with(IndexMap::new)
                .insert(name.into(), schema);
        }
        self
    }

    /// Declares the allowed item schemas of an array schema.
    #[must_use]
    pub fn items(mut self, schemas: impl IntoIterator<Item = Schema>) -> Self {
        if let Kind::Array { items } = &mut self.kind {
            items.extend(schemas);
        }
        self
    }

    /// Sets the label used in error messages.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets a default used when the value is absent.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Returns the schema's presence.
    pub const fn presence(&self) -> Presence {
        self.presence
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the examples attached to the schema.
    pub fn examples(&self) -> &[Value] {
        &self.examples
    }

    /// Returns the schema type name, e.g. `"string"`.
    pub const fn type_name(&self) -> &'static str {
        match self.kind {
            Kind::Any => "any",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
            Kind::Array { .. } => "array",
            Kind::Object { .. } => "object",
            Kind::Alternatives(_) => "alternatives",
        }
    }

    /// Returns the declared keys of an object schema.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        let keys = match &self.kind {
            Kind::Object {
                keys: Some(keys), ..
            } => Some(keys),
            _ => None,
        };
        keys.into_iter().flat_map(|keys| keys.keys().map(String::as_str))
    }

    /// Validates with the runtime's default options: convert types, collect
    /// every failure, strip unknown keys.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationErrors> {
        self.validate_with(value, &ValidateOptions::default())
    }

    /// Validates with explicit options.
    pub fn validate_with(
        &self,
        value: &Value,
        options: &ValidateOptions,
    ) -> Result<Value, ValidationErrors> {
        Validator::new(options).run(self, value)
    }
}

/// The largest integer an `f64` holds exactly, 2^53 - 1.
pub(crate) const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Converts a float into the narrowest JSON number.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn json_number(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER as f64 {
        #[allow(clippy::cast_possible_truncation)]
        Value::from(number as i64)
    } else {
        serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}
