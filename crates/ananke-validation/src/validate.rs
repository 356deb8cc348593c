//! Schema evaluation.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationErrors};
use crate::schema::{json_number, Format, Kind, Presence, Rule, Schema, MAX_SAFE_INTEGER};

/// Options controlling how a value is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Coerce numeric and boolean strings, apply string transforms.
    pub convert: bool,
    /// Drop object keys the schema does not declare instead of rejecting them.
    pub strip_unknown: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            convert: true,
            strip_unknown: true,
        }
    }
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

pub(crate) struct Validator<'o> {
    options: &'o ValidateOptions,
    errors: Vec<ValidationError>,
}

impl<'o> Validator<'o> {
    pub(crate) const fn new(options: &'o ValidateOptions) -> Self {
        Self {
            options,
            errors: Vec::new(),
        }
    }

    pub(crate) fn run(mut self, schema: &Schema, value: &Value) -> Result<Value, ValidationErrors> {
        let output = self.check(schema, Some(value), &mut Vec::new());
        if self.errors.is_empty() {
            Ok(output.unwrap_or(Value::Null))
        } else {
            Err(ValidationErrors {
                details: self.errors,
            })
        }
    }

    fn fail(&mut self, schema: &Schema, path: &[Segment], message: impl std::fmt::Display) {
        let path = render_path(path);
        let label = schema.label.clone().unwrap_or_else(|| {
            if path.is_empty() {
                "value".to_string()
            } else {
                path.clone()
            }
        });
        self.errors.push(ValidationError {
            message: format!("\"{label}\" {message}"),
            path,
        });
    }

    fn check(&mut self, schema: &Schema, value: Option<&Value>, path: &mut Vec<Segment>) -> Option<Value> {
        let value = value.filter(|value| !schema.empty.contains(value));

        let Some(value) = value else {
            if schema.presence == Presence::Required {
                self.fail(schema, path, "is required");
                return None;
            }
            return schema.default.clone();
        };

        if schema.presence == Presence::Forbidden {
            self.fail(schema, path, "is not allowed");
            return None;
        }
        if schema.allow.contains(value) {
            return Some(value.clone());
        }
        if schema.invalid.contains(value) {
            self.fail(schema, path, "contains an invalid value");
            return None;
        }
        if !schema.valid.is_empty() {
            if schema.valid.contains(value) {
                return Some(value.clone());
            }
            let message = match schema.valid.as_slice() {
                [only] => format!("must be [{}]", display_value(only)),
                many => format!(
                    "must be one of [{}]",
                    many.iter().map(display_value).collect::<Vec<_>>().join(", ")
                ),
            };
            self.fail(schema, path, message);
            return None;
        }

        match &schema.kind {
            Kind::Any => Some(value.clone()),
            Kind::String => self.string(schema, value, path),
            Kind::Number => self.number(schema, value, path),
            Kind::Boolean => self.boolean(schema, value, path),
            Kind::Array { items } => self.array(schema, items, value, path),
            Kind::Object { keys, unknown } => self.object(schema, keys.as_ref(), *unknown, value, path),
            Kind::Alternatives(alternatives) => self.alternatives(schema, alternatives, value, path),
        }
    }

    fn string(&mut self, schema: &Schema, value: &Value, path: &[Segment]) -> Option<Value> {
        let Value::String(text) = value else {
            self.fail(schema, path, "must be a string");
            return None;
        };

        let mut text = text.clone();
        if self.options.convert {
            for rule in &schema.rules {
                match rule {
                    Rule::Trim => text = text.trim().to_string(),
                    Rule::Lowercase => text = text.to_lowercase(),
                    Rule::Uppercase => text = text.to_uppercase(),
                    _ => {}
                }
            }
        }

        if text.is_empty() {
            if schema.allow.iter().any(|allowed| allowed.as_str() == Some("")) {
                return Some(Value::String(text));
            }
            self.fail(schema, path, "is not allowed to be empty");
            return None;
        }

        let length = text.chars().count() as f64;
        let before = self.errors.len();
        for rule in &schema.rules {
            let message = match rule {
                Rule::Min(min) if length < *min => {
                    format!("length must be at least {min} characters long")
                }
                Rule::Max(max) if length > *max => {
                    format!("length must be less than or equal to {max} characters long")
                }
                Rule::Length(expected) if (length - expected).abs() > f64::EPSILON => {
                    format!("length must be {expected} characters long")
                }
                Rule::Format(format, regex) if !regex.is_match(&text) => match format {
                    Format::Email => "must be a valid email".to_string(),
                    Format::Uri => "must be a valid uri".to_string(),
                    Format::IsoDate => "must be in iso format".to_string(),
                },
                Rule::Pattern(regex, source) if !regex.is_match(&text) => {
                    format!("with value \"{text}\" fails to match the required pattern: /{source}/")
                }
                Rule::Uuid if uuid::Uuid::try_parse(&text).is_err() => {
                    "must be a valid GUID".to_string()
                }
                Rule::Alphanum if !text.chars().all(|c| c.is_ascii_alphanumeric()) => {
                    "must only contain alpha-numeric characters".to_string()
                }
                Rule::Token if !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
                    "must only contain alpha-numeric and underscore characters".to_string()
                }
                Rule::Hex if !text.chars().all(|c| c.is_ascii_hexdigit()) => {
                    "must only contain hexadecimal characters".to_string()
                }
                Rule::Lowercase if text.to_lowercase() != text => {
                    "must only contain lowercase characters".to_string()
                }
                Rule::Uppercase if text.to_uppercase() != text => {
                    "must only contain uppercase characters".to_string()
                }
                Rule::Trim if text.trim() != text => {
                    "must not have leading or trailing whitespace".to_string()
                }
                _ => continue,
            };
            self.fail(schema, path, message);
        }

        (self.errors.len() == before).then_some(Value::String(text))
    }

    fn number(&mut self, schema: &Schema, value: &Value, path: &[Segment]) -> Option<Value> {
        let (number, converted) = match value {
            Value::Number(number) => (number.as_f64(), false),
            Value::String(text) if self.options.convert => {
                (text.trim().parse::<f64>().ok().filter(|n| n.is_finite()), true)
            }
            _ => (None, false),
        };
        let Some(number) = number else {
            self.fail(schema, path, "must be a number");
            return None;
        };
        if !is_safe(value, number) {
            self.fail(schema, path, "must be a safe number");
            return None;
        }

        let before = self.errors.len();
        for rule in &schema.rules {
            let message = match rule {
                Rule::Min(min) if number < *min => format!("must be greater than or equal to {min}"),
                Rule::Max(max) if number > *max => format!("must be less than or equal to {max}"),
                Rule::Greater(limit) if number <= *limit => format!("must be greater than {limit}"),
                Rule::Less(limit) if number >= *limit => format!("must be less than {limit}"),
                Rule::Multiple(base) if (number % base).abs() > f64::EPSILON => {
                    format!("must be a multiple of {base}")
                }
                Rule::Integer if number.fract() != 0.0 => "must be an integer".to_string(),
                Rule::Positive if number <= 0.0 => "must be a positive number".to_string(),
                Rule::Negative if number >= 0.0 => "must be a negative number".to_string(),
                Rule::Port if number.fract() != 0.0 || !(0.0..=65535.0).contains(&number) => {
                    "must be a valid port".to_string()
                }
                _ => continue,
            };
            self.fail(schema, path, message);
        }

        if self.errors.len() != before {
            return None;
        }
        Some(if converted { json_number(number) } else { value.clone() })
    }

    fn boolean(&mut self, schema: &Schema, value: &Value, path: &[Segment]) -> Option<Value> {
        match value {
            Value::Bool(flag) => Some(Value::Bool(*flag)),
            Value::String(text) if self.options.convert && text.eq_ignore_ascii_case("true") => {
                Some(Value::Bool(true))
            }
            Value::String(text) if self.options.convert && text.eq_ignore_ascii_case("false") => {
                Some(Value::Bool(false))
            }
            _ => {
                self.fail(schema, path, "must be a boolean");
                None
            }
        }
    }

    fn array(
        &mut self,
        schema: &Schema,
        items: &[Schema],
        value: &Value,
        path: &mut Vec<Segment>,
    ) -> Option<Value> {
        let Value::Array(elements) = value else {
            self.fail(schema, path, "must be an array");
            return None;
        };

        let before = self.errors.len();
        let mut output = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            path.push(Segment::Index(index));
            let checked = match items {
                [] => Some(element.clone()),
                [only] => self.check(only, Some(element), path),
                many => self.first_match(schema, many, element, path),
            };
            path.pop();
            output.extend(checked);
        }

        let count = elements.len() as f64;
        for rule in &schema.rules {
            let message = match rule {
                Rule::Min(min) if count < *min => format!("must contain at least {min} items"),
                Rule::Max(max) if count > *max => {
                    format!("must contain less than or equal to {max} items")
                }
                Rule::Length(expected) if (count - expected).abs() > f64::EPSILON => {
                    format!("must contain {expected} items")
                }
                Rule::Unique if has_duplicates(&output) => "contains a duplicate value".to_string(),
                _ => continue,
            };
            self.fail(schema, path, message);
        }

        (self.errors.len() == before).then_some(Value::Array(output))
    }

    fn object(
        &mut self,
        schema: &Schema,
        keys: Option<&indexmap::IndexMap<String, Schema>>,
        unknown: bool,
        value: &Value,
        path: &mut Vec<Segment>,
    ) -> Option<Value> {
        let Value::Object(fields) = value else {
            self.fail(schema, path, "must be of type object");
            return None;
        };

        let before = self.errors.len();
        let output = match keys {
            None => fields.clone(),
            Some(keys) => {
                let mut output = Map::new();
                for (key, child) in keys {
                    path.push(Segment::Key(key.clone()));
                    if let Some(checked) = self.check(child, fields.get(key), path) {
                        output.insert(key.clone(), checked);
                    }
                    path.pop();
                }
                for (key, field) in fields {
                    if keys.contains_key(key) {
                        continue;
                    }
                    if unknown {
                        output.insert(key.clone(), field.clone());
                    } else if !self.options.strip_unknown {
                        path.push(Segment::Key(key.clone()));
                        self.fail(&Schema::any(), path, "is not allowed");
                        path.pop();
                    }
                }
                output
            }
        };

        let count = fields.len() as f64;
        for rule in &schema.rules {
            let message = match rule {
                Rule::Min(min) if count < *min => format!("must have at least {min} keys"),
                Rule::Max(max) if count > *max => format!("must have less than or equal to {max} keys"),
                Rule::Length(expected) if (count - expected).abs() > f64::EPSILON => {
                    format!("must have {expected} keys")
                }
                _ => continue,
            };
            self.fail(schema, path, message);
        }

        (self.errors.len() == before).then_some(Value::Object(output))
    }

    fn alternatives(
        &mut self,
        schema: &Schema,
        alternatives: &[Schema],
        value: &Value,
        path: &mut Vec<Segment>,
    ) -> Option<Value> {
        if alternatives.is_empty() {
            return Some(value.clone());
        }
        self.first_match(schema, alternatives, value, path)
    }

    // Tries each candidate in order. When every candidate fails and exactly
    // one of them accepts the value's JSON type, its errors are reported;
    // otherwise one generic error is.
    fn first_match(
        &mut self,
        schema: &Schema,
        candidates: &[Schema],
        value: &Value,
        path: &mut Vec<Segment>,
    ) -> Option<Value> {
        let mut typed_failures = Vec::new();
        for candidate in candidates {
            let mut attempt = Validator::new(self.options);
            let output = attempt.check(candidate, Some(value), path);
            if attempt.errors.is_empty() {
                return output;
            }
            if accepts_type(candidate, value) {
                typed_failures.push(attempt.errors);
            }
        }

        if typed_failures.len() == 1 {
            self.errors.extend(typed_failures.remove(0));
        } else {
            self.fail(schema, path, "does not match any of the allowed types");
        }
        None
    }
}

fn accepts_type(schema: &Schema, value: &Value) -> bool {
    match (&schema.kind, value) {
        (Kind::Any | Kind::Alternatives(_), _)
        | (Kind::String | Kind::Number, Value::String(_))
        | (Kind::Number, Value::Number(_))
        | (Kind::Boolean, Value::Bool(_))
        | (Kind::Array { .. }, Value::Array(_))
        | (Kind::Object { .. }, Value::Object(_)) => true,
        _ => false,
    }
}

/// Whether `number` sits within the range an `f64` represents without loss.
///
/// Integers are checked on their exact JSON form, since `number` has already
/// been rounded for them.
#[allow(clippy::cast_precision_loss)]
fn is_safe(value: &Value, number: f64) -> bool {
    let max = MAX_SAFE_INTEGER.unsigned_abs();
    match value {
        Value::Number(exact) if exact.is_i64() => exact.as_i64().is_some_and(|n| n.unsigned_abs() <= max),
        Value::Number(exact) if exact.is_u64() => exact.as_u64().is_some_and(|n| n <= max),
        _ => number.abs() <= MAX_SAFE_INTEGER as f64,
    }
}

fn has_duplicates(values: &[Value]) -> bool {
    values
        .iter()
        .enumerate()
        .any(|(i, value)| values[i + 1..].contains(value))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn render_path(path: &[Segment]) -> String {
    let mut rendered = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !rendered.is_empty() {
                    rendered.push('.');
                }
                rendered.push_str(key);
            }
            Segment::Index(index) => {
                let _ = write!(rendered, "[{index}]");
            }
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;
    use serde_json::json;

    fn messages(source: &str, value: &Value) -> Vec<String> {
        compile(source).unwrap().validate(value).unwrap_err().messages()
    }

    #[test]
    fn test_render_path() {
        let path = vec![
            Segment::Key("user".into()),
            Segment::Key("tags".into()),
            Segment::Index(2),
        ];
        assert_eq!(render_path(&path), "user.tags[2]");
    }

    #[test]
    fn test_string_rules() {
        assert_eq!(messages("string()", &json!(1)), ["\"value\" must be a string"]);
        assert_eq!(messages("string()", &json!("")), ["\"value\" is not allowed to be empty"]);
        assert_eq!(
            messages("string().min(3)", &json!("ab")),
            ["\"value\" length must be at least 3 characters long"]
        );
        assert!(compile("string().allow('')").unwrap().validate(&json!("")).is_ok());
        assert_eq!(
            compile("string().trim().lowercase()").unwrap().validate(&json!("  ADA ")).unwrap(),
            json!("ada")
        );
    }

    #[test]
    fn test_formats() {
        assert!(compile("string().email()").unwrap().validate(&json!("ada@example.com")).is_ok());
        assert_eq!(
            messages("string().email()", &json!("ada")),
            ["\"value\" must be a valid email"]
        );
        assert!(compile("string().uuid()")
            .unwrap()
            .validate(&json!("11111111-1111-1111-1111-111111111111"))
            .is_ok());
        assert!(compile("string().isoDate()").unwrap().validate(&json!("2024-02-29T10:00:00Z")).is_ok());
        assert!(compile("string().pattern(/^ab+$/i)").unwrap().validate(&json!("ABB")).is_ok());
        assert!(compile("string().hex()").unwrap().validate(&json!("xyz")).is_err());
    }

    #[test]
    fn test_number_conversion_and_rules() {
        let schema = compile("number().integer().min(1).max(10)").unwrap();
        assert_eq!(schema.validate(&json!("7")).unwrap(), json!(7));
        assert_eq!(
            schema.validate(&json!(11.5)).unwrap_err().messages(),
            ["\"value\" must be an integer", "\"value\" must be less than or equal to 10"]
        );
        assert_eq!(messages("number()", &json!("seven")), ["\"value\" must be a number"]);
        assert!(compile("number().port()").unwrap().validate(&json!(70000)).is_err());
    }

    #[test]
    fn test_number_rejects_unsafe_integers() {
        let unsafe_number = ["\"value\" must be a safe number"];
        assert_eq!(messages("number()", &json!(12_345_678_901_234_567_u64)), unsafe_number);
        assert_eq!(messages("number()", &json!(u64::MAX)), unsafe_number);
        assert_eq!(messages("number()", &json!(-9_007_199_254_740_992_i64)), unsafe_number);
        assert_eq!(messages("number().integer()", &json!(9_007_199_254_740_993_u64)), unsafe_number);
        assert_eq!(messages("number()", &json!("9007199254740993")), unsafe_number);
    }

    #[test]
    fn test_number_keeps_input_verbatim() {
        let schema = compile("number()").unwrap();
        let largest = json!(9_007_199_254_740_991_u64);
        assert_eq!(schema.validate(&largest).unwrap(), largest);
        assert_eq!(schema.validate(&json!(-9_007_199_254_740_991_i64)).unwrap(), json!(-9_007_199_254_740_991_i64));
        assert_eq!(schema.validate(&json!(1.5)).unwrap(), json!(1.5));
        assert_eq!(schema.validate(&json!("9007199254740991")).unwrap(), largest);
    }

    #[test]
    fn test_no_conversion() {
        let options = ValidateOptions {
            convert: false,
            strip_unknown: true,
        };
        let schema = compile("number()").unwrap();
        assert!(schema.validate_with(&json!("7"), &options).is_err());
    }

    #[test]
    fn test_boolean_conversion() {
        assert_eq!(compile("boolean()").unwrap().validate(&json!("TRUE")).unwrap(), json!(true));
        assert!(compile("bool()").unwrap().validate(&json!("yes")).is_err());
    }

    #[test]
    fn test_array_items_paths() {
        let schema = crate::compile_map(&indexmap::indexmap! {
            "tags".to_string() => "array().items(string()).unique()".to_string(),
        })
        .unwrap();

        let errors = schema.validate(&json!({ "tags": ["a", 2] })).unwrap_err();
        assert_eq!(errors.messages(), ["\"tags[1]\" must be a string"]);
        assert!(errors.has_path("tags[1]"));

        let errors = schema.validate(&json!({ "tags": ["a", "a"] })).unwrap_err();
        assert_eq!(errors.messages(), ["\"tags\" contains a duplicate value"]);
    }

    #[test]
    fn test_valid_and_invalid() {
        assert_eq!(messages("string().valid('2.0')", &json!("1.0")), ["\"value\" must be [2.0]"]);
        assert_eq!(
            messages("any().valid('a', 'b')", &json!("c")),
            ["\"value\" must be one of [a, b]"]
        );
        assert_eq!(
            messages("string().invalid('root')", &json!("root")),
            ["\"value\" contains an invalid value"]
        );
    }

    #[test]
    fn test_alternatives() {
        let schema = compile("alternatives().try(array(), object())").unwrap();
        assert!(schema.validate(&json!([1])).is_ok());
        assert!(schema.validate(&json!({ "a": 1 })).is_ok());
        assert_eq!(
            schema.validate(&json!("x")).unwrap_err().messages(),
            ["\"value\" does not match any of the allowed types"]
        );
    }

    #[test]
    fn test_nested_unknown_keys() {
        let schema = Schema::object().key(
            "user",
            Schema::object().key("name", Schema::string()),
        );
        let value = json!({ "user": { "name": "Ada", "admin": true } });
        assert_eq!(schema.validate(&value).unwrap(), json!({ "user": { "name": "Ada" } }));

        let strict = ValidateOptions {
            convert: true,
            strip_unknown: false,
        };
        let errors = schema.validate_with(&value, &strict).unwrap_err();
        assert_eq!(errors.messages(), ["\"user.admin\" is not allowed"]);
    }

    #[test]
    fn test_defaults_and_label() {
        let schema = crate::compile_map(&indexmap::indexmap! {
            "page".to_string() => "number().default(1)".to_string(),
            "name".to_string() => "string().required().label('Full name')".to_string(),
        })
        .unwrap();

        let errors = schema.validate(&json!({})).unwrap_err();
        assert_eq!(errors.messages(), ["\"Full name\" is required"]);

        let value = schema.validate(&json!({ "name": "Ada" })).unwrap();
        assert_eq!(value, json!({ "page": 1, "name": "Ada" }));
    }

    #[test]
    fn test_forbidden_and_empty() {
        assert_eq!(messages("any().forbidden()", &json!(1)), ["\"value\" is not allowed"]);
        let schema = Schema::object().key("note", crate::compile("string().empty('')").unwrap());
        assert_eq!(schema.validate(&json!({ "note": "" })).unwrap(), json!({}));
    }
}
