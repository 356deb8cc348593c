//! Replays a parsed expression against the schema builder vocabulary.
//!
//! The expression tree is flattened into an ordered list of steps, one per
//! name in the chain (`Joi.string().min(2)` becomes `Joi`, `string`, `min`).
//! Steps are then applied left to right, starting from the builder
//! namespace. A name the current builder does not know is a compile error.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::CompileError;
use crate::parser::{parse, Expr};
use crate::schema::{Format, Kind, Presence, Rule, Schema};

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const URI_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s]*$";
const ISO_DATE_PATTERN: &str =
    r"^\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+\-]\d{2}:?\d{2})?)?$";

#[derive(Debug)]
enum Arg {
    Value(Value),
    Regex { pattern: String, flags: String },
    Schema(Schema),
}

#[derive(Debug)]
struct Step {
    name: String,
    args: Vec<Arg>,
}

enum Builder {
    Namespace,
    Schema(Schema),
}

/// Compiles a validation expression into a [`Schema`].
///
/// # Example
///
/// ```
/// use ananke_validation::compile;
/// use serde_json::json;
///
/// let schema = compile("array().items(string().min(2))").unwrap();
/// assert!(schema.validate(&json!(["ab", "cd"])).is_ok());
/// assert!(schema.validate(&json!(["a"])).is_err());
///
/// assert!(compile("string().requird()").is_err());
/// ```
pub fn compile(source: &str) -> Result<Schema, CompileError> {
    let expr = parse(source)?;
    let mut steps = Vec::new();
    flatten(source, &expr, &mut steps)?;

    let mut builder = Builder::Namespace;
    for step in steps {
        builder = builder.apply(source, step)?;
    }

    match builder {
        Builder::Schema(schema) => Ok(schema),
        Builder::Namespace => Err(CompileError::syntax(source, "expression does not build a schema")),
    }
}

/// Compiles a `{field: expression}` map into one object schema.
///
/// Keys keep their declared order. An empty map yields an object schema
/// with no keys, which strips every input field.
pub fn compile_map<'a, I>(fields: I) -> Result<Schema, CompileError>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut keys = IndexMap::new();
    for (field, source) in fields {
        keys.insert(field.clone(), compile(source)?);
    }
    Ok(Schema::new(Kind::Object {
        keys: Some(keys),
        unknown: false,
    }))
}

fn flatten(source: &str, expr: &Expr, steps: &mut Vec<Step>) -> Result<(), CompileError> {
    match expr {
        Expr::Ident { name, .. } => {
            steps.push(Step {
                name: name.clone(),
                args: Vec::new(),
            });
        }
        Expr::Member {
            object, property, ..
        } => {
            flatten(source, object, steps)?;
            steps.push(Step {
                name: property.clone(),
                args: Vec::new(),
            });
        }
        Expr::Call { callee, args, .. } => {
            let name = match callee.as_ref() {
                Expr::Ident { name, .. } => name,
                Expr::Member {
                    object, property, ..
                } => {
                    flatten(source, object, steps)?;
                    property
                }
                _ => return Err(CompileError::syntax(source, "only named members can be called")),
            };
            let args = args
                .iter()
                .map(|arg| compile_arg(source, arg))
                .collect::<Result<_, _>>()?;
            steps.push(Step {
                name: name.clone(),
                args,
            });
        }
        Expr::Literal { .. } | Expr::Regex { .. } => {
            return Err(CompileError::syntax(source, "a literal cannot start a chain"));
        }
    }
    Ok(())
}

fn compile_arg(source: &str, arg: &Expr) -> Result<Arg, CompileError> {
    match arg {
        Expr::Literal { value, .. } => Ok(Arg::Value(value.clone())),
        Expr::Regex { pattern, flags, .. } => Ok(Arg::Regex {
            pattern: pattern.clone(),
            flags: flags.clone(),
        }),
        nested => {
            let span = nested.span();
            compile(&source[span.start..span.end]).map(Arg::Schema)
        }
    }
}

impl Builder {
    fn apply(self, source: &str, step: Step) -> Result<Self, CompileError> {
        match self {
            Self::Namespace => namespace(source, step),
            Self::Schema(schema) => member(source, schema, step).map(Self::Schema),
        }
    }
}

fn namespace(source: &str, step: Step) -> Result<Builder, CompileError> {
    let Step { name, args } = step;
    let kind = match name.as_str() {
        "Joi" => {
            no_args(source, &name, &args)?;
            return Ok(Builder::Namespace);
        }
        "alternatives" | "alt" => {
            let schemas = schema_args(source, &name, args)?;
            return Ok(Builder::Schema(Schema::alternatives(schemas)));
        }
        "any" => Kind::Any,
        "string" => Kind::String,
        "number" => Kind::Number,
        "boolean" | "bool" => Kind::Boolean,
        "array" => Kind::Array { items: Vec::new() },
        "object" => Kind::Object {
            keys: None,
            unknown: false,
        },
        _ => return Err(CompileError::unknown_member(source, &name)),
    };
    no_args(source, &name, &args)?;
    Ok(Builder::Schema(Schema::new(kind)))
}

fn member(source: &str, mut schema: Schema, step: Step) -> Result<Schema, CompileError> {
    let Step { name, args } = step;

    // Members shared by every schema type.
    match name.as_str() {
        "required" | "exist" | "exists" => {
            no_args(source, &name, &args)?;
            return Ok(schema.required());
        }
        "optional" => {
            no_args(source, &name, &args)?;
            return Ok(schema.optional());
        }
        "forbidden" => {
            no_args(source, &name, &args)?;
            schema.presence = Presence::Forbidden;
            return Ok(schema);
        }
        "allow" => {
            schema.allow.extend(value_args(source, &name, args)?);
            return Ok(schema);
        }
        "valid" | "only" | "equal" => {
            schema.valid.extend(value_args(source, &name, args)?);
            return Ok(schema);
        }
        "invalid" | "disallow" | "not" => {
            schema.invalid.extend(value_args(source, &name, args)?);
            return Ok(schema);
        }
        "empty" => {
            schema.empty.extend(value_args(source, &name, args)?);
            return Ok(schema);
        }
        "default" => {
            let value = value_args(source, &name, args)?.into_iter().next();
            schema.default = Some(value.unwrap_or(Value::Null));
            return Ok(schema);
        }
        "label" => {
            schema.label = Some(string_arg(source, &name, args)?);
            return Ok(schema);
        }
        "description" => {
            schema.description = Some(string_arg(source, &name, args)?);
            return Ok(schema);
        }
        "example" => {
            schema.examples.extend(value_args(source, &name, args)?);
            return Ok(schema);
        }
        _ => {}
    }

    let rule = match (&mut schema.kind, name.as_str()) {
        (Kind::String | Kind::Array { .. } | Kind::Object { .. }, "length") => {
            Rule::Length(count_arg(source, &name, args)?)
        }
        (Kind::String | Kind::Array { .. } | Kind::Object { .. }, "min") => {
            Rule::Min(count_arg(source, &name, args)?)
        }
        (Kind::String | Kind::Array { .. } | Kind::Object { .. }, "max") => {
            Rule::Max(count_arg(source, &name, args)?)
        }
        (Kind::String, "email") => format_rule(source, &name, args, Format::Email, EMAIL_PATTERN)?,
        (Kind::String, "uri") => format_rule(source, &name, args, Format::Uri, URI_PATTERN)?,
        (Kind::String, "isoDate") => {
            format_rule(source, &name, args, Format::IsoDate, ISO_DATE_PATTERN)?
        }
        (Kind::String, "uuid" | "guid") => flag(source, &name, &args, Rule::Uuid)?,
        (Kind::String, "alphanum") => flag(source, &name, &args, Rule::Alphanum)?,
        (Kind::String, "token") => flag(source, &name, &args, Rule::Token)?,
        (Kind::String, "hex") => flag(source, &name, &args, Rule::Hex)?,
        (Kind::String, "lowercase") => flag(source, &name, &args, Rule::Lowercase)?,
        (Kind::String, "uppercase") => flag(source, &name, &args, Rule::Uppercase)?,
        (Kind::String, "trim") => flag(source, &name, &args, Rule::Trim)?,
        (Kind::String, "pattern" | "regex") => pattern_rule(source, &name, args)?,
        (Kind::Number, "min") => Rule::Min(number_arg(source, &name, args)?),
        (Kind::Number, "max") => Rule::Max(number_arg(source, &name, args)?),
        (Kind::Number, "greater") => Rule::Greater(number_arg(source, &name, args)?),
        (Kind::Number, "less") => Rule::Less(number_arg(source, &name, args)?),
        (Kind::Number, "multiple") => {
            let base = number_arg(source, &name, args)?;
            if base <= 0.0 {
                return Err(CompileError::invalid_argument(source, &name, "must be a positive number"));
            }
            Rule::Multiple(base)
        }
        (Kind::Number, "integer") => flag(source, &name, &args, Rule::Integer)?,
        (Kind::Number, "positive") => flag(source, &name, &args, Rule::Positive)?,
        (Kind::Number, "negative") => flag(source, &name, &args, Rule::Negative)?,
        (Kind::Number, "port") => flag(source, &name, &args, Rule::Port)?,
        (Kind::Array { .. }, "unique") => flag(source, &name, &args, Rule::Unique)?,
        (Kind::Array { items }, "items") => {
            items.extend(schema_args(source, &name, args)?);
            return Ok(schema);
        }
        (Kind::Object { unknown, .. }, "unknown") => {
            *unknown = match value_args(source, &name, args)?.as_slice() {
                [] => true,
                [Value::Bool(allow)] => *allow,
                _ => {
                    return Err(CompileError::invalid_argument(source, &name, "expected a boolean"));
                }
            };
            return Ok(schema);
        }
        (Kind::Alternatives(alternatives), "try") => {
            alternatives.extend(schema_args(source, &name, args)?);
            return Ok(schema);
        }
        _ => return Err(CompileError::unknown_member(source, &name)),
    };

    schema.rules.push(rule);
    Ok(schema)
}

fn no_args(source: &str, name: &str, args: &[Arg]) -> Result<(), CompileError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CompileError::invalid_argument(source, name, "takes no arguments"))
    }
}

fn flag(source: &str, name: &str, args: &[Arg], rule: Rule) -> Result<Rule, CompileError> {
    no_args(source, name, args).map(|()| rule)
}

fn value_args(source: &str, name: &str, args: Vec<Arg>) -> Result<Vec<Value>, CompileError> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Value(value) => Ok(value),
            _ => Err(CompileError::invalid_argument(source, name, "expected literal values")),
        })
        .collect()
}

fn schema_args(source: &str, name: &str, args: Vec<Arg>) -> Result<Vec<Schema>, CompileError> {
    args.into_iter()
        .map(|arg| match arg {
            Arg::Schema(schema) => Ok(schema),
            _ => Err(CompileError::invalid_argument(source, name, "expected schemas")),
        })
        .collect()
}

fn single_value(source: &str, name: &str, args: Vec<Arg>) -> Result<Value, CompileError> {
    let mut values = value_args(source, name, args)?;
    if values.len() == 1 {
        Ok(values.remove(0))
    } else {
        Err(CompileError::invalid_argument(source, name, "expected exactly one argument"))
    }
}

fn string_arg(source: &str, name: &str, args: Vec<Arg>) -> Result<String, CompileError> {
    match single_value(source, name, args)? {
        Value::String(text) => Ok(text),
        _ => Err(CompileError::invalid_argument(source, name, "expected a string")),
    }
}

fn number_arg(source: &str, name: &str, args: Vec<Arg>) -> Result<f64, CompileError> {
    single_value(source, name, args)?
        .as_f64()
        .ok_or_else(|| CompileError::invalid_argument(source, name, "expected a number"))
}

fn count_arg(source: &str, name: &str, args: Vec<Arg>) -> Result<f64, CompileError> {
    let count = number_arg(source, name, args)?;
    if count < 0.0 || count.fract() != 0.0 {
        return Err(CompileError::invalid_argument(source, name, "expected a non-negative integer"));
    }
    Ok(count)
}

fn format_rule(
    source: &str,
    name: &str,
    args: Vec<Arg>,
    format: Format,
    pattern: &str,
) -> Result<Rule, CompileError> {
    no_args(source, name, &args)?;
    let regex = Regex::new(pattern)
        .map_err(|error| CompileError::invalid_argument(source, name, error.to_string()))?;
    Ok(Rule::Format(format, regex))
}

fn pattern_rule(source: &str, name: &str, args: Vec<Arg>) -> Result<Rule, CompileError> {
    let (pattern, flags) = match args.into_iter().next() {
        Some(Arg::Regex { pattern, flags }) => (pattern, flags),
        Some(Arg::Value(Value::String(pattern))) => (pattern, String::new()),
        _ => {
            return Err(CompileError::invalid_argument(source, name, "expected a regex or string"));
        }
    };

    let inline: String = flags.chars().filter(|c| matches!(c, 'i' | 'm' | 's')).collect();
    let full = if inline.is_empty() {
        pattern.clone()
    } else {
        format!("(?{inline}){pattern}")
    };

    let regex = Regex::new(&full)
        .map_err(|error| CompileError::invalid_argument(source, name, error.to_string()))?;
    Ok(Rule::Pattern(regex, pattern))
}
