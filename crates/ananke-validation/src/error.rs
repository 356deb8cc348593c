//! Compile-time and validation-time errors.

use ananke_core::AnankeError;
use serde::Serialize;
use thiserror::Error;

/// Message of the bad request raised when validation fails.
pub const INVALID_PARAMETERS_MESSAGE: &str = "One or more parameters are invalid";

/// A validation expression could not be compiled.
///
/// This is a configuration defect and should surface when a handler or
/// method is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The expression contains a character outside the grammar.
    #[error("\"{expression}\" is not a valid validator string: unexpected character `{found}` at offset {offset}")]
    UnexpectedChar {
        /// The full expression.
        expression: String,
        /// The offending character.
        found: char,
        /// Byte offset of the character.
        offset: usize,
    },

    /// A string or regex literal is not closed.
    #[error("\"{expression}\" is not a valid validator string: unterminated {what} starting at offset {offset}")]
    Unterminated {
        /// The full expression.
        expression: String,
        /// What kind of literal was left open.
        what: &'static str,
        /// Byte offset of the literal.
        offset: usize,
    },

    /// The expression does not follow the `name(args).name(args)` shape.
    #[error("\"{expression}\" is not a valid validator string: {reason}")]
    Syntax {
        /// The full expression.
        expression: String,
        /// What went wrong.
        reason: String,
    },

    /// A builder member does not exist on the current builder.
    #[error("\"{expression}\" is not a valid validator string because of \"{member}\"")]
    UnknownMember {
        /// The full expression.
        expression: String,
        /// The unrecognized name.
        member: String,
    },

    /// A builder member was given arguments it cannot use.
    #[error("\"{expression}\" is not a valid validator string: invalid arguments to \"{member}\": {reason}")]
    InvalidArgument {
        /// The full expression.
        expression: String,
        /// The member that rejected its arguments.
        member: String,
        /// Why the arguments were rejected.
        reason: String,
    },
}

impl CompileError {
    pub(crate) fn unexpected_char(source: &str, found: char, offset: usize) -> Self {
        Self::UnexpectedChar {
            expression: source.to_string(),
            found,
            offset,
        }
    }

    pub(crate) fn unterminated(source: &str, what: &'static str, offset: usize) -> Self {
        Self::Unterminated {
            expression: source.to_string(),
            what,
            offset,
        }
    }

    pub(crate) fn invalid_number(source: &str, text: &str, offset: usize) -> Self {
        Self::Syntax {
            expression: source.to_string(),
            reason: format!("invalid number `{text}` at offset {offset}"),
        }
    }

    pub(crate) fn syntax(source: &str, reason: impl Into<String>) -> Self {
        Self::Syntax {
            expression: source.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_member(source: &str, member: &str) -> Self {
        Self::UnknownMember {
            expression: source.to_string(),
            member: member.to_string(),
        }
    }

    pub(crate) fn invalid_argument(source: &str, member: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            expression: source.to_string(),
            member: member.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns the expression that failed to compile.
    pub fn expression(&self) -> &str {
        match self {
            Self::UnexpectedChar { expression, .. }
            | Self::Unterminated { expression, .. }
            | Self::Syntax { expression, .. }
            | Self::UnknownMember { expression, .. }
            | Self::InvalidArgument { expression, .. } => expression,
        }
    }
}

impl From<CompileError> for AnankeError {
    fn from(error: CompileError) -> Self {
        AnankeError::internal_with_source("Validation schema could not be compiled", error)
    }
}

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Joi-style message, e.g. `"name" is required`.
    pub message: String,
    /// Path of the failing value, e.g. `tags[0]`.
    pub path: String,
}

/// Every failure found while validating one value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_messages(.details))]
pub struct ValidationErrors {
    /// One entry per failing field, in schema order.
    pub details: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Returns the messages of every failure.
    pub fn messages(&self) -> Vec<String> {
        self.details.iter().map(|d| d.message.clone()).collect()
    }

    /// Returns `true` if a failure was recorded for `path`.
    pub fn has_path(&self, path: &str) -> bool {
        self.details.iter().any(|d| d.path == path)
    }
}

fn join_messages(details: &[ValidationError]) -> String {
    details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join(". ")
}

impl From<ValidationErrors> for AnankeError {
    fn from(errors: ValidationErrors) -> Self {
        AnankeError::bad_request_with_details(INVALID_PARAMETERS_MESSAGE, errors.messages())
    }
}
