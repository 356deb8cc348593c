//! Parser producing the expression tree of a validation string.
//!
//! Grammar:
//!
//! ```text
//! expr    := primary ( "." IDENT call? )*
//! primary := IDENT call? | literal
//! call    := "(" ( expr ( "," expr )* ","? )? ")"
//! literal := STRING | NUMBER | true | false | null | REGEX
//! ```

use serde_json::Value;

use crate::error::CompileError;
use crate::lexer::{tokenize, Span, Token, TokenKind};
use crate::schema::json_number;

/// A node of the expression tree. Every node keeps its source span so nested
/// schema arguments can be recompiled from their own text.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A JSON literal argument.
    Literal { value: Value, span: Span },
    /// A `/pattern/flags` argument.
    Regex {
        pattern: String,
        flags: String,
        span: Span,
    },
    /// A bare name, e.g. the `string` in `string()`.
    Ident { name: String, span: Span },
    /// `object.property`
    Member {
        object: Box<Expr>,
        property: String,
        span: Span,
    },
    /// `callee(args)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    /// Returns the source span of this node.
    pub const fn span(&self) -> Span {
        match self {
            Self::Literal { span, .. }
            | Self::Regex { span, .. }
            | Self::Ident { span, .. }
            | Self::Member { span, .. }
            | Self::Call { span, .. } => *span,
        }
    }
}

/// Parses a full validation expression.
pub fn parse(source: &str) -> Result<Expr, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let expr = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(CompileError::syntax(
            source,
            format!("unexpected trailing input at offset {}", token.span.start),
        ));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> Result<Span, CompileError> {
        match self.advance() {
            Some(token) if &token.kind == expected => Ok(token.span),
            Some(token) => Err(CompileError::syntax(
                self.source,
                format!("expected {what} at offset {}", token.span.start),
            )),
            None => Err(CompileError::syntax(
                self.source,
                format!("expected {what} at end of input"),
            )),
        }
    }

    fn ident(&mut self) -> Result<(String, Span), CompileError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => Ok((name, span)),
            Some(token) => Err(CompileError::syntax(
                self.source,
                format!("expected a name at offset {}", token.span.start),
            )),
            None => Err(CompileError::syntax(self.source, "expected a name at end of input")),
        }
    }

    fn expr(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        while self.peek_kind() == Some(&TokenKind::Dot) {
            self.advance();
            let (property, span) = self.ident()?;
            expr = Expr::Member {
                span: expr.span().to(span),
                object: Box::new(expr),
                property,
            };
            expr = self.maybe_call(expr)?;
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let Some(token) = self.advance() else {
            return Err(CompileError::syntax(self.source, "empty expression"));
        };
        let span = token.span;
        let expr = match token.kind {
            TokenKind::Ident(name) => return self.maybe_call(Expr::Ident { name, span }),
            TokenKind::Str(text) => Expr::Literal {
                value: Value::String(text),
                span,
            },
            TokenKind::Num(number) => Expr::Literal {
                value: json_number(number),
                span,
            },
            TokenKind::Bool(flag) => Expr::Literal {
                value: Value::Bool(flag),
                span,
            },
            TokenKind::Null => Expr::Literal {
                value: Value::Null,
                span,
            },
            TokenKind::Regex { pattern, flags } => Expr::Regex {
                pattern,
                flags,
                span,
            },
            _ => {
                return Err(CompileError::syntax(
                    self.source,
                    format!("unexpected token at offset {}", span.start),
                ))
            }
        };
        Ok(expr)
    }

    fn maybe_call(&mut self, callee: Expr) -> Result<Expr, CompileError> {
        if self.peek_kind() != Some(&TokenKind::LParen) {
            return Ok(callee);
        }
        self.advance();

        let mut args = Vec::new();
        while self.peek_kind() != Some(&TokenKind::RParen) {
            args.push(self.expr()?);
            if self.peek_kind() == Some(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let close = self.expect(&TokenKind::RParen, "`)`")?;

        Ok(Expr::Call {
            span: callee.span().to(close),
            callee: Box::new(callee),
            args,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chain() {
        let expr = parse("string().required()").unwrap();
        let Expr::Call { callee, args, span } = expr else {
            panic!("expected a call");
        };
        assert!(args.is_empty());
        assert_eq!(span, Span::new(0, 19));
        assert!(matches!(*callee, Expr::Member { ref property, .. } if property == "required"));
    }

    #[test]
    fn test_nested_argument_span() {
        let source = "array().items(string().min(2))";
        let Expr::Call { args, .. } = parse(source).unwrap() else {
            panic!("expected a call");
        };
        let span = args[0].span();
        assert_eq!(&source[span.start..span.end], "string().min(2)");
    }

    #[test]
    fn test_property_access_without_call() {
        let expr = parse("Joi.string").unwrap();
        assert!(matches!(expr, Expr::Member { ref property, .. } if property == "string"));
    }

    #[test]
    fn test_literal_arguments() {
        let Expr::Call { args, .. } = parse("valid('a', 2, 2.5, false, null,)").unwrap() else {
            panic!("expected a call");
        };
        let values: Vec<Value> = args
            .into_iter()
            .map(|arg| match arg {
                Expr::Literal { value, .. } => value,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![
            Value::from("a"),
            Value::from(2),
            Value::from(2.5),
            Value::Bool(false),
            Value::Null,
        ]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse("").is_err());
        assert!(parse("string(").is_err());
        assert!(parse("string() string()").is_err());
        assert!(parse("string().(1)").is_err());
    }
}
