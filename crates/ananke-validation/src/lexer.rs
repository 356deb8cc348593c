//! Tokenizer for validation expressions.
//!
//! Recognizes identifiers, string literals (single or double quoted), numeric
//! literals with an optional leading minus, `true`/`false`/`null`, regex
//! literals (`/^[a-z]+$/i`, only where an argument may start) and the
//! punctuation `( ) , .`.

use crate::error::CompileError;

/// Byte range of a token or expression within its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Creates a span.
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns a span covering both `self` and `other`.
    pub const fn to(self, other: Self) -> Self {
        Self {
            start: self.start,
            end: other.end,
        }
    }
}

/// Token kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Regex { pattern: String, flags: String },
    LParen,
    RParen,
    Comma,
    Dot,
}

/// A token and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Tokenizes a validation expression.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let mut lexer = Lexer {
        source,
        chars: source.char_indices().peekable(),
        tokens: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) -> Result<(), CompileError> {
        while let Some(&(start, c)) = self.chars.peek() {
            let kind = match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '\'' | '"' => self.string(start, c)?,
                '/' if self.regex_allowed() => self.regex(start)?,
                '-' | '0'..='9' => self.number(start)?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.ident(),
                other => {
                    return Err(CompileError::unexpected_char(self.source, other, start));
                }
            };
            let end = self.offset();
            self.tokens.push(Token {
                kind,
                span: Span::new(start, end),
            });
        }
        Ok(())
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.chars.next();
        kind
    }

    // A regex literal may only open an argument.
    fn regex_allowed(&self) -> bool {
        matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(TokenKind::LParen | TokenKind::Comma)
        )
    }

    fn string(&mut self, start: usize, quote: char) -> Result<TokenKind, CompileError> {
        self.chars.next();
        let mut value = String::new();
        while let Some((_, c)) = self.chars.next() {
            match c {
                '\\' => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                },
                c if c == quote => return Ok(TokenKind::Str(value)),
                c => value.push(c),
            }
        }
        Err(CompileError::unterminated(self.source, "string", start))
    }

    fn regex(&mut self, start: usize) -> Result<TokenKind, CompileError> {
        self.chars.next();
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            match self.chars.next() {
                Some((_, '\\')) => {
                    pattern.push('\\');
                    if let Some((_, escaped)) = self.chars.next() {
                        pattern.push(escaped);
                    }
                }
                Some((_, '[')) => {
                    in_class = true;
                    pattern.push('[');
                }
                Some((_, ']')) => {
                    in_class = false;
                    pattern.push(']');
                }
                Some((_, '/')) if !in_class => break,
                Some((_, c)) => pattern.push(c),
                None => return Err(CompileError::unterminated(self.source, "regex", start)),
            }
        }

        let mut flags = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            flags.push(c);
            self.chars.next();
        }
        Ok(TokenKind::Regex { pattern, flags })
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, CompileError> {
        let mut text = String::new();
        if let Some(&(_, '-')) = self.chars.peek() {
            text.push('-');
            self.chars.next();
        }
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' || c == '_' || c == 'e' || c == 'E' {
                if c != '_' {
                    text.push(c);
                }
                self.chars.next();
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(TokenKind::Num)
            .map_err(|_| CompileError::invalid_number(self.source, &text, start))
    }

    fn ident(&mut self) -> TokenKind {
        let mut name = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        match name.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(name),
        }
    }
}
