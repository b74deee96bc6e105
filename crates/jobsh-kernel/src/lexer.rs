//! Lexer for jobsh command lines.
//!
//! Converts a single input line into a stream of tokens using the logos lexer
//! generator. Only two token families exist:
//!
//! - **Words**: a lowercase letter followed by letters, digits, `_` or `-`
//!   (`dex`, `fib-multi`)
//! - **Numbers**: a run of decimal digits (`42`)
//!
//! Whitespace is skipped. Anything else is a lexing failure reported with the
//! column of the offending character.

use logos::{Logos, Span};
use std::fmt;

/// A token with its span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(token: T, span: Span) -> Self {
        Self { token, span }
    }
}

/// What went wrong while lexing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    UnexpectedCharacter,
    /// A digit run that does not fit in 64 bits.
    NumberTooLarge,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnexpectedCharacter => write!(f, "unexpected character"),
            LexErrorKind::NumberTooLarge => write!(f, "number too large"),
        }
    }
}

/// A lexing failure, located in the input line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} {fragment:?} at column {column}")]
pub struct LexError {
    pub kind: LexErrorKind,
    /// 1-based character column of the first offending character.
    pub column: usize,
    /// The text that failed to lex.
    pub fragment: String,
}

/// Tokens produced by the jobsh lexer.
#[derive(Logos, Debug, Clone, PartialEq, Eq, Hash)]
#[logos(error = LexErrorKind)]
#[logos(skip r"\s+")]
pub enum Token {
    #[regex(r"[a-z][A-Za-z0-9_\-]*", |lex| lex.slice().to_string())]
    Word(String),

    #[regex(r"[0-9]+", |lex| lex.slice().parse::<u64>().map_err(|_| LexErrorKind::NumberTooLarge))]
    Number(u64),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(w) => write!(f, "{w}"),
            Token::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Tokenize a line, dropping whitespace.
///
/// Stops at the first error; the rest of the line is not examined.
pub fn tokenize(source: &str) -> Result<Vec<Spanned<Token>>, LexError> {
    let mut tokens = Vec::new();

    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push(Spanned::new(token, span)),
            Err(kind) => {
                return Err(LexError {
                    kind,
                    column: source[..span.start].chars().count() + 1,
                    fragment: source[span].to_string(),
                });
            }
        }
    }

    Ok(tokens)
}
