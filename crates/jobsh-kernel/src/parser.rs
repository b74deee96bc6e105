//! Parser for jobsh command lines.
//!
//! Transforms the token stream from the lexer into a single [`Expression`].
//! Uses chumsky parser combinators; the whole token sequence must be consumed.
//!
//! # Grammar
//!
//! ```text
//! expression = dex | dex-multi | fib | fib-multi | job | kill | dash | quit
//! dex        = "dex" NUMBER
//! dex-multi  = "dex-multi" NUMBER*
//! fib        = "fib" NUMBER
//! fib-multi  = "fib-multi" NUMBER*
//! job        = "job" NUMBER
//! kill       = "kill" NUMBER
//! dash       = "dash"
//! quit       = "quit"
//! ```

use crate::ast::{CommandTag, Expression};
use crate::lexer::{self, LexError, Spanned, Token};
use chumsky::{input::ValueInput, prelude::*};

/// Span type used throughout the parser.
pub type Span = SimpleSpan;

/// Parse error with location and context.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {:?}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

/// Anything that stops a line from becoming an [`Expression`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyntaxError {
    #[error("lexer error: {0}")]
    Lex(#[from] LexError),
    #[error("syntax error: {}", join_errors(.0))]
    Parse(Vec<ParseError>),
}

fn join_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Lex and parse one command line.
pub fn parse(source: &str) -> Result<Expression, SyntaxError> {
    let tokens = lexer::tokenize(source)?;
    parse_tokens(&tokens, source.len()).map_err(SyntaxError::Parse)
}

/// Parse an already-lexed line. `end` is the byte length of the source line,
/// used to place end-of-input errors.
pub fn parse_tokens(tokens: &[Spanned<Token>], end: usize) -> Result<Expression, Vec<ParseError>> {
    let tokens: Vec<(Token, Span)> = tokens
        .iter()
        .map(|spanned| (spanned.token.clone(), (spanned.span.start..spanned.span.end).into()))
        .collect();

    let end_span: Span = (end..end).into();

    let parser = expression_parser();
    let result = parser.parse(tokens.as_slice().map(end_span, |(t, s)| (t, s)));

    result.into_result().map_err(|errs| {
        errs.into_iter()
            .map(|e| ParseError {
                span: *e.span(),
                message: e.to_string(),
            })
            .collect()
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Parser Combinators - generic over input type
// ═══════════════════════════════════════════════════════════════════════════

/// Top-level parser: exactly one command followed by end of input.
fn expression_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Expression, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    choice((
        keyword(CommandTag::Dex)
            .ignore_then(number_parser())
            .map(|id| Expression::Dex { id })
            .labelled("dex <N>"),
        keyword(CommandTag::DexMulti)
            .ignore_then(numbers_parser())
            .map(|ids| Expression::DexMulti { ids })
            .labelled("dex-multi <N>..."),
        keyword(CommandTag::Fib)
            .ignore_then(number_parser())
            .map(|nth| Expression::Fib { nth })
            .labelled("fib <N>"),
        keyword(CommandTag::FibMulti)
            .ignore_then(numbers_parser())
            .map(|nths| Expression::FibMulti { nths })
            .labelled("fib-multi <N>..."),
        keyword(CommandTag::JobStatus)
            .ignore_then(index_parser())
            .map(|index| Expression::JobStatus { index })
            .labelled("job <N>"),
        keyword(CommandTag::Kill)
            .ignore_then(index_parser())
            .map(|index| Expression::Kill { index })
            .labelled("kill <N>"),
        keyword(CommandTag::Dash).to(Expression::Dash).labelled("dash"),
        keyword(CommandTag::Quit).to(Expression::Quit).labelled("quit"),
    ))
    .then_ignore(end())
}

/// A command keyword, matched as a whole word.
fn keyword<'tokens, I>(
    tag: CommandTag,
) -> impl Parser<'tokens, I, (), extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    just(Token::Word(tag.keyword().to_string())).ignored()
}

fn number_parser<'tokens, I>(
) -> impl Parser<'tokens, I, u64, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    select! {
        Token::Number(n) => n,
    }
    .labelled("number")
}

/// Zero or more numbers.
fn numbers_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<u64>, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    number_parser().repeated().collect::<Vec<_>>()
}

/// A registry index. Values beyond `usize` saturate and are rejected later as out of range.
fn index_parser<'tokens, I>(
) -> impl Parser<'tokens, I, usize, extra::Err<Rich<'tokens, Token, Span>>> + Clone
where
    I: ValueInput<'tokens, Token = Token, Span = Span>,
{
    number_parser().map(|n| usize::try_from(n).unwrap_or(usize::MAX))
}
