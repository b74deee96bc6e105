//! Lexer tests using rstest for parameterization.

use jobsh_kernel::lexer::{LexErrorKind, Token, tokenize};
use rstest::rstest;

/// Format a Token into the test format string.
fn format_token(token: &Token) -> String {
    match token {
        Token::Word(w) => format!("WORD({w})"),
        Token::Number(n) => format!("NUM({n})"),
    }
}

fn run_lexer_test(input: &str, expected: &[&str]) {
    let tokens = tokenize(input)
        .unwrap_or_else(|e| panic!("lexer failed on {input:?}: {e}"));
    let actual: Vec<String> = tokens.iter().map(|t| format_token(&t.token)).collect();
    assert_eq!(actual, expected, "input: {input:?}");
}

#[rstest]
#[case::dex("dex", &["WORD(dex)"])]
#[case::dex_multi("dex-multi", &["WORD(dex-multi)"])]
#[case::fib("fib", &["WORD(fib)"])]
#[case::fib_multi("fib-multi", &["WORD(fib-multi)"])]
#[case::job("job", &["WORD(job)"])]
#[case::kill("kill", &["WORD(kill)"])]
#[case::dash("dash", &["WORD(dash)"])]
#[case::quit("quit", &["WORD(quit)"])]
#[case::unknown_word("frobnicate", &["WORD(frobnicate)"])]
#[case::mixed_case_tail("fooBar_2", &["WORD(fooBar_2)"])]
fn lexer_words(#[case] input: &str, #[case] expected: &[&str]) {
    run_lexer_test(input, expected);
}

#[rstest]
#[case::zero("0", &["NUM(0)"])]
#[case::leading_zeros("007", &["NUM(7)"])]
#[case::large("18446744073709551615", &["NUM(18446744073709551615)"])]
fn lexer_numbers(#[case] input: &str, #[case] expected: &[&str]) {
    run_lexer_test(input, expected);
}

#[rstest]
#[case::command("fib 10", &["WORD(fib)", "NUM(10)"])]
#[case::variadic("dex-multi 1 2 3", &["WORD(dex-multi)", "NUM(1)", "NUM(2)", "NUM(3)"])]
#[case::tabs("kill\t\t4", &["WORD(kill)", "NUM(4)"])]
#[case::padded("   dash   ", &["WORD(dash)"])]
#[case::blank("", &[])]
#[case::whitespace_only(" \t ", &[])]
fn lexer_sequences(#[case] input: &str, #[case] expected: &[&str]) {
    run_lexer_test(input, expected);
}

#[rstest]
#[case::negative("fib -1", LexErrorKind::UnexpectedCharacter, 5)]
#[case::uppercase("Quit", LexErrorKind::UnexpectedCharacter, 1)]
#[case::punctuation("job 1;", LexErrorKind::UnexpectedCharacter, 6)]
#[case::underscore_start("fib 5 _", LexErrorKind::UnexpectedCharacter, 7)]
#[case::non_ascii("fib é", LexErrorKind::UnexpectedCharacter, 5)]
#[case::overflow("dex 18446744073709551616", LexErrorKind::NumberTooLarge, 5)]
fn lexer_errors(#[case] input: &str, #[case] kind: LexErrorKind, #[case] column: usize) {
    let err = tokenize(input).expect_err("lexer should fail");
    assert_eq!(err.kind, kind, "input: {input:?}");
    assert_eq!(err.column, column, "input: {input:?}");
}
