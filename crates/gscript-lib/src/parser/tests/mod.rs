mod grammar;
mod recovery;

use super::core::{ParseResult, Parser};
use super::lexer::lex;

/// Parse with generous limits; panics only on fuel exhaustion, which the
/// tests here never trigger.
pub(super) fn parse(source: &str) -> ParseResult {
    Parser::new(source, lex(source))
        .with_exec_fuel(Some(1_000_000))
        .with_recursion_fuel(Some(1024))
        .parse()
        .expect("within parse limits")
}
