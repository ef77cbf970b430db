//! Parser infrastructure for GSC/CSC.
//!
//! # Architecture
//!
//! This parser produces a lossless concrete syntax tree (CST) via Rowan's green tree builder:
//!
//! - Zero-copy lexing: tokens carry spans, text sliced only when building tree nodes
//! - Trivia buffering: whitespace/comments collected, then attached as leading trivia
//! - Checkpoint-based wrapping: retroactively wrap nodes for binary operators and call chains
//! - Context flags: a bitset gates contextual statements (`break`, `continue`, dev blocks)
//!
//! # Recovery Strategy
//!
//! The parser is resilient — it always produces a tree. Recovery follows these rules:
//!
//! 1. Missing expected tokens emit a diagnostic but don't consume (parent may handle)
//! 2. A failed definition resynchronizes to the FIRST set of script-level items
//! 3. A failed statement resynchronizes past the next `;` or to a brace boundary
//! 4. Diagnostics are suppressed while resynchronizing, and deduplicated per position
//!
//! Fuel exhaustion (exec fuel, recursion fuel) returns an actual error immediately.

pub mod ast;
mod cst;
mod lexer;

mod core;
mod grammar;
mod invariants;

#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod tests;

pub use cst::{GscLang, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, TokenSet, token_sets};

pub use ast::{Expr, Item, Script, Stmt, SwitchElement};

pub use core::{ParseResult, Parser};

pub use lexer::{Token, lex, token_text};
