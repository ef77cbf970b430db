//! Parser state machine and low-level operations.

use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

use super::ast::Script;
use super::cst::token_sets::ITEM_FIRST;
use super::cst::{SyntaxKind, SyntaxNode, TokenSet};
use super::lexer::{Token, token_text};
use crate::diagnostics::{DiagnosticCode, Diagnostics};

use crate::Error;

#[derive(Debug)]
pub struct ParseResult {
    pub script: Script,
    pub diagnostics: Diagnostics,
    pub exec_fuel_consumed: u32,
}

/// Statement-legality context, tracked as a small bitset.
///
/// `enter_if_newly` / `exit_if_was_newly` are symmetric so that nested
/// constructs of the same kind (a switch inside a switch) neither
/// double-set nor clear the flag early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextFlag(u8);

impl ContextFlag {
    pub const IN_FUNCTION_BODY: ContextFlag = ContextFlag(1 << 0);
    pub const IN_SWITCH_BODY: ContextFlag = ContextFlag(1 << 1);
    pub const IN_LOOP_BODY: ContextFlag = ContextFlag(1 << 2);
    pub const IN_DEV_BLOCK: ContextFlag = ContextFlag(1 << 3);
}

/// Trivia tokens (whitespace, comments) are buffered and flushed as leading trivia
/// when starting a new node. This gives predictable trivia attachment without backtracking.
pub struct Parser<'src> {
    pub(super) source: &'src str,
    pub(super) tokens: Vec<Token>,
    pub(super) pos: usize,
    pub(super) trivia_buffer: Vec<Token>,
    pub(super) builder: GreenNodeBuilder<'static>,
    pub(super) diagnostics: Diagnostics,
    pub(super) depth: u32,
    pub(super) last_diagnostic_pos: Option<TextSize>,
    pub(super) silent: bool,
    context: u8,
    pub(super) debug_fuel: std::cell::Cell<u32>,
    exec_fuel_initial: Option<u32>,
    exec_fuel_remaining: Option<u32>,
    recursion_fuel_limit: Option<u32>,
    fatal_error: Option<Error>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            trivia_buffer: Vec::with_capacity(4),
            builder: GreenNodeBuilder::new(),
            diagnostics: Diagnostics::new(),
            depth: 0,
            last_diagnostic_pos: None,
            silent: false,
            context: 0,
            debug_fuel: std::cell::Cell::new(256),
            exec_fuel_initial: None,
            exec_fuel_remaining: None,
            recursion_fuel_limit: None,
            fatal_error: None,
        }
    }

    pub fn with_exec_fuel(mut self, limit: Option<u32>) -> Self {
        self.exec_fuel_initial = limit;
        self.exec_fuel_remaining = limit;
        self
    }

    pub fn with_recursion_fuel(mut self, limit: Option<u32>) -> Self {
        self.recursion_fuel_limit = limit;
        self
    }

    pub fn parse(mut self) -> Result<ParseResult, Error> {
        self.parse_script();
        let (cst, diagnostics, exec_fuel_consumed) = self.finish()?;
        let script =
            Script::cast(SyntaxNode::new_root(cst)).expect("parser always produces Script");
        Ok(ParseResult {
            script,
            diagnostics,
            exec_fuel_consumed,
        })
    }

    fn finish(mut self) -> Result<(GreenNode, Diagnostics, u32), Error> {
        self.drain_trivia();
        if let Some(err) = self.fatal_error {
            return Err(err);
        }
        let exec_fuel_consumed = match (self.exec_fuel_initial, self.exec_fuel_remaining) {
            (Some(initial), Some(remaining)) => initial.saturating_sub(remaining),
            _ => 0,
        };
        Ok((self.builder.finish(), self.diagnostics, exec_fuel_consumed))
    }

    pub(super) fn has_fatal_error(&self) -> bool {
        self.fatal_error.is_some()
    }

    /// Returns `Error` at EOF (acts as sentinel).
    pub(super) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    fn reset_debug_fuel(&self) {
        self.debug_fuel.set(256);
    }

    pub(super) fn nth(&self, lookahead: usize) -> SyntaxKind {
        self.ensure_progress();

        self.tokens
            .get(self.pos + lookahead)
            .map_or(SyntaxKind::Error, |t| t.kind)
    }

    fn consume_exec_fuel(&mut self) {
        if let Some(ref mut remaining) = self.exec_fuel_remaining {
            if *remaining == 0 {
                if self.fatal_error.is_none() {
                    self.fatal_error = Some(Error::ExecFuelExhausted);
                }
                return;
            }
            *remaining -= 1;
        }
    }

    pub(super) fn current_span(&self) -> TextRange {
        self.tokens
            .get(self.pos)
            .map_or_else(|| TextRange::empty(self.eof_offset()), |t| t.span)
    }

    pub(super) fn eof_offset(&self) -> TextSize {
        TextSize::from(self.source.len() as u32)
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(super) fn should_stop(&self) -> bool {
        self.eof() || self.has_fatal_error()
    }

    pub(super) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(super) fn at_set(&self, set: TokenSet) -> bool {
        set.contains(self.current())
    }

    pub(super) fn peek(&mut self) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        self.current()
    }

    /// LL(k) lookahead past trivia.
    pub(super) fn peek_nth(&mut self, n: usize) -> SyntaxKind {
        self.skip_trivia_to_buffer();
        let mut count = 0;
        let mut pos = self.pos;
        while pos < self.tokens.len() {
            let kind = self.tokens[pos].kind;
            if !kind.is_trivia() {
                if count == n {
                    return kind;
                }
                count += 1;
            }
            pos += 1;
        }
        SyntaxKind::Error
    }

    pub(super) fn skip_trivia_to_buffer(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.trivia_buffer.push(self.tokens[self.pos]);
            self.pos += 1;
        }
    }

    pub(super) fn drain_trivia(&mut self) {
        for token in self.trivia_buffer.drain(..) {
            let text = token_text(self.source, &token);
            self.builder.token(token.kind.into(), text);
        }
    }

    pub(super) fn eat_trivia(&mut self) {
        self.skip_trivia_to_buffer();
        self.drain_trivia();
    }

    pub(super) fn start_node(&mut self, kind: SyntaxKind) {
        self.drain_trivia();
        self.builder.start_node(kind.into());
    }

    /// Wrap previously-parsed content using checkpoint.
    pub(super) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }

    pub(super) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(super) fn checkpoint(&mut self) -> Checkpoint {
        self.drain_trivia();
        self.builder.checkpoint()
    }

    pub(super) fn bump(&mut self) {
        assert!(!self.eof(), "bump called at EOF");

        self.reset_debug_fuel();

        self.consume_exec_fuel();

        // Buffered trivia precedes this token in the source; flush it first
        // so the tree's text stays in source order.
        self.drain_trivia();

        let token = self.tokens[self.pos];
        let text = token_text(self.source, &token);
        self.builder.token(token.kind.into(), text);
        self.pos += 1;
    }

    /// Consume one `]`, splitting a `]]` token in two if needed.
    ///
    /// Nested index expressions like `a[b[0]]` end in two adjacent `]` which
    /// the lexer reads as a single dereference-close token; the parser hands
    /// the first half to the current index and leaves the second for the
    /// enclosing one.
    pub(super) fn bump_close_bracket(&mut self) -> bool {
        if self.at(SyntaxKind::BracketClose) {
            self.bump();
            return true;
        }
        if self.at(SyntaxKind::DoubleBracketClose) {
            self.reset_debug_fuel();
            self.drain_trivia();
            let token = self.tokens[self.pos];
            self.builder.token(SyntaxKind::BracketClose.into(), "]");
            self.tokens[self.pos] = Token::new(
                SyntaxKind::BracketClose,
                TextRange::new(token.span.start() + TextSize::from(1), token.span.end()),
            );
            return true;
        }
        false
    }

    pub(super) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// On mismatch: emit diagnostic but don't consume (allows parent recovery).
    pub(super) fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error_msg(DiagnosticCode::ExpectedToken, format!("expected {}", what));
        false
    }

    /// Statement terminator. The "expected ';'" diagnostic anchors at the end
    /// of the previous non-trivia token rather than the stray current one.
    pub(super) fn expect_semicolon(&mut self) -> bool {
        self.skip_trivia_to_buffer();
        if self.eat(SyntaxKind::Semicolon) {
            return true;
        }
        let anchor = self.last_non_trivia_end().unwrap_or_default();
        self.error_at(
            DiagnosticCode::ExpectedSemiColon,
            TextRange::empty(anchor),
            "expected ';'",
        );
        false
    }

    /// Emit diagnostic with default message for the code.
    pub(super) fn error(&mut self, code: DiagnosticCode) {
        self.error_msg(code, code.default_message());
    }

    /// Emit diagnostic with custom message.
    pub(super) fn error_msg(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        let range = self.current_span();
        self.error_at(code, range, message);
    }

    pub(super) fn error_at(
        &mut self,
        code: DiagnosticCode,
        range: TextRange,
        message: impl Into<String>,
    ) {
        if self.silent {
            return;
        }
        let pos = range.start();
        if self.last_diagnostic_pos == Some(pos) {
            return;
        }
        self.last_diagnostic_pos = Some(pos);
        self.diagnostics.report(code, range).message(message).emit();
    }

    pub(super) fn error_with_related(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        related_msg: impl Into<String>,
        related_range: TextRange,
    ) {
        if self.silent {
            return;
        }
        let range = self.current_span();
        let pos = range.start();
        if self.last_diagnostic_pos == Some(pos) {
            return;
        }
        self.last_diagnostic_pos = Some(pos);
        self.diagnostics
            .report(code, range)
            .message(message)
            .related_to(related_msg, related_range)
            .emit();
    }

    pub(super) fn error_and_bump_msg(&mut self, code: DiagnosticCode, message: &str) {
        self.error_msg(code, message);
        if !self.eof() {
            self.start_node(SyntaxKind::Error);
            self.bump();
            self.finish_node();
        }
    }

    /// Top-level resynchronization: swallow tokens into an Error node until
    /// the FIRST set of script-level items (or EOF). Diagnostics are
    /// suppressed while skipping so one failure reports once.
    pub(super) fn sync_to_item(&mut self) -> bool {
        if self.should_stop() || self.at_item_start() {
            return false;
        }

        let was_silent = self.silent;
        self.silent = true;
        self.start_node(SyntaxKind::Error);
        while !self.should_stop() && !self.at_item_start() {
            self.bump();
            self.skip_trivia_to_buffer();
        }
        self.finish_node();
        self.silent = was_silent;
        true
    }

    fn at_item_start(&mut self) -> bool {
        let kind = self.peek();
        ITEM_FIRST.contains(kind)
    }

    /// Statement-level resynchronization: skip to just past the next `;`,
    /// or stop before a brace boundary.
    pub(super) fn sync_statement(&mut self) {
        if self.should_stop() {
            return;
        }

        let was_silent = self.silent;
        self.silent = true;
        self.start_node(SyntaxKind::Error);
        while !self.should_stop() {
            match self.peek() {
                SyntaxKind::Semicolon => {
                    self.bump();
                    break;
                }
                SyntaxKind::BraceOpen | SyntaxKind::BraceClose | SyntaxKind::DevClose => break,
                _ => self.bump(),
            }
        }
        self.finish_node();
        self.silent = was_silent;
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if let Some(limit) = self.recursion_fuel_limit
            && self.depth >= limit
        {
            if self.fatal_error.is_none() {
                self.fatal_error = Some(Error::RecursionLimitExceeded);
            }
            return false;
        }
        self.depth += 1;
        self.reset_debug_fuel();
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.reset_debug_fuel();
    }

    /// Set `flag`, returning whether it was newly set.
    pub(super) fn enter_context_if_newly(&mut self, flag: ContextFlag) -> bool {
        let newly = self.context & flag.0 == 0;
        self.context |= flag.0;
        newly
    }

    /// Clear `flag` only if this frame set it.
    pub(super) fn exit_context_if_was_newly(&mut self, flag: ContextFlag, was_newly: bool) {
        if was_newly {
            self.context &= !flag.0;
        }
    }

    pub(super) fn in_context(&self, flag: ContextFlag) -> bool {
        self.context & flag.0 != 0
    }

    pub(super) fn last_non_trivia_end(&self) -> Option<TextSize> {
        for i in (0..self.pos).rev() {
            if !self.tokens[i].kind.is_trivia() {
                return Some(self.tokens[i].span.end());
            }
        }
        None
    }
}
