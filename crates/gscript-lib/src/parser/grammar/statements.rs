//! Statement productions.

use crate::diagnostics::DiagnosticCode;
use crate::parser::Parser;
use crate::parser::core::ContextFlag;
use crate::parser::cst::SyntaxKind;
use crate::parser::cst::token_sets::EXPR_FIRST;

impl Parser<'_> {
    /// `{ stmt* }`
    pub(crate) fn parse_block(&mut self) {
        self.start_node(SyntaxKind::Block);
        let open_span = self.current_span();
        self.bump(); // {

        loop {
            match self.peek() {
                SyntaxKind::BraceClose => {
                    self.bump();
                    break;
                }
                SyntaxKind::Error => {
                    self.error_with_related(
                        DiagnosticCode::UnclosedBlock,
                        "unclosed block; expected '}'",
                        "block started here",
                        open_span,
                    );
                    break;
                }
                _ => self.parse_stmt(),
            }
        }

        self.finish_node();
    }

    pub(crate) fn parse_stmt(&mut self) {
        match self.peek() {
            SyntaxKind::Semicolon => {
                self.start_node(SyntaxKind::EmptyStmt);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::BraceOpen => self.parse_block(),
            SyntaxKind::KwIf => self.parse_if(),
            SyntaxKind::KwWhile => self.parse_while(),
            SyntaxKind::KwDo => self.parse_do_while(),
            SyntaxKind::KwFor => self.parse_for(),
            SyntaxKind::KwForeach => self.parse_foreach(),
            SyntaxKind::KwSwitch => self.parse_switch(),
            SyntaxKind::KwReturn => self.parse_return(),
            SyntaxKind::KwWait => self.parse_wait(SyntaxKind::WaitStmt),
            SyntaxKind::KwWaitRealTime => self.parse_wait(SyntaxKind::WaitRealTimeStmt),
            SyntaxKind::KwWaittillFrameEnd => {
                self.start_node(SyntaxKind::WaittillFrameEndStmt);
                self.bump();
                self.expect_semicolon();
                self.finish_node();
            }
            SyntaxKind::KwBreak => self.parse_break(),
            SyntaxKind::KwContinue => self.parse_continue(),
            SyntaxKind::KwConst => self.parse_const(),
            SyntaxKind::DevOpen => self.parse_dev_block_stmts(),
            k if EXPR_FIRST.contains(k) => {
                self.start_node(SyntaxKind::ExprStmt);
                self.parse_expr();
                self.expect_semicolon();
                self.finish_node();
            }
            _ => {
                self.error_msg(DiagnosticCode::UnexpectedToken, "expected a statement");
                self.sync_statement();
            }
        }
    }

    /// `if (cond) stmt [else stmt]` — else-if chains nest through the else arm.
    fn parse_if(&mut self) {
        self.start_node(SyntaxKind::IfStmt);
        self.bump(); // if
        self.parse_condition();
        self.parse_embedded_stmt();

        if self.peek() == SyntaxKind::KwElse {
            self.bump();
            self.parse_embedded_stmt();
        }

        self.finish_node();
    }

    fn parse_while(&mut self) {
        self.start_node(SyntaxKind::WhileStmt);
        self.bump(); // while
        self.parse_condition();
        self.parse_loop_body();
        self.finish_node();
    }

    fn parse_do_while(&mut self) {
        self.start_node(SyntaxKind::DoWhileStmt);
        self.bump(); // do
        self.parse_loop_body();
        self.peek();
        self.expect(SyntaxKind::KwWhile, "'while'");
        self.parse_condition();
        self.expect_semicolon();
        self.finish_node();
    }

    /// `for (init; cond; incr) stmt` — each clause may be empty.
    fn parse_for(&mut self) {
        self.start_node(SyntaxKind::ForStmt);
        self.bump(); // for
        self.peek();
        self.expect(SyntaxKind::ParenOpen, "'('");

        if self.peek() != SyntaxKind::Semicolon {
            self.parse_expr_or_error();
        }
        self.peek();
        self.expect(SyntaxKind::Semicolon, "';'");

        if self.peek() != SyntaxKind::Semicolon {
            self.parse_expr_or_error();
        }
        self.peek();
        self.expect(SyntaxKind::Semicolon, "';'");

        if self.peek() != SyntaxKind::ParenClose {
            self.parse_expr_or_error();
        }
        self.peek();
        self.expect(SyntaxKind::ParenClose, "')'");

        self.parse_loop_body();
        self.finish_node();
    }

    /// `foreach (value in collection)` | `foreach (key, value in collection)`
    fn parse_foreach(&mut self) {
        self.start_node(SyntaxKind::ForeachStmt);
        self.bump(); // foreach
        self.peek();
        self.expect(SyntaxKind::ParenOpen, "'('");

        self.peek();
        self.expect(SyntaxKind::Ident, "a loop variable");
        if self.peek() == SyntaxKind::Comma {
            self.bump();
            self.peek();
            self.expect(SyntaxKind::Ident, "a loop variable");
        }

        self.peek();
        self.expect(SyntaxKind::KwIn, "'in'");
        self.parse_expr_or_error();
        self.peek();
        self.expect(SyntaxKind::ParenClose, "')'");

        self.parse_loop_body();
        self.finish_node();
    }

    /// `switch (expr) { case label: ... default: ... }`
    ///
    /// The body is a flat list of case labels and statements; grouping into
    /// case blocks (and fallthrough detection) happens during CFG construction.
    fn parse_switch(&mut self) {
        self.start_node(SyntaxKind::SwitchStmt);
        self.bump(); // switch
        self.parse_condition();

        self.peek();
        if !self.expect(SyntaxKind::BraceOpen, "'{'") {
            self.finish_node();
            return;
        }

        let newly = self.enter_context_if_newly(ContextFlag::IN_SWITCH_BODY);
        loop {
            match self.peek() {
                SyntaxKind::BraceClose => {
                    self.bump();
                    break;
                }
                SyntaxKind::KwCase => {
                    self.start_node(SyntaxKind::CaseLabel);
                    self.bump();
                    self.parse_expr_or_error();
                    self.peek();
                    self.expect(SyntaxKind::Colon, "':'");
                    self.finish_node();
                }
                SyntaxKind::KwDefault => {
                    self.start_node(SyntaxKind::CaseLabel);
                    self.bump();
                    self.peek();
                    self.expect(SyntaxKind::Colon, "':'");
                    self.finish_node();
                }
                SyntaxKind::Error => {
                    self.error(DiagnosticCode::UnclosedBlock);
                    break;
                }
                _ => self.parse_stmt(),
            }
        }
        self.exit_context_if_was_newly(ContextFlag::IN_SWITCH_BODY, newly);

        self.finish_node();
    }

    fn parse_return(&mut self) {
        self.start_node(SyntaxKind::ReturnStmt);
        self.bump(); // return
        self.peek();
        if self.at_set(EXPR_FIRST) {
            self.parse_expr();
        }
        self.expect_semicolon();
        self.finish_node();
    }

    /// `wait expr;` | `waitrealtime expr;`
    fn parse_wait(&mut self, node: SyntaxKind) {
        self.start_node(node);
        self.bump();
        self.parse_expr_or_error();
        self.expect_semicolon();
        self.finish_node();
    }

    fn parse_break(&mut self) {
        if !self.in_context(ContextFlag::IN_LOOP_BODY)
            && !self.in_context(ContextFlag::IN_SWITCH_BODY)
        {
            self.error(DiagnosticCode::BreakOutsideLoopOrSwitch);
        }
        self.start_node(SyntaxKind::BreakStmt);
        self.bump();
        self.expect_semicolon();
        self.finish_node();
    }

    fn parse_continue(&mut self) {
        if !self.in_context(ContextFlag::IN_LOOP_BODY) {
            self.error(DiagnosticCode::ContinueOutsideLoop);
        }
        self.start_node(SyntaxKind::ContinueStmt);
        self.bump();
        self.expect_semicolon();
        self.finish_node();
    }

    /// `const NAME = expr;`
    fn parse_const(&mut self) {
        self.start_node(SyntaxKind::ConstStmt);
        self.bump(); // const
        self.peek();
        self.expect(SyntaxKind::Ident, "a constant name");
        self.peek();
        self.expect(SyntaxKind::Assign, "'='");
        self.parse_expr_or_error();
        self.expect_semicolon();
        self.finish_node();
    }

    /// Statement-level `/# ... #/`.
    fn parse_dev_block_stmts(&mut self) {
        self.start_node(SyntaxKind::DevBlock);
        let newly = self.enter_context_if_newly(ContextFlag::IN_DEV_BLOCK);
        if !newly {
            self.error(DiagnosticCode::NestedDevBlock);
        }
        self.bump(); // /#

        loop {
            match self.peek() {
                SyntaxKind::DevClose => {
                    self.bump();
                    break;
                }
                SyntaxKind::BraceClose => {
                    // The enclosing block is closing under us; report and leave.
                    self.error(DiagnosticCode::UnclosedDevBlock);
                    break;
                }
                SyntaxKind::Error => {
                    self.error(DiagnosticCode::UnclosedDevBlock);
                    break;
                }
                _ => self.parse_stmt(),
            }
        }

        self.exit_context_if_was_newly(ContextFlag::IN_DEV_BLOCK, newly);
        self.finish_node();
    }

    /// `( expr )` after a statement keyword.
    fn parse_condition(&mut self) {
        self.peek();
        self.expect(SyntaxKind::ParenOpen, "'('");
        self.parse_expr_or_error();
        self.peek();
        self.expect(SyntaxKind::ParenClose, "')'");
    }

    /// Single statement or block in if/loop position.
    fn parse_embedded_stmt(&mut self) {
        match self.peek() {
            SyntaxKind::BraceClose | SyntaxKind::Error => {
                self.error_msg(DiagnosticCode::UnexpectedToken, "expected a statement");
            }
            _ => self.parse_stmt(),
        }
    }

    fn parse_loop_body(&mut self) {
        let newly = self.enter_context_if_newly(ContextFlag::IN_LOOP_BODY);
        self.parse_embedded_stmt();
        self.exit_context_if_was_newly(ContextFlag::IN_LOOP_BODY, newly);
    }
}
