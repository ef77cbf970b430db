//! Expression precedence ladder.
//!
//! Binary levels are parsed with a shared left-associative helper; the
//! call/access level handles the grammar's trickiest corners: `[[ f ]]()`
//! dereference calls, `thread` at either the leading or the called-on
//! position, called-on calls (`ent foo()`, `ent waittill(...)`), and
//! parenthesized heads that turn out to be ternaries or vector literals.

use crate::diagnostics::DiagnosticCode;
use crate::parser::Parser;
use crate::parser::cst::SyntaxKind;
use crate::parser::cst::token_sets::{
    ADDITIVE_OPS, ASSIGN_OPS, EQUALITY_OPS, EXPR_FIRST, MULTIPLICATIVE_OPS, RELATIONAL_OPS,
    SHIFT_OPS,
};

impl Parser<'_> {
    /// Parse an expression, or emit an error if the current token can't start one.
    /// Returns `true` if a valid expression was parsed.
    pub(crate) fn parse_expr_or_error(&mut self) -> bool {
        if self.peek() != SyntaxKind::Error && self.at_set(EXPR_FIRST) {
            self.parse_expr();
            return true;
        }
        self.error_msg(DiagnosticCode::UnexpectedToken, "expected an expression");
        false
    }

    /// Core recursive descent entry: the assignment level.
    pub(crate) fn parse_expr(&mut self) {
        if !self.enter_recursion() {
            self.start_node(SyntaxKind::Error);
            while !self.should_stop() {
                self.bump();
            }
            self.finish_node();
            return;
        }

        let checkpoint = self.checkpoint();
        self.parse_logical_or();

        loop {
            let kind = self.peek();
            if ASSIGN_OPS.contains(kind) {
                self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
                self.bump();
                self.parse_logical_or();
                self.finish_node();
            } else if matches!(kind, SyntaxKind::PlusPlus | SyntaxKind::MinusMinus) {
                self.start_node_at(checkpoint, SyntaxKind::PostfixExpr);
                self.bump();
                self.finish_node();
            } else {
                break;
            }
        }

        self.exit_recursion();
    }

    fn parse_logical_or(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_logical_and();
        while self.peek() == SyntaxKind::PipePipe {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_logical_and();
            self.finish_node();
        }
    }

    fn parse_logical_and(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_bit_or();
        while self.peek() == SyntaxKind::AmpAmp {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_bit_or();
            self.finish_node();
        }
    }

    fn parse_bit_or(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_bit_xor();
        while self.peek() == SyntaxKind::Pipe {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_bit_xor();
            self.finish_node();
        }
    }

    fn parse_bit_xor(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_bit_and();
        while self.peek() == SyntaxKind::Caret {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_bit_and();
            self.finish_node();
        }
    }

    fn parse_bit_and(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_equality();
        // `&` is also the function-reference prefix; as an infix operator it
        // only continues the expression when something can follow it.
        while self.peek() == SyntaxKind::Amp {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_equality();
            self.finish_node();
        }
    }

    fn parse_equality(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_relational();
        while EQUALITY_OPS.contains(self.peek()) {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_relational();
            self.finish_node();
        }
    }

    fn parse_relational(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_shift();
        while RELATIONAL_OPS.contains(self.peek()) {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_shift();
            self.finish_node();
        }
    }

    fn parse_shift(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_additive();
        while SHIFT_OPS.contains(self.peek()) {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_additive();
            self.finish_node();
        }
    }

    fn parse_additive(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_multiplicative();
        while ADDITIVE_OPS.contains(self.peek()) {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_multiplicative();
            self.finish_node();
        }
    }

    fn parse_multiplicative(&mut self) {
        let checkpoint = self.checkpoint();
        self.parse_unary();
        while MULTIPLICATIVE_OPS.contains(self.peek()) {
            self.start_node_at(checkpoint, SyntaxKind::BinaryExpr);
            self.bump();
            self.parse_unary();
            self.finish_node();
        }
    }

    /// Prefix level: unary `+ - ~ !`, `&name` function references, `%anim`,
    /// `new Class()`, and leading `thread`.
    fn parse_unary(&mut self) {
        if !self.enter_recursion() {
            return;
        }

        match self.peek() {
            SyntaxKind::Plus | SyntaxKind::Minus | SyntaxKind::Tilde | SyntaxKind::Bang => {
                self.start_node(SyntaxKind::PrefixExpr);
                self.bump();
                self.parse_unary();
                self.finish_node();
            }
            SyntaxKind::Amp => self.parse_func_ref(),
            SyntaxKind::Percent => {
                self.start_node(SyntaxKind::AnimRefExpr);
                self.bump();
                self.peek();
                self.expect(SyntaxKind::Ident, "an animation name");
                self.finish_node();
            }
            SyntaxKind::KwNew => self.parse_constructor(),
            SyntaxKind::KwThread => {
                self.start_node(SyntaxKind::ThreadExpr);
                self.bump();
                self.parse_postfix();
                self.finish_node();
            }
            _ => self.parse_postfix(),
        }

        self.exit_recursion();
    }

    /// `&name` | `&ns::name`
    fn parse_func_ref(&mut self) {
        self.start_node(SyntaxKind::FuncRefExpr);
        self.bump(); // &
        self.peek();
        self.expect(SyntaxKind::Ident, "a function name");
        if self.peek() == SyntaxKind::ColonColon {
            self.bump();
            self.peek();
            self.expect(SyntaxKind::Ident, "a function name");
        }
        self.finish_node();
    }

    /// `new ClassName()`
    fn parse_constructor(&mut self) {
        self.start_node(SyntaxKind::ConstructorExpr);
        self.bump(); // new
        self.peek();
        self.expect(SyntaxKind::Ident, "a class name");
        self.peek();
        if self.expect(SyntaxKind::ParenOpen, "'('") {
            self.peek();
            if self.at_set(EXPR_FIRST) {
                // Constructors take no arguments; parse them for recovery.
                self.error_msg(
                    DiagnosticCode::TooManyArguments,
                    "constructors take no arguments",
                );
                self.parse_expr();
                while self.peek() == SyntaxKind::Comma {
                    self.bump();
                    self.parse_expr();
                }
            }
            self.peek();
            self.expect(SyntaxKind::ParenClose, "')'");
        }
        self.finish_node();
    }

    /// Call/access level: suffixes `()`, `[ ]`, `.member`, `ns::name`,
    /// `->method()`, plus called-on forms (`target foo()`, `target thread
    /// foo()`, `target waittill(...)`, `target [[ f ]]()`).
    fn parse_postfix(&mut self) {
        let checkpoint = self.checkpoint();
        if !self.parse_primary() {
            return;
        }

        loop {
            match self.peek() {
                SyntaxKind::ParenOpen => {
                    self.start_node_at(checkpoint, SyntaxKind::CallExpr);
                    self.parse_arg_list();
                    self.finish_node();
                }
                SyntaxKind::BracketOpen => {
                    self.start_node_at(checkpoint, SyntaxKind::IndexExpr);
                    self.bump();
                    self.parse_expr_or_error();
                    self.peek();
                    if !self.bump_close_bracket() {
                        self.error_msg(DiagnosticCode::ExpectedToken, "expected ']'");
                    }
                    self.finish_node();
                }
                SyntaxKind::Dot => {
                    self.start_node_at(checkpoint, SyntaxKind::MemberExpr);
                    self.bump();
                    self.peek();
                    self.expect(SyntaxKind::Ident, "a member name");
                    self.finish_node();
                }
                SyntaxKind::ColonColon => {
                    self.start_node_at(checkpoint, SyntaxKind::NsMemberExpr);
                    self.bump();
                    self.peek();
                    self.expect(SyntaxKind::Ident, "a name");
                    self.finish_node();
                }
                SyntaxKind::Arrow => {
                    self.start_node_at(checkpoint, SyntaxKind::MethodCallExpr);
                    self.bump();
                    self.peek();
                    self.expect(SyntaxKind::Ident, "a method name");
                    if self.peek() == SyntaxKind::ParenOpen {
                        self.parse_arg_list();
                    }
                    self.finish_node();
                }
                SyntaxKind::KwThread => {
                    self.start_node_at(checkpoint, SyntaxKind::CalledOnExpr);
                    self.start_node(SyntaxKind::ThreadExpr);
                    self.bump();
                    self.parse_call_part();
                    self.finish_node();
                    self.finish_node();
                }
                SyntaxKind::KwWaittill => {
                    self.start_node_at(checkpoint, SyntaxKind::WaittillExpr);
                    self.bump();
                    if self.peek() == SyntaxKind::ParenOpen {
                        self.parse_arg_list();
                    } else {
                        self.error_msg(DiagnosticCode::ExpectedToken, "expected '('");
                    }
                    self.finish_node();
                }
                SyntaxKind::KwWaittillMatch => {
                    self.start_node_at(checkpoint, SyntaxKind::WaittillMatchExpr);
                    self.bump();
                    if self.peek() == SyntaxKind::ParenOpen {
                        self.parse_arg_list();
                    } else {
                        self.error_msg(DiagnosticCode::ExpectedToken, "expected '('");
                    }
                    self.finish_node();
                }
                SyntaxKind::Ident
                    if matches!(
                        self.peek_nth(1),
                        SyntaxKind::ParenOpen | SyntaxKind::ColonColon
                    ) =>
                {
                    self.start_node_at(checkpoint, SyntaxKind::CalledOnExpr);
                    self.parse_call_part();
                    self.finish_node();
                }
                SyntaxKind::DoubleBracketOpen => {
                    self.start_node_at(checkpoint, SyntaxKind::CalledOnExpr);
                    self.parse_call_part();
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    /// The call following a called-on target or `thread`:
    /// `name(args)`, `ns::name(args)` or `[[ f ]](args)`.
    fn parse_call_part(&mut self) {
        let checkpoint = self.checkpoint();
        match self.peek() {
            SyntaxKind::Ident => {
                self.start_node(SyntaxKind::IdentExpr);
                self.bump();
                self.finish_node();
                if self.peek() == SyntaxKind::ColonColon {
                    self.start_node_at(checkpoint, SyntaxKind::NsMemberExpr);
                    self.bump();
                    self.peek();
                    self.expect(SyntaxKind::Ident, "a function name");
                    self.finish_node();
                }
            }
            SyntaxKind::DoubleBracketOpen => {
                self.parse_deref();
            }
            _ => {
                self.error_msg(DiagnosticCode::ExpectedFunction, "expected a call");
                return;
            }
        }

        if self.peek() == SyntaxKind::ParenOpen {
            self.start_node_at(checkpoint, SyntaxKind::CallExpr);
            self.parse_arg_list();
            self.finish_node();
        } else if self.peek() == SyntaxKind::Arrow {
            self.start_node_at(checkpoint, SyntaxKind::MethodCallExpr);
            self.bump();
            self.peek();
            self.expect(SyntaxKind::Ident, "a method name");
            if self.peek() == SyntaxKind::ParenOpen {
                self.parse_arg_list();
            }
            self.finish_node();
        } else {
            self.error_msg(DiagnosticCode::ExpectedToken, "expected '('");
        }
    }

    /// `[[ expr ]]`
    fn parse_deref(&mut self) {
        self.start_node(SyntaxKind::DerefExpr);
        self.bump(); // [[
        self.parse_expr_or_error();
        self.peek();
        if !self.eat(SyntaxKind::DoubleBracketClose) {
            // `[[ f ] ]` with a space still closes; two singles equal a double.
            if self.eat(SyntaxKind::BracketClose) {
                self.peek();
                self.expect(SyntaxKind::BracketClose, "']]'");
            } else {
                self.error_msg(DiagnosticCode::ExpectedToken, "expected ']]'");
            }
        }
        self.finish_node();
    }

    /// Returns `false` when no expression could be built (nothing consumed).
    fn parse_primary(&mut self) -> bool {
        match self.peek() {
            SyntaxKind::IntLit
            | SyntaxKind::FloatLit
            | SyntaxKind::StringLit
            | SyntaxKind::IStringLit
            | SyntaxKind::HashLit
            | SyntaxKind::KwTrue
            | SyntaxKind::KwFalse
            | SyntaxKind::KwUndefined => {
                self.start_node(SyntaxKind::LiteralExpr);
                self.bump();
                self.finish_node();
                true
            }
            SyntaxKind::Ident => {
                self.start_node(SyntaxKind::IdentExpr);
                self.bump();
                self.finish_node();
                true
            }
            SyntaxKind::ParenOpen => {
                self.parse_paren_vector_or_ternary();
                true
            }
            SyntaxKind::DoubleBracketOpen => {
                self.parse_deref();
                true
            }
            SyntaxKind::BracketOpen => {
                self.parse_array_lit();
                true
            }
            _ => {
                self.error_msg(DiagnosticCode::UnexpectedToken, "expected an expression");
                false
            }
        }
    }

    /// `( expr )` | `( cond ? a : b )` | `( x, y, z )`
    ///
    /// Which one is decided by the token that follows the first expression.
    fn parse_paren_vector_or_ternary(&mut self) {
        let checkpoint = self.checkpoint();
        self.bump(); // (
        self.parse_expr_or_error();

        match self.peek() {
            SyntaxKind::QuestionMark => {
                self.start_node_at(checkpoint, SyntaxKind::TernaryExpr);
                self.bump();
                self.parse_expr_or_error();
                self.peek();
                self.expect(SyntaxKind::Colon, "':'");
                self.parse_expr_or_error();
                self.peek();
                self.expect(SyntaxKind::ParenClose, "')'");
                self.finish_node();
            }
            SyntaxKind::Comma => {
                self.start_node_at(checkpoint, SyntaxKind::VectorExpr);
                self.bump();
                self.parse_expr_or_error();
                self.peek();
                if self.expect(SyntaxKind::Comma, "',' (vectors have three components)") {
                    self.parse_expr_or_error();
                }
                self.peek();
                self.expect(SyntaxKind::ParenClose, "')'");
                self.finish_node();
            }
            _ => {
                self.start_node_at(checkpoint, SyntaxKind::ParenExpr);
                self.peek();
                self.expect(SyntaxKind::ParenClose, "')'");
                self.finish_node();
            }
        }
    }

    /// `[]` — the empty array literal. Elements are parsed for recovery but
    /// GSC arrays are built by indexed assignment, not literals.
    fn parse_array_lit(&mut self) {
        self.start_node(SyntaxKind::ArrayLit);
        self.bump(); // [

        if self.peek() != SyntaxKind::BracketClose {
            self.error_msg(
                DiagnosticCode::UnexpectedToken,
                "array literals are empty; build arrays by assignment",
            );
            while self.peek() != SyntaxKind::Error {
                if self.at(SyntaxKind::BracketClose) {
                    break;
                }
                if self.at_set(EXPR_FIRST) {
                    self.parse_expr();
                } else if self.at(SyntaxKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }

        self.peek();
        self.expect(SyntaxKind::BracketClose, "']'");
        self.finish_node();
    }

    /// `( arg, arg, ... )`
    fn parse_arg_list(&mut self) {
        self.start_node(SyntaxKind::ArgList);
        self.bump(); // (

        loop {
            match self.peek() {
                SyntaxKind::ParenClose => {
                    self.bump();
                    break;
                }
                SyntaxKind::Comma => {
                    self.bump();
                }
                SyntaxKind::Error | SyntaxKind::Semicolon | SyntaxKind::BraceClose => {
                    self.error_msg(DiagnosticCode::ExpectedToken, "expected ')'");
                    break;
                }
                k if EXPR_FIRST.contains(k) => {
                    self.parse_expr();
                }
                _ => {
                    self.error_and_bump_msg(
                        DiagnosticCode::UnexpectedToken,
                        "expected an argument",
                    );
                }
            }
        }

        self.finish_node();
    }
}
