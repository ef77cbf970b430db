//! Script-level items: directives, function and class definitions, dev blocks.

use crate::diagnostics::DiagnosticCode;
use crate::parser::Parser;
use crate::parser::core::ContextFlag;
use crate::parser::cst::SyntaxKind;

impl Parser<'_> {
    pub(crate) fn parse_script(&mut self) {
        self.start_node(SyntaxKind::Script);

        while !self.should_stop() {
            self.parse_item();
        }

        self.eat_trivia();
        self.finish_node();
    }

    fn parse_item(&mut self) {
        match self.peek() {
            SyntaxKind::UsingDirective => self.parse_using(),
            SyntaxKind::InsertDirective => self.parse_insert(),
            SyntaxKind::NamespaceDirective => self.parse_namespace(),
            SyntaxKind::PrecacheDirective => self.parse_precache(),
            SyntaxKind::AnimTreeDirective => self.parse_using_animtree(),
            SyntaxKind::KwFunction => self.parse_function(),
            SyntaxKind::KwClass => self.parse_class(),
            SyntaxKind::DevOpen => self.parse_dev_block_items(),
            SyntaxKind::Error => {}
            _ => {
                self.error(DiagnosticCode::ExpectedScriptDefn);
                self.sync_to_item();
            }
        }
    }

    /// `#using path\to\script;`
    ///
    /// Path segments must be contiguous: the loop advances on raw tokens so
    /// whitespace between segments ends the path instead of being skipped.
    fn parse_using(&mut self) {
        self.start_node(SyntaxKind::Using);
        self.bump(); // #using
        self.parse_path();
        self.expect_semicolon();
        self.finish_node();
    }

    /// `#insert path\to\shared.gsh;`
    fn parse_insert(&mut self) {
        self.start_node(SyntaxKind::Insert);
        self.bump(); // #insert
        self.parse_path();
        self.expect_semicolon();
        self.finish_node();
    }

    fn parse_path(&mut self) {
        self.start_node(SyntaxKind::Path);
        if self.peek() != SyntaxKind::Ident {
            self.error(DiagnosticCode::InvalidUsingPath);
            self.finish_node();
            return;
        }
        self.bump();

        // Raw advance: `current()` does not skip trivia here, so a gap in the
        // path terminates the loop.
        while matches!(
            self.current(),
            SyntaxKind::Backslash | SyntaxKind::Slash | SyntaxKind::Dot
        ) {
            self.bump();
            if self.current() == SyntaxKind::Ident {
                self.bump();
            } else {
                self.error(DiagnosticCode::InvalidUsingPath);
                break;
            }
        }
        self.finish_node();
    }

    /// `#namespace name;`
    fn parse_namespace(&mut self) {
        self.start_node(SyntaxKind::Namespace);
        self.bump(); // #namespace
        self.peek();
        self.expect(SyntaxKind::Ident, "a namespace name");
        self.expect_semicolon();
        self.finish_node();
    }

    /// `#precache("type", "name");`
    fn parse_precache(&mut self) {
        self.start_node(SyntaxKind::Precache);
        self.bump(); // #precache
        self.peek();
        self.expect(SyntaxKind::ParenOpen, "'('");
        self.peek();
        self.expect(SyntaxKind::StringLit, "an asset type string");
        self.peek();
        self.expect(SyntaxKind::Comma, "','");
        self.peek();
        self.expect(SyntaxKind::StringLit, "an asset name string");
        self.peek();
        self.expect(SyntaxKind::ParenClose, "')'");
        self.expect_semicolon();
        self.finish_node();
    }

    /// `#using_animtree("tree");`
    fn parse_using_animtree(&mut self) {
        self.start_node(SyntaxKind::UsingAnimTree);
        self.bump(); // #using_animtree
        self.peek();
        self.expect(SyntaxKind::ParenOpen, "'('");
        self.peek();
        self.expect(SyntaxKind::StringLit, "an animtree name string");
        self.peek();
        self.expect(SyntaxKind::ParenClose, "')'");
        self.expect_semicolon();
        self.finish_node();
    }

    /// `function [private] [autoexec] name(params) { ... }`
    pub(crate) fn parse_function(&mut self) {
        self.start_node(SyntaxKind::FunDefn);
        self.bump(); // function

        while matches!(
            self.peek(),
            SyntaxKind::KwPrivate | SyntaxKind::KwAutoexec
        ) {
            self.bump();
        }

        if !self.expect(SyntaxKind::Ident, "a function name") {
            // No name: bail out to the next item so a stray `function` keyword
            // does not swallow the rest of the script.
            self.sync_to_item();
            self.finish_node();
            return;
        }

        self.parse_param_list();

        let newly = self.enter_context_if_newly(ContextFlag::IN_FUNCTION_BODY);
        if self.peek() == SyntaxKind::BraceOpen {
            self.parse_block();
        } else {
            self.error_msg(DiagnosticCode::ExpectedToken, "expected '{'");
            self.sync_to_item();
        }
        self.exit_context_if_was_newly(ContextFlag::IN_FUNCTION_BODY, newly);

        self.finish_node();
    }

    fn parse_param_list(&mut self) {
        self.start_node(SyntaxKind::ParamList);
        self.peek();
        self.expect(SyntaxKind::ParenOpen, "'('");

        loop {
            match self.peek() {
                SyntaxKind::ParenClose => {
                    self.bump();
                    break;
                }
                SyntaxKind::Comma => {
                    self.bump();
                }
                SyntaxKind::Amp | SyntaxKind::Ident | SyntaxKind::Ellipsis => {
                    self.parse_param();
                }
                SyntaxKind::Error | SyntaxKind::BraceOpen => {
                    // EOF or the body already started; let the caller continue.
                    self.error_msg(DiagnosticCode::ExpectedToken, "expected ')'");
                    break;
                }
                _ => {
                    self.error_and_bump_msg(
                        DiagnosticCode::UnexpectedToken,
                        "expected a parameter",
                    );
                }
            }
        }

        self.finish_node();
    }

    /// `name` | `&name` | `name = default` | `...`
    fn parse_param(&mut self) {
        self.start_node(SyntaxKind::Param);

        if self.peek() == SyntaxKind::Ellipsis {
            self.bump();
            self.finish_node();
            return;
        }

        if self.peek() == SyntaxKind::Amp {
            self.bump();
        }
        self.peek();
        self.expect(SyntaxKind::Ident, "a parameter name");

        if self.peek() == SyntaxKind::Assign {
            self.bump();
            self.parse_expr_or_error();
        }

        self.finish_node();
    }

    /// `class Name [: Parent] { var member; constructor() {} function method() {} }`
    fn parse_class(&mut self) {
        self.start_node(SyntaxKind::ClassDefn);
        self.bump(); // class

        if !self.expect(SyntaxKind::Ident, "a class name") {
            self.sync_to_item();
            self.finish_node();
            return;
        }

        if self.peek() == SyntaxKind::Colon {
            self.bump();
            self.peek();
            self.expect(SyntaxKind::Ident, "a parent class name");
        }

        self.peek();
        if !self.expect(SyntaxKind::BraceOpen, "'{'") {
            self.sync_to_item();
            self.finish_node();
            return;
        }

        loop {
            match self.peek() {
                SyntaxKind::BraceClose => {
                    self.bump();
                    break;
                }
                SyntaxKind::KwVar => self.parse_member_decl(),
                SyntaxKind::KwConstructor | SyntaxKind::KwDestructor => self.parse_structor(),
                SyntaxKind::KwFunction => self.parse_function(),
                SyntaxKind::Error => {
                    self.error(DiagnosticCode::UnclosedBlock);
                    break;
                }
                _ => {
                    self.error_and_bump_msg(
                        DiagnosticCode::UnexpectedToken,
                        "expected 'var', 'constructor', 'destructor' or 'function'",
                    );
                }
            }
        }

        self.finish_node();
    }

    /// `var name;`
    fn parse_member_decl(&mut self) {
        self.start_node(SyntaxKind::MemberDecl);
        self.bump(); // var
        self.peek();
        self.expect(SyntaxKind::Ident, "a member name");
        self.expect_semicolon();
        self.finish_node();
    }

    /// `constructor() { ... }` | `destructor() { ... }`
    fn parse_structor(&mut self) {
        self.start_node(SyntaxKind::Structor);
        self.bump(); // constructor / destructor
        self.parse_param_list();

        let newly = self.enter_context_if_newly(ContextFlag::IN_FUNCTION_BODY);
        if self.peek() == SyntaxKind::BraceOpen {
            self.parse_block();
        } else {
            self.error_msg(DiagnosticCode::ExpectedToken, "expected '{'");
        }
        self.exit_context_if_was_newly(ContextFlag::IN_FUNCTION_BODY, newly);

        self.finish_node();
    }

    /// Top-level `/# ... #/`: wraps further script items.
    fn parse_dev_block_items(&mut self) {
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
                SyntaxKind::Error => {
                    self.error(DiagnosticCode::UnclosedDevBlock);
                    break;
                }
                _ => self.parse_item(),
            }
        }

        self.exit_context_if_was_newly(ContextFlag::IN_DEV_BLOCK, newly);
        self.finish_node();
    }
}
