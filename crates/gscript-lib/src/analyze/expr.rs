//! Expression analysis: evaluates AST expressions under an environment,
//! producing a lattice value plus branch facts, and emitting diagnostics.
//!
//! Every failure path returns a best-effort value: semantic errors substitute
//! `Any` or `Error` so later checks continue without cascading noise.

use std::collections::HashSet;

use indexmap::IndexMap;
use rowan::TextRange;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::parser::ast;
use crate::parser::{Expr, Stmt, SyntaxKind};

use super::builtins::{Api, EntityRegistry, Exports, FieldSet, Overload, SpecialCall};
use super::lattice::{Facts, Narrowing, SubType, Ty, TyMask};
use super::sense::{SenseKind, SenseModifiers, SenseToken};
use super::signature::Definitions;
use super::symbol_table::{Env, Lookup, SetOutcome, is_reserved};

/// Read-only surroundings of one function analysis.
pub struct AnalysisContext<'a> {
    pub defs: &'a Definitions,
    pub api: &'a Api,
    pub exports: &'a Exports,
    pub entities: &'a EntityRegistry,
    /// Namespace the analyzed function was declared under.
    pub namespace: String,
    /// Class of the analyzed method, for implicit member resolution.
    pub class: Option<String>,
}

/// Identifier usage gathered during the diagnostic pass, for unused-symbol
/// warnings after the graph has been walked.
#[derive(Debug, Default)]
pub struct Usage {
    pub reads: HashSet<String>,
    /// Declarations seen: lowercased name -> (range, declared-as-parameter).
    pub decls: IndexMap<String, (TextRange, bool)>,
    pub used_namespaces: HashSet<String>,
    /// Origin scripts of resolved imports, for unused-`#using` detection.
    pub used_origins: HashSet<String>,
}

impl Usage {
    pub fn read(&mut self, name: &str) {
        self.reads.insert(name.to_ascii_lowercase());
    }

    pub fn declare(&mut self, name: &str, range: TextRange, is_param: bool) {
        self.decls
            .entry(name.to_ascii_lowercase())
            .or_insert((range, is_param));
    }

    pub fn use_origin(&mut self, origin: &str) {
        self.used_origins.insert(origin.to_ascii_lowercase());
    }
}

/// One statement/expression evaluation pass over an environment.
pub struct ExprAnalyzer<'a> {
    pub ctx: &'a AnalysisContext<'a>,
    pub env: &'a mut Env,
    /// Scope recorded for fresh bindings. GSC locals are function-scoped, so
    /// plain assignments bind at the function-body depth; dev-block and
    /// foreach bindings use the deeper node scope so they prune on exit.
    pub var_scope: u32,
    pub silent: bool,
    pub diag: &'a mut Diagnostics,
    pub usage: Option<&'a mut Usage>,
    pub senses: Option<&'a mut Vec<SenseToken>>,
}

impl ExprAnalyzer<'_> {
    fn report(&mut self, code: DiagnosticCode, range: TextRange, message: String) {
        if !self.silent {
            self.diag.report(code, range).message(message).emit();
        }
    }

    fn note_read(&mut self, name: &str) {
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.read(name);
        }
    }

    fn note_decl(&mut self, name: &str, range: TextRange, is_param: bool) {
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.declare(name, range, is_param);
        }
    }

    fn note_namespace(&mut self, ns: &str) {
        if let Some(usage) = self.usage.as_deref_mut() {
            usage.used_namespaces.insert(ns.to_ascii_lowercase());
        }
    }

    fn sense(&mut self, token: SenseToken) {
        if let Some(senses) = self.senses.as_deref_mut() {
            senses.push(token);
        }
    }

    /// Execute one statement carried by a basic block.
    pub fn exec_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr_stmt) => {
                if let Some(expr) = expr_stmt.expr() {
                    self.check_expression_statement(&expr);
                    self.eval(&expr);
                }
            }
            Stmt::Const(const_stmt) => self.exec_const(const_stmt),
            Stmt::Return(ret) => {
                if let Some(value) = ret.value() {
                    self.eval(&value);
                }
            }
            Stmt::Wait(wait) => {
                if let Some(duration) = wait.duration() {
                    self.check_wait_duration(&duration);
                }
            }
            Stmt::WaitRealTime(wait) => {
                if let Some(duration) = wait.duration() {
                    self.check_wait_duration(&duration);
                }
            }
            _ => {}
        }
    }

    fn check_wait_duration(&mut self, duration: &Expr) {
        let ty = self.eval(duration);
        if !ty.mask.intersects(TyMask::NUMBER)
            && !ty.mask.is_exactly(TyMask::ANY)
            && !ty.mask.intersects(TyMask::ERROR)
        {
            self.report(
                DiagnosticCode::NoImplicitConversionExists,
                duration.range(),
                format!("wait duration must be a number, found {}", ty),
            );
        }
    }

    /// Only calls, assignments and increments may stand alone.
    fn check_expression_statement(&mut self, expr: &Expr) {
        let valid = match expr {
            Expr::Call(_)
            | Expr::MethodCall(_)
            | Expr::CalledOn(_)
            | Expr::Thread(_)
            | Expr::Waittill(_)
            | Expr::WaittillMatch(_)
            | Expr::Postfix(_) => true,
            Expr::Binary(binary) => binary
                .op()
                .is_some_and(|op| op.kind().is_assign_op()),
            _ => false,
        };
        if !valid {
            self.report(
                DiagnosticCode::InvalidExpressionStatement,
                expr.range(),
                "expression cannot stand alone as a statement".to_owned(),
            );
        }
    }

    fn exec_const(&mut self, stmt: &ast::ConstStmt) {
        let Some(name_token) = stmt.name() else { return };

        let ty = match stmt.value() {
            Some(value) => {
                if !is_constant_expr(&value) {
                    self.report(
                        DiagnosticCode::ExpectedConstantExpression,
                        value.range(),
                        "constants require a constant initializer".to_owned(),
                    );
                }
                self.eval(&value)
            }
            None => Ty::any(),
        };

        let name = name_token.text().to_owned();
        let range = name_token.text_range();
        let (outcome, _) = self
            .env
            .add_or_set(&name, ty.clone(), self.var_scope, true, range);
        match outcome {
            SetOutcome::Ok => {
                self.note_decl(&name, range, false);
                self.sense(SenseToken {
                    range,
                    kind: SenseKind::Variable,
                    modifiers: SenseModifiers::DECLARATION | SenseModifiers::READONLY,
                    hover: format!("const {}: {}", name, ty),
                });
            }
            SetOutcome::FailedConstant => {
                self.report(
                    DiagnosticCode::CannotAssignToConstant,
                    range,
                    format!("cannot assign to constant '{}'", name),
                );
            }
            SetOutcome::FailedReserved => {
                self.report(
                    DiagnosticCode::ReservedSymbol,
                    range,
                    format!("'{}' is a reserved name", name),
                );
            }
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Ty {
        self.eval_facts(expr).0
    }

    /// Evaluate an expression, returning its lattice value and the narrowing
    /// facts its truth implies.
    pub fn eval_facts(&mut self, expr: &Expr) -> (Ty, Facts) {
        match expr {
            Expr::Literal(lit) => (self.eval_literal(lit), Facts::new()),
            Expr::Ident(ident) => self.eval_ident(ident),
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Prefix(prefix) => self.eval_prefix(prefix),
            Expr::Postfix(postfix) => (self.eval_postfix(postfix), Facts::new()),
            Expr::Ternary(ternary) => (self.eval_ternary(ternary), Facts::new()),
            Expr::Vector(vector) => (self.eval_vector(vector), Facts::new()),
            Expr::Array(array) => {
                for element in array.elements() {
                    self.eval(&element);
                }
                (Ty::of(TyMask::ARRAY), Facts::new())
            }
            Expr::AnimRef(_) => (Ty::of(TyMask::ANIM), Facts::new()),
            Expr::Index(index) => (self.eval_index(index), Facts::new()),
            Expr::Member(member) => (self.eval_member(member), Facts::new()),
            Expr::NsMember(ns) => (self.eval_ns_member(ns, true), Facts::new()),
            Expr::FuncRef(func_ref) => (self.eval_func_ref(func_ref), Facts::new()),
            Expr::Call(call) => self.eval_call(call),
            Expr::MethodCall(method) => (self.eval_method_call(method), Facts::new()),
            Expr::CalledOn(called_on) => (self.eval_called_on(called_on), Facts::new()),
            Expr::Thread(thread) => (self.eval_thread(thread), Facts::new()),
            Expr::Constructor(ctor) => (self.eval_constructor(ctor), Facts::new()),
            Expr::Waittill(waittill) => {
                if let Some(target) = waittill.target() {
                    self.eval(&target);
                }
                if let Some(args) = waittill.args() {
                    self.eval_waittill_args(&args);
                }
                (Ty::of(TyMask::VOID), Facts::new())
            }
            Expr::WaittillMatch(waittill) => {
                if let Some(target) = waittill.target() {
                    self.eval(&target);
                }
                if let Some(args) = waittill.args() {
                    for arg in args.args() {
                        self.eval(&arg);
                    }
                }
                (Ty::of(TyMask::VOID), Facts::new())
            }
            Expr::Deref(deref) => (self.eval_deref(deref), Facts::new()),
            Expr::Paren(paren) => match paren.inner() {
                Some(inner) => self.eval_facts(&inner),
                None => (Ty::any(), Facts::new()),
            },
        }
    }

    fn eval_literal(&mut self, lit: &ast::LiteralExpr) -> Ty {
        let Some(token) = lit.token() else {
            return Ty::any();
        };
        match token.kind() {
            SyntaxKind::IntLit => Ty::of(TyMask::INT),
            SyntaxKind::FloatLit => Ty::of(TyMask::FLOAT),
            SyntaxKind::StringLit => Ty::of(TyMask::STRING),
            SyntaxKind::IStringLit => Ty::of(TyMask::ISTRING),
            SyntaxKind::HashLit => Ty::of(TyMask::HASH),
            SyntaxKind::KwTrue => Ty::bool_const(true),
            SyntaxKind::KwFalse => Ty::bool_const(false),
            SyntaxKind::KwUndefined => Ty::undefined(),
            _ => Ty::any(),
        }
    }

    fn eval_ident(&mut self, ident: &ast::IdentExpr) -> (Ty, Facts) {
        let Some(token) = ident.token() else {
            return (Ty::any(), Facts::new());
        };
        let name = token.text().to_owned();
        let range = token.text_range();

        if let Some(ty) = super::builtins::reserved_global(&name) {
            self.sense(SenseToken {
                range,
                kind: SenseKind::Variable,
                modifiers: SenseModifiers::READONLY | SenseModifiers::DEFAULT_LIBRARY,
                hover: format!("{}: {}", name.to_ascii_lowercase(), ty),
            });
            return (ty, Facts::new());
        }

        match self.env.try_get(&name) {
            Lookup::Local(var) => {
                let ty = var.ty.clone();
                let is_const = var.is_const;
                let written_name = var.name.clone();
                self.note_read(&name);
                self.sense(SenseToken {
                    range,
                    kind: SenseKind::Variable,
                    modifiers: if is_const {
                        SenseModifiers::READONLY | SenseModifiers::LOCAL
                    } else {
                        SenseModifiers::LOCAL
                    },
                    hover: format!("{}: {}", written_name, ty),
                });

                // A truthy value cannot be undefined.
                let mut facts = Facts::new();
                facts.add_true(name, Narrowing::removing(TyMask::UNDEFINED));
                (ty, facts)
            }
            Lookup::Reserved => (Ty::any(), Facts::new()),
            Lookup::Undefined => {
                // Inside a method, a bare identifier may be an implicit
                // `self.member`.
                if let Some(class) = &self.ctx.class
                    && let Some(class_def) = self.ctx.defs.class(class)
                    && class_def.has_member(&name)
                {
                    self.sense(SenseToken {
                        range,
                        kind: SenseKind::Field,
                        modifiers: SenseModifiers::empty(),
                        hover: format!("{}: Any", name),
                    });
                    return (Ty::any().labeled(name), Facts::new());
                }
                // Identifier in value position naming a function: the
                // reference needs `&` to be stored.
                if self.resolve_function(&name).is_some() {
                    self.report(
                        DiagnosticCode::StoreFunctionAsPointer,
                        range,
                        format!("use '&{}' to store this function as a pointer", name),
                    );
                    return (
                        Ty::with_subtype(
                            TyMask::FUNCTION,
                            SubType::FunctionTarget(name.to_ascii_lowercase()),
                        ),
                        Facts::new(),
                    );
                }
                // Unassigned locals read as undefined.
                (Ty::undefined(), Facts::new())
            }
        }
    }

    fn eval_binary(&mut self, binary: &ast::BinaryExpr) -> (Ty, Facts) {
        let Some(op) = binary.op() else {
            return (Ty::any(), Facts::new());
        };
        let op_kind = op.kind();

        if op_kind.is_assign_op() {
            return (self.eval_assignment(binary, op_kind), Facts::new());
        }

        match op_kind {
            SyntaxKind::AmpAmp => self.eval_logical(binary, true),
            SyntaxKind::PipePipe => self.eval_logical(binary, false),
            SyntaxKind::EqEq
            | SyntaxKind::BangEq
            | SyntaxKind::EqEqEq
            | SyntaxKind::BangEqEq
            | SyntaxKind::Lt
            | SyntaxKind::LtEq
            | SyntaxKind::Gt
            | SyntaxKind::GtEq => (self.eval_comparison(binary), Facts::new()),
            _ => {
                let lhs = binary.lhs().map(|e| self.eval(&e)).unwrap_or_else(Ty::any);
                let rhs = binary.rhs().map(|e| self.eval(&e)).unwrap_or_else(Ty::any);
                if matches!(op_kind, SyntaxKind::Slash | SyntaxKind::Percent)
                    && binary.rhs().as_ref().is_some_and(is_zero_literal)
                {
                    self.report(
                        DiagnosticCode::DivisionByZero,
                        binary.rhs().map(|e| e.range()).unwrap_or_else(|| op.text_range()),
                        "division by zero".to_owned(),
                    );
                }
                (
                    self.arith(op_kind, op.text(), &lhs, &rhs, binary.range()),
                    Facts::new(),
                )
            }
        }
    }

    /// Short-circuit `&&` / `||`: the RHS is analyzed under an environment
    /// refined by the LHS facts of the branch that reaches it.
    fn eval_logical(&mut self, binary: &ast::BinaryExpr, is_and: bool) -> (Ty, Facts) {
        let lhs_facts = match binary.lhs() {
            Some(lhs) => self.eval_facts(&lhs).1,
            None => Facts::new(),
        };

        let reaching = if is_and {
            &lhs_facts.when_true
        } else {
            &lhs_facts.when_false
        };

        let mut rhs_env = self.env.clone();
        apply_facts(&mut rhs_env, reaching);

        let rhs_facts = match binary.rhs() {
            Some(rhs) => {
                let mut inner = ExprAnalyzer {
                    ctx: self.ctx,
                    env: &mut rhs_env,
                    var_scope: self.var_scope,
                    silent: self.silent,
                    diag: &mut *self.diag,
                    usage: self.usage.as_deref_mut(),
                    senses: self.senses.as_deref_mut(),
                };
                inner.eval_facts(&rhs).1
            }
            None => Facts::new(),
        };

        let mut facts = Facts::new();
        if is_and {
            facts.merge_true(&lhs_facts.when_true);
            facts.merge_true(&rhs_facts.when_true);
        } else {
            facts.merge_false(&lhs_facts.when_false);
            facts.merge_false(&rhs_facts.when_false);
        }

        (Ty::of(TyMask::BOOL), facts)
    }

    fn eval_comparison(&mut self, binary: &ast::BinaryExpr) -> Ty {
        let lhs_expr = binary.lhs();
        let rhs_expr = binary.rhs();
        let lhs = lhs_expr.as_ref().map(|e| self.eval(e)).unwrap_or_else(Ty::any);
        let rhs = rhs_expr.as_ref().map(|e| self.eval(e)).unwrap_or_else(Ty::any);

        // Comparing against `undefined` is what isdefined() is for; a
        // possibly-undefined operand gets the same advice.
        let literal_undefined = lhs_expr.as_ref().is_some_and(is_undefined_literal)
            || rhs_expr.as_ref().is_some_and(is_undefined_literal);
        let possibly_undefined = (lhs.maybe_undefined() && !lhs.mask.is_exactly(TyMask::ANY))
            || (rhs.maybe_undefined() && !rhs.mask.is_exactly(TyMask::ANY));

        if literal_undefined || possibly_undefined {
            self.report(
                DiagnosticCode::PossibleUndefinedComparison,
                binary.range(),
                "operand may be undefined; use isdefined() to test for presence".to_owned(),
            );
        }

        Ty::of(TyMask::BOOL)
    }

    fn eval_assignment(&mut self, binary: &ast::BinaryExpr, op: SyntaxKind) -> Ty {
        let rhs_expr = binary.rhs();
        let rhs = rhs_expr.as_ref().map(|e| self.eval(e)).unwrap_or_else(Ty::any);

        // `x = thread f()` has no value to store.
        if op == SyntaxKind::Assign
            && rhs_expr.as_ref().is_some_and(is_threaded_call)
        {
            self.report(
                DiagnosticCode::AssignOnThreadedFunction,
                binary.range(),
                "a threaded call does not produce a value".to_owned(),
            );
        }

        let Some(target) = binary.lhs() else {
            return rhs;
        };

        let value = if op == SyntaxKind::Assign {
            rhs
        } else {
            // Compound assignment: combine the old value with the rhs.
            let old = self.eval(&target);
            let op_text = compound_op_text(op);
            if matches!(op, SyntaxKind::SlashAssign | SyntaxKind::PercentAssign)
                && rhs_expr.as_ref().is_some_and(is_zero_literal)
            {
                self.report(
                    DiagnosticCode::DivisionByZero,
                    binary.range(),
                    "division by zero".to_owned(),
                );
            }
            self.arith(op, op_text, &old, &rhs, binary.range())
        };

        self.assign_to(&target, value.clone());
        value
    }

    /// Assignment target dispatch.
    pub fn assign_to(&mut self, target: &Expr, value: Ty) {
        match target {
            Expr::Ident(ident) => self.assign_ident(ident, value),
            Expr::Member(member) => self.assign_member(member, value),
            Expr::Index(index) => self.assign_index(index, value),
            Expr::Paren(paren) => {
                if let Some(inner) = paren.inner() {
                    self.assign_to(&inner, value);
                } else {
                    self.report(
                        DiagnosticCode::InvalidAssignmentTarget,
                        target.range(),
                        "expression is not assignable".to_owned(),
                    );
                }
            }
            _ => {
                self.report(
                    DiagnosticCode::InvalidAssignmentTarget,
                    target.range(),
                    "expression is not assignable".to_owned(),
                );
            }
        }
    }

    fn assign_ident(&mut self, ident: &ast::IdentExpr, value: Ty) {
        let Some(token) = ident.token() else { return };
        let name = token.text().to_owned();
        let range = token.text_range();

        let (outcome, previous) =
            self.env
                .add_or_set(&name, value.clone(), self.var_scope, false, range);
        match outcome {
            SetOutcome::Ok => {
                if previous.is_none() {
                    self.note_decl(&name, range, false);
                }
                self.sense(SenseToken {
                    range,
                    kind: SenseKind::Variable,
                    modifiers: if previous.is_none() {
                        SenseModifiers::DECLARATION | SenseModifiers::LOCAL
                    } else {
                        SenseModifiers::LOCAL
                    },
                    hover: format!("{}: {}", name, value),
                });
            }
            SetOutcome::FailedConstant => {
                self.report(
                    DiagnosticCode::CannotAssignToConstant,
                    range,
                    format!("cannot assign to constant '{}'", name),
                );
            }
            SetOutcome::FailedReserved => {
                self.report(
                    DiagnosticCode::ReservedSymbol,
                    range,
                    format!("cannot assign to reserved name '{}'", name),
                );
            }
        }
    }

    fn assign_member(&mut self, member: &ast::MemberExpr, value: Ty) {
        let Some(base_expr) = member.base() else { return };
        let base = self.eval(&base_expr);
        let Some(field_token) = member.member() else { return };
        let field = field_token.text().to_owned();
        let range = field_token.text_range();

        let field_holder = TyMask::STRUCT
            .union(TyMask::ENTITY)
            .union(TyMask::OBJECT)
            .union(TyMask::ARRAY);
        if base.mask.intersects(TyMask::ERROR) {
            return;
        }
        if !base.mask.intersects(field_holder) && !base.mask.is_exactly(TyMask::ANY) {
            self.report(
                DiagnosticCode::DoesNotContainMember,
                range,
                format!("{} does not contain member '{}'", base, field),
            );
            return;
        }

        // Entity subtypes consult the predefined-field registry; the worst
        // failure across tags is the one reported, and only once.
        if base.mask.intersects(TyMask::ENTITY) {
            let mut worst = FieldSet::Success;
            for subtype in &base.subtypes {
                if let SubType::EntityTag(tag) = subtype {
                    let outcome = self.ctx.entities.check_set(tag, &field, value.mask);
                    if outcome > worst {
                        worst = outcome;
                    }
                }
            }
            match worst {
                FieldSet::Success => {}
                FieldSet::EntityImmutable => {
                    self.report(
                        DiagnosticCode::CannotAssignToImmutableEntity,
                        range,
                        "cannot assign to a field of an immutable entity".to_owned(),
                    );
                    return;
                }
                FieldSet::FieldReadOnly => {
                    self.report(
                        DiagnosticCode::CannotAssignToReadOnlyProperty,
                        range,
                        format!("'{}' is read-only", field),
                    );
                    return;
                }
                FieldSet::FieldTypeMismatch => {
                    self.report(
                        DiagnosticCode::PredefinedFieldTypeMismatch,
                        range,
                        format!("{} does not match the predefined type of '{}'", value, field),
                    );
                    return;
                }
            }
        }

        self.sense(SenseToken {
            range,
            kind: SenseKind::Field,
            modifiers: SenseModifiers::empty(),
            hover: format!("{}: {}", field, value),
        });
    }

    fn assign_index(&mut self, index: &ast::IndexExpr, _value: Ty) {
        if let Some(idx) = index.index() {
            self.eval(&idx);
        }
        let Some(base_expr) = index.base() else { return };

        // Writing through an index materializes the array.
        if let Expr::Ident(ident) = &base_expr
            && let Some(token) = ident.token()
        {
            let name = token.text().to_owned();
            if !is_reserved(&name) {
                let base = self.eval(&base_expr);
                let new_mask = base.mask.without(TyMask::UNDEFINED).union(TyMask::ARRAY);
                let mut new_ty = base.clone();
                new_ty.mask = new_mask;
                let range = token.text_range();
                let (outcome, previous) =
                    self.env
                        .add_or_set(&name, new_ty, self.var_scope, false, range);
                if outcome == SetOutcome::Ok && previous.is_none() {
                    self.note_decl(&name, range, false);
                }
                return;
            }
        }

        let base = self.eval(&base_expr);
        let indexable = TyMask::ARRAY
            .union(TyMask::STRUCT)
            .union(TyMask::ENTITY)
            .union(TyMask::OBJECT);
        if !base.mask.intersects(indexable)
            && !base.mask.is_exactly(TyMask::ANY)
            && !base.mask.intersects(TyMask::ERROR)
        {
            self.report(
                DiagnosticCode::InvalidAssignmentTarget,
                index.range(),
                format!("{} cannot be indexed", base),
            );
        }
    }

    fn eval_prefix(&mut self, prefix: &ast::PrefixExpr) -> (Ty, Facts) {
        let Some(op) = prefix.op() else {
            return (Ty::any(), Facts::new());
        };
        let operand_expr = prefix.operand();

        match op.kind() {
            SyntaxKind::Bang => {
                let (ty, facts) = match operand_expr {
                    Some(operand) => self.eval_facts(&operand),
                    None => (Ty::any(), Facts::new()),
                };
                let mut result = Ty::of(TyMask::BOOL);
                result.known_bool = ty.known_bool.map(|b| !b);
                (result, facts.negate())
            }
            SyntaxKind::Minus | SyntaxKind::Plus => {
                let ty = operand_expr
                    .map(|e| self.eval(&e))
                    .unwrap_or_else(Ty::any);
                if ty.mask.intersects(TyMask::ERROR) {
                    (Ty::error(), Facts::new())
                } else if ty.mask.intersects(TyMask::NUMBER.union(TyMask::VECTOR))
                    || ty.mask.is_exactly(TyMask::ANY)
                {
                    (Ty::of(ty.mask.intersect(TyMask::NUMBER.union(TyMask::VECTOR))), Facts::new())
                } else {
                    self.report(
                        DiagnosticCode::OperatorNotSupportedOnTypes,
                        prefix.range(),
                        format!("operator '{}' is not supported on {}", op.text(), ty),
                    );
                    (Ty::error(), Facts::new())
                }
            }
            SyntaxKind::Tilde => {
                let ty = operand_expr
                    .map(|e| self.eval(&e))
                    .unwrap_or_else(Ty::any);
                if ty.mask.intersects(TyMask::INT) || ty.mask.is_exactly(TyMask::ANY) {
                    (Ty::of(TyMask::INT), Facts::new())
                } else {
                    self.report(
                        DiagnosticCode::OperatorNotSupportedOnTypes,
                        prefix.range(),
                        format!("operator '~' is not supported on {}", ty),
                    );
                    (Ty::error(), Facts::new())
                }
            }
            _ => (Ty::any(), Facts::new()),
        }
    }

    fn eval_postfix(&mut self, postfix: &ast::PostfixExpr) -> Ty {
        let Some(operand) = postfix.operand() else {
            return Ty::any();
        };
        let ty = self.eval(&operand);
        if !ty.mask.intersects(TyMask::NUMBER)
            && !ty.mask.is_exactly(TyMask::ANY)
            && !ty.mask.intersects(TyMask::ERROR)
        {
            let op = postfix.op().map(|t| t.text().to_owned()).unwrap_or_default();
            self.report(
                DiagnosticCode::OperatorNotSupportedOnTypes,
                postfix.range(),
                format!("operator '{}' is not supported on {}", op, ty),
            );
            return Ty::error();
        }
        let result = Ty::of(ty.mask.intersect(TyMask::NUMBER));
        self.assign_to(&operand, result.clone());
        result
    }

    fn eval_ternary(&mut self, ternary: &ast::TernaryExpr) -> Ty {
        let facts = match ternary.condition() {
            Some(cond) => self.eval_facts(&cond).1,
            None => Facts::new(),
        };

        let then_ty = match ternary.then_expr() {
            Some(then_expr) => {
                let mut env = self.env.clone();
                apply_facts(&mut env, &facts.when_true);
                let mut inner = ExprAnalyzer {
                    ctx: self.ctx,
                    env: &mut env,
                    var_scope: self.var_scope,
                    silent: self.silent,
                    diag: &mut *self.diag,
                    usage: self.usage.as_deref_mut(),
                    senses: self.senses.as_deref_mut(),
                };
                inner.eval(&then_expr)
            }
            None => Ty::any(),
        };
        let else_ty = match ternary.else_expr() {
            Some(else_expr) => {
                let mut env = self.env.clone();
                apply_facts(&mut env, &facts.when_false);
                let mut inner = ExprAnalyzer {
                    ctx: self.ctx,
                    env: &mut env,
                    var_scope: self.var_scope,
                    silent: self.silent,
                    diag: &mut *self.diag,
                    usage: self.usage.as_deref_mut(),
                    senses: self.senses.as_deref_mut(),
                };
                inner.eval(&else_expr)
            }
            None => Ty::any(),
        };

        then_ty.join(&else_ty)
    }

    fn eval_vector(&mut self, vector: &ast::VectorExpr) -> Ty {
        for component in vector.components() {
            let ty = self.eval(&component);
            if !ty.mask.intersects(TyMask::NUMBER)
                && !ty.mask.is_exactly(TyMask::ANY)
                && !ty.mask.intersects(TyMask::ERROR)
            {
                self.report(
                    DiagnosticCode::InvalidVectorComponent,
                    component.range(),
                    format!("vector components must be numbers, found {}", ty),
                );
            }
        }
        Ty::of(TyMask::VECTOR)
    }

    fn eval_index(&mut self, index: &ast::IndexExpr) -> Ty {
        let base = index
            .base()
            .map(|e| self.eval(&e))
            .unwrap_or_else(Ty::any);
        if let Some(idx) = index.index() {
            self.eval(&idx);
        }

        if base.mask.intersects(TyMask::ERROR) {
            return Ty::error();
        }
        let indexable = TyMask::ARRAY
            .union(TyMask::STRING)
            .union(TyMask::VECTOR)
            .union(TyMask::STRUCT)
            .union(TyMask::ENTITY);
        if !base.mask.intersects(indexable) && !base.mask.is_exactly(TyMask::ANY) {
            self.report(
                DiagnosticCode::OperatorNotSupportedOnTypes,
                index.range(),
                format!("{} cannot be indexed", base),
            );
            return Ty::error();
        }
        if base.mask.is_exactly(TyMask::STRING) || base.mask.is_exactly(TyMask::ISTRING) {
            return Ty::of(TyMask::STRING);
        }
        if base.mask.is_exactly(TyMask::VECTOR) {
            return Ty::of(TyMask::FLOAT);
        }
        Ty::any()
    }

    fn eval_member(&mut self, member: &ast::MemberExpr) -> Ty {
        let base = member
            .base()
            .map(|e| self.eval(&e))
            .unwrap_or_else(Ty::any);
        let Some(field_token) = member.member() else {
            return Ty::any();
        };
        let field = field_token.text().to_owned();
        let range = field_token.text_range();

        if base.mask.intersects(TyMask::ERROR) {
            return Ty::error();
        }

        // `.size` is defined on arrays and strings.
        if field.eq_ignore_ascii_case("size")
            && base
                .mask
                .intersects(TyMask::ARRAY.union(TyMask::STRING))
        {
            self.sense(SenseToken {
                range,
                kind: SenseKind::Property,
                modifiers: SenseModifiers::READONLY | SenseModifiers::DEFAULT_LIBRARY,
                hover: "size: Int".to_owned(),
            });
            return Ty::of(TyMask::INT).read_only().labeled("size");
        }

        let field_holder = TyMask::STRUCT
            .union(TyMask::ENTITY)
            .union(TyMask::OBJECT)
            .union(TyMask::ARRAY)
            .union(TyMask::ANIMTREE);
        if !base.mask.intersects(field_holder) && !base.mask.is_exactly(TyMask::ANY) {
            self.report(
                DiagnosticCode::DoesNotContainMember,
                range,
                format!("{} does not contain member '{}'", base, field),
            );
            return Ty::error();
        }

        // Predefined entity fields carry their declared type.
        for subtype in &base.subtypes {
            if let SubType::EntityTag(tag) = subtype
                && let Some(ty) = self.ctx.entities.field_ty(tag, &field)
            {
                self.sense(SenseToken {
                    range,
                    kind: SenseKind::Property,
                    modifiers: SenseModifiers::DEFAULT_LIBRARY,
                    hover: format!("{}: {}", field, ty),
                });
                return ty.labeled(field);
            }
        }

        self.sense(SenseToken {
            range,
            kind: SenseKind::Field,
            modifiers: SenseModifiers::empty(),
            hover: format!("{}: Any", field),
        });
        Ty::any().labeled(field)
    }

    fn eval_ns_member(&mut self, ns: &ast::NsMemberExpr, value_position: bool) -> Ty {
        let Some(ns_token) = ns.namespace() else {
            return Ty::any();
        };
        let Some(member_token) = ns.member() else {
            return Ty::any();
        };
        let namespace = ns_token.text().to_owned();
        let member = member_token.text().to_owned();

        let known = self.ctx.defs.has_namespace(&namespace)
            || self.ctx.exports.has_namespace(&namespace)
            || namespace.eq_ignore_ascii_case(&self.ctx.namespace);
        if !known {
            self.report(
                DiagnosticCode::UnknownNamespace,
                ns_token.text_range(),
                format!("unknown namespace '{}'", namespace),
            );
            return Ty::any();
        }
        self.note_namespace(&namespace);
        self.sense(SenseToken {
            range: ns_token.text_range(),
            kind: SenseKind::Namespace,
            modifiers: SenseModifiers::empty(),
            hover: format!("namespace {}", namespace),
        });

        let mut found = self.ctx.defs.function(&namespace, &member).is_some();
        if !found
            && let Some(export) = self.ctx.exports.qualified(&namespace, &member)
        {
            found = true;
            let origin = export.origin.clone();
            if let Some(usage) = self.usage.as_deref_mut() {
                usage.use_origin(&origin);
            }
        }
        if !found {
            self.report(
                DiagnosticCode::FunctionDoesNotExist,
                member_token.text_range(),
                format!("function '{}::{}' does not exist", namespace, member),
            );
            return Ty::any();
        }

        if value_position {
            self.report(
                DiagnosticCode::StoreFunctionAsPointer,
                ns.range(),
                format!(
                    "use '&{}::{}' to store this function as a pointer",
                    namespace, member
                ),
            );
        }
        Ty::with_subtype(
            TyMask::FUNCTION,
            SubType::FunctionTarget(format!(
                "{}::{}",
                namespace.to_ascii_lowercase(),
                member.to_ascii_lowercase()
            )),
        )
    }

    fn eval_func_ref(&mut self, func_ref: &ast::FuncRefExpr) -> Ty {
        let (ns, name) = func_ref.parts();
        let Some(name_token) = name else {
            return Ty::any();
        };
        let name = name_token.text().to_owned();

        let target = match ns {
            Some(ns_token) => {
                let namespace = ns_token.text().to_owned();
                let known = self.ctx.defs.has_namespace(&namespace)
                    || self.ctx.exports.has_namespace(&namespace)
                    || namespace.eq_ignore_ascii_case(&self.ctx.namespace);
                if !known {
                    self.report(
                        DiagnosticCode::UnknownNamespace,
                        ns_token.text_range(),
                        format!("unknown namespace '{}'", namespace),
                    );
                    return Ty::undefined();
                }
                self.note_namespace(&namespace);
                let local = self.ctx.defs.function(&namespace, &name).is_some();
                if !local {
                    match self.ctx.exports.qualified(&namespace, &name) {
                        Some(export) => {
                            let origin = export.origin.clone();
                            if let Some(usage) = self.usage.as_deref_mut() {
                                usage.use_origin(&origin);
                            }
                        }
                        None => {
                            self.report(
                                DiagnosticCode::FunctionDoesNotExist,
                                name_token.text_range(),
                                format!("function '{}::{}' does not exist", namespace, name),
                            );
                            return Ty::undefined();
                        }
                    }
                }
                format!(
                    "{}::{}",
                    namespace.to_ascii_lowercase(),
                    name.to_ascii_lowercase()
                )
            }
            None => {
                if self.resolve_function(&name).is_none() {
                    self.report(
                        DiagnosticCode::FunctionDoesNotExist,
                        name_token.text_range(),
                        format!("function '{}' does not exist", name),
                    );
                    return Ty::undefined();
                }
                name.to_ascii_lowercase()
            }
        };

        self.sense(SenseToken {
            range: name_token.text_range(),
            kind: SenseKind::Function,
            modifiers: SenseModifiers::empty(),
            hover: format!("&{}", target),
        });
        Ty::with_subtype(TyMask::FUNCTION_POINTER, SubType::FunctionTarget(target))
    }

    /// Overload sets for a bare function name: script definitions first, then
    /// imports, then the built-in API.
    fn resolve_function(&mut self, name: &str) -> Option<(Vec<Overload>, bool, bool)> {
        if let Some(def) = self
            .ctx
            .defs
            .function(&self.ctx.namespace, name)
            .or_else(|| self.ctx.defs.function("", name))
            .or_else(|| self.ctx.defs.function_any_namespace(name))
        {
            return Some((vec![def.as_overload()], false, false));
        }
        if let Some(class) = &self.ctx.class
            && let Some(class_def) = self.ctx.defs.class(class)
            && let Some(method) = class_def.methods.get(&name.to_ascii_lowercase())
        {
            return Some((vec![method.as_overload()], false, false));
        }
        if let Some(export) = self.ctx.exports.function(name) {
            let overloads = export.overloads.clone();
            let origin = export.origin.clone();
            if let Some(usage) = self.usage.as_deref_mut() {
                usage.use_origin(&origin);
            }
            return Some((overloads, false, false));
        }
        if let Some(builtin) = self.ctx.api.function(name) {
            return Some((
                builtin.overloads.clone(),
                true,
                builtin.flags.autogenerated,
            ));
        }
        None
    }

    fn eval_call(&mut self, call: &ast::CallExpr) -> (Ty, Facts) {
        let arg_count = call.args().map(|a| a.count()).unwrap_or(0);
        let args: Vec<Expr> = call
            .args()
            .map(|list| list.args().collect())
            .unwrap_or_default();

        // Arguments are analyzed for effects regardless of the callee.
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in &args {
            arg_tys.push(self.eval(arg));
        }

        let Some(callee) = call.callee() else {
            return (Ty::any(), Facts::new());
        };

        match &callee {
            Expr::Ident(ident) => {
                let Some(token) = ident.token() else {
                    return (Ty::any(), Facts::new());
                };
                let name = token.text().to_owned();

                // Predicate dispatch: isdefined narrows its identifier argument.
                let facts = self.predicate_facts(&name, &args);

                // Locals holding function values are callable too.
                if let Lookup::Local(var) = self.env.try_get(&name) {
                    let ty = var.ty.clone();
                    self.note_read(&name);
                    if ty.mask.intersects(TyMask::FUNCTION) || ty.mask.is_exactly(TyMask::ANY) {
                        return (Ty::any(), facts);
                    }
                    self.report(
                        DiagnosticCode::ExpectedFunction,
                        token.text_range(),
                        format!("{} is not callable", ty),
                    );
                    return (Ty::error(), facts);
                }

                let Some((overloads, is_builtin, autogenerated)) = self.resolve_function(&name)
                else {
                    self.report(
                        DiagnosticCode::FunctionDoesNotExist,
                        token.text_range(),
                        format!("function '{}' does not exist", name),
                    );
                    return (Ty::any(), facts);
                };

                self.sense(SenseToken {
                    range: token.text_range(),
                    kind: SenseKind::Function,
                    modifiers: if is_builtin {
                        SenseModifiers::DEFAULT_LIBRARY
                    } else {
                        SenseModifiers::empty()
                    },
                    hover: format!("function {}", name),
                });

                let ret = self.check_arity(
                    &name,
                    &overloads,
                    arg_count,
                    is_builtin,
                    autogenerated,
                    call.range(),
                );
                (ret, facts)
            }
            Expr::NsMember(ns) => {
                let ty = self.eval_ns_member(ns, false);
                if !ty.mask.intersects(TyMask::FUNCTION) && !ty.mask.is_exactly(TyMask::ANY) {
                    return (Ty::any(), Facts::new());
                }
                // Arity for qualified calls uses the resolved definition.
                if let (Some(ns_token), Some(member_token)) = (ns.namespace(), ns.member()) {
                    let namespace = ns_token.text();
                    let member = member_token.text();
                    let overloads = self
                        .ctx
                        .defs
                        .function(namespace, member)
                        .map(|def| vec![def.as_overload()])
                        .or_else(|| {
                            self.ctx
                                .exports
                                .qualified(namespace, member)
                                .map(|e| e.overloads.clone())
                        });
                    if let Some(overloads) = overloads {
                        let ret = self.check_arity(
                            member,
                            &overloads,
                            arg_count,
                            false,
                            false,
                            call.range(),
                        );
                        return (ret, Facts::new());
                    }
                }
                (Ty::any(), Facts::new())
            }
            Expr::Deref(deref) => {
                let inner = self.eval_deref(deref);
                if inner.mask.intersects(TyMask::FUNCTION) || inner.mask.is_exactly(TyMask::ANY) {
                    (Ty::any(), Facts::new())
                } else {
                    (Ty::error(), Facts::new())
                }
            }
            other => {
                let ty = self.eval(other);
                if !ty.mask.intersects(TyMask::FUNCTION) && !ty.mask.is_exactly(TyMask::ANY) {
                    self.report(
                        DiagnosticCode::ExpectedFunction,
                        other.range(),
                        format!("{} is not callable", ty),
                    );
                    return (Ty::error(), Facts::new());
                }
                (Ty::any(), Facts::new())
            }
        }
    }

    fn predicate_facts(&mut self, name: &str, args: &[Expr]) -> Facts {
        let mut facts = Facts::new();
        match self.ctx.api.special(name) {
            Some(SpecialCall::IsDefined) => {
                if let Some(Expr::Ident(ident)) = args.first()
                    && let Some(token) = ident.token()
                {
                    let var = token.text().to_owned();
                    facts.add_true(var.clone(), Narrowing::removing(TyMask::UNDEFINED));
                    facts.add_false(var, Narrowing::keeping(TyMask::UNDEFINED));
                }
            }
            Some(SpecialCall::VectorScale) | None => {}
        }
        facts
    }

    fn check_arity(
        &mut self,
        name: &str,
        overloads: &[Overload],
        arg_count: usize,
        is_builtin: bool,
        autogenerated: bool,
        range: TextRange,
    ) -> Ty {
        if overloads.is_empty() {
            return Ty::any();
        }

        let min = overloads.iter().map(|o| o.min_args).min().unwrap_or(0);
        let max = overloads
            .iter()
            .map(|o| o.max_args)
            .try_fold(0usize, |acc, m| m.map(|m| acc.max(m)));

        // Too few: built-ins only. Script functions fill missing arguments
        // with undefined.
        if arg_count < min && is_builtin {
            let code = if autogenerated {
                DiagnosticCode::UnverifiedArgumentCount
            } else {
                DiagnosticCode::TooFewArguments
            };
            self.report(
                code,
                range,
                format!(
                    "'{}' expects at least {} argument{}, found {}",
                    name,
                    min,
                    if min == 1 { "" } else { "s" },
                    arg_count
                ),
            );
        }

        if let Some(max) = max
            && arg_count > max
        {
            let code = if autogenerated {
                DiagnosticCode::UnverifiedArgumentCount
            } else {
                DiagnosticCode::TooManyArguments
            };
            self.report(
                code,
                range,
                format!(
                    "'{}' expects at most {} argument{}, found {}",
                    name,
                    max,
                    if max == 1 { "" } else { "s" },
                    arg_count
                ),
            );
        }

        // Special returns override the declared signature.
        if let Some(SpecialCall::VectorScale) = self.ctx.api.special(name) {
            return Ty::of(TyMask::VECTOR);
        }

        let mut ret = TyMask::VOID;
        for overload in overloads {
            ret = ret.union(overload.return_mask);
        }
        Ty::of(ret)
    }

    fn eval_method_call(&mut self, method: &ast::MethodCallExpr) -> Ty {
        let receiver = method
            .receiver()
            .map(|e| self.eval(&e))
            .unwrap_or_else(Ty::any);
        if let Some(args) = method.args() {
            for arg in args.args() {
                self.eval(&arg);
            }
        }
        let Some(name_token) = method.method() else {
            return Ty::any();
        };
        let name = name_token.text().to_owned();

        if !receiver.mask.intersects(TyMask::OBJECT.union(TyMask::FUNCTION))
            && !receiver.mask.is_exactly(TyMask::ANY)
            && !receiver.mask.intersects(TyMask::ERROR)
        {
            self.report(
                DiagnosticCode::DoesNotContainMember,
                name_token.text_range(),
                format!("{} does not contain method '{}'", receiver, name),
            );
            return Ty::error();
        }

        // Dispatch against the receiver's class when its id is known.
        for subtype in &receiver.subtypes {
            if let SubType::ClassId(class) = subtype {
                if let Some(class_def) = self.ctx.defs.class(class) {
                    if let Some(def) = class_def.methods.get(&name.to_ascii_lowercase()) {
                        let arg_count = method.args().map(|a| a.count()).unwrap_or(0);
                        return self.check_arity(
                            &name,
                            &[def.as_overload()],
                            arg_count,
                            false,
                            false,
                            method.range(),
                        );
                    }
                    self.report(
                        DiagnosticCode::DoesNotContainMember,
                        name_token.text_range(),
                        format!("class '{}' has no method '{}'", class_def.name, name),
                    );
                    return Ty::error();
                }
            }
        }

        self.sense(SenseToken {
            range: name_token.text_range(),
            kind: SenseKind::Method,
            modifiers: SenseModifiers::empty(),
            hover: format!("method {}", name),
        });
        Ty::any()
    }

    fn eval_called_on(&mut self, called_on: &ast::CalledOnExpr) -> Ty {
        if let Some(target) = called_on.target() {
            self.eval(&target);
        }
        match called_on.call() {
            Some(call) => self.eval(&call),
            None => Ty::any(),
        }
    }

    fn eval_thread(&mut self, thread: &ast::ThreadExpr) -> Ty {
        if let Some(inner) = thread.inner() {
            match &inner {
                Expr::Call(_) | Expr::MethodCall(_) | Expr::CalledOn(_) => {
                    self.eval(&inner);
                }
                other => {
                    self.eval(other);
                    self.report(
                        DiagnosticCode::ExpectedFunction,
                        other.range(),
                        "'thread' must be followed by a call".to_owned(),
                    );
                }
            }
        }
        Ty::of(TyMask::VOID)
    }

    fn eval_constructor(&mut self, ctor: &ast::ConstructorExpr) -> Ty {
        for arg in ctor.args() {
            self.eval(&arg);
        }
        let Some(name_token) = ctor.class_name() else {
            return Ty::any();
        };
        let name = name_token.text().to_owned();

        if self.ctx.defs.class(&name).is_none() && self.ctx.exports.class(&name).is_none() {
            self.report(
                DiagnosticCode::ClassDoesNotExist,
                name_token.text_range(),
                format!("class '{}' does not exist", name),
            );
            return Ty::any();
        }

        self.sense(SenseToken {
            range: name_token.text_range(),
            kind: SenseKind::Class,
            modifiers: SenseModifiers::empty(),
            hover: format!("class {}", name),
        });
        Ty::with_subtype(
            TyMask::OBJECT,
            SubType::ClassId(name.to_ascii_lowercase()),
        )
    }

    fn eval_waittill_args(&mut self, args: &ast::ArgList) {
        // First argument is the notify name; the rest bind locals on receipt.
        for (i, arg) in args.args().enumerate() {
            if i == 0 {
                self.eval(&arg);
            } else if let Expr::Ident(ident) = &arg {
                if let Some(token) = ident.token() {
                    let name = token.text().to_owned();
                    let range = token.text_range();
                    let (outcome, previous) = self.env.add_or_set(
                        &name,
                        Ty::any(),
                        self.var_scope,
                        false,
                        range,
                    );
                    if outcome == SetOutcome::Ok && previous.is_none() {
                        self.note_decl(&name, range, false);
                    }
                }
            } else {
                self.eval(&arg);
            }
        }
    }

    fn eval_deref(&mut self, deref: &ast::DerefExpr) -> Ty {
        let inner = deref
            .inner()
            .map(|e| self.eval(&e))
            .unwrap_or_else(Ty::any);

        if inner.mask.is_exactly(TyMask::ANY) {
            return Ty::of(TyMask::FUNCTION);
        }
        if inner.mask.intersects(TyMask::FUNCTION_POINTER) {
            let mut ty = Ty::of(TyMask::FUNCTION);
            ty.subtypes = inner.subtypes.clone();
            return ty;
        }
        if inner.mask.intersects(TyMask::ERROR) {
            return Ty::error();
        }
        self.report(
            DiagnosticCode::ExpectedFunction,
            deref.range(),
            format!("expected a function pointer, found {}", inner),
        );
        Ty::error()
    }

    /// Numeric-coercion table for arithmetic and bitwise operators.
    fn arith(
        &mut self,
        op: SyntaxKind,
        op_text: &str,
        lhs: &Ty,
        rhs: &Ty,
        range: TextRange,
    ) -> Ty {
        let l = lhs.mask;
        let r = rhs.mask;

        if l.intersects(TyMask::ERROR) || r.intersects(TyMask::ERROR) {
            return Ty::error();
        }
        if l.is_exactly(TyMask::ANY) || r.is_exactly(TyMask::ANY) {
            return Ty::any();
        }

        let is_add = matches!(op, SyntaxKind::Plus | SyntaxKind::PlusAssign);
        let is_addsub = is_add || matches!(op, SyntaxKind::Minus | SyntaxKind::MinusAssign);
        let is_muldiv = matches!(
            op,
            SyntaxKind::Star
                | SyntaxKind::Slash
                | SyntaxKind::StarAssign
                | SyntaxKind::SlashAssign
        );
        let is_int_op = matches!(
            op,
            SyntaxKind::Percent
                | SyntaxKind::PercentAssign
                | SyntaxKind::Amp
                | SyntaxKind::Pipe
                | SyntaxKind::Caret
                | SyntaxKind::ShiftLeft
                | SyntaxKind::ShiftRight
                | SyntaxKind::AmpAssign
                | SyntaxKind::PipeAssign
                | SyntaxKind::CaretAssign
                | SyntaxKind::ShiftLeftAssign
                | SyntaxKind::ShiftRightAssign
        );

        let num = TyMask::NUMBER;
        let stringy = TyMask::ISTRING;
        let string_coercible = TyMask::NUMBER
            .union(TyMask::ISTRING)
            .union(TyMask::HASH)
            .union(TyMask::UINT64);

        // Hash + String (either side) stays a hash.
        if is_add
            && ((l.intersects(TyMask::HASH) && r.intersects(TyMask::STRING))
                || (r.intersects(TyMask::HASH) && l.intersects(TyMask::STRING)))
        {
            return Ty::of(TyMask::HASH);
        }

        // String concatenation when the other side is coercible.
        if is_add
            && ((l.intersects(stringy) && r.without(string_coercible).is_void())
                || (r.intersects(stringy) && l.without(string_coercible).is_void()))
        {
            return Ty::of(TyMask::STRING);
        }

        // Vector arithmetic: vector with vector (additive) or number scale.
        if is_addsub && l.intersects(TyMask::VECTOR) && r.intersects(TyMask::VECTOR) {
            return Ty::of(TyMask::VECTOR);
        }
        if (is_muldiv || is_addsub)
            && ((l.intersects(TyMask::VECTOR) && r.without(num).is_void())
                || (r.intersects(TyMask::VECTOR) && l.without(num).is_void()))
            && (l.intersects(TyMask::VECTOR) != r.intersects(TyMask::VECTOR))
        {
            return Ty::of(TyMask::VECTOR);
        }

        if is_int_op {
            if l.intersects(TyMask::INT) && r.intersects(TyMask::INT) {
                return Ty::of(TyMask::INT);
            }
            self.report(
                DiagnosticCode::OperatorNotSupportedOnTypes,
                range,
                format!("operator '{}' is not supported on {} and {}", op_text, lhs, rhs),
            );
            return Ty::error();
        }

        // Plain numeric arithmetic.
        if l.intersects(num) && r.intersects(num) && l.without(num).is_void() && r.without(num).is_void()
        {
            let mut result = TyMask::VOID;
            if l.intersects(TyMask::INT) && r.intersects(TyMask::INT) {
                result = result.union(TyMask::INT);
            }
            if l.intersects(TyMask::FLOAT) || r.intersects(TyMask::FLOAT) {
                result = result.union(TyMask::FLOAT);
            }
            if result.is_void() {
                result = TyMask::NUMBER;
            }
            return Ty::of(result);
        }

        self.report(
            DiagnosticCode::OperatorNotSupportedOnTypes,
            range,
            format!("operator '{}' is not supported on {} and {}", op_text, lhs, rhs),
        );
        Ty::error()
    }
}

/// Refine existing bindings by a branch's narrowings.
pub fn apply_facts(env: &mut Env, facts: &IndexMap<String, Narrowing>) {
    for (name, narrowing) in facts {
        if let Lookup::Local(var) = env.try_get(name) {
            let narrowed = narrowing.apply(&var.ty);
            env.refine(name, narrowed);
        }
    }
}

fn is_undefined_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(lit) => lit
            .token()
            .is_some_and(|t| t.kind() == SyntaxKind::KwUndefined),
        Expr::Paren(paren) => paren.inner().as_ref().is_some_and(is_undefined_literal),
        _ => false,
    }
}

fn is_zero_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(lit) => lit.token().is_some_and(|t| {
            matches!(t.kind(), SyntaxKind::IntLit | SyntaxKind::FloatLit)
                && t.text().chars().all(|c| matches!(c, '0' | '.'))
        }),
        Expr::Paren(paren) => paren.inner().as_ref().is_some_and(is_zero_literal),
        _ => false,
    }
}

fn is_threaded_call(expr: &Expr) -> bool {
    match expr {
        Expr::Thread(_) => true,
        Expr::CalledOn(called_on) => {
            matches!(called_on.call(), Some(Expr::Thread(_)))
        }
        Expr::Paren(paren) => paren.inner().as_ref().is_some_and(is_threaded_call),
        _ => false,
    }
}

fn compound_op_text(op: SyntaxKind) -> &'static str {
    match op {
        SyntaxKind::PlusAssign => "+",
        SyntaxKind::MinusAssign => "-",
        SyntaxKind::StarAssign => "*",
        SyntaxKind::SlashAssign => "/",
        SyntaxKind::PercentAssign => "%",
        SyntaxKind::AmpAssign => "&",
        SyntaxKind::PipeAssign => "|",
        SyntaxKind::CaretAssign => "^",
        SyntaxKind::ShiftLeftAssign => "<<",
        SyntaxKind::ShiftRightAssign => ">>",
        _ => "=",
    }
}

/// Constant expressions: literals, vectors of constants, and arithmetic on
/// constants.
fn is_constant_expr(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::AnimRef(_) => true,
        Expr::Paren(paren) => paren.inner().as_ref().is_some_and(is_constant_expr),
        Expr::Prefix(prefix) => prefix.operand().as_ref().is_some_and(is_constant_expr),
        Expr::Vector(vector) => vector.components().all(|c| is_constant_expr(&c)),
        Expr::Binary(binary) => {
            binary.op().is_some_and(|op| !op.kind().is_assign_op())
                && binary.lhs().as_ref().is_some_and(is_constant_expr)
                && binary.rhs().as_ref().is_some_and(is_constant_expr)
        }
        _ => false,
    }
}
