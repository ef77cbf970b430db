//! Reaching-definitions solver: a forward may-analysis over the CFG with a
//! LIFO worklist and per-edge environments.
//!
//! Two phases, strictly separated:
//! 1. **Silent pass** iterates to a fixed point; nothing user-visible escapes.
//! 2. **Diagnostic pass** re-runs each visited node once, non-silent, with the
//!    converged IN environment; diagnostics and editor facts come only from
//!    here, and IN/OUT are no longer mutated.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use rowan::TextRange;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::parser::Expr;

use super::cfg::{BasicItem, Cfg, CfgNodeKind, NodeId};
use super::expr::{AnalysisContext, ExprAnalyzer, Usage, apply_facts};
use super::lattice::{Facts, Ty, TyMask};
use super::sense::{SenseKind, SenseModifiers, SenseToken};
use super::symbol_table::Env;

/// Converged state of one graph, kept around for tests and tooling.
#[derive(Debug)]
pub struct GraphAnalysis {
    pub ins: IndexMap<NodeId, Env>,
    pub visited: Vec<NodeId>,
    pub iterations: u32,
    pub budget_hit: bool,
}

/// Per-switch label bookkeeping, keyed by the Switch node so repeated
/// fixed-point visits cannot double-report.
#[derive(Default)]
struct SwitchContext {
    seen_labels: Vec<String>,
    default_range: Option<TextRange>,
}

pub struct Solver<'a> {
    cfg: &'a Cfg,
    ctx: &'a AnalysisContext<'a>,
    edge_outs: HashMap<(NodeId, NodeId), Env>,
    switch_contexts: HashMap<NodeId, SwitchContext>,
}

impl<'a> Solver<'a> {
    pub fn new(cfg: &'a Cfg, ctx: &'a AnalysisContext<'a>) -> Self {
        Self {
            cfg,
            ctx,
            edge_outs: HashMap::new(),
            switch_contexts: HashMap::new(),
        }
    }

    /// Run both phases over the graph.
    pub fn run(
        mut self,
        diag: &mut Diagnostics,
        usage: &mut Usage,
        senses: &mut Vec<SenseToken>,
    ) -> GraphAnalysis {
        let analysis = self.silent_pass(diag);
        self.diagnostic_pass(&analysis, diag, usage, senses);

        if analysis.budget_hit {
            diag.report(DiagnosticCode::InternalLimit, self.cfg.name_range)
                .message(format!(
                    "analysis of '{}' stopped after {} iterations",
                    self.cfg.name, analysis.iterations
                ))
                .emit();
        }
        analysis
    }

    fn budget(&self) -> u32 {
        100u32.max(5 * self.cfg.len() as u32)
    }

    fn silent_pass(&mut self, diag: &mut Diagnostics) -> GraphAnalysis {
        let budget = self.budget();
        let mut ins: IndexMap<NodeId, Env> = IndexMap::new();
        let mut visited: Vec<NodeId> = Vec::new();
        let mut visited_set: HashSet<NodeId> = HashSet::new();
        let mut worklist: Vec<NodeId> = vec![self.cfg.entry];
        let mut iterations = 0u32;
        let mut budget_hit = false;

        while let Some(id) = worklist.pop() {
            iterations += 1;
            if iterations > budget {
                budget_hit = true;
                break;
            }

            let node = self.cfg.node(id);

            // The first available edge seeds IN; later edges merge two-sided
            // so one-path-only variables pick up Undefined.
            let mut in_env: Option<Env> = None;
            for &pred in &node.incoming {
                if let Some(edge_env) = self.edge_outs.get(&(pred, id)) {
                    match &mut in_env {
                        None => in_env = Some(edge_env.clone()),
                        Some(env) => env.merge(edge_env, node.scope),
                    }
                }
            }
            let mut in_env = in_env.unwrap_or_default();
            in_env.prune(node.scope);

            let first_visit = visited_set.insert(id);
            if first_visit {
                visited.push(id);
            } else if ins.get(&id) == Some(&in_env) {
                continue;
            }
            ins.insert(id, in_env.clone());

            let (out, facts) = self.transfer(id, &in_env, true, diag, None, None);

            let outgoing = self.cfg.node(id).outgoing.clone();
            for (edge_index, succ) in outgoing.into_iter().enumerate() {
                let env = self.edge_env(id, edge_index, &out, &facts);
                let key = (id, succ);
                if self.edge_outs.get(&key) != Some(&env) {
                    self.edge_outs.insert(key, env);
                    worklist.push(succ);
                }
            }
        }

        GraphAnalysis {
            ins,
            visited,
            iterations,
            budget_hit,
        }
    }

    fn diagnostic_pass(
        &mut self,
        analysis: &GraphAnalysis,
        diag: &mut Diagnostics,
        usage: &mut Usage,
        senses: &mut Vec<SenseToken>,
    ) {
        for &id in &analysis.visited {
            let Some(in_env) = analysis.ins.get(&id) else {
                continue;
            };
            let in_env = in_env.clone();
            self.transfer(id, &in_env, false, diag, Some(usage), Some(senses));
        }

        for (name, (range, is_param)) in &usage.decls {
            if usage.reads.contains(name) || name.starts_with('_') {
                continue;
            }
            let (code, what) = if *is_param {
                (DiagnosticCode::UnusedParameter, "parameter")
            } else {
                (DiagnosticCode::UnusedVariable, "variable")
            };
            diag.report(code, *range)
                .message(format!("{} '{}' is never read", what, name))
                .emit();
        }
    }

    /// The per-edge OUT: condition facts on Decision/Iteration edges, loop
    /// bindings on the Enumeration body edge, base OUT everywhere else.
    fn edge_env(&self, id: NodeId, edge_index: usize, out: &Env, facts: &Facts) -> Env {
        let node = self.cfg.node(id);
        let mut env = out.clone();
        match &node.kind {
            CfgNodeKind::Decision { .. } | CfgNodeKind::Iteration { .. } => {
                if edge_index == 0 {
                    apply_facts(&mut env, &facts.when_true);
                } else {
                    apply_facts(&mut env, &facts.when_false);
                }
            }
            CfgNodeKind::Enumeration { key, value, .. } => {
                if edge_index == 0 {
                    let binding_scope = node.scope + 1;
                    if let Some(key) = key {
                        env.add_or_set(
                            key.text(),
                            Ty::of(TyMask::INT.union(TyMask::STRING)),
                            binding_scope,
                            false,
                            key.text_range(),
                        );
                    }
                    if let Some(value) = value {
                        env.add_or_set(
                            value.text(),
                            Ty::of(TyMask::ANY.without(TyMask::UNDEFINED)),
                            binding_scope,
                            false,
                            value.text_range(),
                        );
                    }
                }
            }
            _ => {}
        }
        env
    }

    /// Per-kind transfer function: IN environment to OUT plus condition facts.
    fn transfer(
        &mut self,
        id: NodeId,
        in_env: &Env,
        silent: bool,
        diag: &mut Diagnostics,
        mut usage: Option<&mut Usage>,
        mut senses: Option<&mut Vec<SenseToken>>,
    ) -> (Env, Facts) {
        let node = self.cfg.node(id);
        let mut env = in_env.clone();
        let var_scope = if node.in_dev { node.scope } else { 1 };

        let mut facts = Facts::new();
        match &node.kind {
            CfgNodeKind::FunctionEntry => {
                self.bind_params(&mut env, silent, diag, usage.as_deref_mut(), senses.as_deref_mut());
            }
            CfgNodeKind::FunctionExit | CfgNodeKind::ClassEntry => {}
            CfgNodeKind::ClassMembers { members } => {
                if let Some(senses) = senses.as_deref_mut() {
                    for member in members {
                        if let Some(token) = member.name() {
                            senses.push(SenseToken {
                                range: token.text_range(),
                                kind: SenseKind::Field,
                                modifiers: SenseModifiers::DECLARATION,
                                hover: format!("var {}", token.text()),
                            });
                        }
                    }
                }
            }
            CfgNodeKind::Basic { items } => {
                let mut analyzer = ExprAnalyzer {
                    ctx: self.ctx,
                    env: &mut env,
                    var_scope,
                    silent,
                    diag: &mut *diag,
                    usage: usage.as_deref_mut(),
                    senses: senses.as_deref_mut(),
                };
                for item in items {
                    match item {
                        BasicItem::Stmt(stmt) => analyzer.exec_stmt(stmt),
                        BasicItem::Expr(expr) => {
                            analyzer.eval(expr);
                        }
                    }
                }
            }
            CfgNodeKind::Decision { condition }
            | CfgNodeKind::Iteration { condition, .. } => {
                if let Some(condition) = condition {
                    let mut analyzer = ExprAnalyzer {
                        ctx: self.ctx,
                        env: &mut env,
                        var_scope,
                        silent,
                        diag: &mut *diag,
                        usage: usage.as_deref_mut(),
                        senses: senses.as_deref_mut(),
                    };
                    facts = analyzer.eval_facts(condition).1;
                }
            }
            CfgNodeKind::Enumeration {
                key,
                value,
                collection,
            } => {
                if let Some(collection) = collection {
                    let mut analyzer = ExprAnalyzer {
                        ctx: self.ctx,
                        env: &mut env,
                        var_scope,
                        silent,
                        diag: &mut *diag,
                        usage: usage.as_deref_mut(),
                        senses: senses.as_deref_mut(),
                    };
                    let ty = analyzer.eval(collection);
                    if !ty.mask.intersects(TyMask::ARRAY)
                        && !ty.mask.is_exactly(TyMask::ANY)
                        && !ty.mask.intersects(TyMask::ERROR)
                        && !silent
                    {
                        diag.report(DiagnosticCode::CannotEnumerateType, collection.range())
                            .message(format!("{} cannot be enumerated", ty))
                            .emit();
                    }
                }
                if let Some(usage) = usage.as_deref_mut() {
                    for token in [key, value].into_iter().flatten() {
                        usage.declare(token.text(), token.text_range(), false);
                    }
                }
            }
            CfgNodeKind::Switch { subject } => {
                if let Some(subject) = subject {
                    let mut analyzer = ExprAnalyzer {
                        ctx: self.ctx,
                        env: &mut env,
                        var_scope,
                        silent,
                        diag: &mut *diag,
                        usage: usage.as_deref_mut(),
                        senses: senses.as_deref_mut(),
                    };
                    analyzer.eval(subject);
                }
            }
            CfgNodeKind::SwitchCase { labels, switch } => {
                // Label bookkeeping happens once, in the diagnostic pass.
                if !silent {
                    self.check_case_labels(id, *switch, labels, diag);
                }
            }
        }

        (env, facts)
    }

    fn bind_params(
        &self,
        env: &mut Env,
        silent: bool,
        diag: &mut Diagnostics,
        mut usage: Option<&mut Usage>,
        mut senses: Option<&mut Vec<SenseToken>>,
    ) {
        let Some(params) = &self.cfg.params else {
            return;
        };
        for param in params.params() {
            if param.is_vararg() {
                continue;
            }
            let Some(token) = param.name() else { continue };
            let name = token.text().to_owned();
            let range = token.text_range();

            if let Some(default) = param.default_value() {
                let mut analyzer = ExprAnalyzer {
                    ctx: self.ctx,
                    env: &mut *env,
                    var_scope: 1,
                    silent,
                    diag: &mut *diag,
                    usage: usage.as_deref_mut(),
                    senses: senses.as_deref_mut(),
                };
                analyzer.eval(&default);
            }

            env.add_or_set(&name, Ty::any(), 1, false, range);
            if let Some(usage) = usage.as_deref_mut() {
                usage.declare(&name, range, true);
            }
            if let Some(senses) = senses.as_deref_mut() {
                senses.push(SenseToken {
                    range,
                    kind: SenseKind::Parameter,
                    modifiers: SenseModifiers::DECLARATION | SenseModifiers::LOCAL,
                    hover: format!("{}: Any", name),
                });
            }
        }
    }

    fn check_case_labels(
        &mut self,
        case_id: NodeId,
        switch: NodeId,
        labels: &[crate::parser::ast::CaseLabel],
        diag: &mut Diagnostics,
    ) {
        let context = self.switch_contexts.entry(switch).or_default();

        if labels.is_empty() {
            // Statements before the first label can never run.
            let range = self
                .cfg
                .node(case_id)
                .outgoing
                .first()
                .and_then(|&body| match &self.cfg.node(body).kind {
                    CfgNodeKind::Basic { items } => items.first().map(|item| match item {
                        BasicItem::Stmt(s) => s.range(),
                        BasicItem::Expr(e) => e.range(),
                    }),
                    _ => None,
                });
            if let Some(range) = range {
                diag.report(DiagnosticCode::UnreachableCase, range)
                    .message("statements before the first case label are unreachable")
                    .emit();
            }
            return;
        }

        for label in labels {
            if label.is_default() {
                if let Some(first) = context.default_range {
                    diag.report(DiagnosticCode::MultipleDefaultLabels, label.range())
                        .message("switch already has a default label")
                        .related_to("first default here", first)
                        .emit();
                } else {
                    context.default_range = Some(label.range());
                }
                continue;
            }

            let Some(value) = label.value() else { continue };
            if !is_case_constant(&value) {
                diag.report(DiagnosticCode::ExpectedConstantExpression, value.range())
                    .message("case labels must be constant expressions")
                    .emit();
                continue;
            }

            let key = case_key(&value);
            if context.seen_labels.contains(&key) {
                diag.report(DiagnosticCode::DuplicateCaseLabel, value.range())
                    .message(format!("duplicate case label {}", key))
                    .emit();
            } else {
                context.seen_labels.push(key);
            }
        }
    }
}

fn is_case_constant(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) => true,
        Expr::Prefix(prefix) => prefix
            .operand()
            .as_ref()
            .is_some_and(|e| matches!(e, Expr::Literal(_))),
        Expr::Paren(paren) => paren.inner().as_ref().is_some_and(is_case_constant),
        _ => false,
    }
}

/// Normalized text of a case label for duplicate detection.
fn case_key(expr: &Expr) -> String {
    expr.as_cst()
        .text()
        .to_string()
        .split_whitespace()
        .collect::<String>()
        .to_ascii_lowercase()
}
