//! Control-flow graph construction.
//!
//! One graph per function, method, constructor or destructor, plus a small
//! overarching graph per class. Nodes live in a flat `Vec` referenced by
//! `NodeId`; edges are ids in `incoming`/`outgoing`, never ownership.
//!
//! Edge conventions consumed by the solver:
//! - Decision/Iteration/Enumeration: `outgoing[0]` is the true/body edge,
//!   `outgoing[1]` the false/continuation edge.
//! - Switch fans out to one SwitchCase per case group, plus the continuation
//!   when no default label exists.
//! - Fallthrough between case groups links the previous body tail directly
//!   to the next body head, bypassing the label test.

use rowan::TextRange;

use crate::parser::ast;
use crate::parser::{Expr, Stmt, SwitchElement, SyntaxToken};

/// Index into `Cfg::nodes`.
pub type NodeId = u32;

/// A statement or a bare expression carried by a basic block.
///
/// `for` headers contribute their init/increment clauses as expressions.
#[derive(Debug, Clone)]
pub enum BasicItem {
    Stmt(Stmt),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum CfgNodeKind {
    FunctionEntry,
    FunctionExit,
    ClassEntry,
    ClassMembers { members: Vec<ast::MemberDecl> },
    Basic { items: Vec<BasicItem> },
    Decision { condition: Option<Expr> },
    Iteration {
        init: Option<Expr>,
        condition: Option<Expr>,
        increment: Option<Expr>,
    },
    Enumeration {
        key: Option<SyntaxToken>,
        value: Option<SyntaxToken>,
        collection: Option<Expr>,
    },
    Switch { subject: Option<Expr> },
    SwitchCase {
        labels: Vec<ast::CaseLabel>,
        switch: NodeId,
    },
}

impl CfgNodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            CfgNodeKind::FunctionEntry => "FunctionEntry",
            CfgNodeKind::FunctionExit => "FunctionExit",
            CfgNodeKind::ClassEntry => "ClassEntry",
            CfgNodeKind::ClassMembers { .. } => "ClassMembers",
            CfgNodeKind::Basic { .. } => "Basic",
            CfgNodeKind::Decision { .. } => "Decision",
            CfgNodeKind::Iteration { .. } => "Iteration",
            CfgNodeKind::Enumeration { .. } => "Enumeration",
            CfgNodeKind::Switch { .. } => "Switch",
            CfgNodeKind::SwitchCase { .. } => "SwitchCase",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CfgNode {
    pub kind: CfgNodeKind,
    /// Lexical depth at the node's origin; the solver drops deeper bindings
    /// when merging into this node.
    pub scope: u32,
    pub in_dev: bool,
    pub incoming: Vec<NodeId>,
    pub outgoing: Vec<NodeId>,
}

/// What a graph was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphKind {
    Function,
    Method,
    Constructor,
    Destructor,
    Class,
}

#[derive(Debug)]
pub struct Cfg {
    pub name: String,
    pub kind: GraphKind,
    /// Back-pointer for method dispatch during analysis.
    pub class_name: Option<String>,
    pub params: Option<ast::ParamList>,
    pub name_range: TextRange,
    pub nodes: Vec<CfgNode>,
    pub entry: NodeId,
    pub exit: NodeId,
}

impl Cfg {
    pub fn node(&self, id: NodeId) -> &CfgNode {
        &self.nodes[id as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CfgNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (i as NodeId, n))
    }

    /// Multi-line textual rendering for the CLI and tests.
    pub fn dump(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(out, "cfg {} ({} nodes)", self.name, self.nodes.len());
        for (id, node) in self.iter() {
            let succ: Vec<String> = node.outgoing.iter().map(|s| s.to_string()).collect();
            let _ = writeln!(
                out,
                "  n{} {} scope={}{} -> [{}]",
                id,
                node.kind.name(),
                node.scope,
                if node.in_dev { " dev" } else { "" },
                succ.join(", ")
            );
        }
        out
    }
}

/// Build the graph for a free function.
pub fn build_function(fun: &ast::FunDefn) -> Option<Cfg> {
    let name = fun.name()?;
    Some(build(
        name.text().to_owned(),
        GraphKind::Function,
        None,
        fun.params(),
        name.text_range(),
        fun.body(),
    ))
}

/// Build the graph for a class method.
pub fn build_method(class: &str, fun: &ast::FunDefn) -> Option<Cfg> {
    let name = fun.name()?;
    Some(build(
        name.text().to_owned(),
        GraphKind::Method,
        Some(class.to_owned()),
        fun.params(),
        name.text_range(),
        fun.body(),
    ))
}

/// Build the graph for a constructor or destructor.
pub fn build_structor(class: &str, structor: &ast::Structor) -> Option<Cfg> {
    let keyword = structor.keyword()?;
    let kind = if structor.is_constructor() {
        GraphKind::Constructor
    } else {
        GraphKind::Destructor
    };
    Some(build(
        keyword.text().to_ascii_lowercase(),
        kind,
        Some(class.to_owned()),
        structor.params(),
        keyword.text_range(),
        structor.body(),
    ))
}

/// The overarching class graph: entry -> members block -> exit. Method
/// bodies get their own graphs via [`build_method`].
pub fn build_class(class: &ast::ClassDefn) -> Option<Cfg> {
    let name = class.name()?;
    let mut nodes = Vec::new();

    nodes.push(CfgNode {
        kind: CfgNodeKind::ClassEntry,
        scope: 0,
        in_dev: false,
        incoming: Vec::new(),
        outgoing: Vec::new(),
    });
    nodes.push(CfgNode {
        kind: CfgNodeKind::FunctionExit,
        scope: 0,
        in_dev: false,
        incoming: Vec::new(),
        outgoing: Vec::new(),
    });
    nodes.push(CfgNode {
        kind: CfgNodeKind::ClassMembers {
            members: class.members().collect(),
        },
        scope: 1,
        in_dev: false,
        incoming: Vec::new(),
        outgoing: Vec::new(),
    });

    let entry = 0;
    let exit = 1;
    let members = 2;
    nodes[entry as usize].outgoing.push(members);
    nodes[members as usize].incoming.push(entry);
    nodes[members as usize].outgoing.push(exit);
    nodes[exit as usize].incoming.push(members);

    Some(Cfg {
        name: name.text().to_owned(),
        kind: GraphKind::Class,
        class_name: Some(name.text().to_owned()),
        params: None,
        name_range: name.text_range(),
        nodes,
        entry: 0,
        exit: 1,
    })
}

fn build(
    name: String,
    kind: GraphKind,
    class_name: Option<String>,
    params: Option<ast::ParamList>,
    name_range: TextRange,
    body: Option<ast::Block>,
) -> Cfg {
    let mut builder = Builder {
        nodes: Vec::new(),
        exit: 0,
        loops: Vec::new(),
        scope: 0,
        in_dev: false,
    };

    let entry = builder.add(CfgNodeKind::FunctionEntry);
    builder.exit = builder.add(CfgNodeKind::FunctionExit);
    let exit = builder.exit;

    builder.scope = 1;
    let mut tail = Some(entry);
    if let Some(block) = &body {
        let stmts: Vec<Stmt> = block.stmts().collect();
        tail = builder.lower_stmts(&stmts, entry);
    }
    if let Some(end) = tail {
        builder.connect(end, exit);
    }

    Cfg {
        name,
        kind,
        class_name,
        params,
        name_range,
        nodes: builder.nodes,
        entry,
        exit,
    }
}

struct LoopFrame {
    /// `None` for switch frames: `continue` skips them to the enclosing loop.
    continue_target: Option<NodeId>,
    break_target: NodeId,
}

struct Builder {
    nodes: Vec<CfgNode>,
    exit: NodeId,
    loops: Vec<LoopFrame>,
    scope: u32,
    in_dev: bool,
}

impl Builder {
    fn add(&mut self, kind: CfgNodeKind) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(CfgNode {
            kind,
            scope: self.scope,
            in_dev: self.in_dev,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        });
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        self.nodes[from as usize].outgoing.push(to);
        self.nodes[to as usize].incoming.push(from);
    }

    fn new_basic(&mut self) -> NodeId {
        self.add(CfgNodeKind::Basic { items: Vec::new() })
    }

    fn new_basic_from(&mut self, pred: NodeId) -> NodeId {
        let id = self.new_basic();
        self.connect(pred, id);
        id
    }

    /// A block statements can be appended to: `current` itself when it is a
    /// basic block, otherwise a fresh one linked behind it.
    fn appendable(&mut self, current: NodeId) -> NodeId {
        if matches!(self.nodes[current as usize].kind, CfgNodeKind::Basic { .. }) {
            current
        } else {
            self.new_basic_from(current)
        }
    }

    fn append(&mut self, current: NodeId, item: BasicItem) -> NodeId {
        let target = self.appendable(current);
        if let CfgNodeKind::Basic { items } = &mut self.nodes[target as usize].kind {
            items.push(item);
        }
        target
    }

    /// Lower a statement list. Returns the node where control continues, or
    /// `None` when every path diverged; trailing unreachable statements are
    /// dropped.
    fn lower_stmts(&mut self, stmts: &[Stmt], pred: NodeId) -> Option<NodeId> {
        let mut current = Some(pred);
        for stmt in stmts {
            let Some(cur) = current else { break };
            current = self.lower_stmt(cur, stmt);
        }
        current
    }

    fn lower_stmt(&mut self, current: NodeId, stmt: &Stmt) -> Option<NodeId> {
        match stmt {
            Stmt::Empty(_) => Some(current),

            Stmt::Const(_) | Stmt::Expr(_) => {
                Some(self.append(current, BasicItem::Stmt(stmt.clone())))
            }

            Stmt::Block(block) => {
                self.scope += 1;
                let head = self.new_basic_from(current);
                let stmts: Vec<Stmt> = block.stmts().collect();
                let tail = self.lower_stmts(&stmts, head);
                self.scope -= 1;
                tail.map(|t| self.new_basic_from(t))
            }

            Stmt::If(stmt) => self.lower_if(current, stmt),
            Stmt::While(stmt) => self.lower_while(current, stmt),
            Stmt::DoWhile(stmt) => self.lower_do_while(current, stmt),
            Stmt::For(stmt) => self.lower_for(current, stmt),
            Stmt::Foreach(stmt) => self.lower_foreach(current, stmt),
            Stmt::Switch(stmt) => self.lower_switch(current, stmt),

            Stmt::Return(_) => {
                let cur = self.append(current, BasicItem::Stmt(stmt.clone()));
                self.connect(cur, self.exit);
                None
            }

            Stmt::Break(_) => {
                if let Some(frame) = self.loops.last() {
                    let target = frame.break_target;
                    self.connect(current, target);
                }
                None
            }

            Stmt::Continue(_) => {
                let target = self
                    .loops
                    .iter()
                    .rev()
                    .find_map(|frame| frame.continue_target);
                if let Some(target) = target {
                    self.connect(current, target);
                }
                None
            }

            // Suspension points end the block but control flows on.
            Stmt::Wait(_) | Stmt::WaitRealTime(_) | Stmt::WaittillFrameEnd(_) => {
                let cur = self.append(current, BasicItem::Stmt(stmt.clone()));
                Some(self.new_basic_from(cur))
            }

            Stmt::Dev(dev) => {
                let was_dev = self.in_dev;
                self.in_dev = true;
                self.scope += 1;
                let head = self.new_basic_from(current);
                let stmts: Vec<Stmt> = dev.stmts().collect();
                let tail = self.lower_stmts(&stmts, head);
                self.scope -= 1;
                self.in_dev = was_dev;
                tail.map(|t| self.new_basic_from(t))
            }
        }
    }

    fn lower_if(&mut self, current: NodeId, stmt: &ast::IfStmt) -> Option<NodeId> {
        let decision = self.add(CfgNodeKind::Decision {
            condition: stmt.condition(),
        });
        self.connect(current, decision);

        self.scope += 1;
        let then_head = self.new_basic_from(decision);
        let then_tail = match stmt.then_branch() {
            Some(branch) => self.lower_stmt(then_head, &branch),
            None => Some(then_head),
        };
        self.scope -= 1;

        let else_tail = match stmt.else_branch() {
            Some(branch) => {
                self.scope += 1;
                let else_head = self.new_basic_from(decision);
                let tail = self.lower_stmt(else_head, &branch);
                self.scope -= 1;
                tail
            }
            None => None,
        };
        let has_else = stmt.else_branch().is_some();

        if then_tail.is_none() && else_tail.is_none() && has_else {
            return None;
        }

        let merge = self.new_basic();
        if let Some(t) = then_tail {
            self.connect(t, merge);
        }
        if has_else {
            if let Some(e) = else_tail {
                self.connect(e, merge);
            }
        } else {
            // Missing else: the false edge goes straight to the merge.
            self.connect(decision, merge);
        }
        Some(merge)
    }

    fn lower_while(&mut self, current: NodeId, stmt: &ast::WhileStmt) -> Option<NodeId> {
        let decision = self.add(CfgNodeKind::Decision {
            condition: stmt.condition(),
        });
        self.connect(current, decision);

        self.scope += 1;
        let body_head = self.new_basic_from(decision);
        self.scope -= 1;

        let merge = self.new_basic();
        self.loops.push(LoopFrame {
            continue_target: Some(decision),
            break_target: merge,
        });

        self.scope += 1;
        let body_tail = match stmt.body() {
            Some(body) => self.lower_stmt(body_head, &body),
            None => Some(body_head),
        };
        self.scope -= 1;
        self.loops.pop();

        if let Some(t) = body_tail {
            self.connect(t, decision);
        }
        self.connect(decision, merge);
        Some(merge)
    }

    fn lower_do_while(&mut self, current: NodeId, stmt: &ast::DoWhileStmt) -> Option<NodeId> {
        let decision = self.add(CfgNodeKind::Decision {
            condition: stmt.condition(),
        });
        let merge = self.new_basic();

        self.scope += 1;
        let body_head = self.new_basic_from(current);
        self.scope -= 1;

        self.loops.push(LoopFrame {
            continue_target: Some(decision),
            break_target: merge,
        });
        self.scope += 1;
        let body_tail = match stmt.body() {
            Some(body) => self.lower_stmt(body_head, &body),
            None => Some(body_head),
        };
        self.scope -= 1;
        self.loops.pop();

        if let Some(t) = body_tail {
            self.connect(t, decision);
        }
        self.connect(decision, body_head);
        self.connect(decision, merge);
        Some(merge)
    }

    fn lower_for(&mut self, current: NodeId, stmt: &ast::ForStmt) -> Option<NodeId> {
        let (init, condition, increment) = stmt.clauses();

        let mut cur = current;
        if let Some(init) = &init {
            cur = self.append(cur, BasicItem::Expr(init.clone()));
        }

        let iter = self.add(CfgNodeKind::Iteration {
            init,
            condition,
            increment: increment.clone(),
        });
        self.connect(cur, iter);

        self.scope += 1;
        let body_head = self.new_basic_from(iter);
        let latch = self.new_basic();
        if let Some(incr) = increment {
            self.append(latch, BasicItem::Expr(incr));
        }
        self.scope -= 1;

        let merge = self.new_basic();
        self.loops.push(LoopFrame {
            continue_target: Some(latch),
            break_target: merge,
        });

        self.scope += 1;
        let body_tail = match stmt.body() {
            Some(body) => self.lower_stmt(body_head, &body),
            None => Some(body_head),
        };
        self.scope -= 1;
        self.loops.pop();

        if let Some(t) = body_tail {
            self.connect(t, latch);
        }
        self.connect(latch, iter);
        self.connect(iter, merge);
        Some(merge)
    }

    fn lower_foreach(&mut self, current: NodeId, stmt: &ast::ForeachStmt) -> Option<NodeId> {
        let (key, value) = stmt.bindings();
        let enum_node = self.add(CfgNodeKind::Enumeration {
            key,
            value,
            collection: stmt.collection(),
        });
        self.connect(current, enum_node);

        self.scope += 1;
        let body_head = self.new_basic_from(enum_node);
        self.scope -= 1;

        let merge = self.new_basic();
        self.loops.push(LoopFrame {
            continue_target: Some(enum_node),
            break_target: merge,
        });

        self.scope += 1;
        let body_tail = match stmt.body() {
            Some(body) => self.lower_stmt(body_head, &body),
            None => Some(body_head),
        };
        self.scope -= 1;
        self.loops.pop();

        if let Some(t) = body_tail {
            self.connect(t, enum_node);
        }
        self.connect(enum_node, merge);
        Some(merge)
    }

    fn lower_switch(&mut self, current: NodeId, stmt: &ast::SwitchStmt) -> Option<NodeId> {
        let switch_node = self.add(CfgNodeKind::Switch {
            subject: stmt.subject(),
        });
        self.connect(current, switch_node);

        let merge = self.new_basic();
        self.loops.push(LoopFrame {
            continue_target: None,
            break_target: merge,
        });

        // Group the flat element list into (labels, statements) runs.
        let mut groups: Vec<(Vec<ast::CaseLabel>, Vec<Stmt>)> = Vec::new();
        for element in stmt.elements() {
            match element {
                SwitchElement::Label(label) => {
                    match groups.last_mut() {
                        Some((labels, stmts)) if stmts.is_empty() => labels.push(label),
                        _ => groups.push((vec![label], Vec::new())),
                    }
                }
                SwitchElement::Stmt(s) => match groups.last_mut() {
                    Some((_, stmts)) => stmts.push(s),
                    None => groups.push((Vec::new(), vec![s])),
                },
            }
        }

        let mut has_default = false;
        let mut fallthrough: Option<NodeId> = None;
        for (labels, stmts) in &groups {
            if labels.iter().any(|l| l.is_default()) {
                has_default = true;
            }

            let case_node = self.add(CfgNodeKind::SwitchCase {
                labels: labels.clone(),
                switch: switch_node,
            });
            self.connect(switch_node, case_node);

            self.scope += 1;
            let body_head = self.new_basic_from(case_node);
            if let Some(prev_tail) = fallthrough.take() {
                self.connect(prev_tail, body_head);
            }
            let tail = self.lower_stmts(stmts, body_head);
            self.scope -= 1;
            fallthrough = tail;
        }
        if let Some(last_tail) = fallthrough {
            self.connect(last_tail, merge);
        }

        if !has_default {
            self.connect(switch_node, merge);
        }
        self.loops.pop();

        if self.nodes[merge as usize].incoming.is_empty() {
            None
        } else {
            Some(merge)
        }
    }
}
