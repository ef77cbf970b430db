use indoc::indoc;

use super::cfg::{self, Cfg, CfgNodeKind, NodeId};
use crate::parser::{Parser, lex};

fn build(source: &str) -> Cfg {
    let result = Parser::new(source, lex(source))
        .parse()
        .expect("parses");
    let fun = result.script.functions().next().expect("one function");
    cfg::build_function(&fun).expect("named function")
}

fn kind_count(cfg: &Cfg, name: &str) -> usize {
    cfg.iter().filter(|(_, n)| n.kind.name() == name).count()
}

/// Nodes reachable from the entry along outgoing edges.
fn reachable(cfg: &Cfg) -> Vec<NodeId> {
    let mut seen = vec![false; cfg.len()];
    let mut stack = vec![cfg.entry];
    seen[cfg.entry as usize] = true;
    while let Some(id) = stack.pop() {
        for &succ in &cfg.node(id).outgoing {
            if !seen[succ as usize] {
                seen[succ as usize] = true;
                stack.push(succ);
            }
        }
    }
    (0..cfg.len() as NodeId)
        .filter(|&id| seen[id as usize])
        .collect()
}

#[test]
fn straight_line_coalesces_into_one_block() {
    let cfg = build("function f() { a = 1; b = 2; c = a + b; }");

    assert_eq!(kind_count(&cfg, "FunctionEntry"), 1);
    assert_eq!(kind_count(&cfg, "FunctionExit"), 1);
    assert_eq!(kind_count(&cfg, "Basic"), 1);

    let (_, basic) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Basic { .. }))
        .unwrap();
    let CfgNodeKind::Basic { items } = &basic.kind else {
        unreachable!()
    };
    assert_eq!(items.len(), 3);
}

#[test]
fn if_without_else_has_false_edge_to_merge() {
    let cfg = build("function f(a) { if (a) { x = 1; } y = 2; }");

    let (decision_id, decision) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Decision { .. }))
        .expect("decision node");
    assert_eq!(decision.outgoing.len(), 2);

    // True edge leads into the then-branch, false edge to the merge; the
    // then-branch rejoins the merge.
    let then_head = decision.outgoing[0];
    let merge = decision.outgoing[1];
    assert!(cfg.node(merge).incoming.contains(&decision_id));
    let mut cursor = then_head;
    let mut hops = 0;
    while cursor != merge && hops < 10 {
        cursor = cfg.node(cursor).outgoing[0];
        hops += 1;
    }
    assert_eq!(cursor, merge, "then branch rejoins the merge");
}

#[test]
fn if_else_with_both_returns_has_no_merge() {
    let cfg = build("function f(a) { if (a) { return 1; } else { return 2; } }");

    let (_, decision) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Decision { .. }))
        .expect("decision node");
    assert_eq!(decision.outgoing.len(), 2);
    // Both branches end at the exit.
    assert_eq!(cfg.node(cfg.exit).incoming.len(), 2);
}

#[test]
fn while_loop_has_back_edge() {
    let cfg = build("function f(a) { while (a) { a = a - 1; } }");

    let (decision_id, decision) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Decision { .. }))
        .expect("decision node");

    // The body eventually loops back to the condition.
    assert!(
        cfg.node(decision_id).incoming.len() >= 2,
        "condition has entry edge and back edge"
    );
    assert_eq!(decision.outgoing.len(), 2);
}

#[test]
fn for_loop_shape() {
    let cfg = build("function f() { for (i = 0; i < 3; i++) { x = i; } }");

    assert_eq!(kind_count(&cfg, "Iteration"), 1);
    let (iter_id, iter) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Iteration { .. }))
        .unwrap();
    let CfgNodeKind::Iteration {
        init,
        condition,
        increment,
    } = &iter.kind
    else {
        unreachable!()
    };
    assert!(init.is_some());
    assert!(condition.is_some());
    assert!(increment.is_some());
    assert_eq!(iter.outgoing.len(), 2);

    // init runs before the iteration node: the entry-side block carries it.
    let pred = iter.incoming[0];
    assert!(matches!(cfg.node(pred).kind, CfgNodeKind::Basic { .. }));

    // The latch holding the increment feeds back into the iteration node.
    assert!(iter.incoming.len() >= 2, "back edge present");
    let _ = iter_id;
}

#[test]
fn foreach_shape() {
    let cfg = build("function f(arr) { foreach (k, v in arr) { x = v; } }");

    let (_, enum_node) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Enumeration { .. }))
        .expect("enumeration node");
    let CfgNodeKind::Enumeration { key, value, collection } = &enum_node.kind else {
        unreachable!()
    };
    assert_eq!(key.as_ref().unwrap().text(), "k");
    assert_eq!(value.as_ref().unwrap().text(), "v");
    assert!(collection.is_some());
    assert_eq!(enum_node.outgoing.len(), 2);
}

#[test]
fn switch_fans_out_and_preserves_fallthrough() {
    let cfg = build(indoc! {r#"
        function f(x) {
            switch (x) {
                case 1:
                    a = 1;
                case 2:
                    a = 2;
                    break;
                default:
                    a = 3;
            }
        }
    "#});

    assert_eq!(kind_count(&cfg, "Switch"), 1);
    assert_eq!(kind_count(&cfg, "SwitchCase"), 3);

    let (switch_id, switch_node) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Switch { .. }))
        .unwrap();
    // All three case nodes fan out of the switch; with a default present
    // there is no direct switch -> merge edge.
    assert_eq!(switch_node.outgoing.len(), 3);
    for &succ in &switch_node.outgoing {
        assert!(matches!(
            cfg.node(succ).kind,
            CfgNodeKind::SwitchCase { .. }
        ));
        let CfgNodeKind::SwitchCase { switch, .. } = &cfg.node(succ).kind else {
            unreachable!()
        };
        assert_eq!(*switch, switch_id);
    }

    // Fallthrough: case 1's body tail connects to case 2's body head, which
    // therefore has two incoming edges.
    let case2_body = {
        let case2 = switch_node.outgoing[1];
        cfg.node(case2).outgoing[0]
    };
    assert_eq!(cfg.node(case2_body).incoming.len(), 2);
}

#[test]
fn switch_without_default_links_to_continuation() {
    let cfg = build(indoc! {r#"
        function f(x) {
            switch (x) {
                case 1:
                    break;
            }
            y = 1;
        }
    "#});

    let (_, switch_node) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Switch { .. }))
        .unwrap();
    // One case plus the no-default continuation edge.
    assert_eq!(switch_node.outgoing.len(), 2);
}

#[test]
fn return_connects_to_exit_and_stops_the_block() {
    let cfg = build("function f() { return 1; }");
    let exit = cfg.node(cfg.exit);
    assert_eq!(exit.incoming.len(), 1);
    let pred = exit.incoming[0];
    let CfgNodeKind::Basic { items } = &cfg.node(pred).kind else {
        panic!("return lives in a basic block")
    };
    assert_eq!(items.len(), 1);
}

#[test]
fn wait_seals_the_block_but_flow_continues() {
    let cfg = build("function f() { a = 1; wait 0.5; b = 2; }");
    // wait splits statements across two blocks.
    assert!(kind_count(&cfg, "Basic") >= 2);
    assert_eq!(cfg.node(cfg.exit).incoming.len(), 1);
}

#[test]
fn break_and_continue_edges() {
    let cfg = build(indoc! {r#"
        function f(a) {
            while (a) {
                if (a == 1) {
                    break;
                }
                if (a == 2) {
                    continue;
                }
                a = a - 1;
            }
        }
    "#});

    // All reachable non-entry nodes have a predecessor.
    for id in reachable(&cfg) {
        if id == cfg.entry {
            continue;
        }
        assert!(
            !cfg.node(id).incoming.is_empty(),
            "node {} has no predecessor",
            id
        );
    }
}

#[test]
fn dev_block_nodes_are_marked() {
    let cfg = build("function f() { /# x = 1; #/ }");
    assert!(cfg.iter().any(|(_, n)| n.in_dev));
}

#[test]
fn scope_increases_in_loop_bodies() {
    let cfg = build("function f(a) { while (a) { x = 1; } }");
    let (_, decision) = cfg
        .iter()
        .find(|(_, n)| matches!(n.kind, CfgNodeKind::Decision { .. }))
        .unwrap();
    let body = decision.outgoing[0];
    let merge = decision.outgoing[1];
    assert!(cfg.node(body).scope > decision.scope);
    assert_eq!(cfg.node(merge).scope, decision.scope);
}

#[test]
fn class_graph_links_entry_members_exit() {
    let source = indoc! {r#"
        class widget {
            var state;
            function poke() { self.state = 1; }
        }
    "#};
    let result = Parser::new(source, lex(source)).parse().expect("parses");
    let class = result.script.classes().next().unwrap();

    let graph = cfg::build_class(&class).expect("class graph");
    assert_eq!(graph.entry, 0);
    let CfgNodeKind::ClassMembers { members } = &graph.node(graph.node(graph.entry).outgoing[0]).kind
    else {
        panic!("entry leads to members block")
    };
    assert_eq!(members.len(), 1);

    let method = cfg::build_method("widget", &class.methods().next().unwrap()).unwrap();
    assert_eq!(method.class_name.as_deref(), Some("widget"));
}

#[test]
fn every_statement_lands_in_the_graph() {
    let cfg = build(indoc! {r#"
        function f(a) {
            x = 1;
            if (a) {
                y = 2;
            } else {
                z = 3;
            }
            w = 4;
        }
    "#});

    let mut stmt_count = 0;
    for (_, node) in cfg.iter() {
        if let CfgNodeKind::Basic { items } = &node.kind {
            stmt_count += items.len();
        }
    }
    assert_eq!(stmt_count, 4);
}
