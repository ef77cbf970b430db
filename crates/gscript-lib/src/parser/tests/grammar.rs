use indoc::indoc;

use super::parse;
use crate::parser::ast;
use crate::parser::{Expr, Item, Stmt, SwitchElement, SyntaxKind};

#[test]
fn function_definition() {
    let result = parse(indoc! {r#"
        function private autoexec init(a, &b, c = 1, ...) {
        }
    "#});
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().expect("one function");
    assert_eq!(fun.name().unwrap().text(), "init");
    assert!(fun.is_private());
    assert!(fun.is_autoexec());

    let params: Vec<ast::Param> = fun.params().unwrap().params().collect();
    assert_eq!(params.len(), 4);
    assert_eq!(params[0].name().unwrap().text(), "a");
    assert!(!params[0].is_by_ref());
    assert!(params[1].is_by_ref());
    assert!(params[2].default_value().is_some());
    assert!(params[3].is_vararg());
}

#[test]
fn directives() {
    let result = parse(indoc! {r#"
        #using scripts\shared\util;
        #insert scripts\shared\shared.gsh;
        #namespace mymod;
        #precache("model", "p7_dogtags");
        #using_animtree("generic");
    "#});
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.codes());

    let items: Vec<Item> = result.script.items().collect();
    assert_eq!(items.len(), 5);

    let Item::Using(using) = &items[0] else {
        panic!("expected #using first")
    };
    assert_eq!(using.path().unwrap().text(), r"scripts\shared\util");
    assert_eq!(
        using.path().unwrap().script_name().unwrap().text(),
        "util"
    );

    let Item::Namespace(ns) = &items[2] else {
        panic!("expected #namespace third")
    };
    assert_eq!(ns.name().unwrap().text(), "mymod");
}

#[test]
fn if_else_chain_nests_through_else() {
    let result = parse(indoc! {r#"
        function f(a) {
            if (a == 1) {
                b = 1;
            } else if (a == 2) {
                b = 2;
            } else {
                b = 3;
            }
        }
    "#});
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let body: Vec<Stmt> = fun.body().unwrap().stmts().collect();
    assert_eq!(body.len(), 1);

    let Stmt::If(outer) = &body[0] else {
        panic!("expected if statement")
    };
    assert!(outer.condition().is_some());
    assert!(matches!(outer.then_branch(), Some(Stmt::Block(_))));
    let Some(Stmt::If(inner)) = outer.else_branch() else {
        panic!("expected else-if to nest")
    };
    assert!(matches!(inner.else_branch(), Some(Stmt::Block(_))));
}

#[test]
fn for_clauses_split_on_semicolons() {
    let result = parse("function f() { for (i = 0; i < 10; i++) { } }");
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::For(for_stmt)) = fun.body().unwrap().stmts().next() else {
        panic!("expected for statement")
    };
    let (init, cond, incr) = for_stmt.clauses();
    assert!(matches!(init, Some(Expr::Binary(_))));
    assert!(matches!(cond, Some(Expr::Binary(_))));
    assert!(matches!(incr, Some(Expr::Postfix(_))));
    assert!(for_stmt.body().is_some());
}

#[test]
fn empty_for_clauses() {
    let result = parse("function f() { for (;;) { break; } }");
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::For(for_stmt)) = fun.body().unwrap().stmts().next() else {
        panic!("expected for statement")
    };
    let (init, cond, incr) = for_stmt.clauses();
    assert!(init.is_none());
    assert!(cond.is_none());
    assert!(incr.is_none());
}

#[test]
fn foreach_bindings() {
    let result = parse("function f(arr) { foreach (k, v in arr) { } }");
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Foreach(foreach)) = fun.body().unwrap().stmts().next() else {
        panic!("expected foreach")
    };
    let (key, value) = foreach.bindings();
    assert_eq!(key.unwrap().text(), "k");
    assert_eq!(value.unwrap().text(), "v");
    assert!(matches!(foreach.collection(), Some(Expr::Ident(_))));
}

#[test]
fn foreach_single_binding_is_the_value() {
    let result = parse("function f(arr) { foreach (v in arr) { } }");
    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Foreach(foreach)) = fun.body().unwrap().stmts().next() else {
        panic!("expected foreach")
    };
    let (key, value) = foreach.bindings();
    assert!(key.is_none());
    assert_eq!(value.unwrap().text(), "v");
}

#[test]
fn switch_elements_stay_flat_and_ordered() {
    let result = parse(indoc! {r#"
        function f(x) {
            switch (x) {
                case 1:
                case 2:
                    y = 1;
                    break;
                default:
                    y = 2;
            }
        }
    "#});
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Switch(switch)) = fun.body().unwrap().stmts().next() else {
        panic!("expected switch")
    };
    assert!(switch.subject().is_some());

    let elements: Vec<SwitchElement> = switch.elements().collect();
    assert_eq!(elements.len(), 6);
    assert!(matches!(elements[0], SwitchElement::Label(_)));
    assert!(matches!(elements[1], SwitchElement::Label(_)));
    assert!(matches!(elements[2], SwitchElement::Stmt(_)));
    assert!(matches!(elements[3], SwitchElement::Stmt(Stmt::Break(_))));
    let SwitchElement::Label(default) = &elements[4] else {
        panic!("expected default label")
    };
    assert!(default.is_default());
}

#[test]
fn precedence_multiplication_binds_tighter() {
    let result = parse("function f() { x = 1 + 2 * 3; }");
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Expr(stmt)) = fun.body().unwrap().stmts().next() else {
        panic!("expected expression statement")
    };
    let Some(Expr::Binary(assign)) = stmt.expr() else {
        panic!("expected assignment")
    };
    assert_eq!(assign.op().unwrap().kind(), SyntaxKind::Assign);

    let Some(Expr::Binary(add)) = assign.rhs() else {
        panic!("expected addition on the rhs")
    };
    assert_eq!(add.op().unwrap().kind(), SyntaxKind::Plus);
    let Some(Expr::Binary(mul)) = add.rhs() else {
        panic!("expected multiplication nested under addition")
    };
    assert_eq!(mul.op().unwrap().kind(), SyntaxKind::Star);
}

#[test]
fn logical_operators_nest_by_precedence() {
    let result = parse("function f(a, b, c) { if (a || b && c) { } }");
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::If(if_stmt)) = fun.body().unwrap().stmts().next() else {
        panic!("expected if")
    };
    let Some(Expr::Binary(or)) = if_stmt.condition() else {
        panic!("expected || at the top")
    };
    assert_eq!(or.op().unwrap().kind(), SyntaxKind::PipePipe);
    let Some(Expr::Binary(and)) = or.rhs() else {
        panic!("expected && nested under ||")
    };
    assert_eq!(and.op().unwrap().kind(), SyntaxKind::AmpAmp);
}

#[test]
fn paren_head_disambiguation() {
    let result = parse(indoc! {r#"
        function f(a) {
            v = (1, 2, 3);
            t = (a ? 1 : 2);
            p = (a);
        }
    "#});
    assert!(result.diagnostics.is_empty());

    let fun = result.script.functions().next().unwrap();
    let stmts: Vec<Stmt> = fun.body().unwrap().stmts().collect();

    let rhs = |stmt: &Stmt| -> Expr {
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expression statement")
        };
        let Some(Expr::Binary(assign)) = expr_stmt.expr() else {
            panic!("expected assignment")
        };
        assign.rhs().expect("assignment rhs")
    };

    let Expr::Vector(vector) = rhs(&stmts[0]) else {
        panic!("expected vector literal")
    };
    assert_eq!(vector.components().count(), 3);
    assert!(matches!(rhs(&stmts[1]), Expr::Ternary(_)));
    assert!(matches!(rhs(&stmts[2]), Expr::Paren(_)));
}

#[test]
fn call_shapes() {
    let result = parse(indoc! {r#"
        function f(ent, g) {
            foo();
            util::bar(1, 2);
            ent foo();
            thread foo();
            ent thread foo();
            [[ g ]]();
            ent waittill("damage", amount);
        }
        function foo() {}
    "#});

    let fun = result.script.functions().next().unwrap();
    let stmts: Vec<Stmt> = fun.body().unwrap().stmts().collect();
    let expr = |i: usize| -> Expr {
        let Stmt::Expr(expr_stmt) = &stmts[i] else {
            panic!("expected expression statement at {}", i)
        };
        expr_stmt.expr().expect("expression")
    };

    let Expr::Call(plain) = expr(0) else {
        panic!("expected call")
    };
    assert!(matches!(plain.callee(), Some(Expr::Ident(_))));
    assert_eq!(plain.args().unwrap().count(), 0);

    let Expr::Call(qualified) = expr(1) else {
        panic!("expected namespaced call")
    };
    let Some(Expr::NsMember(ns)) = qualified.callee() else {
        panic!("expected ns::member callee")
    };
    assert_eq!(ns.namespace().unwrap().text(), "util");
    assert_eq!(ns.member().unwrap().text(), "bar");
    assert_eq!(qualified.args().unwrap().count(), 2);

    let Expr::CalledOn(called_on) = expr(2) else {
        panic!("expected called-on")
    };
    assert!(matches!(called_on.call(), Some(Expr::Call(_))));

    assert!(matches!(expr(3), Expr::Thread(_)));

    let Expr::CalledOn(threaded) = expr(4) else {
        panic!("expected called-on thread")
    };
    assert!(matches!(threaded.call(), Some(Expr::Thread(_))));

    let Expr::Call(deref_call) = expr(5) else {
        panic!("expected deref call")
    };
    assert!(matches!(deref_call.callee(), Some(Expr::Deref(_))));

    let Expr::Waittill(waittill) = expr(6) else {
        panic!("expected waittill")
    };
    assert!(waittill.target().is_some());
    assert_eq!(waittill.args().unwrap().count(), 2);
}

#[test]
fn function_references() {
    let result = parse("function f() { a = &foo; b = &util::bar; }");
    let fun = result.script.functions().next().unwrap();
    let stmts: Vec<Stmt> = fun.body().unwrap().stmts().collect();

    let rhs = |stmt: &Stmt| -> Expr {
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expression statement")
        };
        let Some(Expr::Binary(assign)) = expr_stmt.expr() else {
            panic!("expected assignment")
        };
        assign.rhs().expect("assignment rhs")
    };

    let Expr::FuncRef(bare) = rhs(&stmts[0]) else {
        panic!("expected function reference")
    };
    let (ns, name) = bare.parts();
    assert!(ns.is_none());
    assert_eq!(name.unwrap().text(), "foo");

    let Expr::FuncRef(qualified) = rhs(&stmts[1]) else {
        panic!("expected namespaced function reference")
    };
    let (ns, name) = qualified.parts();
    assert_eq!(ns.unwrap().text(), "util");
    assert_eq!(name.unwrap().text(), "bar");
}

#[test]
fn nested_index_splits_double_bracket() {
    let result = parse("function f(a, b) { x = a[b[0]]; }");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.codes());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Expr(stmt)) = fun.body().unwrap().stmts().next() else {
        panic!("expected expression statement")
    };
    let Some(Expr::Binary(assign)) = stmt.expr() else {
        panic!("expected assignment")
    };
    let Some(Expr::Index(outer)) = assign.rhs() else {
        panic!("expected index expression")
    };
    assert!(matches!(outer.index(), Some(Expr::Index(_))));
}

#[test]
fn class_definition() {
    let result = parse(indoc! {r#"
        class zbot : zombie {
            var target;
            var speed;

            constructor() {
                self.speed = 1;
            }

            destructor() {
            }

            function chase() {
                return self.target;
            }
        }
    "#});
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.codes());

    let class = result.script.classes().next().expect("one class");
    assert_eq!(class.name().unwrap().text(), "zbot");
    assert_eq!(class.parent_name().unwrap().text(), "zombie");
    assert_eq!(class.members().count(), 2);
    assert_eq!(class.structors().count(), 2);
    assert_eq!(class.methods().count(), 1);

    let ctor = class.structors().next().unwrap();
    assert!(ctor.is_constructor());
    assert!(ctor.body().is_some());
}

#[test]
fn constructor_expression() {
    let result = parse("function f() { b = new zbot(); }");
    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Expr(stmt)) = fun.body().unwrap().stmts().next() else {
        panic!("expected expression statement")
    };
    let Some(Expr::Binary(assign)) = stmt.expr() else {
        panic!("expected assignment")
    };
    let Some(Expr::Constructor(ctor)) = assign.rhs() else {
        panic!("expected constructor expression")
    };
    assert_eq!(ctor.class_name().unwrap().text(), "zbot");
}

#[test]
fn dev_block_wraps_statements() {
    let result = parse(indoc! {r#"
        function f() {
            /#
                println("debug");
            #/
        }
    "#});
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.codes());

    let fun = result.script.functions().next().unwrap();
    let Some(Stmt::Dev(dev)) = fun.body().unwrap().stmts().next() else {
        panic!("expected dev block")
    };
    assert_eq!(dev.stmts().count(), 1);
}

#[test]
fn doc_comment_attaches_to_function() {
    let result = parse(indoc! {r#"
        // Spawns the boss.
        // Called once per round.
        function spawn_boss() {
        }

        function undocumented() {
        }
    "#});

    let funs: Vec<ast::FunDefn> = result.script.functions().collect();
    assert_eq!(
        funs[0].doc_comment().as_deref(),
        Some("Spawns the boss.\nCalled once per round.")
    );
    assert_eq!(funs[1].doc_comment(), None);
}

#[test]
fn wait_statements() {
    let result = parse(indoc! {r#"
        function f() {
            wait 0.5;
            waitrealtime 1;
            waittillframeend;
        }
    "#});
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.codes());

    let fun = result.script.functions().next().unwrap();
    let stmts: Vec<Stmt> = fun.body().unwrap().stmts().collect();
    assert!(matches!(stmts[0], Stmt::Wait(_)));
    assert!(matches!(stmts[1], Stmt::WaitRealTime(_)));
    assert!(matches!(stmts[2], Stmt::WaittillFrameEnd(_)));
}

#[test]
fn parse_is_deterministic() {
    let source = indoc! {r#"
        #using scripts\shared\util;
        function f(a) {
            if (isdefined(a)) {
                return a;
            }
            return 0;
        }
    "#};
    let first = parse(source);
    let second = parse(source);
    assert_eq!(
        format!("{:#?}", first.script.as_cst()),
        format!("{:#?}", second.script.as_cst())
    );
}

#[test]
fn node_ranges_cover_children() {
    let result = parse("function f(a) { if (a > 1) { x = a * (1, 2, 3); } }");
    let root = result.script.as_cst().clone();
    for node in root.descendants() {
        let range = node.text_range();
        for child in node.children() {
            assert!(
                range.contains_range(child.text_range()),
                "{:?} does not cover {:?}",
                node.kind(),
                child.kind()
            );
        }
    }
}
