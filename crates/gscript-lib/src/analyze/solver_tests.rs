//! End-to-end dataflow scenarios over the full pipeline.

use indoc::indoc;

use crate::ScriptAnalysis;
use crate::analyze::cfg::{BasicItem, CfgNodeKind};
use crate::analyze::lattice::TyMask;
use crate::analyze::symbol_table::{Env, Lookup};
use crate::analyze::{ExportedFn, Exports, Overload};
use crate::diagnostics::DiagnosticCode;
use crate::script::ScriptBuilder;

fn analyze(source: &str) -> ScriptAnalysis {
    ScriptAnalysis::new(source).expect("within parse limits")
}

/// IN environment of the first basic block whose text contains `snippet`.
fn ins_at<'a>(analysis: &'a ScriptAnalysis, fun: &str, snippet: &str) -> &'a Env {
    let graph = analysis.graph(fun).expect("graph exists");
    let (id, _) = graph
        .iter()
        .find(|(_, node)| match &node.kind {
            CfgNodeKind::Basic { items } => items.iter().any(|item| {
                let text = match item {
                    BasicItem::Stmt(s) => s.as_cst().text().to_string(),
                    BasicItem::Expr(e) => e.as_cst().text().to_string(),
                };
                text.contains(snippet)
            }),
            _ => false,
        })
        .unwrap_or_else(|| panic!("no block containing {:?}", snippet));
    analysis
        .graph_analysis(fun)
        .expect("analysis exists")
        .ins
        .get(&id)
        .expect("IN computed")
}

fn exit_ins<'a>(analysis: &'a ScriptAnalysis, fun: &str) -> &'a Env {
    let graph = analysis.graph(fun).expect("graph exists");
    analysis
        .graph_analysis(fun)
        .expect("analysis exists")
        .ins
        .get(&graph.exit)
        .expect("exit reachable")
}

fn mask_of(env: &Env, name: &str) -> TyMask {
    match env.try_get(name) {
        Lookup::Local(var) => var.ty.mask,
        other => panic!("{} not bound: {:?}", name, other),
    }
}

#[test]
fn negated_isdefined_narrows_to_undefined() {
    let analysis = analyze(indoc! {r#"
        function f() {
            x = 1;
            if (!isdefined(x)) {
                y = x;
            }
        }
    "#});

    // Inside the then-branch x reads as Undefined, and so does y.
    let env = ins_at(&analysis, "f", "y = x");
    assert!(mask_of(env, "x").is_exactly(TyMask::UNDEFINED));

    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "y").is_exactly(TyMask::UNDEFINED));
}

#[test]
fn short_circuit_and_narrows_the_rhs() {
    let analysis = analyze(indoc! {r#"
        function f(a) {
            if (isdefined(a) && a == 0) {
                b = 1;
            }
            c = b;
        }
    "#});

    // The rhs of && sees `a` without Undefined, so no advice fires.
    assert!(
        !analysis
            .diagnostics()
            .codes()
            .contains(&DiagnosticCode::PossibleUndefinedComparison),
        "{:?}",
        analysis.diagnostics().codes()
    );

    // `b` after the if joins the assigned Int with Undefined.
    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "b").is_exactly(TyMask::INT.union(TyMask::UNDEFINED)));
    assert!(mask_of(exit, "c").is_exactly(TyMask::INT.union(TyMask::UNDEFINED)));
}

#[test]
fn isdefined_else_branch_is_exactly_undefined() {
    let analysis = analyze(indoc! {r#"
        function f(a) {
            if (isdefined(a)) {
                b = a;
            } else {
                c = a;
            }
        }
    "#});

    let then_env = ins_at(&analysis, "f", "b = a");
    assert!(!mask_of(then_env, "a").intersects(TyMask::UNDEFINED));

    let else_env = ins_at(&analysis, "f", "c = a");
    assert!(mask_of(else_env, "a").is_exactly(TyMask::UNDEFINED));
}

#[test]
fn const_reassignment_is_rejected() {
    let analysis = analyze(indoc! {r#"
        function f() {
            const K = 1 + 2;
            K = 4;
        }
    "#});

    let codes = analysis.diagnostics().codes();
    assert!(codes.contains(&DiagnosticCode::CannotAssignToConstant), "{:?}", codes);

    // The constant folded to an Int binding.
    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "K").is_exactly(TyMask::INT));
}

#[test]
fn non_constant_initializer_for_const() {
    let analysis = analyze(indoc! {r#"
        function f(a) {
            const K = a + 1;
        }
    "#});
    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::ExpectedConstantExpression));
}

#[test]
fn duplicate_case_and_multiple_defaults() {
    let analysis = analyze(indoc! {r#"
        function f(x) {
            switch (x) {
                case 1:
                case 1:
                    break;
                default:
                    break;
                default:
                    break;
            }
        }
    "#});

    let codes = analysis.diagnostics().codes();
    let dups = codes
        .iter()
        .filter(|c| **c == DiagnosticCode::DuplicateCaseLabel)
        .count();
    let defaults = codes
        .iter()
        .filter(|c| **c == DiagnosticCode::MultipleDefaultLabels)
        .count();
    assert_eq!(dups, 1, "{:?}", codes);
    assert_eq!(defaults, 1, "{:?}", codes);
}

#[test]
fn vector_plus_string_is_rejected() {
    let analysis = analyze(indoc! {r#"
        function f(c) {
            v = (1, 2, 3);
            if (c) {
                v += "x";
            }
        }
    "#});

    let env = ins_at(&analysis, "f", r#"v += "x""#);
    assert!(mask_of(env, "v").is_exactly(TyMask::VECTOR));

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::OperatorNotSupportedOnTypes));
}

#[test]
fn reference_to_missing_function() {
    let analysis = analyze("function f() { a = &missing; a = a; }");

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::FunctionDoesNotExist));

    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "a").is_exactly(TyMask::UNDEFINED));
}

#[test]
fn assigning_a_threaded_call() {
    let analysis = analyze(indoc! {r#"
        function f() {
            thread g();
            x = thread g();
        }
        function g() {
        }
    "#});

    let count = analysis
        .diagnostics()
        .codes()
        .into_iter()
        .filter(|c| *c == DiagnosticCode::AssignOnThreadedFunction)
        .count();
    assert_eq!(count, 1);
}

#[test]
fn loop_analysis_converges_within_budget() {
    let analysis = analyze(indoc! {r#"
        function f(n) {
            total = 0;
            for (i = 0; i < n; i++) {
                total = total + i;
            }
            done = total;
        }
    "#});

    let graph_analysis = analysis.graph_analysis("f").unwrap();
    assert!(!graph_analysis.budget_hit);

    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "total").contains(TyMask::INT));
    assert!(
        !analysis
            .diagnostics()
            .codes()
            .contains(&DiagnosticCode::InternalLimit)
    );
}

#[test]
fn diagnostics_are_emitted_once_despite_refixing() {
    // The decision node is visited repeatedly during the silent pass; the
    // warning must still appear exactly once.
    let analysis = analyze(indoc! {r#"
        function f() {
            while (x == 1) {
                x = x;
            }
        }
    "#});

    let warnings = analysis
        .diagnostics()
        .codes()
        .into_iter()
        .filter(|c| *c == DiagnosticCode::PossibleUndefinedComparison)
        .count();
    assert_eq!(warnings, 1, "{:?}", analysis.diagnostics().codes());
}

#[test]
fn foreach_bindings_do_not_leak_past_the_loop() {
    let analysis = analyze(indoc! {r#"
        function f(arr) {
            arr[0] = 1;
            foreach (k, v in arr) {
                use = v;
                use2 = k;
            }
        }
    "#});

    let body = ins_at(&analysis, "f", "use = v");
    assert!(matches!(body.try_get("v"), Lookup::Local(_)));
    assert!(mask_of(body, "k").contains(TyMask::INT));

    let exit = exit_ins(&analysis, "f");
    assert!(matches!(exit.try_get("k"), Lookup::Undefined));
    assert!(matches!(exit.try_get("v"), Lookup::Undefined));
}

#[test]
fn enumerating_a_number_is_rejected() {
    let analysis = analyze(indoc! {r#"
        function f() {
            x = 1;
            foreach (v in x) {
            }
        }
    "#});
    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::CannotEnumerateType));
}

#[test]
fn indexed_write_materializes_an_array() {
    let analysis = analyze(indoc! {r#"
        function f() {
            a[0] = 1;
            b = a;
        }
    "#});

    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "a").contains(TyMask::ARRAY));
    assert!(!mask_of(exit, "a").intersects(TyMask::UNDEFINED));
}

#[test]
fn unused_variable_and_parameter_warnings() {
    let analysis = analyze(indoc! {r#"
        function f(used, dangling) {
            kept = used;
            orphan = 1;
            result = kept;
            keep2 = result;
            keep3 = keep2;
            final_use = keep3;
        }
    "#});

    let codes = analysis.diagnostics().codes();
    assert!(codes.contains(&DiagnosticCode::UnusedParameter), "{:?}", codes);
    assert!(codes.contains(&DiagnosticCode::UnusedVariable), "{:?}", codes);

    let unused_params = analysis
        .diagnostics()
        .iter()
        .filter(|d| d.code() == DiagnosticCode::UnusedParameter)
        .count();
    assert_eq!(unused_params, 1);
}

#[test]
fn reserved_globals_read_but_never_written() {
    let analysis = analyze(indoc! {r#"
        function f() {
            x = level;
            self = 1;
        }
    "#});

    let codes = analysis.diagnostics().codes();
    assert!(codes.contains(&DiagnosticCode::ReservedSymbol), "{:?}", codes);

    // level read fine: x picked up the struct kind.
    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "x").intersects(TyMask::STRUCT));
}

#[test]
fn bare_expression_statement_is_flagged() {
    let analysis = analyze("function f() { 1 + 2; }");
    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::InvalidExpressionStatement));
}

#[test]
fn division_by_zero_literal() {
    let analysis = analyze("function f() { x = 1 / 0; y = x; }");
    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::DivisionByZero));
}

#[test]
fn script_function_arity() {
    let analysis = analyze(indoc! {r#"
        function g(a, b) {
            return a + b;
        }
        function f() {
            g(1, 2, 3);
            g(1);
        }
    "#});

    let codes = analysis.diagnostics().codes();
    // Too many always fires; too few never does for script functions.
    assert!(codes.contains(&DiagnosticCode::TooManyArguments), "{:?}", codes);
    assert!(!codes.contains(&DiagnosticCode::TooFewArguments), "{:?}", codes);
}

#[test]
fn builtin_arity() {
    let analysis = analyze(indoc! {r#"
        function f() {
            gettime(1);
            getdvarstring();
        }
    "#});

    let codes = analysis.diagnostics().codes();
    assert!(codes.contains(&DiagnosticCode::TooManyArguments), "{:?}", codes);
    assert!(codes.contains(&DiagnosticCode::TooFewArguments), "{:?}", codes);
}

#[test]
fn builtin_return_types_flow() {
    let analysis = analyze(indoc! {r#"
        function f() {
            t = gettime();
            done = t;
        }
    "#});

    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "t").is_exactly(TyMask::INT));
}

#[test]
fn vectorscale_special_return() {
    let analysis = analyze(indoc! {r#"
        function f() {
            v = vectorscale((1, 0, 0), 2);
            done = v;
        }
    "#});

    let exit = exit_ins(&analysis, "f");
    assert!(mask_of(exit, "v").is_exactly(TyMask::VECTOR));
}

#[test]
fn storing_a_function_without_ampersand() {
    let analysis = analyze(indoc! {r#"
        function f() {
            a = g;
            b = a;
        }
        function g() {
        }
    "#});

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::StoreFunctionAsPointer));
}

#[test]
fn deref_requires_a_function_pointer() {
    let analysis = analyze(indoc! {r#"
        function f() {
            x = 1;
            y = [[ x ]]();
        }
    "#});

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::ExpectedFunction));
}

#[test]
fn deref_of_a_real_pointer_is_fine() {
    let analysis = analyze(indoc! {r#"
        function f() {
            ptr = &g;
            [[ ptr ]]();
        }
        function g() {
        }
    "#});

    assert!(
        !analysis
            .diagnostics()
            .codes()
            .contains(&DiagnosticCode::ExpectedFunction),
        "{:?}",
        analysis.diagnostics().codes()
    );
}

#[test]
fn unknown_namespace_and_class() {
    let analysis = analyze(indoc! {r#"
        function f() {
            x = nowhere::thing();
            y = new ghost();
            z = x;
            w = y;
        }
    "#});

    let codes = analysis.diagnostics().codes();
    assert!(codes.contains(&DiagnosticCode::UnknownNamespace), "{:?}", codes);
    assert!(codes.contains(&DiagnosticCode::ClassDoesNotExist), "{:?}", codes);
}

#[test]
fn known_class_constructor_and_method() {
    let analysis = analyze(indoc! {r#"
        class widget {
            var state;

            function poke(amount) {
                self.state = amount;
            }
        }

        function f() {
            w = new widget();
            w->poke(1);
            w->poke(1, 2);
            w->vanish();
        }
    "#});

    let codes = analysis.diagnostics().codes();
    assert!(codes.contains(&DiagnosticCode::TooManyArguments), "{:?}", codes);
    assert!(codes.contains(&DiagnosticCode::DoesNotContainMember), "{:?}", codes);
    assert!(!codes.contains(&DiagnosticCode::ClassDoesNotExist), "{:?}", codes);
}

#[test]
fn unused_using_reported_and_used_one_kept_quiet() {
    let mut exports = Exports::new();
    exports.add_function(ExportedFn {
        namespace: "util".to_owned(),
        name: "helper".to_owned(),
        overloads: vec![Overload::exact(0, TyMask::INT)],
        origin: r"scripts\shared\util".to_owned(),
    });
    exports.add_function(ExportedFn {
        namespace: "other".to_owned(),
        name: "noop".to_owned(),
        overloads: vec![Overload::exact(0, TyMask::VOID)],
        origin: r"scripts\shared\other".to_owned(),
    });

    let analysis = ScriptBuilder::new(indoc! {r#"
        #using scripts\shared\util;
        #using scripts\shared\other;

        function f() {
            x = util::helper();
            y = x;
            z = y;
            w = z;
            v = w;
            u = v;
            t = u;
        }
    "#})
    .with_exports(exports)
    .parse()
    .expect("parses")
    .analyze();

    let unused: Vec<_> = analysis
        .diagnostics()
        .iter()
        .filter(|d| d.code() == DiagnosticCode::UnusedUsing)
        .collect();
    assert_eq!(unused.len(), 1, "{:?}", analysis.diagnostics().codes());
    assert!(unused[0].message().contains("other"));
}

#[test]
fn exported_definitions_skip_private_functions() {
    let analysis = analyze(indoc! {r#"
        function private hidden() {
        }
        function visible() {
        }
        class widget {
        }
    "#});

    let names: Vec<&str> = analysis
        .exported_definitions()
        .iter()
        .map(|d| d.name.as_str())
        .collect();
    assert!(names.contains(&"visible"));
    assert!(names.contains(&"widget"));
    assert!(!names.contains(&"hidden"));
}

#[test]
fn senses_and_foldings_are_collected() {
    let analysis = analyze(indoc! {r#"
        function f(a) {
            if (isdefined(a)) {
                b = a;
                c = b;
            }
        }
    "#});

    assert!(!analysis.senses().is_empty());
    assert!(!analysis.folding_ranges().is_empty());
}

#[test]
fn redefinition_is_reported_by_the_signature_pass() {
    let analysis = analyze(indoc! {r#"
        function f() {
        }
        function f() {
        }
    "#});

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::RedefinitionOfSymbol));
}

#[test]
fn wait_duration_must_be_numeric() {
    let analysis = analyze(indoc! {r#"
        function f() {
            wait "soon";
        }
    "#});

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::NoImplicitConversionExists));
}

#[test]
fn statements_before_the_first_case_label() {
    let analysis = analyze(indoc! {r#"
        function f(x) {
            switch (x) {
                y = 1;
                case 1:
                    break;
            }
        }
    "#});

    assert!(analysis
        .diagnostics()
        .codes()
        .contains(&DiagnosticCode::UnreachableCase));
}
