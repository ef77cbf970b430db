use indoc::indoc;

use super::parse;
use crate::diagnostics::DiagnosticCode;
use crate::parser::Stmt;

#[test]
fn missing_semicolon_recovers_and_anchors_at_previous_token() {
    let source = "function f() { x = 1 y = 2; }";
    let result = parse(source);

    let codes = result.diagnostics.codes();
    assert!(codes.contains(&DiagnosticCode::ExpectedSemiColon), "{:?}", codes);

    // The diagnostic anchors at the end of `1`, not at `y`.
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code() == DiagnosticCode::ExpectedSemiColon)
        .unwrap();
    assert_eq!(u32::from(diag.range().start()), 20);
    assert!(diag.range().is_empty());

    // Both statements still made it into the tree.
    let fun = result.script.functions().next().unwrap();
    assert_eq!(fun.body().unwrap().stmts().count(), 2);
}

#[test]
fn top_level_garbage_resyncs_to_next_definition() {
    let source = indoc! {r#"
        ) ) what is this
        function f() {
        }
    "#};
    let result = parse(source);

    assert!(result
        .diagnostics
        .codes()
        .contains(&DiagnosticCode::ExpectedScriptDefn));

    // The function after the garbage still parses.
    let fun = result.script.functions().next().expect("function survives");
    assert_eq!(fun.name().unwrap().text(), "f");
}

#[test]
fn statement_recovery_skips_to_terminator() {
    let source = indoc! {r#"
        function f() {
            case 1;
            y = 2;
        }
    "#};
    let result = parse(source);

    assert!(result
        .diagnostics
        .codes()
        .contains(&DiagnosticCode::UnexpectedToken));

    let fun = result.script.functions().next().unwrap();
    let has_y = fun.body().unwrap().stmts().any(|s| matches!(s, Stmt::Expr(_)));
    assert!(has_y, "statement after recovery survives");
}

#[test]
fn unclosed_block_reports_once() {
    let result = parse("function f() { x = 1;");
    let codes = result.diagnostics.codes();
    assert!(codes.contains(&DiagnosticCode::UnclosedBlock), "{:?}", codes);
}

#[test]
fn unclosed_dev_block() {
    let result = parse("function f() { /# x = 1; }");
    assert!(result
        .diagnostics
        .codes()
        .contains(&DiagnosticCode::UnclosedDevBlock));
}

#[test]
fn break_outside_loop_or_switch() {
    let result = parse("function f() { break; }");
    assert!(result
        .diagnostics
        .codes()
        .contains(&DiagnosticCode::BreakOutsideLoopOrSwitch));
}

#[test]
fn continue_outside_loop() {
    let result = parse("function f() { switch (1) { default: continue; } }");
    assert!(result
        .diagnostics
        .codes()
        .contains(&DiagnosticCode::ContinueOutsideLoop));
}

#[test]
fn break_inside_loop_is_fine() {
    let result = parse("function f() { while (1) { break; } }");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.codes());
}

#[test]
fn missing_expression_does_not_cascade() {
    let result = parse("function f() { x = ; y = 1; }");

    // One complaint about the missing rhs, and parsing continues.
    assert!(result
        .diagnostics
        .codes()
        .contains(&DiagnosticCode::UnexpectedToken));
    let fun = result.script.functions().next().unwrap();
    assert_eq!(fun.body().unwrap().stmts().count(), 2);
}

#[test]
fn deeply_nested_input_terminates() {
    let mut source = String::from("function f() { x = ");
    for _ in 0..64 {
        source.push('(');
    }
    source.push('1');
    for _ in 0..64 {
        source.push(')');
    }
    source.push_str("; }");

    let result = parse(&source);
    assert!(!result.diagnostics.has_errors());
}

#[test]
fn recursion_limit_is_an_error_not_a_hang() {
    let mut source = String::from("function f() { x = ");
    for _ in 0..5000 {
        source.push('(');
    }

    let result = crate::parser::Parser::new(&source, crate::parser::lex(&source))
        .with_recursion_fuel(Some(64))
        .parse();
    assert!(result.is_err());
}

#[test]
fn nested_switches_keep_context_flags_balanced() {
    let source = indoc! {r#"
        function f(a, b) {
            switch (a) {
                case 1:
                    switch (b) {
                        case 2:
                            break;
                    }
                    break;
            }
            break;
        }
    "#};
    let result = parse(source);

    // The inner switch must not clear the outer switch's context early, and
    // the trailing break is still illegal.
    let breaks: Vec<_> = result
        .diagnostics
        .codes()
        .into_iter()
        .filter(|c| *c == DiagnosticCode::BreakOutsideLoopOrSwitch)
        .collect();
    assert_eq!(breaks.len(), 1);
}

#[test]
fn missing_function_name_resyncs() {
    let source = indoc! {r#"
        function () {
        }
        function g() {
        }
    "#};
    let result = parse(source);

    assert!(result.diagnostics.has_errors());
    let names: Vec<String> = result
        .script
        .functions()
        .filter_map(|f| f.name().map(|t| t.text().to_owned()))
        .collect();
    assert!(names.contains(&"g".to_owned()));
}
