//! `gscript check`: full analysis with rendered diagnostics.

use gscript_lib::ScriptBuilder;

use crate::cli::CheckParams;

use super::load_source;

pub fn run(params: &CheckParams) -> i32 {
    let source = match load_source(&params.source) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("error: {}", message);
            return 2;
        }
    };

    let parsed = match ScriptBuilder::new(source).parse() {
        Ok(parsed) => parsed,
        Err(error) => {
            eprintln!("error: {}", error);
            return 2;
        }
    };
    let analysis = parsed.analyze();
    let diag = analysis.diagnostics();

    if params.json {
        let entries: Vec<serde_json::Value> = diag
            .iter()
            .map(|d| {
                serde_json::json!({
                    "code": format!("{}", d.code()),
                    "severity": format!("{}", d.severity()),
                    "start": u32::from(d.range().start()),
                    "end": u32::from(d.range().end()),
                    "message": d.message(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).expect("diagnostics serialize")
        );
    } else if !diag.is_empty() {
        let colored = match params.color.as_str() {
            "always" => true,
            "never" => false,
            _ => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        };
        let path = params
            .source
            .path
            .as_ref()
            .map(|p| p.display().to_string());
        let mut printer = analysis.diagnostics_printer().colored(colored);
        if let Some(path) = &path {
            printer = printer.path(path);
        }
        eprintln!("{}", printer.render());
    }

    let failed = diag.has_errors() || (params.strict && diag.has_warnings());
    if failed { 1 } else { 0 }
}
