//! `gscript ast`: dump the syntax tree.

use gscript_lib::ScriptBuilder;

use crate::cli::AstParams;

use super::load_source;

pub fn run(params: &AstParams) -> i32 {
    let source = match load_source(&params.source) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("error: {}", message);
            return 2;
        }
    };

    match ScriptBuilder::new(source).parse() {
        Ok(parsed) => {
            print!("{}", parsed.snapshot_cst());
            if !parsed.diagnostics().is_empty() {
                eprintln!("{}", parsed.diagnostics().printer().source(parsed.source()).render());
            }
            0
        }
        Err(error) => {
            eprintln!("error: {}", error);
            2
        }
    }
}
