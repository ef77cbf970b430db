//! `gscript cfg`: dump per-function control-flow graphs.

use gscript_lib::ScriptBuilder;

use crate::cli::CfgParams;

use super::load_source;

pub fn run(params: &CfgParams) -> i32 {
    let source = match load_source(&params.source) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("error: {}", message);
            return 2;
        }
    };

    match ScriptBuilder::new(source).parse() {
        Ok(parsed) => {
            let analysis = parsed.analyze();
            for graph in analysis.graphs() {
                print!("{}", graph.dump());
            }
            0
        }
        Err(error) => {
            eprintln!("error: {}", error);
            2
        }
    }
}
