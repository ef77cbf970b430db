mod cli;
mod commands;

use cli::{AstParams, CfgParams, CheckParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();

    let code = match matches.subcommand() {
        Some(("check", m)) => {
            let params = CheckParams::from_matches(m);
            commands::check::run(&params)
        }
        Some(("ast", m)) => {
            let params = AstParams::from_matches(m);
            commands::ast::run(&params)
        }
        Some(("cfg", m)) => {
            let params = CfgParams::from_matches(m);
            commands::cfg::run(&params)
        }
        _ => unreachable!("clap should have caught this"),
    };

    std::process::exit(code);
}
