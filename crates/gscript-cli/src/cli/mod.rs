//! Command-line definition: shared argument builders plus per-command
//! parameter structs.

mod args;

use std::path::PathBuf;

use clap::{ArgMatches, Command};

pub use args::{color_arg, json_arg, script_path_arg, script_text_arg, strict_arg};

pub fn build_cli() -> Command {
    Command::new("gscript")
        .about("Static analyzer for GSC/CSC scripts")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("check")
                .about("Parse and analyze a script, printing diagnostics")
                .arg(script_path_arg())
                .arg(script_text_arg())
                .arg(color_arg())
                .arg(json_arg())
                .arg(strict_arg()),
        )
        .subcommand(
            Command::new("ast")
                .about("Dump the syntax tree")
                .arg(script_path_arg())
                .arg(script_text_arg()),
        )
        .subcommand(
            Command::new("cfg")
                .about("Dump per-function control-flow graphs")
                .arg(script_path_arg())
                .arg(script_text_arg()),
        )
}

/// Source selection shared by every command.
#[derive(Debug)]
pub struct SourceParams {
    pub path: Option<PathBuf>,
    pub text: Option<String>,
}

impl SourceParams {
    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            path: matches.get_one::<PathBuf>("script_path").cloned(),
            text: matches.get_one::<String>("script_text").cloned(),
        }
    }
}

#[derive(Debug)]
pub struct CheckParams {
    pub source: SourceParams,
    pub color: String,
    pub json: bool,
    pub strict: bool,
}

impl CheckParams {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            source: SourceParams::from_matches(matches),
            color: matches
                .get_one::<String>("color")
                .cloned()
                .unwrap_or_else(|| "auto".to_owned()),
            json: matches.get_flag("json"),
            strict: matches.get_flag("strict"),
        }
    }
}

#[derive(Debug)]
pub struct AstParams {
    pub source: SourceParams,
}

impl AstParams {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            source: SourceParams::from_matches(matches),
        }
    }
}

#[derive(Debug)]
pub struct CfgParams {
    pub source: SourceParams,
}

impl CfgParams {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            source: SourceParams::from_matches(matches),
        }
    }
}
