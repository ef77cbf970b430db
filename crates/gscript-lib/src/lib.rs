//! Static analyzer core for the GSC/CSC scripting languages.
//!
//! The pipeline turns a source buffer into a recoverable syntax tree, a
//! per-function control-flow graph, and a reaching-definitions dataflow
//! analysis that assigns a type/value lattice to every program point and
//! emits diagnostics and editor facts.
//!
//! # Example
//!
//! ```
//! use gscript_lib::ScriptAnalysis;
//!
//! let analysis = ScriptAnalysis::new(r#"
//!     function main() {
//!         x = 1;
//!         if (isdefined(x)) {
//!             x += 1;
//!         }
//!     }
//! "#).expect("script parses");
//!
//! if analysis.diagnostics().has_errors() {
//!     eprintln!("{}", analysis.diagnostics_printer().render());
//! }
//! ```

pub mod analyze;
pub mod diagnostics;
pub mod parser;
pub mod script;

pub use diagnostics::{DiagnosticCode, DiagnosticMessage, Diagnostics, DiagnosticsPrinter, Severity};
pub use script::{ScriptAnalysis, ScriptBuilder, ScriptParsed};

/// Errors that can occur during parsing or analysis.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Execution fuel exhausted (too many parser operations).
    #[error("execution limit exceeded")]
    ExecFuelExhausted,

    /// Recursion fuel exhausted (input nested too deeply).
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,
}

/// Result type for analyzer operations.
pub type Result<T> = std::result::Result<T, Error>;
