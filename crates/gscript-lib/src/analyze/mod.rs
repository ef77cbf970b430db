//! Static analysis passes: signatures, control-flow graphs, and the
//! reaching-definitions dataflow with its type/value lattice.

pub mod builtins;
pub mod cfg;
pub mod expr;
pub mod lattice;
pub mod sense;
pub mod signature;
pub mod solver;
pub mod symbol_table;

#[cfg(test)]
mod builtins_tests;
#[cfg(test)]
mod cfg_tests;
#[cfg(test)]
mod lattice_tests;
#[cfg(test)]
mod solver_tests;
#[cfg(test)]
mod symbol_table_tests;

pub use builtins::{Api, EntityRegistry, ExportedClass, ExportedFn, Exports, Overload};
pub use cfg::{Cfg, CfgNode, CfgNodeKind, NodeId};
pub use expr::{AnalysisContext, Usage};
pub use lattice::{Facts, Narrowing, SubType, Ty, TyMask};
pub use sense::{
    DefinitionLocation, FoldingKind, FoldingRange, SenseKind, SenseModifiers, SenseToken,
};
pub use signature::{ClassDef, Definitions, FunctionDef, ParamDef};
pub use solver::{GraphAnalysis, Solver};
pub use symbol_table::{Env, Lookup, SetOutcome, Variable};
