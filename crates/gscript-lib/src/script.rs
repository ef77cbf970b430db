//! Staged analysis facade: build → parse → analyze.
//!
//! ```
//! use gscript_lib::ScriptBuilder;
//!
//! let analysis = ScriptBuilder::new("function f() { x = 1; }")
//!     .parse()
//!     .expect("within parse limits")
//!     .analyze();
//! assert!(!analysis.diagnostics().has_errors());
//! ```

use indexmap::IndexMap;

use crate::analyze::expr::{AnalysisContext, Usage};
use crate::analyze::sense::{DefinitionLocation, FoldingRange, SenseToken, collect_folding_ranges};
use crate::analyze::solver::{GraphAnalysis, Solver};
use crate::analyze::{Api, Cfg, Definitions, EntityRegistry, Exports, cfg, signature};
use crate::diagnostics::{DiagnosticCode, Diagnostics, DiagnosticsPrinter};
use crate::parser::{Item, Parser, Script, SyntaxNode, lex};

const DEFAULT_PARSE_FUEL: u32 = 1_000_000;
const DEFAULT_PARSE_MAX_DEPTH: u32 = 2048;

/// Configures and runs the parse stage.
pub struct ScriptBuilder {
    source: String,
    exports: Exports,
    api: Api,
    entities: EntityRegistry,
    parse_fuel: u32,
    parse_max_depth: u32,
}

impl ScriptBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            exports: Exports::new(),
            api: Api::default_set(),
            entities: EntityRegistry::default_set(),
            parse_fuel: DEFAULT_PARSE_FUEL,
            parse_max_depth: DEFAULT_PARSE_MAX_DEPTH,
        }
    }

    /// Symbols imported from dependent scripts.
    pub fn with_exports(mut self, exports: Exports) -> Self {
        self.exports = exports;
        self
    }

    /// Built-in API table (GSC and CSC hosts supply different sets).
    pub fn with_api(mut self, api: Api) -> Self {
        self.api = api;
        self
    }

    pub fn with_entities(mut self, entities: EntityRegistry) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_parse_fuel(mut self, fuel: u32) -> Self {
        self.parse_fuel = fuel;
        self
    }

    pub fn with_parse_recursion_limit(mut self, limit: u32) -> Self {
        self.parse_max_depth = limit;
        self
    }

    pub fn parse(self) -> crate::Result<ScriptParsed> {
        let tokens = lex(&self.source);
        let parser = Parser::new(&self.source, tokens)
            .with_exec_fuel(Some(self.parse_fuel))
            .with_recursion_fuel(Some(self.parse_max_depth));
        let result = parser.parse()?;

        Ok(ScriptParsed {
            source: self.source,
            exports: self.exports,
            api: self.api,
            entities: self.entities,
            script: result.script,
            diag: result.diagnostics,
            fuel_consumed: result.exec_fuel_consumed,
        })
    }
}

/// Output of the parse stage: a lossless tree plus parse diagnostics.
#[derive(Debug)]
pub struct ScriptParsed {
    source: String,
    exports: Exports,
    api: Api,
    entities: EntityRegistry,
    script: Script,
    diag: Diagnostics,
    fuel_consumed: u32,
}

impl ScriptParsed {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn fuel_consumed(&self) -> u32 {
        self.fuel_consumed
    }

    /// Indented CST rendering for tests and the CLI `ast` command.
    pub fn snapshot_cst(&self) -> String {
        snapshot_node(self.script.as_cst(), 0)
    }

    /// Run the signature pass, build the graphs, and solve each one.
    pub fn analyze(mut self) -> ScriptAnalysis {
        let defs = signature::collect(&self.script, &self.api, &mut self.diag);

        let namespace = defs.namespaces.first().cloned().unwrap_or_default();
        let mut graphs = Vec::new();
        collect_graphs(&self.script, &mut graphs);

        let mut usage = Usage::default();
        let mut senses = Vec::new();
        let mut analyses = IndexMap::new();

        for graph in &graphs {
            let ctx = AnalysisContext {
                defs: &defs,
                api: &self.api,
                exports: &self.exports,
                entities: &self.entities,
                namespace: namespace.clone(),
                class: graph.class_name.clone(),
            };
            let analysis =
                Solver::new(graph, &ctx).run(&mut self.diag, &mut usage, &mut senses);
            analyses.insert(graph_key(graph), analysis);
        }

        // A `#using` none of whose symbols were touched is dead weight.
        for (path, range) in &defs.usings {
            let used = usage.used_origins.contains(&path.to_ascii_lowercase());
            if !used {
                self.diag
                    .report(DiagnosticCode::UnusedUsing, *range)
                    .message(format!("'{}' is never referenced", path))
                    .emit();
            }
        }

        let foldings = collect_folding_ranges(&self.script);
        let definitions = export_locations(&defs);

        ScriptAnalysis {
            parsed: ScriptParsedView {
                source: self.source,
                script: self.script,
            },
            defs,
            graphs,
            analyses,
            diag: self.diag,
            senses,
            foldings,
            definitions,
        }
    }
}

/// Source and tree retained by the analysis stage.
#[derive(Debug)]
struct ScriptParsedView {
    source: String,
    script: Script,
}

/// Fully analyzed script: diagnostics, editor facts, graphs and tables.
#[derive(Debug)]
pub struct ScriptAnalysis {
    parsed: ScriptParsedView,
    defs: Definitions,
    graphs: Vec<Cfg>,
    analyses: IndexMap<String, GraphAnalysis>,
    diag: Diagnostics,
    senses: Vec<SenseToken>,
    foldings: Vec<FoldingRange>,
    definitions: Vec<DefinitionLocation>,
}

impl ScriptAnalysis {
    /// Parse and analyze in one step with default collaborators.
    pub fn new(source: impl Into<String>) -> crate::Result<Self> {
        Ok(ScriptBuilder::new(source).parse()?.analyze())
    }

    pub fn source(&self) -> &str {
        &self.parsed.source
    }

    pub fn script(&self) -> &Script {
        &self.parsed.script
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    pub fn diagnostics_printer(&self) -> DiagnosticsPrinter<'_, '_> {
        self.diag.printer().source(&self.parsed.source)
    }

    pub fn definitions_table(&self) -> &Definitions {
        &self.defs
    }

    pub fn graphs(&self) -> &[Cfg] {
        &self.graphs
    }

    pub fn graph(&self, name: &str) -> Option<&Cfg> {
        self.graphs
            .iter()
            .find(|g| g.name.eq_ignore_ascii_case(name))
    }

    pub fn graph_analysis(&self, name: &str) -> Option<&GraphAnalysis> {
        self.analyses.get(&name.to_ascii_lowercase())
    }

    pub fn senses(&self) -> &[SenseToken] {
        &self.senses
    }

    pub fn folding_ranges(&self) -> &[FoldingRange] {
        &self.foldings
    }

    /// Locations exported for cross-file go-to-definition.
    pub fn exported_definitions(&self) -> &[DefinitionLocation] {
        &self.definitions
    }

    pub fn is_valid(&self) -> bool {
        !self.diag.has_errors()
    }
}

fn graph_key(graph: &Cfg) -> String {
    match &graph.class_name {
        Some(class) => format!("{}::{}", class.to_ascii_lowercase(), graph.name.to_ascii_lowercase()),
        None => graph.name.to_ascii_lowercase(),
    }
}

fn collect_graphs(script: &Script, out: &mut Vec<Cfg>) {
    let items: Vec<Item> = script.items().collect();
    collect_graphs_from_items(&items, out);
}

fn collect_graphs_from_items(items: &[Item], out: &mut Vec<Cfg>) {
    for item in items {
        match item {
            Item::Function(fun) => {
                out.extend(cfg::build_function(fun));
            }
            Item::Class(class) => {
                out.extend(cfg::build_class(class));
                let class_name = class
                    .name()
                    .map(|t| t.text().to_owned())
                    .unwrap_or_default();
                for structor in class.structors() {
                    out.extend(cfg::build_structor(&class_name, &structor));
                }
                for method in class.methods() {
                    out.extend(cfg::build_method(&class_name, &method));
                }
            }
            Item::DevBlock(dev) => {
                let inner: Vec<Item> = dev.items().collect();
                collect_graphs_from_items(&inner, out);
            }
            _ => {}
        }
    }
}

fn export_locations(defs: &Definitions) -> Vec<DefinitionLocation> {
    let mut out = Vec::new();
    for def in defs.functions() {
        // Private functions stay within their script.
        if def.is_private {
            continue;
        }
        out.push(DefinitionLocation {
            namespace: def.namespace.clone(),
            name: def.name.clone(),
            range: def.name_range,
            is_class: false,
        });
    }
    for class in defs.classes() {
        out.push(DefinitionLocation {
            namespace: String::new(),
            name: class.name.clone(),
            range: class.name_range,
            is_class: true,
        });
    }
    out
}

fn snapshot_node(node: &SyntaxNode, depth: usize) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{}{:?}", "  ".repeat(depth), node.kind());
    for child in node.children_with_tokens() {
        match child {
            rowan::NodeOrToken::Node(n) => out.push_str(&snapshot_node(&n, depth + 1)),
            rowan::NodeOrToken::Token(t) => {
                if t.kind().is_trivia() {
                    continue;
                }
                let _ = writeln!(
                    out,
                    "{}{:?} {:?}",
                    "  ".repeat(depth + 1),
                    t.kind(),
                    t.text()
                );
            }
        }
    }
    out
}
