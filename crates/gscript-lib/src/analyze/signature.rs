//! Signature pass: one AST walk collecting function and class declarations
//! into the definitions table, before any dataflow runs.

use indexmap::IndexMap;
use rowan::TextRange;

use crate::diagnostics::{DiagnosticCode, Diagnostics};
use crate::parser::ast;
use crate::parser::{Item, Script};

use super::builtins::{Api, Overload};
use super::lattice::TyMask;
use super::symbol_table::is_reserved;

#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: String,
    pub by_ref: bool,
    pub has_default: bool,
    pub vararg: bool,
    pub range: TextRange,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub namespace: String,
    pub name: String,
    pub params: Vec<ParamDef>,
    pub doc: Option<String>,
    pub is_private: bool,
    pub is_autoexec: bool,
    /// Whole-definition range, for folding and go-to-definition.
    pub range: TextRange,
    pub name_range: TextRange,
}

impl FunctionDef {
    /// Required argument count: parameters without defaults, before a vararg.
    pub fn min_args(&self) -> usize {
        self.params
            .iter()
            .filter(|p| !p.has_default && !p.vararg)
            .count()
    }

    pub fn max_args(&self) -> Option<usize> {
        if self.params.iter().any(|p| p.vararg) {
            None
        } else {
            Some(self.params.len())
        }
    }

    pub fn as_overload(&self) -> Overload {
        Overload {
            min_args: self.min_args(),
            max_args: self.max_args(),
            vararg: self.max_args().is_none(),
            return_mask: TyMask::ANY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub members: Vec<(String, TextRange)>,
    pub methods: IndexMap<String, FunctionDef>,
    pub has_constructor: bool,
    pub has_destructor: bool,
    pub doc: Option<String>,
    pub range: TextRange,
    pub name_range: TextRange,
}

impl ClassDef {
    pub fn has_member(&self, name: &str) -> bool {
        self.members
            .iter()
            .any(|(m, _)| m.eq_ignore_ascii_case(name))
            || self.methods.contains_key(&name.to_ascii_lowercase())
    }
}

/// Declarations of one script, immutable once the dataflow starts.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    /// Keyed by `(namespace, name)`, both lowercased.
    functions: IndexMap<(String, String), FunctionDef>,
    /// Keyed by lowercased class name.
    classes: IndexMap<String, ClassDef>,
    /// Namespaces declared by `#namespace`, in order.
    pub namespaces: Vec<String>,
    /// Scripts pulled in by `#using`, as written.
    pub usings: Vec<(String, TextRange)>,
}

impl Definitions {
    pub fn function(&self, namespace: &str, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&(
            namespace.to_ascii_lowercase(),
            name.to_ascii_lowercase(),
        ))
    }

    /// Look a function up in any namespace of this script.
    pub fn function_any_namespace(&self, name: &str) -> Option<&FunctionDef> {
        let lower = name.to_ascii_lowercase();
        self.functions
            .iter()
            .find(|((_, n), _)| *n == lower)
            .map(|(_, def)| def)
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions.values()
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDef> {
        self.classes.values()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .iter()
            .any(|n| n.eq_ignore_ascii_case(namespace))
    }
}

/// Walk the script once and populate the definitions table.
pub fn collect(script: &Script, api: &Api, diag: &mut Diagnostics) -> Definitions {
    let mut defs = Definitions::default();
    let mut namespace = String::new();

    let items: Vec<Item> = script.items().collect();
    collect_items(&items, &mut namespace, &mut defs, api, diag);
    defs
}

fn collect_items(
    items: &[Item],
    namespace: &mut String,
    defs: &mut Definitions,
    api: &Api,
    diag: &mut Diagnostics,
) {
    for item in items {
        match item {
            Item::Namespace(ns) => {
                if let Some(token) = ns.name() {
                    *namespace = token.text().to_ascii_lowercase();
                    defs.namespaces.push(namespace.clone());
                }
            }
            Item::Using(using) => {
                if let Some(path) = using.path() {
                    defs.usings.push((path.text(), path.range()));
                }
            }
            Item::Function(fun) => {
                if let Some(def) = function_def(fun, namespace, api, diag) {
                    let key = (def.namespace.clone(), def.name.to_ascii_lowercase());
                    if let Some(existing) = defs.functions.get(&key) {
                        diag.report(DiagnosticCode::RedefinitionOfSymbol, def.name_range)
                            .message(format!("function '{}' is already defined", def.name))
                            .related_to("first defined here", existing.name_range)
                            .emit();
                    } else {
                        defs.functions.insert(key, def);
                    }
                }
            }
            Item::Class(class) => {
                if let Some(def) = class_def(class, namespace, api, diag) {
                    let key = def.name.to_ascii_lowercase();
                    if let Some(existing) = defs.classes.get(&key) {
                        diag.report(DiagnosticCode::RedefinitionOfSymbol, def.name_range)
                            .message(format!("class '{}' is already defined", def.name))
                            .related_to("first defined here", existing.name_range)
                            .emit();
                    } else {
                        defs.classes.insert(key, def);
                    }
                }
            }
            Item::DevBlock(dev) => {
                let inner: Vec<Item> = dev.items().collect();
                collect_items(&inner, namespace, defs, api, diag);
            }
            Item::Insert(_) | Item::Precache(_) | Item::UsingAnimTree(_) => {}
        }
    }
}

fn function_def(
    fun: &ast::FunDefn,
    namespace: &str,
    api: &Api,
    diag: &mut Diagnostics,
) -> Option<FunctionDef> {
    let name_token = fun.name()?;
    let name = name_token.text().to_owned();

    if is_reserved(&name) || api.function(&name).is_some_and(|f| f.flags.reserved) {
        diag.report(DiagnosticCode::ReservedSymbol, name_token.text_range())
            .message(format!("'{}' is a reserved name", name))
            .emit();
    }

    let params = fun
        .params()
        .map(|list| param_defs(&list))
        .unwrap_or_default();

    Some(FunctionDef {
        namespace: namespace.to_owned(),
        name,
        params,
        doc: fun.doc_comment(),
        is_private: fun.is_private(),
        is_autoexec: fun.is_autoexec(),
        range: fun.range(),
        name_range: name_token.text_range(),
    })
}

fn param_defs(list: &ast::ParamList) -> Vec<ParamDef> {
    list.params()
        .filter_map(|param| {
            if param.is_vararg() {
                return Some(ParamDef {
                    name: String::new(),
                    by_ref: false,
                    has_default: false,
                    vararg: true,
                    range: param.range(),
                });
            }
            let name = param.name()?;
            Some(ParamDef {
                name: name.text().to_owned(),
                by_ref: param.is_by_ref(),
                has_default: param.default_value().is_some(),
                vararg: false,
                range: param.range(),
            })
        })
        .collect()
}

fn class_def(
    class: &ast::ClassDefn,
    namespace: &str,
    api: &Api,
    diag: &mut Diagnostics,
) -> Option<ClassDef> {
    let name_token = class.name()?;
    let name = name_token.text().to_owned();

    if is_reserved(&name) {
        diag.report(DiagnosticCode::ReservedSymbol, name_token.text_range())
            .message(format!("'{}' is a reserved name", name))
            .emit();
    }

    let mut members = Vec::new();
    for member in class.members() {
        if let Some(token) = member.name() {
            let member_name = token.text().to_owned();
            if members
                .iter()
                .any(|(m, _): &(String, TextRange)| m.eq_ignore_ascii_case(&member_name))
            {
                diag.report(DiagnosticCode::RedefinitionOfSymbol, token.text_range())
                    .message(format!("member '{}' is already declared", member_name))
                    .emit();
            } else {
                members.push((member_name, token.text_range()));
            }
        }
    }

    let mut methods = IndexMap::new();
    for method in class.methods() {
        if let Some(def) = function_def(&method, namespace, api, diag) {
            let key = def.name.to_ascii_lowercase();
            if let Some(existing) = methods.get(&key) {
                let existing: &FunctionDef = existing;
                diag.report(DiagnosticCode::RedefinitionOfSymbol, def.name_range)
                    .message(format!("method '{}' is already defined", def.name))
                    .related_to("first defined here", existing.name_range)
                    .emit();
            } else {
                methods.insert(key, def);
            }
        }
    }

    let mut has_constructor = false;
    let mut has_destructor = false;
    for structor in class.structors() {
        if structor.is_constructor() {
            has_constructor = true;
        } else {
            has_destructor = true;
        }
    }

    Some(ClassDef {
        name,
        parent: class.parent_name().map(|t| t.text().to_owned()),
        members,
        methods,
        has_constructor,
        has_destructor,
        doc: class.doc_comment(),
        range: class.range(),
        name_range: name_token.text_range(),
    })
}
