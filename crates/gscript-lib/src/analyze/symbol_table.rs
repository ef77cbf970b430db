//! Per-program-point variable environments.
//!
//! Identifier keys are case-insensitive: every map access lowercases at the
//! boundary and the `Variable` record keeps the spelling as written.

use indexmap::IndexMap;
use rowan::TextRange;

use super::lattice::{Ty, TyMask};

/// Names the engine binds implicitly; scripts may read but never write them.
pub const RESERVED_NAMES: &[&str] = &["self", "level", "game", "anim", "vararg"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// One local variable binding at a program point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Spelling as written at the declaration site.
    pub name: String,
    pub ty: Ty,
    /// Lexical depth of the declaration; deeper bindings are dropped when
    /// environments merge into a shallower node.
    pub scope: u32,
    pub is_const: bool,
    pub decl_range: TextRange,
}

/// Outcome of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'e> {
    /// No binding anywhere.
    Undefined,
    /// One of the engine-bound names (`self`, `level`, ...).
    Reserved,
    /// A local binding.
    Local(&'e Variable),
}

/// Outcome of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Ok,
    FailedConstant,
    FailedReserved,
}

/// The mutable layer of the symbol table: local variables at one point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    vars: IndexMap<String, Variable>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_get(&self, name: &str) -> Lookup<'_> {
        if is_reserved(name) {
            return Lookup::Reserved;
        }
        match self.vars.get(&name.to_ascii_lowercase()) {
            Some(var) => Lookup::Local(var),
            None => Lookup::Undefined,
        }
    }

    /// Insert on first write, mutate on subsequent ones.
    ///
    /// Returns the previous binding's declaration on success so callers can
    /// distinguish a fresh declaration from a re-assignment.
    pub fn add_or_set(
        &mut self,
        name: &str,
        ty: Ty,
        scope: u32,
        is_const: bool,
        range: TextRange,
    ) -> (SetOutcome, Option<TextRange>) {
        if is_reserved(name) {
            return (SetOutcome::FailedReserved, None);
        }

        let key = name.to_ascii_lowercase();
        match self.vars.get_mut(&key) {
            Some(existing) => {
                if existing.is_const {
                    return (SetOutcome::FailedConstant, Some(existing.decl_range));
                }
                let previous = existing.decl_range;
                existing.ty = ty;
                existing.is_const = is_const;
                // A shallower write widens the binding's visibility.
                existing.scope = existing.scope.min(scope);
                (SetOutcome::Ok, Some(previous))
            }
            None => {
                self.vars.insert(
                    key,
                    Variable {
                        name: name.to_owned(),
                        ty,
                        scope,
                        is_const,
                        decl_range: range,
                    },
                );
                (SetOutcome::Ok, None)
            }
        }
    }

    /// Replace a binding's lattice value in place, for narrowing.
    pub fn refine(&mut self, name: &str, ty: Ty) {
        if let Some(var) = self.vars.get_mut(&name.to_ascii_lowercase()) {
            var.ty = ty;
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Variable)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into this environment for a node at `target_scope`.
    ///
    /// Variables present in both join their lattice values. A variable
    /// reaching the merge on only one path may be undefined on the other, so
    /// one-sided entries pick up the Undefined kind. Entries deeper than the
    /// target scope are discarded from the result.
    pub fn merge(&mut self, other: &Env, target_scope: u32) {
        for (key, ours) in &mut self.vars {
            match other.vars.get(key) {
                Some(theirs) => {
                    ours.ty = ours.ty.join(&theirs.ty);
                    ours.is_const = ours.is_const && theirs.is_const;
                    ours.scope = ours.scope.min(theirs.scope);
                }
                None => {
                    ours.ty.mask = ours.ty.mask.union(TyMask::UNDEFINED);
                    ours.ty.known_bool = None;
                }
            }
        }
        for (key, theirs) in &other.vars {
            if !self.vars.contains_key(key) {
                let mut var = theirs.clone();
                var.ty.mask = var.ty.mask.union(TyMask::UNDEFINED);
                var.ty.known_bool = None;
                self.vars.insert(key.clone(), var);
            }
        }
        self.vars.retain(|_, var| var.scope <= target_scope);
    }

    /// Drop bindings deeper than `target_scope`.
    pub fn prune(&mut self, target_scope: u32) {
        self.vars.retain(|_, var| var.scope <= target_scope);
    }
}
