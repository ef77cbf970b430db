//! The type/value lattice assigned to every program point.
//!
//! A value's kind is a bitmask over the engine's runtime kinds. Derived kinds
//! imply their components: `Int` contains the `Bool` bit, `IString` contains
//! `String`, `Number` is `Int | Float`. Joins are bitwise OR; narrowings are
//! keep/remove mask pairs applied along control-flow edges.

use std::collections::BTreeSet;

use indexmap::IndexMap;

/// Bitmask over runtime kinds, written in the same const-bitset style as the
/// parser's `TokenSet`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TyMask(u32);

impl TyMask {
    pub const VOID: TyMask = TyMask(0);

    pub const BOOL: TyMask = TyMask(1 << 0);
    /// Int contains Bool: every boolean is an integer at runtime.
    pub const INT: TyMask = TyMask(1 << 1 | 1 << 0);
    pub const FLOAT: TyMask = TyMask(1 << 2);
    pub const NUMBER: TyMask = Self::INT.union(Self::FLOAT);
    pub const STRING: TyMask = TyMask(1 << 3);
    /// IString contains String: localized strings degrade to plain ones.
    pub const ISTRING: TyMask = TyMask(1 << 4 | 1 << 3);
    pub const ARRAY: TyMask = TyMask(1 << 5);
    pub const VECTOR: TyMask = TyMask(1 << 6);
    pub const STRUCT: TyMask = TyMask(1 << 7);
    pub const ENTITY: TyMask = TyMask(1 << 8);
    pub const OBJECT: TyMask = TyMask(1 << 9);
    pub const HASH: TyMask = TyMask(1 << 10);
    pub const ANIMTREE: TyMask = TyMask(1 << 11);
    pub const ANIM: TyMask = TyMask(1 << 12);
    pub const FUNCTION: TyMask = TyMask(1 << 13);
    pub const FUNCTION_POINTER: TyMask = TyMask(1 << 14);
    pub const UNDEFINED: TyMask = TyMask(1 << 15);
    pub const UINT64: TyMask = TyMask(1 << 16);
    /// Propagated from analysis failures so one mistake reports once.
    pub const ERROR: TyMask = TyMask(1 << 17);

    /// All valid runtime kinds; the lattice top.
    pub const ANY: TyMask = TyMask((1 << 17) - 1);

    #[inline]
    pub const fn union(self, other: TyMask) -> TyMask {
        TyMask(self.0 | other.0)
    }

    #[inline]
    pub const fn intersect(self, other: TyMask) -> TyMask {
        TyMask(self.0 & other.0)
    }

    #[inline]
    pub const fn without(self, other: TyMask) -> TyMask {
        TyMask(self.0 & !other.0)
    }

    /// Whether every bit of `other` is present.
    #[inline]
    pub const fn contains(self, other: TyMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is present.
    #[inline]
    pub const fn intersects(self, other: TyMask) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub const fn is_void(self) -> bool {
        self.0 == 0
    }

    /// Exactly the given kind, nothing else.
    #[inline]
    pub const fn is_exactly(self, other: TyMask) -> bool {
        self.0 == other.0
    }
}

/// Display table, supersets first so implied base kinds are skipped.
const DISPLAY: &[(TyMask, &str)] = &[
    (TyMask::UNDEFINED, "Undefined"),
    (TyMask::ISTRING, "IString"),
    (TyMask::STRING, "String"),
    (TyMask::INT, "Int"),
    (TyMask::BOOL, "Bool"),
    (TyMask::FLOAT, "Float"),
    (TyMask::UINT64, "UInt64"),
    (TyMask::ARRAY, "Array"),
    (TyMask::VECTOR, "Vector"),
    (TyMask::STRUCT, "Struct"),
    (TyMask::ENTITY, "Entity"),
    (TyMask::OBJECT, "Object"),
    (TyMask::HASH, "Hash"),
    (TyMask::ANIMTREE, "AnimTree"),
    (TyMask::ANIM, "Anim"),
    (TyMask::FUNCTION, "Function"),
    (TyMask::FUNCTION_POINTER, "FunctionPointer"),
    (TyMask::ERROR, "Error"),
];

impl std::fmt::Display for TyMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_void() {
            return write!(f, "Void");
        }
        if self.is_exactly(TyMask::ANY) {
            return write!(f, "Any");
        }

        let mut covered = TyMask::VOID;
        let mut first = true;
        for &(mask, name) in DISPLAY {
            if self.contains(mask) && !covered.contains(mask) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{}", name)?;
                covered = covered.union(mask);
                first = false;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for TyMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TyMask({})", self)
    }
}

/// Refinement attached to Entity/Object/Function kinds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubType {
    /// Entity kind tag, e.g. `player` or `vehicle`.
    EntityTag(String),
    /// Class id for Object values.
    ClassId(String),
    /// Target of a function reference, `namespace::name`.
    FunctionTarget(String),
}

/// A lattice value: kind mask plus optional refinements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ty {
    pub mask: TyMask,
    pub subtypes: BTreeSet<SubType>,
    /// Statically known boolean, when the value is a known truth constant.
    pub known_bool: Option<bool>,
    pub read_only: bool,
    /// Name of the field this value was read from, for field-set diagnostics.
    pub field_label: Option<String>,
}

impl Ty {
    pub fn of(mask: TyMask) -> Self {
        Self {
            mask,
            subtypes: BTreeSet::new(),
            known_bool: None,
            read_only: false,
            field_label: None,
        }
    }

    pub fn any() -> Self {
        Self::of(TyMask::ANY)
    }

    pub fn undefined() -> Self {
        Self::of(TyMask::UNDEFINED)
    }

    pub fn error() -> Self {
        Self::of(TyMask::ERROR)
    }

    pub fn bool_const(value: bool) -> Self {
        let mut ty = Self::of(TyMask::BOOL);
        ty.known_bool = Some(value);
        ty
    }

    pub fn with_subtype(mask: TyMask, subtype: SubType) -> Self {
        let mut ty = Self::of(mask);
        ty.subtypes.insert(subtype);
        ty
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn labeled(mut self, field: impl Into<String>) -> Self {
        self.field_label = Some(field.into());
        self
    }

    /// Lattice join: masks OR, subtypes union, booleans collapse to unknown
    /// when they disagree, read-only only if both sides are.
    pub fn join(&self, other: &Ty) -> Ty {
        let mut subtypes = self.subtypes.clone();
        subtypes.extend(other.subtypes.iter().cloned());
        Ty {
            mask: self.mask.union(other.mask),
            subtypes,
            known_bool: match (self.known_bool, other.known_bool) {
                (Some(a), Some(b)) if a == b => Some(a),
                _ => None,
            },
            read_only: self.read_only && other.read_only,
            field_label: self.field_label.clone().or_else(|| other.field_label.clone()),
        }
    }

    /// May the value be undefined at runtime?
    pub fn maybe_undefined(&self) -> bool {
        self.mask.intersects(TyMask::UNDEFINED)
    }

    pub fn is_exactly_undefined(&self) -> bool {
        self.mask.is_exactly(TyMask::UNDEFINED)
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.mask)
    }
}

/// A per-symbol refinement applied along one control-flow edge:
/// `new = (old & keep) & !remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Narrowing {
    pub keep: TyMask,
    pub remove: TyMask,
}

impl Narrowing {
    pub const NONE: Narrowing = Narrowing {
        keep: TyMask::ANY,
        remove: TyMask::VOID,
    };

    pub fn keeping(keep: TyMask) -> Self {
        Self {
            keep,
            remove: TyMask::VOID,
        }
    }

    pub fn removing(remove: TyMask) -> Self {
        Self {
            keep: TyMask::ANY,
            remove,
        }
    }

    /// Composition: keeps intersect, removes union.
    pub fn and(self, other: Narrowing) -> Narrowing {
        Narrowing {
            keep: self.keep.intersect(other.keep),
            remove: self.remove.union(other.remove),
        }
    }

    pub fn apply(self, ty: &Ty) -> Ty {
        let mut narrowed = ty.clone();
        let mut mask = ty.mask.intersect(self.keep).without(self.remove);
        // A contradictory narrowing (the branch is statically dead) still
        // describes what the symbol would be inside it: fall back to the
        // narrowing's own mask rather than Void.
        if mask.is_void() {
            mask = TyMask::ANY.intersect(self.keep).without(self.remove);
        }
        narrowed.mask = mask;
        narrowed.known_bool = None;
        narrowed
    }
}

/// Narrowings gathered from evaluating a condition, per branch.
///
/// Merging the facts of `A && B` composes narrowings for symbols named on
/// both sides and set-unions across disjoint names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    pub when_true: IndexMap<String, Narrowing>,
    pub when_false: IndexMap<String, Narrowing>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.when_true.is_empty() && self.when_false.is_empty()
    }

    /// Swap the branches; the facts of `!expr`.
    pub fn negate(self) -> Facts {
        Facts {
            when_true: self.when_false,
            when_false: self.when_true,
        }
    }

    pub fn add_true(&mut self, name: impl Into<String>, narrowing: Narrowing) {
        compose(&mut self.when_true, name.into(), narrowing);
    }

    pub fn add_false(&mut self, name: impl Into<String>, narrowing: Narrowing) {
        compose(&mut self.when_false, name.into(), narrowing);
    }

    /// Merge another fact set into the true branch only.
    pub fn merge_true(&mut self, other: &IndexMap<String, Narrowing>) {
        for (name, narrowing) in other {
            compose(&mut self.when_true, name.clone(), *narrowing);
        }
    }

    /// Merge another fact set into the false branch only.
    pub fn merge_false(&mut self, other: &IndexMap<String, Narrowing>) {
        for (name, narrowing) in other {
            compose(&mut self.when_false, name.clone(), *narrowing);
        }
    }
}

fn compose(map: &mut IndexMap<String, Narrowing>, name: String, narrowing: Narrowing) {
    match map.get_mut(&name) {
        Some(existing) => *existing = existing.and(narrowing),
        None => {
            map.insert(name, narrowing);
        }
    }
}
