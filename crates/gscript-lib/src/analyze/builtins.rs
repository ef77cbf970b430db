//! Built-in function tables, engine globals, and the entity field registry.
//!
//! Reserved functions with analysis-visible behavior (`isdefined`,
//! `vectorscale`) are regular table entries; a small dispatch map keys their
//! narrowing/return-type customization so the call analyzer stays generic.

use indexmap::IndexMap;

use super::lattice::{Ty, TyMask};

/// One callable shape of a built-in or exported function.
#[derive(Debug, Clone)]
pub struct Overload {
    pub min_args: usize,
    /// `None` with `vararg` means any count >= min.
    pub max_args: Option<usize>,
    pub vararg: bool,
    pub return_mask: TyMask,
}

impl Overload {
    pub fn exact(args: usize, return_mask: TyMask) -> Self {
        Self {
            min_args: args,
            max_args: Some(args),
            vararg: false,
            return_mask,
        }
    }

    pub fn range(min: usize, max: usize, return_mask: TyMask) -> Self {
        Self {
            min_args: min,
            max_args: Some(max),
            vararg: false,
            return_mask,
        }
    }

    pub fn vararg(min: usize, return_mask: TyMask) -> Self {
        Self {
            min_args: min,
            max_args: None,
            vararg: true,
            return_mask,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuiltinFlags {
    pub builtin: bool,
    /// Signature scraped rather than curated; arity findings are unverified.
    pub autogenerated: bool,
    pub reserved: bool,
}

/// A function known to the API data provider.
#[derive(Debug, Clone)]
pub struct ApiFunction {
    pub name: String,
    pub overloads: Vec<Overload>,
    pub flags: BuiltinFlags,
}

/// Special-case semantics attached to reserved functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCall {
    /// `isdefined(x)`: narrows `x` by Undefined on both branches.
    IsDefined,
    /// `vectorscale(v, s)`: returns Vector regardless of the declared signature.
    VectorScale,
}

/// The built-in API set for one language id (GSC or CSC pick different sets
/// in the host; the default table carries the shared core).
#[derive(Debug, Clone, Default)]
pub struct Api {
    functions: IndexMap<String, ApiFunction>,
    specials: IndexMap<String, SpecialCall>,
}

impl Api {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared core of engine built-ins.
    pub fn default_set() -> Self {
        let mut api = Self::default();

        let reserved = BuiltinFlags {
            builtin: true,
            autogenerated: false,
            reserved: true,
        };
        let curated = BuiltinFlags {
            builtin: true,
            autogenerated: false,
            reserved: false,
        };
        let scraped = BuiltinFlags {
            builtin: true,
            autogenerated: true,
            reserved: false,
        };

        api.add(
            "isdefined",
            vec![Overload::exact(1, TyMask::BOOL)],
            reserved,
        );
        api.add(
            "vectorscale",
            vec![Overload::exact(2, TyMask::VECTOR)],
            reserved,
        );
        api.add("gettime", vec![Overload::exact(0, TyMask::INT)], curated);
        api.add(
            "getdvarstring",
            vec![Overload::range(1, 2, TyMask::STRING)],
            curated,
        );
        api.add(
            "getdvarint",
            vec![Overload::range(1, 2, TyMask::INT)],
            curated,
        );
        api.add(
            "randomint",
            vec![Overload::exact(1, TyMask::INT)],
            curated,
        );
        api.add(
            "randomfloat",
            vec![Overload::exact(1, TyMask::FLOAT)],
            curated,
        );
        api.add(
            "spawn",
            vec![Overload::range(1, 2, TyMask::ENTITY)],
            curated,
        );
        api.add(
            "spawnstruct",
            vec![Overload::exact(0, TyMask::STRUCT)],
            curated,
        );
        api.add("distance", vec![Overload::exact(2, TyMask::FLOAT)], curated);
        api.add(
            "arrayinsert",
            vec![Overload::vararg(2, TyMask::VOID)],
            scraped,
        );
        api.add("println", vec![Overload::vararg(0, TyMask::VOID)], scraped);
        api.add(
            "iprintlnbold",
            vec![Overload::vararg(0, TyMask::VOID)],
            scraped,
        );

        api.specials
            .insert("isdefined".to_owned(), SpecialCall::IsDefined);
        api.specials
            .insert("vectorscale".to_owned(), SpecialCall::VectorScale);

        api
    }

    pub fn add(&mut self, name: &str, overloads: Vec<Overload>, flags: BuiltinFlags) {
        self.functions.insert(
            name.to_ascii_lowercase(),
            ApiFunction {
                name: name.to_owned(),
                overloads,
                flags,
            },
        );
    }

    pub fn function(&self, name: &str) -> Option<&ApiFunction> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    pub fn special(&self, name: &str) -> Option<SpecialCall> {
        self.specials.get(&name.to_ascii_lowercase()).copied()
    }
}

/// Lattice values of the engine-bound globals.
pub fn reserved_global(name: &str) -> Option<Ty> {
    let mask = match name.to_ascii_lowercase().as_str() {
        "self" => TyMask::ENTITY.union(TyMask::STRUCT),
        "level" => TyMask::STRUCT,
        "game" => TyMask::ARRAY,
        "anim" => TyMask::STRUCT,
        "vararg" => TyMask::ARRAY,
        _ => return None,
    };
    Some(Ty::of(mask).read_only())
}

/// Outcome of an entity field write, in diagnostic priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldSet {
    Success,
    FieldTypeMismatch,
    FieldReadOnly,
    EntityImmutable,
}

#[derive(Debug, Clone)]
struct FieldSpec {
    mask: TyMask,
    read_only: bool,
}

/// Predefined fields per entity tag.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    kinds: IndexMap<String, EntityKind>,
}

#[derive(Debug, Clone, Default)]
struct EntityKind {
    immutable: bool,
    fields: IndexMap<String, FieldSpec>,
}

impl EntityRegistry {
    pub fn default_set() -> Self {
        let mut registry = Self::default();

        registry.kind("player", false, &[
            ("origin", TyMask::VECTOR, false),
            ("angles", TyMask::VECTOR, false),
            ("health", TyMask::INT, false),
            ("name", TyMask::STRING, true),
            ("team", TyMask::STRING, false),
        ]);
        registry.kind("vehicle", false, &[
            ("origin", TyMask::VECTOR, false),
            ("angles", TyMask::VECTOR, false),
            ("health", TyMask::INT, false),
        ]);
        registry.kind("worldspawn", true, &[("origin", TyMask::VECTOR, true)]);

        registry
    }

    fn kind(&mut self, tag: &str, immutable: bool, fields: &[(&str, TyMask, bool)]) {
        let mut kind = EntityKind {
            immutable,
            fields: IndexMap::new(),
        };
        for &(name, mask, read_only) in fields {
            kind.fields
                .insert(name.to_owned(), FieldSpec { mask, read_only });
        }
        self.kinds.insert(tag.to_owned(), kind);
    }

    /// Check a write of `value` to `field` on an entity tagged `tag`.
    ///
    /// Unknown tags and unknown fields succeed: entities accept script-defined
    /// fields freely.
    pub fn check_set(&self, tag: &str, field: &str, value: TyMask) -> FieldSet {
        let Some(kind) = self.kinds.get(&tag.to_ascii_lowercase()) else {
            return FieldSet::Success;
        };
        if kind.immutable {
            return FieldSet::EntityImmutable;
        }
        let Some(spec) = kind.fields.get(&field.to_ascii_lowercase()) else {
            return FieldSet::Success;
        };
        if spec.read_only {
            return FieldSet::FieldReadOnly;
        }
        if !value.intersects(spec.mask) && !value.is_void() {
            return FieldSet::FieldTypeMismatch;
        }
        FieldSet::Success
    }

    /// Lattice value of a predefined field read, if the field is known.
    pub fn field_ty(&self, tag: &str, field: &str) -> Option<Ty> {
        let kind = self.kinds.get(&tag.to_ascii_lowercase())?;
        let spec = kind.fields.get(&field.to_ascii_lowercase())?;
        let ty = Ty::of(spec.mask);
        Some(if spec.read_only { ty.read_only() } else { ty })
    }
}

/// A function exported by a dependent script.
#[derive(Debug, Clone)]
pub struct ExportedFn {
    pub namespace: String,
    pub name: String,
    pub overloads: Vec<Overload>,
    /// Path of the script that exports this symbol; drives unused-`#using`.
    pub origin: String,
}

/// A class exported by a dependent script.
#[derive(Debug, Clone)]
pub struct ExportedClass {
    pub name: String,
    pub origin: String,
}

/// Symbols imported from `#using` dependencies, keyed by bare name and by
/// `namespace::name`.
#[derive(Debug, Clone, Default)]
pub struct Exports {
    functions: IndexMap<String, ExportedFn>,
    classes: IndexMap<String, ExportedClass>,
    namespaces: Vec<String>,
}

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, func: ExportedFn) {
        let bare = func.name.to_ascii_lowercase();
        let qualified = format!("{}::{}", func.namespace.to_ascii_lowercase(), bare);
        if !self
            .namespaces
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&func.namespace))
        {
            self.namespaces.push(func.namespace.to_ascii_lowercase());
        }
        self.functions.entry(bare).or_insert_with(|| func.clone());
        self.functions.insert(qualified, func);
    }

    pub fn add_class(&mut self, class: ExportedClass) {
        self.classes.insert(class.name.to_ascii_lowercase(), class);
    }

    pub fn function(&self, name: &str) -> Option<&ExportedFn> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    pub fn qualified(&self, namespace: &str, name: &str) -> Option<&ExportedFn> {
        self.functions.get(&format!(
            "{}::{}",
            namespace.to_ascii_lowercase(),
            name.to_ascii_lowercase()
        ))
    }

    pub fn class(&self, name: &str) -> Option<&ExportedClass> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .iter()
            .any(|n| n.eq_ignore_ascii_case(namespace))
    }
}
