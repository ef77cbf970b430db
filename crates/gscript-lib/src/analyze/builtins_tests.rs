use super::builtins::{Api, EntityRegistry, Exports, ExportedFn, FieldSet, Overload, SpecialCall};
use super::lattice::TyMask;

#[test]
fn api_lookup_is_case_insensitive() {
    let api = Api::default_set();
    assert!(api.function("IsDefined").is_some());
    assert!(api.function("ISDEFINED").is_some());
    assert!(api.function("nonexistent").is_none());
}

#[test]
fn specials_dispatch_from_the_table() {
    let api = Api::default_set();
    assert_eq!(api.special("isdefined"), Some(SpecialCall::IsDefined));
    assert_eq!(api.special("VectorScale"), Some(SpecialCall::VectorScale));
    assert_eq!(api.special("gettime"), None);
}

#[test]
fn reserved_functions_are_flagged() {
    let api = Api::default_set();
    assert!(api.function("isdefined").unwrap().flags.reserved);
    assert!(!api.function("gettime").unwrap().flags.reserved);
}

#[test]
fn field_set_outcomes_order_by_priority() {
    // Immutable > ReadOnly > TypeMismatch, so a max() over outcomes picks
    // the one diagnostic to emit.
    assert!(FieldSet::EntityImmutable > FieldSet::FieldReadOnly);
    assert!(FieldSet::FieldReadOnly > FieldSet::FieldTypeMismatch);
    assert!(FieldSet::FieldTypeMismatch > FieldSet::Success);
}

#[test]
fn entity_registry_checks_writes() {
    let registry = EntityRegistry::default_set();

    assert_eq!(
        registry.check_set("player", "health", TyMask::INT),
        FieldSet::Success
    );
    assert_eq!(
        registry.check_set("player", "name", TyMask::STRING),
        FieldSet::FieldReadOnly
    );
    assert_eq!(
        registry.check_set("player", "origin", TyMask::STRING),
        FieldSet::FieldTypeMismatch
    );
    assert_eq!(
        registry.check_set("worldspawn", "origin", TyMask::VECTOR),
        FieldSet::EntityImmutable
    );
    // Script-defined fields on known entities are free-form.
    assert_eq!(
        registry.check_set("player", "custom_score", TyMask::STRING),
        FieldSet::Success
    );
    // Unknown tags impose nothing.
    assert_eq!(
        registry.check_set("turret", "anything", TyMask::STRING),
        FieldSet::Success
    );
}

#[test]
fn entity_registry_field_reads() {
    let registry = EntityRegistry::default_set();

    let health = registry.field_ty("player", "HEALTH").expect("known field");
    assert!(health.mask.is_exactly(TyMask::INT));
    assert!(!health.read_only);

    let name = registry.field_ty("player", "name").expect("known field");
    assert!(name.read_only);

    assert!(registry.field_ty("player", "custom").is_none());
}

#[test]
fn exports_resolve_bare_and_qualified() {
    let mut exports = Exports::new();
    exports.add_function(ExportedFn {
        namespace: "util".to_owned(),
        name: "Helper".to_owned(),
        overloads: vec![Overload::exact(1, TyMask::INT)],
        origin: r"scripts\shared\util".to_owned(),
    });

    assert!(exports.function("helper").is_some());
    assert!(exports.qualified("UTIL", "helper").is_some());
    assert!(exports.qualified("other", "helper").is_none());
    assert!(exports.has_namespace("util"));
    assert!(!exports.has_namespace("other"));
}

#[test]
fn overload_shapes() {
    let exact = Overload::exact(2, TyMask::INT);
    assert_eq!(exact.min_args, 2);
    assert_eq!(exact.max_args, Some(2));

    let spread = Overload::vararg(1, TyMask::VOID);
    assert_eq!(spread.min_args, 1);
    assert_eq!(spread.max_args, None);
    assert!(spread.vararg);
}
