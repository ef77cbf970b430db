use super::lattice::{Facts, Narrowing, SubType, Ty, TyMask};

#[test]
fn derived_kinds_imply_components() {
    assert!(TyMask::INT.contains(TyMask::BOOL));
    assert!(TyMask::ISTRING.contains(TyMask::STRING));
    assert!(TyMask::NUMBER.contains(TyMask::INT));
    assert!(TyMask::NUMBER.contains(TyMask::FLOAT));
    assert!(TyMask::ANY.contains(TyMask::UNDEFINED));
    assert!(!TyMask::BOOL.contains(TyMask::INT));
}

#[test]
fn display_skips_implied_base_kinds() {
    insta::assert_snapshot!(format!("{}", TyMask::INT), @"Int");
    insta::assert_snapshot!(format!("{}", TyMask::BOOL), @"Bool");
    insta::assert_snapshot!(format!("{}", TyMask::ISTRING), @"IString");
    insta::assert_snapshot!(
        format!("{}", TyMask::INT.union(TyMask::UNDEFINED)),
        @"Undefined | Int"
    );
    insta::assert_snapshot!(format!("{}", TyMask::ANY), @"Any");
    insta::assert_snapshot!(format!("{}", TyMask::VOID), @"Void");
    insta::assert_snapshot!(
        format!("{}", TyMask::VECTOR.union(TyMask::FLOAT)),
        @"Float | Vector"
    );
}

#[test]
fn join_widens_masks_and_unions_subtypes() {
    let mut a = Ty::with_subtype(TyMask::ENTITY, SubType::EntityTag("player".into()));
    a.known_bool = Some(true);
    let mut b = Ty::with_subtype(TyMask::ENTITY, SubType::EntityTag("vehicle".into()));
    b.known_bool = Some(true);

    let joined = a.join(&b);
    assert!(joined.mask.is_exactly(TyMask::ENTITY));
    assert_eq!(joined.subtypes.len(), 2);
    assert_eq!(joined.known_bool, Some(true));
}

#[test]
fn join_collapses_disagreeing_booleans() {
    let a = Ty::bool_const(true);
    let b = Ty::bool_const(false);
    assert_eq!(a.join(&b).known_bool, None);
}

#[test]
fn join_read_only_requires_both() {
    let a = Ty::of(TyMask::INT).read_only();
    let b = Ty::of(TyMask::INT);
    assert!(!a.join(&b).read_only);
    assert!(a.join(&a.clone()).read_only);
}

#[test]
fn narrowing_removes_and_keeps() {
    let ty = Ty::of(TyMask::INT.union(TyMask::UNDEFINED));

    let defined = Narrowing::removing(TyMask::UNDEFINED).apply(&ty);
    assert!(defined.mask.is_exactly(TyMask::INT));

    let undefined = Narrowing::keeping(TyMask::UNDEFINED).apply(&ty);
    assert!(undefined.mask.is_exactly(TyMask::UNDEFINED));
}

#[test]
fn contradictory_narrowing_falls_back_to_its_own_mask() {
    // Narrowing Int to "only Undefined" describes a dead branch; the symbol
    // still reads as Undefined inside it.
    let ty = Ty::of(TyMask::INT);
    let narrowed = Narrowing::keeping(TyMask::UNDEFINED).apply(&ty);
    assert!(narrowed.mask.is_exactly(TyMask::UNDEFINED));
}

#[test]
fn narrowing_composition() {
    let a = Narrowing::removing(TyMask::UNDEFINED);
    let b = Narrowing::keeping(TyMask::NUMBER);
    let composed = a.and(b);

    let ty = Ty::of(TyMask::ANY);
    let narrowed = composed.apply(&ty);
    assert!(narrowed.mask.is_exactly(TyMask::NUMBER.without(TyMask::UNDEFINED)));
}

#[test]
fn facts_negate_swaps_branches() {
    let mut facts = Facts::new();
    facts.add_true("x", Narrowing::removing(TyMask::UNDEFINED));
    facts.add_false("x", Narrowing::keeping(TyMask::UNDEFINED));

    let negated = facts.negate();
    assert_eq!(
        negated.when_true.get("x"),
        Some(&Narrowing::keeping(TyMask::UNDEFINED))
    );
    assert_eq!(
        negated.when_false.get("x"),
        Some(&Narrowing::removing(TyMask::UNDEFINED))
    );
}

#[test]
fn facts_compose_per_name() {
    let mut facts = Facts::new();
    facts.add_true("x", Narrowing::removing(TyMask::UNDEFINED));
    facts.add_true("x", Narrowing::keeping(TyMask::NUMBER));
    facts.add_true("y", Narrowing::removing(TyMask::UNDEFINED));

    assert_eq!(facts.when_true.len(), 2);
    let x = facts.when_true.get("x").unwrap();
    assert!(x.keep.is_exactly(TyMask::NUMBER));
    assert!(x.remove.is_exactly(TyMask::UNDEFINED));
}
