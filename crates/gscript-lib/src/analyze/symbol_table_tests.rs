use rowan::TextRange;

use super::lattice::{Ty, TyMask};
use super::symbol_table::{Env, Lookup, SetOutcome};

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(start.into(), end.into())
}

#[test]
fn add_then_get_is_case_insensitive() {
    let mut env = Env::new();
    let (outcome, previous) =
        env.add_or_set("MyVar", Ty::of(TyMask::INT), 1, false, range(0, 5));
    assert_eq!(outcome, SetOutcome::Ok);
    assert!(previous.is_none());

    let Lookup::Local(var) = env.try_get("myvar") else {
        panic!("case-insensitive lookup failed")
    };
    assert_eq!(var.name, "MyVar");
    assert!(var.ty.mask.is_exactly(TyMask::INT));
}

#[test]
fn second_write_mutates_and_reports_previous() {
    let mut env = Env::new();
    env.add_or_set("x", Ty::of(TyMask::INT), 1, false, range(0, 1));
    let (outcome, previous) =
        env.add_or_set("x", Ty::of(TyMask::STRING), 1, false, range(5, 6));
    assert_eq!(outcome, SetOutcome::Ok);
    assert_eq!(previous, Some(range(0, 1)));

    let Lookup::Local(var) = env.try_get("x") else {
        panic!()
    };
    assert!(var.ty.mask.is_exactly(TyMask::STRING));
}

#[test]
fn const_blocks_reassignment() {
    let mut env = Env::new();
    env.add_or_set("k", Ty::of(TyMask::INT), 1, true, range(0, 1));
    let (outcome, _) = env.add_or_set("k", Ty::of(TyMask::INT), 1, false, range(5, 6));
    assert_eq!(outcome, SetOutcome::FailedConstant);
}

#[test]
fn reserved_names_cannot_be_written() {
    let mut env = Env::new();
    for name in ["self", "level", "game", "anim", "vararg", "SELF"] {
        let (outcome, _) = env.add_or_set(name, Ty::any(), 1, false, range(0, 4));
        assert_eq!(outcome, SetOutcome::FailedReserved, "{}", name);
    }
    assert_eq!(env.try_get("self"), Lookup::Reserved);
}

#[test]
fn merge_joins_types() {
    let mut a = Env::new();
    a.add_or_set("x", Ty::of(TyMask::INT), 1, false, range(0, 1));
    let mut b = Env::new();
    b.add_or_set("x", Ty::of(TyMask::STRING), 1, false, range(0, 1));

    a.merge(&b, 1);
    let Lookup::Local(var) = a.try_get("x") else {
        panic!()
    };
    assert!(var.ty.mask.is_exactly(TyMask::INT.union(TyMask::STRING)));
}

#[test]
fn merge_keeps_one_sided_entries() {
    let mut a = Env::new();
    a.add_or_set("x", Ty::of(TyMask::INT), 1, false, range(0, 1));
    let mut b = Env::new();
    b.add_or_set("y", Ty::of(TyMask::STRING), 1, false, range(2, 3));

    a.merge(&b, 1);
    assert_eq!(a.len(), 2);
}

#[test]
fn merge_drops_entries_deeper_than_target() {
    let mut a = Env::new();
    a.add_or_set("outer", Ty::of(TyMask::INT), 1, false, range(0, 1));
    let mut b = Env::new();
    b.add_or_set("inner", Ty::of(TyMask::INT), 3, false, range(2, 3));

    a.merge(&b, 1);
    assert!(matches!(a.try_get("outer"), Lookup::Local(_)));
    assert!(matches!(a.try_get("inner"), Lookup::Undefined));
}

#[test]
fn refine_replaces_in_place() {
    let mut env = Env::new();
    env.add_or_set(
        "x",
        Ty::of(TyMask::INT.union(TyMask::UNDEFINED)),
        1,
        false,
        range(0, 1),
    );
    env.refine("X", Ty::of(TyMask::INT));

    let Lookup::Local(var) = env.try_get("x") else {
        panic!()
    };
    assert!(var.ty.mask.is_exactly(TyMask::INT));
}

#[test]
fn env_equality_tracks_types() {
    let mut a = Env::new();
    a.add_or_set("x", Ty::of(TyMask::INT), 1, false, range(0, 1));
    let mut b = Env::new();
    b.add_or_set("x", Ty::of(TyMask::INT), 1, false, range(0, 1));
    assert_eq!(a, b);

    b.refine("x", Ty::of(TyMask::STRING));
    assert_ne!(a, b);
}
