use invoke::signature::{
    ClassDef, Kind, Prim, RefType, Signature, SignatureTable, is_convertible_to, is_viewable_as,
};

fn all_kinds() -> Vec<Kind> {
    let mut kinds: Vec<Kind> = Prim::ALL.iter().map(|p| Kind::Prim(*p)).collect();
    kinds.extend(Prim::ALL.iter().map(|p| Kind::boxed(*p)));
    kinds.extend([
        Kind::OBJECT,
        Kind::NUMBER,
        Kind::STRING,
        Kind::THROWABLE,
        Kind::HANDLE,
        Kind::array_of(Kind::INT),
        Kind::array_of(Kind::STRING),
    ]);
    kinds
}

#[test]
fn convertibility_is_reflexive_for_every_kind() {
    for kind in all_kinds() {
        assert!(is_convertible_to(&kind, &kind), "{kind} -> {kind}");
        assert!(is_viewable_as(&kind, &kind, true), "{kind} viewable as itself");
    }
}

#[test]
fn widening_then_boxing_composes() {
    assert!(is_convertible_to(&Kind::BYTE, &Kind::boxed(Prim::Long)));
    assert!(is_convertible_to(&Kind::CHAR, &Kind::boxed(Prim::Int)));
    assert!(is_convertible_to(&Kind::FLOAT, &Kind::NUMBER));
    // boxing then widening the wrapper is not a thing
    assert!(!is_convertible_to(&Kind::boxed(Prim::Int), &Kind::boxed(Prim::Long)));
}

#[test]
fn unboxing_then_widening_composes() {
    assert!(is_convertible_to(&Kind::boxed(Prim::Int), &Kind::LONG));
    assert!(is_convertible_to(&Kind::boxed(Prim::Short), &Kind::DOUBLE));
    assert!(!is_convertible_to(&Kind::boxed(Prim::Long), &Kind::INT));
    assert!(is_convertible_to(&Kind::OBJECT, &Kind::INT));
    assert!(is_convertible_to(&Kind::NUMBER, &Kind::DOUBLE));
    assert!(!is_convertible_to(&Kind::NUMBER, &Kind::BOOL));
    assert!(!is_convertible_to(&Kind::STRING, &Kind::INT));
}

#[test]
fn unrelated_final_references_fail_statically() {
    assert!(!is_convertible_to(&Kind::STRING, &Kind::boxed(Prim::Int)));
    assert!(!is_convertible_to(&Kind::array_of(Kind::INT), &Kind::STRING));
    // a non-final side defers the check to the value
    assert!(is_convertible_to(&Kind::OBJECT, &Kind::STRING));
    assert!(is_convertible_to(&Kind::THROWABLE, &Kind::HANDLE));
}

#[test]
fn class_hierarchy_participates_in_the_lattice() {
    let shape = ClassDef::builder("Shape").build();
    let circle = ClassDef::builder("Circle")
        .extends(RefType::Class(shape.clone()))
        .final_class()
        .build();
    let circle_kind = Kind::class(&circle);
    let shape_kind = Kind::class(&shape);
    assert!(is_viewable_as(&circle_kind, &shape_kind, true));
    assert!(!is_viewable_as(&shape_kind, &circle_kind, true));
    assert!(is_viewable_as(&shape_kind, &circle_kind, false));
    assert!(!is_convertible_to(&circle_kind, &Kind::STRING));
}

#[test]
fn void_is_absorbing_on_returns() {
    let producer = Signature::make(Kind::VOID, vec![Kind::INT]).unwrap();
    let consumer = Signature::make(Kind::LONG, vec![Kind::INT]).unwrap();
    assert!(producer.is_convertible_to(&consumer));
    assert!(consumer.is_convertible_to(&producer));
}

#[test]
fn interned_signatures_share_storage() {
    let table = SignatureTable::new();
    let built: Vec<Signature> = (0..8)
        .map(|_| table.make(Kind::INT, vec![Kind::INT, Kind::INT]).unwrap())
        .collect();
    assert!(built.windows(2).all(|pair| pair[0].same_instance(&pair[1])));
    let other = table.make(Kind::INT, vec![Kind::INT]).unwrap();
    assert!(!other.same_instance(&built[0]));
    assert_eq!(table.len(), 2);
}
