//! Static conversion predicates between kinds.
//!
//! Loose conversion permits at most one change of representation (boxing or
//! unboxing) combined with primitive widening on the primitive side:
//!
//! | from \ to  | primitive              | reference                         |
//! |------------|------------------------|-----------------------------------|
//! | primitive  | widening               | widen, then box to a subtype      |
//! | reference  | unbox, then widen      | any, unless unrelated final types |
//!
//! `void` converts to anything as a return (the zero value is produced) and
//! anything converts to `void` (the value is discarded).
use super::kind::{Kind, Prim, RefType};

/// Loose conversion: the relation `as_type` adapts along.
pub fn is_convertible_to(from: &Kind, to: &Kind) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (Kind::Void, _) | (_, Kind::Void) => true,
        (Kind::Prim(p), Kind::Prim(q)) => p.widens_to(*q),
        (Kind::Prim(p), Kind::Ref(target)) => box_target(*p, target).is_some(),
        (Kind::Ref(source), Kind::Prim(q)) => can_unbox_to(source, *q),
        (Kind::Ref(source), Kind::Ref(target)) => {
            source.is_related_to(target) || !(source.is_final() && target.is_final())
        }
    }
}

/// Conversion without a change of representation.
///
/// With `strict` set, primitives must match exactly and references may only
/// move up the lattice; otherwise primitive widening and statically legal
/// reference casts are also accepted. Boxing and unboxing are never viewable.
pub fn is_viewable_as(from: &Kind, to: &Kind, strict: bool) -> bool {
    if from == to {
        return true;
    }
    match (from, to) {
        (Kind::Prim(p), Kind::Prim(q)) => !strict && p.widens_to(*q),
        (Kind::Ref(source), Kind::Ref(target)) => {
            if strict {
                source.is_subtype_of(target)
            } else {
                is_convertible_to(from, to)
            }
        }
        _ => false,
    }
}

/// Returns the primitive a value of kind `prim` is widened to before boxing
/// into `target`, if any.
///
/// Boxing without widening is preferred; `int` into `Long` widens first.
pub fn box_target(prim: Prim, target: &RefType) -> Option<Prim> {
    if RefType::Boxed(prim).is_subtype_of(target) {
        return Some(prim);
    }
    match target {
        RefType::Boxed(q) if prim.widens_to(*q) => Some(*q),
        _ => None,
    }
}

/// Returns whether a reference of static type `source` may unbox into `prim`.
///
/// Wrappers are checked statically; `Object` and `Number` defer the check to
/// the value at invocation time.
pub fn can_unbox_to(source: &RefType, prim: Prim) -> bool {
    match source {
        RefType::Boxed(q) => q.widens_to(prim),
        RefType::Object => true,
        RefType::Number => prim.is_numeric(),
        _ => false,
    }
}
