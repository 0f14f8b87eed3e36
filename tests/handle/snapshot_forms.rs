#[path = "../common/fixtures.rs"]
mod fixtures;

use fixtures::{add, describe, double, is_positive, negate, sig};
use invoke::{
    Kind, Value,
    combinators::{drop_arguments, filter_return_value, guard_with_test},
    handle::identity,
};

#[test]
fn identity_returns_its_argument_slot() {
    insta::assert_snapshot!(identity(Kind::STRING).unwrap().disassemble(), @r"
    (String) -> String
      return a0
    ");
}

#[test]
fn bound_argument_becomes_a_constant() {
    let bound = add().bind_argument(0, Value::Int(5)).unwrap();
    insta::assert_snapshot!(bound.disassemble(), @r"
    (int) -> int
      t1: int = const 5
      t2: int = call (int, int) -> int(t1, a0)
      return t2
    ");
}

#[test]
fn dropped_argument_is_never_read() {
    let dropped = drop_arguments(&add(), 1, &[Kind::STRING]).unwrap();
    insta::assert_snapshot!(dropped.disassemble(), @r"
    (int, String, int) -> int
      t3: int = call (int, int) -> int(a0, a2)
      return t3
    ");
}

#[test]
fn as_type_inserts_return_conversion() {
    let widened = add().as_type(&sig(Kind::LONG, vec![Kind::INT, Kind::INT])).unwrap();
    insta::assert_snapshot!(widened.disassemble(), @r"
    (int, int) -> long
      t2: int = call (int, int) -> int(a0, a1)
      t3: long = convert t2 int -> long
      return t3
    ");
}

#[test]
fn spreader_unpacks_fixed_positions() {
    let spread = add().as_spreader(&Kind::array_of(Kind::INT), 2).unwrap();
    insta::assert_snapshot!(spread.disassemble(), @r"
    (int[]) -> int
      t1: int = spread a0[0/2]
      t2: int = spread a0[1/2]
      t3: int = call (int, int) -> int(t1, t2)
      return t3
    ");
}

#[test]
fn filtered_return_chains_calls() {
    let described = filter_return_value(&add(), &describe()).unwrap();
    insta::assert_snapshot!(described.disassemble(), @r"
    (int, int) -> String
      t2: int = call (int, int) -> int(a0, a1)
      t3: String = call (int) -> String(t2)
      return t3
    ");
}

#[test]
fn guard_is_a_single_step() {
    let guarded = guard_with_test(&is_positive(), &negate(), &double()).unwrap();
    insta::assert_snapshot!(guarded.disassemble(), @r"
    (int) -> int
      t1: int = guard(a0)
      return t1
    ");
}
