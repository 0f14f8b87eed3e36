#[path = "../common/fixtures.rs"]
mod fixtures;

use fixtures::{add, double, int, sig};
use invoke::{
    FunctionHandle, InvokeError, Kind, Value,
    combinators::{
        LoopClause, counted_loop, counted_loop_range, do_while_loop, drop_arguments,
        iterated_loop, loop_clauses, while_loop,
    },
    handle::{constant, identity},
};

fn less_than() -> FunctionHandle {
    FunctionHandle::native("less_than", sig(Kind::BOOL, vec![Kind::INT, Kind::INT]), |args| {
        Ok(Value::Bool(args[0].as_int() < args[1].as_int()))
    })
}

fn multiply() -> FunctionHandle {
    FunctionHandle::native("multiply", sig(Kind::INT, vec![Kind::INT, Kind::INT]), |args| {
        let a = args[0].as_int().unwrap_or(0);
        let b = args[1].as_int().unwrap_or(0);
        Ok(Value::Int(a * b))
    })
}

fn int_const(value: i32) -> FunctionHandle {
    constant(Kind::INT, int(value)).unwrap()
}

#[test]
fn counted_loop_sums_zero_to_four() {
    let sum = counted_loop(int_const(5), Some(int_const(0)), add()).unwrap();
    assert_eq!(sum.arity(), 0);
    assert_eq!(sum.invoke_exact(vec![]).unwrap(), int(10));
}

#[test]
fn counted_loop_takes_its_bound_as_a_parameter() {
    let sum = counted_loop(identity(Kind::INT).unwrap(), None, add()).unwrap();
    assert_eq!(sum.signature(), &sig(Kind::INT, vec![Kind::INT]));
    assert_eq!(sum.invoke_exact(vec![int(5)]).unwrap(), int(10));
    assert_eq!(sum.invoke_exact(vec![int(0)]).unwrap(), int(0));
    assert_eq!(sum.invoke_exact(vec![int(-3)]).unwrap(), int(0));
}

#[test]
fn counted_range_runs_from_start_to_end() {
    let product = counted_loop_range(int_const(2), int_const(5), Some(int_const(1)), multiply()).unwrap();
    assert_eq!(product.invoke_exact(vec![]).unwrap(), int(24));
}

#[test]
fn void_counted_body_only_sees_the_counter() {
    let body = FunctionHandle::native("noop", sig(Kind::VOID, vec![Kind::INT]), |_| Ok(Value::Void));
    let looped = counted_loop(int_const(3), None, body).unwrap();
    assert!(looped.signature().returns_void());
    assert_eq!(looped.invoke_exact(vec![]).unwrap(), Value::Void);
}

#[test]
fn while_loop_checks_before_the_body() {
    // v = 1; while v < limit { v = v * 2 }
    let body = drop_arguments(&double(), 1, &[Kind::INT]).unwrap();
    let doubling = while_loop(Some(int_const(1)), less_than(), body).unwrap();
    assert_eq!(doubling.signature(), &sig(Kind::INT, vec![Kind::INT]));
    assert_eq!(doubling.invoke_exact(vec![int(100)]).unwrap(), int(128));
    assert_eq!(doubling.invoke_exact(vec![int(1)]).unwrap(), int(1));
}

#[test]
fn do_while_runs_the_body_at_least_once() {
    let body = drop_arguments(&double(), 1, &[Kind::INT]).unwrap();
    let doubling = do_while_loop(Some(int_const(100)), body, less_than()).unwrap();
    assert_eq!(doubling.invoke_exact(vec![int(10)]).unwrap(), int(200));
    assert_eq!(doubling.invoke_exact(vec![int(1000)]).unwrap(), int(1600));
}

#[test]
fn iterated_loop_walks_array_elements() {
    let ints = Kind::array_of(Kind::INT);
    let total = iterated_loop(&ints, None, add()).unwrap();
    assert_eq!(total.signature(), &sig(Kind::INT, vec![ints]));
    let values = Value::array(Kind::INT, vec![int(3), int(4), int(5)]);
    assert_eq!(total.invoke_exact(vec![values]).unwrap(), int(12));
    let empty = Value::array(Kind::INT, Vec::new());
    assert_eq!(total.invoke_exact(vec![empty]).unwrap(), int(0));
}

#[test]
fn clauses_update_in_place_and_share_the_frame() {
    // frame (b, a, i, n); steps run in clause order so `a` sees the new `b`
    let frame = vec![Kind::INT, Kind::INT, Kind::INT, Kind::INT];
    let pair = || sig(Kind::INT, frame[..2].to_vec());
    let sum_into_b = FunctionHandle::native("sum_into_b", pair(), |args| {
        Ok(Value::Int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0)))
    });
    let recover_a = FunctionHandle::native("recover_a", pair(), |args| {
        Ok(Value::Int(args[0].as_int().unwrap_or(0) - args[1].as_int().unwrap_or(0)))
    });
    let count_up = FunctionHandle::native("count_up", sig(Kind::INT, frame[..3].to_vec()), |args| {
        Ok(Value::Int(args[2].as_int().unwrap_or(0) + 1))
    });
    let below = FunctionHandle::native("below", sig(Kind::BOOL, frame.clone()), |args| {
        Ok(Value::Bool(args[2].as_int() < args[3].as_int()))
    });
    let answer = FunctionHandle::native("answer", pair(), |args| Ok(args[1].clone()));

    let fib = loop_clauses(vec![
        LoopClause::new().init(int_const(1)).step(sum_into_b),
        LoopClause::new().init(int_const(0)).step(recover_a).fini(answer),
        LoopClause::new().init(int_const(0)).step(count_up).pred(below),
    ])
    .unwrap();
    assert_eq!(fib.signature(), &sig(Kind::INT, vec![Kind::INT]));
    let results: Vec<Value> = (0..8).map(|n| fib.invoke_exact(vec![int(n)]).unwrap()).collect();
    assert_eq!(
        results,
        [0, 1, 1, 2, 3, 5, 8, 13].into_iter().map(int).collect::<Vec<_>>()
    );
}

#[test]
fn loop_shape_errors_are_reported_at_construction() {
    assert!(matches!(loop_clauses(vec![]), Err(InvokeError::IllegalArgument(_))));
    assert!(matches!(
        loop_clauses(vec![LoopClause::new()]),
        Err(InvokeError::IllegalArgument(_))
    ));

    let two_results = loop_clauses(vec![
        LoopClause::new().init(int_const(0)).fini(identity(Kind::INT).unwrap()),
        LoopClause::new().init(int_const(0)).fini(drop_arguments(&identity(Kind::INT).unwrap(), 0, &[Kind::INT]).unwrap()),
    ]);
    assert!(matches!(two_results, Err(InvokeError::CombinatorTypeMismatch { .. })));

    let not_boolean = loop_clauses(vec![LoopClause::new().init(int_const(0)).pred(identity(Kind::INT).unwrap())]);
    assert!(matches!(not_boolean, Err(InvokeError::CombinatorTypeMismatch { .. })));
}
