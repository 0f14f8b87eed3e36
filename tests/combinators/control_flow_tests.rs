#[path = "../common/fixtures.rs"]
mod fixtures;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use fixtures::{double, int, is_positive, negate, sig};
use invoke::{
    FunctionHandle, InvokeError, Kind, RefType, Value,
    combinators::{catch_exception, drop_arguments, guard_with_test, try_finally},
    handle::{constant, identity},
    runtime::exceptions::{arithmetic, null_pointer, throw},
};
use parking_lot::Mutex;

fn divide() -> FunctionHandle {
    FunctionHandle::native("divide", sig(Kind::INT, vec![Kind::INT, Kind::INT]), |args| {
        match (&args[0], &args[1]) {
            (_, Value::Int(0)) => Err(throw(arithmetic(), "/ by zero")),
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a / b)),
            _ => Err(InvokeError::illegal("divide takes ints")),
        }
    })
}

fn counting(name: &str, hits: &Arc<AtomicUsize>, inner: FunctionHandle) -> FunctionHandle {
    let hits = Arc::clone(hits);
    FunctionHandle::native(name, inner.signature().clone(), move |args| {
        hits.fetch_add(1, Ordering::SeqCst);
        inner.invoke_exact(args)
    })
}

/// `max(n, 0)` built from a guard with a constant fallback.
fn clamp_to_zero() -> FunctionHandle {
    let zero = drop_arguments(&constant(Kind::INT, int(0)).unwrap(), 0, &[Kind::INT]).unwrap();
    guard_with_test(&is_positive(), &identity(Kind::INT).unwrap(), &zero).unwrap()
}

#[test]
fn guarded_fixture_is_pinned() {
    let clamp = clamp_to_zero();
    assert_eq!(clamp.invoke_exact(vec![int(5)]).unwrap(), int(5));
    assert_eq!(clamp.invoke_exact(vec![int(0)]).unwrap(), int(0));
    assert_eq!(clamp.invoke_exact(vec![int(-5)]).unwrap(), int(0));
}

#[test]
fn guard_runs_exactly_one_branch() {
    let taken = Arc::new(AtomicUsize::new(0));
    let skipped = Arc::new(AtomicUsize::new(0));
    let positive = counting("positive", &taken, negate());
    let other = counting("other", &skipped, double());
    let guarded = guard_with_test(&is_positive(), &positive, &other).unwrap();

    for n in [3, -3, 1, 0, -1] {
        guarded.invoke_exact(vec![int(n)]).unwrap();
    }
    assert_eq!(taken.load(Ordering::SeqCst), 2);
    assert_eq!(skipped.load(Ordering::SeqCst), 3);
    assert_eq!(guarded.invoke_exact(vec![int(4)]).unwrap(), int(-4));
    assert_eq!(guarded.invoke_exact(vec![int(-4)]).unwrap(), int(-8));
}

#[test]
fn catch_recovers_matching_throwables() {
    let fallback = FunctionHandle::native(
        "fallback",
        sig(Kind::INT, vec![Kind::THROWABLE, Kind::INT]),
        |args| Ok(Value::Int(args[1].as_int().unwrap_or(0) * 1000)),
    );
    let safe = catch_exception(&divide(), &RefType::Class(arithmetic()), &fallback).unwrap();
    assert_eq!(safe.invoke_exact(vec![int(9), int(3)]).unwrap(), int(3));
    assert_eq!(safe.invoke_exact(vec![int(9), int(0)]).unwrap(), int(9000));
}

#[test]
fn catch_passes_other_failures_through() {
    let npe = FunctionHandle::native("npe", sig(Kind::INT, vec![Kind::INT]), |_| {
        Err(throw(null_pointer(), "boom"))
    });
    let handler = FunctionHandle::native("handler", sig(Kind::INT, vec![Kind::THROWABLE]), |_| {
        Ok(Value::Int(0))
    });
    let guarded = catch_exception(&npe, &RefType::Class(arithmetic()), &handler).unwrap();
    let err = guarded.invoke_exact(vec![int(1)]).unwrap_err();
    assert_eq!(err.thrown().unwrap().class.name.as_ref(), "NullPointerException");

    assert!(matches!(
        catch_exception(&npe, &RefType::String, &handler),
        Err(InvokeError::IllegalArgument(_))
    ));
}

#[test]
fn finally_runs_once_on_both_paths() {
    let runs = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(Mutex::new(Vec::new()));
    let cleanup = {
        let runs = Arc::clone(&runs);
        let failures = Arc::clone(&failures);
        FunctionHandle::native(
            "cleanup",
            sig(Kind::INT, vec![Kind::THROWABLE, Kind::INT]),
            move |args| {
                runs.fetch_add(1, Ordering::SeqCst);
                if let Value::Error(throwable) = &args[0] {
                    failures.lock().push(throwable.class.name.to_string());
                }
                Ok(args[1].clone())
            },
        )
    };
    let guarded = try_finally(&divide(), &cleanup).unwrap();

    assert_eq!(guarded.invoke_exact(vec![int(8), int(2)]).unwrap(), int(4));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    let err = guarded.invoke_exact(vec![int(8), int(0)]).unwrap_err();
    assert_eq!(err.thrown().unwrap().class.name.as_ref(), "ArithmeticException");
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let err = guarded
        .invoke_exact(vec![int(8), Value::Long(2)])
        .unwrap_err();
    assert!(matches!(err, InvokeError::SignatureMismatch { .. }));
    // exact-arity rejection happens before the body runs
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(*failures.lock(), vec!["ArithmeticException".to_string()]);
}

#[test]
fn finally_sees_non_throwable_failures_as_invocation_failures() {
    let failures = Arc::new(Mutex::new(Vec::new()));
    let cleanup = {
        let failures = Arc::clone(&failures);
        FunctionHandle::native(
            "cleanup",
            sig(Kind::INT, vec![Kind::THROWABLE, Kind::INT]),
            move |args| {
                if let Value::Error(throwable) = &args[0] {
                    failures.lock().push(throwable.class.name.to_string());
                }
                Ok(args[1].clone())
            },
        )
    };
    let broken = FunctionHandle::native("broken", sig(Kind::INT, vec![]), |_| {
        Err(InvokeError::illegal("state lost"))
    });
    let guarded = try_finally(&broken, &cleanup).unwrap();
    let err = guarded.invoke_exact(vec![]).unwrap_err();
    assert!(matches!(err, InvokeError::IllegalArgument(_)));
    assert_eq!(*failures.lock(), vec!["InvocationFailure".to_string()]);
}

#[test]
fn fatal_errors_skip_cleanup() {
    let runs = Arc::new(AtomicUsize::new(0));
    let cleanup = {
        let runs = Arc::clone(&runs);
        FunctionHandle::native("cleanup", sig(Kind::VOID, vec![Kind::THROWABLE]), move |_| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Void)
        })
    };
    let doomed = FunctionHandle::native("doomed", sig(Kind::VOID, vec![]), |_| {
        Err(InvokeError::Fatal("out of memory".into()))
    });
    let guarded = try_finally(&doomed, &cleanup).unwrap();
    assert!(guarded.invoke_exact(vec![]).unwrap_err().is_fatal());
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn cleanup_failure_replaces_the_outcome() {
    let cleanup = FunctionHandle::native(
        "cleanup",
        sig(Kind::INT, vec![Kind::THROWABLE, Kind::INT]),
        |_| Err(throw(null_pointer(), "cleanup broke")),
    );
    let guarded = try_finally(&divide(), &cleanup).unwrap();
    let err = guarded.invoke_exact(vec![int(1), int(0)]).unwrap_err();
    let thrown = err.thrown().unwrap();
    assert_eq!(thrown.message, "cleanup broke");
    let suppressed = thrown.suppressed();
    assert_eq!(suppressed.len(), 1);
    assert_eq!(suppressed[0].class.name.as_ref(), "ArithmeticException");
    assert_eq!(suppressed[0].message, "/ by zero");

    // on the normal path nothing is suppressed
    let err = guarded.invoke_exact(vec![int(4), int(2)]).unwrap_err();
    assert!(err.thrown().unwrap().suppressed().is_empty());
}

#[test]
fn finally_validates_cleanup_shape() {
    let wrong = FunctionHandle::native("wrong", sig(Kind::INT, vec![Kind::INT]), |_| Ok(Value::Int(0)));
    assert!(matches!(
        try_finally(&divide(), &wrong),
        Err(InvokeError::CombinatorTypeMismatch { .. })
    ));
}
