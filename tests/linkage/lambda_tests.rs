#[path = "../common/fixtures.rs"]
mod fixtures;

use std::sync::Arc;

use fixtures::{add, int, sig};
use invoke::{
    FunctionHandle, InvokeError, Kind, Value,
    diagnostics::LambdaSlot,
    lambda::{LambdaMetafactory, validate},
    linkage::{BootstrapDescriptor, CallPointId, DynamicCallPoint, Linker, LinkerConfig, Lookup, MemberRegistry},
};

fn linker() -> Linker {
    Linker::new(Lookup::new("Main", Arc::new(MemberRegistry::new())), LinkerConfig::default())
}

/// `scale(factor, x) = factor * x`
fn scale() -> FunctionHandle {
    FunctionHandle::native("scale", sig(Kind::INT, vec![Kind::INT, Kind::INT]), |args| {
        Ok(Value::Int(args[0].as_int().unwrap_or(0) * args[1].as_int().unwrap_or(0)))
    })
}

fn unary_interface() -> invoke::Signature {
    sig(Kind::OBJECT, vec![Kind::OBJECT])
}

fn lambda_point(id: u64, captured: Vec<Kind>, implementation: FunctionHandle, instantiated: invoke::Signature) -> DynamicCallPoint {
    let sam = sig(Kind::OBJECT, vec![Kind::OBJECT; instantiated.arity()]);
    DynamicCallPoint::new(
        CallPointId(id),
        BootstrapDescriptor::new(
            "apply",
            sig(Kind::HANDLE, captured),
            LambdaMetafactory::static_args(sam, implementation, instantiated),
        ),
        Arc::new(LambdaMetafactory),
    )
}

#[test]
fn capturing_lambdas_bind_their_captures_first() {
    let linker = linker();
    let point = lambda_point(1, vec![Kind::INT], scale(), sig(Kind::LONG, vec![Kind::INT]));

    let triple = point.invoke(&linker, vec![int(3)]).unwrap();
    let triple = triple.as_handle().unwrap();
    assert_eq!(triple.signature(), &sig(Kind::LONG, vec![Kind::INT]));
    assert_eq!(triple.invoke_exact(vec![int(7)]).unwrap(), Value::Long(21));

    let tenfold = point.invoke(&linker, vec![int(10)]).unwrap();
    assert_eq!(
        tenfold.as_handle().unwrap().invoke_exact(vec![int(7)]).unwrap(),
        Value::Long(70)
    );
    // each capture yields its own instance
    assert!(!triple.ptr_eq(tenfold.as_handle().unwrap()));
}

#[test]
fn non_capturing_lambdas_are_shared() {
    let linker = linker();
    let point = lambda_point(2, vec![], add(), sig(Kind::LONG, vec![Kind::INT, Kind::INT]));
    let first = point.invoke(&linker, vec![]).unwrap();
    let second = point.invoke(&linker, vec![]).unwrap();
    let (first, second) = (first.as_handle().unwrap(), second.as_handle().unwrap());
    assert!(first.ptr_eq(second));
    assert_eq!(first.invoke_exact(vec![int(2), int(3)]).unwrap(), Value::Long(5));
}

#[test]
fn factories_must_return_a_handle() {
    let linker = linker();
    let descriptor = BootstrapDescriptor::new(
        "apply",
        sig(Kind::INT, vec![]),
        LambdaMetafactory::static_args(unary_interface(), scale(), sig(Kind::INT, vec![Kind::INT])),
    );
    match linker.resolve(&descriptor, &LambdaMetafactory).unwrap_err() {
        InvokeError::BootstrapLinkage { cause, .. } => assert!(matches!(
            *cause,
            InvokeError::LambdaShapeMismatch { slot: LambdaSlot::Return, .. }
        )),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn malformed_static_arguments_are_rejected() {
    let linker = linker();
    let descriptor = BootstrapDescriptor::new("apply", sig(Kind::HANDLE, vec![]), vec![int(1)]);
    match linker.resolve(&descriptor, &LambdaMetafactory).unwrap_err() {
        InvokeError::BootstrapLinkage { name, cause } => {
            assert_eq!(name, "apply");
            assert!(matches!(*cause, InvokeError::IllegalArgument(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn captured_kinds_must_match_exactly() {
    let linker = linker();
    let point = lambda_point(3, vec![Kind::LONG], scale(), sig(Kind::INT, vec![Kind::INT]));
    match point.invoke(&linker, vec![Value::Long(2)]).unwrap_err() {
        InvokeError::BootstrapLinkage { cause, .. } => {
            assert!(matches!(
                *cause,
                InvokeError::LambdaShapeMismatch { slot: LambdaSlot::Captured(0), .. }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(linker.linked(CallPointId(3)).is_none());
}

#[test]
fn validation_is_available_without_linking() {
    let instantiated = sig(Kind::INT, vec![Kind::SHORT]);
    assert!(validate(&[Kind::INT], &unary_interface(), &scale(), &instantiated).is_ok());
    let err = validate(&[Kind::INT], &unary_interface(), &scale(), &sig(Kind::INT, vec![Kind::STRING])).unwrap_err();
    assert!(matches!(
        err,
        InvokeError::LambdaShapeMismatch { slot: LambdaSlot::Parameter(0), .. }
    ));
    assert_eq!(
        err.to_string(),
        "lambda shape mismatch at parameter 0: String is not convertible to int"
    );
}
