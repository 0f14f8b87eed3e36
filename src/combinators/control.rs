//! Branching and exception-handling combinators.
use std::sync::Arc;

use crate::{
    diagnostics::InvokeError,
    handle::{
        FunctionHandle,
        form::{FormBuilder, Step},
    },
    runtime::{
        convert::zero_value,
        exceptions::as_throwable,
        value::Value,
    },
    signature::{Kind, RefType, Signature},
};

fn build(signature: &Signature, step: Step) -> FunctionHandle {
    let ret = signature.return_kind();
    let mut b = FormBuilder::new(signature.arity());
    let result = b.push(ret.clone(), step);
    FunctionHandle::new(signature.clone(), b.finish(Some(result), ret))
}

/// `if test(prefix) { target(args) } else { fallback(args) }`.
///
/// `target` and `fallback` must share one signature; `test` returns
/// `boolean` and takes a prefix of its parameters.
pub fn guard_with_test(
    test: &FunctionHandle,
    target: &FunctionHandle,
    fallback: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let signature = target.signature();
    if fallback.signature() != signature {
        return Err(InvokeError::mismatch(
            "guard_with_test",
            "target and fallback signatures differ",
            signature,
            fallback.signature(),
        ));
    }
    let test_sig = test.signature();
    if test_sig.return_kind() != &Kind::BOOL {
        return Err(InvokeError::mismatch(
            "guard_with_test",
            "test does not return boolean",
            signature,
            test_sig,
        ));
    }
    if !signature.has_param_prefix(test_sig.params()) {
        return Err(InvokeError::mismatch(
            "guard_with_test",
            "test parameters are not a prefix of the target parameters",
            signature,
            test_sig,
        ));
    }
    Ok(build(
        signature,
        Step::Guard {
            test: test.clone(),
            target: target.clone(),
            fallback: fallback.clone(),
            args: (0..signature.arity()).collect(),
        },
    ))
}

pub(crate) fn run_guard(
    test: &FunctionHandle,
    target: &FunctionHandle,
    fallback: &FunctionHandle,
    args: Vec<Value>,
) -> Result<Value, InvokeError> {
    let outcome = test.call(args[..test.arity()].to_vec())?;
    if outcome.as_bool().unwrap_or(false) {
        target.call(args)
    } else {
        fallback.call(args)
    }
}

/// Runs `target`; a thrown `exception` (or subclass) is handed to
/// `handler(exception, prefix...)`, whose result replaces the failure.
pub fn catch_exception(
    target: &FunctionHandle,
    exception: &RefType,
    handler: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    if !exception.is_throwable() {
        return Err(InvokeError::illegal(format!("{} is not throwable", exception)));
    }
    let signature = target.signature();
    let handler_sig = handler.signature();
    if handler_sig.return_kind() != signature.return_kind() {
        return Err(InvokeError::mismatch(
            "catch_exception",
            "handler return kind differs from target",
            signature,
            handler_sig,
        ));
    }
    let accepts = match handler_sig.params().first() {
        Some(Kind::Ref(param)) => exception.is_subtype_of(param),
        _ => false,
    };
    if !accepts {
        return Err(InvokeError::mismatch(
            "catch_exception",
            format!("handler does not accept {}", exception),
            signature,
            handler_sig,
        ));
    }
    if !signature.has_param_prefix(handler_sig.params_from(1)) {
        return Err(InvokeError::mismatch(
            "catch_exception",
            "handler parameters after the exception are not a prefix of the target parameters",
            signature,
            handler_sig,
        ));
    }
    Ok(build(
        signature,
        Step::Catch {
            target: target.clone(),
            exception: exception.clone(),
            handler: handler.clone(),
            args: (0..signature.arity()).collect(),
        },
    ))
}

pub(crate) fn run_catch(
    target: &FunctionHandle,
    exception: &RefType,
    handler: &FunctionHandle,
    args: Vec<Value>,
) -> Result<Value, InvokeError> {
    match target.call(args.clone()) {
        Err(InvokeError::Thrown(throwable)) if throwable.is_instance_of(exception) => {
            let mut handler_args = Vec::with_capacity(handler.arity());
            handler_args.push(Value::Error(throwable));
            handler_args.extend_from_slice(&args[..handler.arity() - 1]);
            handler.call(handler_args)
        }
        outcome => outcome,
    }
}

/// Runs `cleanup(throwable, [result], prefix...)` exactly once after
/// `target`, on both paths.
///
/// On the normal path `throwable` is `null` and the cleanup's result becomes
/// the result. When `target` fails, `result` is the zero value and the
/// original failure is rethrown after cleanup unless cleanup fails itself.
/// Fatal errors skip cleanup.
pub fn try_finally(
    target: &FunctionHandle,
    cleanup: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let signature = target.signature();
    let cleanup_sig = cleanup.signature();
    if cleanup_sig.return_kind() != signature.return_kind() {
        return Err(InvokeError::mismatch(
            "try_finally",
            "cleanup return kind differs from target",
            signature,
            cleanup_sig,
        ));
    }
    let accepts_throwable = match cleanup_sig.params().first() {
        Some(Kind::Ref(param)) => RefType::Throwable.is_subtype_of(param),
        _ => false,
    };
    if !accepts_throwable {
        return Err(InvokeError::mismatch(
            "try_finally",
            "cleanup does not take a throwable first",
            signature,
            cleanup_sig,
        ));
    }
    let mut leading = 1;
    if !signature.returns_void() {
        if cleanup_sig.params().get(1) != Some(signature.return_kind()) {
            return Err(InvokeError::mismatch(
                "try_finally",
                format!("cleanup does not take the {} result second", signature.return_kind()),
                signature,
                cleanup_sig,
            ));
        }
        leading = 2;
    }
    if !signature.has_param_prefix(cleanup_sig.params_from(leading)) {
        return Err(InvokeError::mismatch(
            "try_finally",
            "cleanup trailing parameters are not a prefix of the target parameters",
            signature,
            cleanup_sig,
        ));
    }
    Ok(build(
        signature,
        Step::Finally {
            target: target.clone(),
            cleanup: cleanup.clone(),
            args: (0..signature.arity()).collect(),
        },
    ))
}

pub(crate) fn run_finally(
    target: &FunctionHandle,
    cleanup: &FunctionHandle,
    args: Vec<Value>,
) -> Result<Value, InvokeError> {
    let ret = target.signature().return_kind();
    let outcome = target.call(args.clone());
    let (failure, throwable, result) = match &outcome {
        Err(error) if error.is_fatal() => return outcome,
        Err(error) => {
            let throwable = as_throwable(error);
            (Some(throwable.clone()), Value::Error(throwable), zero_value(ret))
        }
        Ok(value) => (None, Value::Null, value.clone()),
    };
    let mut cleanup_args = Vec::with_capacity(cleanup.arity());
    cleanup_args.push(throwable);
    if !ret.is_void() {
        cleanup_args.push(result);
    }
    let prefix = cleanup.arity() - cleanup_args.len();
    cleanup_args.extend_from_slice(&args[..prefix]);
    let cleaned = match cleanup.call(cleanup_args) {
        Ok(value) => value,
        Err(cleanup_error) => {
            // the failure cleanup replaced stays reachable from the new one
            if let (Some(original), Some(raised)) = (failure, cleanup_error.thrown()) {
                if !Arc::ptr_eq(&original, raised) {
                    raised.add_suppressed(original);
                }
            }
            return Err(cleanup_error);
        }
    };
    match outcome {
        Ok(_) => Ok(cleaned),
        Err(error) => {
            tracing::trace!(%error, "rethrowing after cleanup");
            Err(error)
        }
    }
}
