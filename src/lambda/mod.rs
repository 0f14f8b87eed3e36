//! Functional-interface shape validation and the lambda metafactory.
//!
//! A lambda is an implementation handle whose leading parameters are filled
//! by values captured at the creation site; the remaining parameters are
//! supplied through the interface method. [`validate`] checks that the
//! pieces fit before any adapter is built.
use tracing::debug;

use crate::{
    callsite::CallSite,
    combinators::insert_arguments,
    diagnostics::{InvokeError, LambdaSlot},
    handle::FunctionHandle,
    linkage::{BootstrapMethod, Lookup},
    runtime::value::Value,
    signature::{Kind, RefType, Signature, is_convertible_to},
};

fn shape_error(slot: LambdaSlot, detail: String) -> InvokeError {
    InvokeError::LambdaShapeMismatch { slot, detail }
}

/// Checks that `implementation`, fed `captured` values followed by the
/// interface arguments, can stand behind the interface method `sam` at the
/// `instantiated` signature.
pub fn validate(
    captured: &[Kind],
    sam: &Signature,
    implementation: &FunctionHandle,
    instantiated: &Signature,
) -> Result<(), InvokeError> {
    let imp = implementation.signature();
    let captured_arity = captured.len();

    if imp.arity() != captured_arity + sam.arity() {
        return Err(shape_error(
            LambdaSlot::Arity,
            format!(
                "implementation {} takes {} arguments, {} captured plus {} supplied",
                imp,
                imp.arity(),
                captured_arity,
                sam.arity()
            ),
        ));
    }
    if instantiated.arity() != sam.arity() {
        return Err(shape_error(
            LambdaSlot::InstantiatedArity,
            format!("instantiated {} does not match interface {}", instantiated, sam),
        ));
    }
    for (i, kind) in captured.iter().enumerate() {
        if kind != imp.param(i) {
            return Err(shape_error(
                LambdaSlot::Captured(i),
                format!("captured {} where the implementation takes {}", kind, imp.param(i)),
            ));
        }
    }
    for (i, supplied) in instantiated.params().iter().enumerate() {
        let wanted = imp.param(captured_arity + i);
        if !is_convertible_to(supplied, wanted) {
            return Err(shape_error(
                LambdaSlot::Parameter(i),
                format!("{} is not convertible to {}", supplied, wanted),
            ));
        }
    }

    let ret = instantiated.return_kind();
    if !ret.is_void() {
        if imp.returns_void() {
            return Err(shape_error(
                LambdaSlot::Return,
                format!("implementation returns void, {} expected", ret),
            ));
        }
        if !is_convertible_to(imp.return_kind(), ret) {
            return Err(shape_error(
                LambdaSlot::Return,
                format!("{} is not convertible to {}", imp.return_kind(), ret),
            ));
        }
    }
    Ok(())
}

/// Bootstrap method producing lambda factories.
///
/// Static arguments are `[Signature(sam), Handle(implementation),
/// Signature(instantiated)]`. The call site's parameters are the captured
/// kinds and its return kind must accept a handle. Invoking the linked site
/// with the captured values yields a `Value::Handle` of the instantiated
/// signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct LambdaMetafactory;

impl LambdaMetafactory {
    pub fn static_args(sam: Signature, implementation: FunctionHandle, instantiated: Signature) -> Vec<Value> {
        vec![
            Value::Signature(sam),
            Value::Handle(implementation),
            Value::Signature(instantiated),
        ]
    }

    fn unpack(static_args: &[Value]) -> Result<(&Signature, &FunctionHandle, &Signature), InvokeError> {
        match static_args {
            [Value::Signature(sam), Value::Handle(implementation), Value::Signature(instantiated)] => {
                Ok((sam, implementation, instantiated))
            }
            _ => Err(InvokeError::illegal(format!(
                "lambda bootstrap expects (Signature, Handle, Signature), got {} arguments",
                static_args.len()
            ))),
        }
    }
}

impl BootstrapMethod for LambdaMetafactory {
    fn bootstrap(
        &self,
        lookup: &Lookup,
        name: &str,
        signature: &Signature,
        static_args: &[Value],
    ) -> Result<Value, InvokeError> {
        let (sam, implementation, instantiated) = Self::unpack(static_args)?;
        let returns_handle = matches!(
            signature.return_kind(),
            Kind::Ref(target) if RefType::Handle.is_subtype_of(target)
        );
        if !returns_handle {
            return Err(shape_error(
                LambdaSlot::Return,
                format!("factory {} cannot return a handle", signature),
            ));
        }
        validate(signature.params(), sam, implementation, instantiated)?;
        debug!(call_point = name, factory = %signature, implementation = %implementation.signature(), "lambda factory linked");

        let target = if signature.arity() == 0 {
            let instance = implementation.as_type(instantiated)?;
            lookup.constant(signature.return_kind(), Value::Handle(instance))?
        } else {
            let implementation = implementation.clone();
            let instantiated = instantiated.clone();
            FunctionHandle::native(name, signature.clone(), move |captured| {
                let bound = insert_arguments(&implementation, 0, captured)?;
                Ok(Value::Handle(bound.as_type(&instantiated)?))
            })
        };
        Ok(Value::CallSite(CallSite::constant(target)))
    }
}
