//! Basic handle factories.
use crate::{
    diagnostics::InvokeError,
    handle::{
        FunctionHandle,
        form::{FormBuilder, Step},
    },
    runtime::{
        convert::{cast_error, coerce, zero_value},
        exceptions::{index_out_of_bounds, null_pointer, throw},
        value::Value,
    },
    signature::{Kind, RefType, Signature},
};

/// `(kind) -> kind` returning its argument.
pub fn identity(kind: Kind) -> Result<FunctionHandle, InvokeError> {
    let signature = Signature::make(kind.clone(), vec![kind.clone()])?;
    let form = FormBuilder::new(1).finish(Some(0), &kind);
    Ok(FunctionHandle::new(signature, form))
}

/// `() -> kind` returning `value`, coerced to `kind` eagerly.
pub fn constant(kind: Kind, value: Value) -> Result<FunctionHandle, InvokeError> {
    let value = coerce(value, &kind)?;
    let signature = Signature::make(kind.clone(), Vec::new())?;
    let mut b = FormBuilder::new(0);
    let slot = b.push(kind.clone(), Step::Const(value));
    Ok(FunctionHandle::new(signature, b.finish(Some(slot), &kind)))
}

/// `() -> kind` returning the zero value of `kind`.
pub fn zero(kind: Kind) -> Result<FunctionHandle, InvokeError> {
    Ok(empty(Signature::make(kind, Vec::new())?))
}

/// Handle of `signature` ignoring its arguments and returning the zero
/// value of the return kind.
pub fn empty(signature: Signature) -> FunctionHandle {
    let ret = signature.return_kind().clone();
    let mut b = FormBuilder::new(signature.arity());
    let slot = b.push(ret.clone(), Step::Const(zero_value(&ret)));
    let form = b.finish(Some(slot), &ret);
    FunctionHandle::new(signature, form)
}

/// `(exception) -> ret` throwing its argument.
pub fn throw_exception(ret: Kind, exception: RefType) -> Result<FunctionHandle, InvokeError> {
    if !exception.is_throwable() {
        return Err(InvokeError::illegal(format!("{} is not throwable", exception)));
    }
    let signature = Signature::make(ret, vec![Kind::Ref(exception)])?;
    Ok(FunctionHandle::native("throw", signature, |args| {
        match args.into_iter().next() {
            Some(Value::Error(throwable)) => Err(InvokeError::Thrown(throwable)),
            Some(Value::Null) | None => Err(throw(null_pointer(), "thrown value is null")),
            Some(other) => Err(cast_error(&other, &Kind::THROWABLE)),
        }
    }))
}

fn element_of(array_kind: &Kind) -> Result<Kind, InvokeError> {
    array_kind
        .array_element()
        .cloned()
        .ok_or_else(|| InvokeError::illegal(format!("{} is not an array kind", array_kind)))
}

/// `(array, int) -> element`.
pub fn array_element_getter(array_kind: Kind) -> Result<FunctionHandle, InvokeError> {
    let element = element_of(&array_kind)?;
    let signature = Signature::make(element, vec![array_kind, Kind::INT])?;
    Ok(FunctionHandle::native("array_get", signature, |args| {
        match (&args[0], &args[1]) {
            (Value::Array(array), Value::Int(index)) => usize::try_from(*index)
                .ok()
                .and_then(|i| array.items.get(i))
                .cloned()
                .ok_or_else(|| {
                    throw(
                        index_out_of_bounds(),
                        format!("index {} out of bounds for length {}", index, array.len()),
                    )
                }),
            (Value::Null, _) => Err(throw(null_pointer(), "array is null")),
            (other, _) => Err(cast_error(other, &Kind::array_of(Kind::OBJECT))),
        }
    }))
}

/// `(array) -> int`.
pub fn array_length(array_kind: Kind) -> Result<FunctionHandle, InvokeError> {
    element_of(&array_kind)?;
    let signature = Signature::make(Kind::INT, vec![array_kind])?;
    Ok(FunctionHandle::native("array_length", signature, |args| {
        match &args[0] {
            Value::Array(array) => Ok(Value::Int(array.len() as i32)),
            Value::Null => Err(throw(null_pointer(), "array is null")),
            other => Err(cast_error(other, &Kind::array_of(Kind::OBJECT))),
        }
    }))
}
