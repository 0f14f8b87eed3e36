//! Value-level conversions backing the static conversion predicates.
use crate::{
    diagnostics::InvokeError,
    runtime::value::Value,
    signature::{Kind, Prim, RefType, conversion::box_target},
};

/// Zero value of a kind: `0`, `false`, `null`, or `Void`.
pub fn zero_value(kind: &Kind) -> Value {
    match kind {
        Kind::Void => Value::Void,
        Kind::Ref(_) => Value::Null,
        Kind::Prim(p) => match p {
            Prim::Bool => Value::Bool(false),
            Prim::Byte => Value::Byte(0),
            Prim::Short => Value::Short(0),
            Prim::Char => Value::Char(0),
            Prim::Int => Value::Int(0),
            Prim::Long => Value::Long(0),
            Prim::Float => Value::Float(0.0),
            Prim::Double => Value::Double(0.0),
        },
    }
}

/// Converts `value`, statically of kind `from`, into kind `to`.
///
/// Callers only request conversions accepted by
/// [`is_convertible_to`](crate::signature::is_convertible_to); the dynamic
/// checks here cover casts and unboxing that can only be decided per value.
pub fn convert(value: Value, from: &Kind, to: &Kind) -> Result<Value, InvokeError> {
    if from == to {
        return Ok(value);
    }
    match (from, to) {
        (_, Kind::Void) => Ok(Value::Void),
        (Kind::Void, _) => Ok(zero_value(to)),
        (Kind::Prim(_), Kind::Prim(q)) => widen(value, *q),
        (Kind::Prim(p), Kind::Ref(target)) => match box_target(*p, target) {
            Some(q) => widen(value, q),
            None => Err(cast_error(&value, to)),
        },
        (Kind::Ref(_), Kind::Prim(q)) => unbox(value, *q),
        (Kind::Ref(_), Kind::Ref(target)) => check_cast(value, target),
    }
}

/// Checks that a reference value is `null` or an instance of `target`.
pub fn check_cast(value: Value, target: &RefType) -> Result<Value, InvokeError> {
    match value.ref_type() {
        None if matches!(value, Value::Null) => Ok(value),
        Some(actual) if actual.is_subtype_of(target) => Ok(value),
        _ => Err(cast_error(&value, &Kind::Ref(target.clone()))),
    }
}

/// Unboxes a reference value into `prim`, widening when needed.
pub fn unbox(value: Value, prim: Prim) -> Result<Value, InvokeError> {
    match value.prim() {
        Some(actual) if actual.widens_to(prim) => widen(value, prim),
        _ => Err(cast_error(&value, &Kind::Prim(prim))),
    }
}

/// Widens a primitive value to `to`. The value's own kind must widen to it.
pub fn widen(value: Value, to: Prim) -> Result<Value, InvokeError> {
    if value.prim() == Some(to) {
        return Ok(value);
    }
    let converted = match (&value, to) {
        (Value::Byte(v), Prim::Short) => Value::Short(i16::from(*v)),
        (Value::Byte(v), Prim::Int) => Value::Int(i32::from(*v)),
        (Value::Byte(v), Prim::Long) => Value::Long(i64::from(*v)),
        (Value::Byte(v), Prim::Float) => Value::Float(f32::from(*v)),
        (Value::Byte(v), Prim::Double) => Value::Double(f64::from(*v)),
        (Value::Short(v), Prim::Int) => Value::Int(i32::from(*v)),
        (Value::Short(v), Prim::Long) => Value::Long(i64::from(*v)),
        (Value::Short(v), Prim::Float) => Value::Float(f32::from(*v)),
        (Value::Short(v), Prim::Double) => Value::Double(f64::from(*v)),
        (Value::Char(v), Prim::Int) => Value::Int(i32::from(*v)),
        (Value::Char(v), Prim::Long) => Value::Long(i64::from(*v)),
        (Value::Char(v), Prim::Float) => Value::Float(f32::from(*v)),
        (Value::Char(v), Prim::Double) => Value::Double(f64::from(*v)),
        (Value::Int(v), Prim::Long) => Value::Long(i64::from(*v)),
        (Value::Int(v), Prim::Float) => Value::Float(*v as f32),
        (Value::Int(v), Prim::Double) => Value::Double(f64::from(*v)),
        (Value::Long(v), Prim::Float) => Value::Float(*v as f32),
        (Value::Long(v), Prim::Double) => Value::Double(*v as f64),
        (Value::Float(v), Prim::Double) => Value::Double(f64::from(*v)),
        _ => return Err(cast_error(&value, &Kind::Prim(to))),
    };
    Ok(converted)
}

/// Checks an argument of an exact invocation against its declared kind.
///
/// Primitive slots need a value of exactly that primitive kind; reference
/// slots accept `null` or any instance of the declared type.
pub fn conforms(value: &Value, kind: &Kind) -> bool {
    match kind {
        Kind::Void => matches!(value, Value::Void),
        Kind::Prim(p) => value.prim() == Some(*p),
        Kind::Ref(target) => match value.ref_type() {
            Some(actual) => actual.is_subtype_of(target),
            None => matches!(value, Value::Null),
        },
    }
}

/// Coerces a bound constant into a declared parameter kind.
///
/// Primitive values are widened (unboxing first when the slot is primitive);
/// references are cast-checked. Used eagerly when arguments are bound.
pub fn coerce(value: Value, kind: &Kind) -> Result<Value, InvokeError> {
    match kind {
        Kind::Void => Err(InvokeError::illegal("cannot bind a value to a void slot")),
        Kind::Prim(p) => unbox(value, *p),
        Kind::Ref(target) => match (value.prim(), target) {
            (Some(prim), _) => match box_target(prim, target) {
                Some(q) => widen(value, q),
                None => Err(cast_error(&value, kind)),
            },
            (None, _) => check_cast(value, target),
        },
    }
}

pub(crate) fn cast_error(value: &Value, to: &Kind) -> InvokeError {
    let from = match value.ref_type() {
        Some(actual) => actual.to_string(),
        None => value.type_name(),
    };
    InvokeError::ClassCast {
        from,
        to: to.to_string(),
    }
}
