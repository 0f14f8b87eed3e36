//! Builtin throwable classes raised by leaf actions and combinators.
use std::sync::{Arc, OnceLock};

use crate::{
    diagnostics::InvokeError,
    runtime::value::Throwable,
    signature::{ClassDef, RefType},
};

static RUNTIME_EXCEPTION: OnceLock<Arc<ClassDef>> = OnceLock::new();
static NULL_POINTER: OnceLock<Arc<ClassDef>> = OnceLock::new();
static ARITHMETIC: OnceLock<Arc<ClassDef>> = OnceLock::new();
static INDEX_OUT_OF_BOUNDS: OnceLock<Arc<ClassDef>> = OnceLock::new();
static INVOCATION_FAILURE: OnceLock<Arc<ClassDef>> = OnceLock::new();

/// Root of unchecked failures.
pub fn runtime_exception() -> Arc<ClassDef> {
    RUNTIME_EXCEPTION
        .get_or_init(|| {
            ClassDef::builder("RuntimeException")
                .extends(RefType::Throwable)
                .build()
        })
        .clone()
}

/// Raised when a leaf dereferences `null`.
pub fn null_pointer() -> Arc<ClassDef> {
    NULL_POINTER
        .get_or_init(|| {
            ClassDef::builder("NullPointerException")
                .extends(RefType::Class(runtime_exception()))
                .build()
        })
        .clone()
}

/// Raised by arithmetic leaves (division by zero).
pub fn arithmetic() -> Arc<ClassDef> {
    ARITHMETIC
        .get_or_init(|| {
            ClassDef::builder("ArithmeticException")
                .extends(RefType::Class(runtime_exception()))
                .build()
        })
        .clone()
}

/// Raised by array element access outside the array.
pub fn index_out_of_bounds() -> Arc<ClassDef> {
    INDEX_OUT_OF_BOUNDS
        .get_or_init(|| {
            ClassDef::builder("IndexOutOfBoundsException")
                .extends(RefType::Class(runtime_exception()))
                .build()
        })
        .clone()
}

/// Throwable view of a non-throwable invocation failure (a failed cast, a
/// wrong argument count), handed to cleanup actions.
pub fn invocation_failure() -> Arc<ClassDef> {
    INVOCATION_FAILURE
        .get_or_init(|| {
            ClassDef::builder("InvocationFailure")
                .extends(RefType::Class(runtime_exception()))
                .final_class()
                .build()
        })
        .clone()
}

/// Builds a `Thrown` error of the given class.
pub fn throw(class: Arc<ClassDef>, message: impl Into<String>) -> InvokeError {
    InvokeError::Thrown(Throwable::new(class, message))
}

/// Returns the throwable carried by `error`, synthesizing an
/// `InvocationFailure` for errors that are not throwables.
pub fn as_throwable(error: &InvokeError) -> Arc<Throwable> {
    match error {
        InvokeError::Thrown(throwable) => throwable.clone(),
        other => Throwable::new(invocation_failure(), other.to_string()),
    }
}
