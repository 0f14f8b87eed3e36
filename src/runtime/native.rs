use std::{fmt, sync::Arc};

use crate::{diagnostics::InvokeError, runtime::value::Value};

/// Host callback executed by a leaf step.
pub type NativeFn = dyn Fn(Vec<Value>) -> Result<Value, InvokeError> + Send + Sync;

/// Named host function: the opaque "raw action" at the bottom of every handle.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: Arc<str>,
    pub func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, InvokeError> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}
