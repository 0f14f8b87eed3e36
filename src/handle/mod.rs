//! Function handles: immutable, signature-typed callables.
//!
//! A handle pairs a [`Signature`] with a shared [`Form`] (its step program).
//! Adapters never mutate a handle; they build a new form whose steps call the
//! handles they wrap. Handles compare by identity.
use std::{
    fmt,
    sync::{Arc, Weak},
};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::{
    combinators,
    diagnostics::InvokeError,
    runtime::{
        convert::{cast_error, conforms},
        native::NativeFunction,
        value::Value,
    },
    signature::{Kind, Signature, is_convertible_to, is_viewable_as},
};

pub mod factory;
pub mod form;
pub mod leaf;

pub use factory::{
    array_element_getter, array_length, constant, empty, identity, throw_exception, zero,
};
pub use form::Form;
pub use leaf::LeafAction;

use form::{FormBuilder, Step};

struct HandleInner {
    signature: Signature,
    form: Arc<Form>,
    variable_arity: bool,
    /// Last `as_type` adapter. Weak: the adapter owns this handle.
    as_type_memo: RwLock<Option<Weak<HandleInner>>>,
}

/// An immutable, invocable value with a known signature.
#[derive(Clone)]
pub struct FunctionHandle(Arc<HandleInner>);

impl FunctionHandle {
    pub(crate) fn new(signature: Signature, form: Arc<Form>) -> Self {
        debug_assert_eq!(signature.arity(), form.arity());
        Self(Arc::new(HandleInner {
            signature,
            form,
            variable_arity: false,
            as_type_memo: RwLock::new(None),
        }))
    }

    /// Handle whose program is a single leaf over all of its arguments.
    pub fn from_leaf(signature: Signature, action: LeafAction) -> Self {
        let arity = signature.arity();
        let mut b = FormBuilder::new(arity);
        let args = b.args(0..arity);
        let result = b.push(signature.return_kind().clone(), Step::Leaf { action, args });
        let form = b.finish(Some(result), signature.return_kind());
        Self::new(signature, form)
    }

    /// Handle calling a host closure.
    ///
    /// ```
    /// use invoke::{FunctionHandle, Kind, Signature, Value};
    ///
    /// let sig = Signature::make(Kind::INT, vec![Kind::INT, Kind::INT]).unwrap();
    /// let add = FunctionHandle::native("add", sig, |args| match (&args[0], &args[1]) {
    ///     (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
    ///     _ => Ok(Value::Int(0)),
    /// });
    /// assert_eq!(add.invoke_exact(vec![Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
    /// ```
    pub fn native<F>(name: &str, signature: Signature, func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        Self::from_leaf(signature, LeafAction::Static(NativeFunction::new(name, func)))
    }

    pub fn signature(&self) -> &Signature {
        &self.0.signature
    }

    pub fn arity(&self) -> usize {
        self.0.signature.arity()
    }

    pub fn is_variable_arity(&self) -> bool {
        self.0.variable_arity
    }

    pub fn form(&self) -> &Form {
        &self.0.form
    }

    pub fn ptr_eq(&self, other: &FunctionHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Runs the program without checking arguments.
    pub(crate) fn call(&self, args: Vec<Value>) -> Result<Value, InvokeError> {
        self.0.form.run(args)
    }

    /// Invokes with arguments that must match the signature exactly.
    ///
    /// Primitive arguments must carry exactly the declared primitive kind;
    /// reference arguments must be `null` or instances of the declared type.
    /// Failures raised by the program propagate unmodified.
    pub fn invoke_exact(&self, args: Vec<Value>) -> Result<Value, InvokeError> {
        self.check_exact(&args)?;
        self.call(args)
    }

    fn check_exact(&self, args: &[Value]) -> Result<(), InvokeError> {
        let signature = self.signature();
        if args.len() != signature.arity() {
            return Err(InvokeError::WrongArgumentCount {
                expected: signature.arity(),
                got: args.len(),
            });
        }
        for (value, kind) in args.iter().zip(signature.params()) {
            if conforms(value, kind) {
                continue;
            }
            return Err(match kind {
                Kind::Prim(_) => InvokeError::SignatureMismatch {
                    expected: signature.clone(),
                    actual: Signature::of_values(signature.return_kind().clone(), args)?,
                },
                _ => cast_error(value, kind),
            });
        }
        Ok(())
    }

    /// Invokes with loose conversion of the arguments.
    ///
    /// The caller signature is derived from the argument values; variable
    /// arity handles collect trailing arguments into their array parameter.
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, InvokeError> {
        if !self.is_variable_arity() && args.len() != self.arity() {
            return Err(InvokeError::WrongArgumentCount {
                expected: self.arity(),
                got: args.len(),
            });
        }
        let caller = Signature::of_values(self.signature().return_kind().clone(), &args)?;
        self.invoke_as(&caller, args)
    }

    /// Invokes as if called through `caller`, converting arguments and the
    /// result between the two signatures.
    pub fn invoke_as(&self, caller: &Signature, args: Vec<Value>) -> Result<Value, InvokeError> {
        let adapted = match self.collected_count(caller)? {
            Some(count) => {
                let array = self.signature().param(self.arity() - 1).clone();
                self.as_collector(&array, count)?.as_type(caller)?
            }
            None => self.as_type(caller)?,
        };
        adapted.invoke_exact(args)
    }

    /// Number of trailing caller arguments a variable arity handle collects,
    /// or `None` when the call passes the array itself.
    fn collected_count(&self, caller: &Signature) -> Result<Option<usize>, InvokeError> {
        if !self.is_variable_arity() {
            return Ok(None);
        }
        let fixed = self.arity() - 1;
        if caller.arity() == self.arity()
            && is_convertible_to(caller.param(fixed), self.signature().param(fixed))
        {
            return Ok(None);
        }
        if caller.arity() < fixed {
            return Err(InvokeError::WrongArgumentCount {
                expected: fixed,
                got: caller.arity(),
            });
        }
        Ok(Some(caller.arity() - fixed))
    }

    /// Adapts this handle to `target` under loose conversion.
    ///
    /// The most recent adapter is memoized: asking again for an equal
    /// signature returns the same handle while it is alive elsewhere.
    pub fn as_type(&self, target: &Signature) -> Result<FunctionHandle, InvokeError> {
        let own = self.signature();
        if own == target {
            return Ok(self.clone());
        }
        if let Some(cached) = self.memoized(target) {
            trace!(from = %own, to = %target, "as_type memo hit");
            return Ok(cached);
        }
        if !own.is_convertible_to(target) {
            return Err(InvokeError::SignatureMismatch {
                expected: target.clone(),
                actual: own.clone(),
            });
        }
        let adapted = if own.is_viewable_as(target, true) {
            FunctionHandle::new(target.clone(), self.0.form.clone())
        } else {
            self.conversion_adapter(target)
        };
        *self.0.as_type_memo.write() = Some(Arc::downgrade(&adapted.0));
        debug!(from = %own, to = %target, "as_type memo miss");
        Ok(adapted)
    }

    fn memoized(&self, target: &Signature) -> Option<FunctionHandle> {
        let memo = self.0.as_type_memo.read();
        let inner = memo.as_ref()?.upgrade()?;
        (inner.signature == *target).then_some(FunctionHandle(inner))
    }

    fn conversion_adapter(&self, target: &Signature) -> FunctionHandle {
        let own = self.signature();
        let mut b = FormBuilder::new(target.arity());
        let args: Vec<_> = own
            .params()
            .iter()
            .zip(target.params())
            .enumerate()
            .map(|(slot, (param, wanted))| b.convert(slot, wanted, param))
            .collect();
        let result = b.push(
            own.return_kind().clone(),
            Step::Call {
                target: self.clone(),
                args,
            },
        );
        let result = b.convert(result, own.return_kind(), target.return_kind());
        FunctionHandle::new(target.clone(), b.finish(Some(result), target.return_kind()))
    }

    /// Re-types this handle where [`is_viewable_as`] allows it.
    ///
    /// Strict views share the program. Lenient views may widen primitives,
    /// which changes the value representation, so they convert.
    pub fn view_as(&self, target: &Signature, strict: bool) -> Result<FunctionHandle, InvokeError> {
        let own = self.signature();
        if own == target {
            return Ok(self.clone());
        }
        if !own.is_viewable_as(target, strict) {
            return Err(InvokeError::SignatureMismatch {
                expected: target.clone(),
                actual: own.clone(),
            });
        }
        if strict {
            Ok(FunctionHandle::new(target.clone(), self.0.form.clone()))
        } else {
            Ok(self.conversion_adapter(target))
        }
    }

    /// Fixes parameter `pos` to `value`.
    pub fn bind_argument(&self, pos: usize, value: Value) -> Result<FunctionHandle, InvokeError> {
        combinators::insert_arguments(self, pos, vec![value])
    }

    fn with_variable_arity(&self, variable_arity: bool) -> FunctionHandle {
        Self(Arc::new(HandleInner {
            signature: self.0.signature.clone(),
            form: self.0.form.clone(),
            variable_arity,
            as_type_memo: RwLock::new(None),
        }))
    }

    /// Marks the trailing `array_kind` parameter as collecting loose
    /// trailing arguments.
    pub fn as_variable_arity(&self, array_kind: &Kind) -> Result<FunctionHandle, InvokeError> {
        let trailing = self.signature().params().last();
        if array_kind.array_element().is_none() || trailing != Some(array_kind) {
            return Err(InvokeError::illegal(format!(
                "{} does not end with a {} parameter",
                self.signature(),
                array_kind
            )));
        }
        if self.is_variable_arity() {
            return Ok(self.clone());
        }
        Ok(self.with_variable_arity(true))
    }

    pub fn as_fixed_arity(&self) -> FunctionHandle {
        if self.is_variable_arity() {
            self.with_variable_arity(false)
        } else {
            self.clone()
        }
    }

    /// Replaces the trailing `count` parameters by one array parameter whose
    /// elements are spread into them. The array must hold exactly `count`
    /// elements at invocation.
    pub fn as_spreader(&self, array_kind: &Kind, count: usize) -> Result<FunctionHandle, InvokeError> {
        let own = self.signature();
        let element = array_kind
            .array_element()
            .ok_or_else(|| InvokeError::illegal(format!("{} is not an array kind", array_kind)))?;
        if count > own.arity() {
            return Err(InvokeError::illegal(format!(
                "cannot spread {} arguments into {}",
                count, own
            )));
        }
        let start = own.arity() - count;
        let spreader = own.replace_params(start, own.arity(), vec![array_kind.clone()])?;
        for (offset, param) in own.params_from(start).iter().enumerate() {
            if !is_convertible_to(element, param) {
                return Err(InvokeError::mismatch(
                    "as_spreader",
                    format!(
                        "array element {} does not convert to parameter {} ({})",
                        element,
                        start + offset,
                        param
                    ),
                    own,
                    &spreader,
                ));
            }
        }

        let mut b = FormBuilder::new(start + 1);
        let mut args = b.args(0..start);
        for index in 0..count {
            let slot = b.push(
                element.clone(),
                Step::Spread {
                    slot: start,
                    index,
                    length: count,
                },
            );
            args.push(b.convert(slot, element, own.param(start + index)));
        }
        let result = b.push(
            own.return_kind().clone(),
            Step::Call {
                target: self.clone(),
                args,
            },
        );
        let form = b.finish(Some(result), own.return_kind());
        Ok(FunctionHandle::new(spreader, form))
    }

    /// Replaces the trailing array parameter by `count` element parameters
    /// gathered into a fresh array.
    pub fn as_collector(&self, array_kind: &Kind, count: usize) -> Result<FunctionHandle, InvokeError> {
        let own = self.signature();
        let element = array_kind
            .array_element()
            .ok_or_else(|| InvokeError::illegal(format!("{} is not an array kind", array_kind)))?;
        let Some(trailing) = own.params().last() else {
            return Err(InvokeError::illegal(format!(
                "{} has no trailing parameter to collect into",
                own
            )));
        };
        let last = own.arity() - 1;
        let collector = own.replace_params(last, own.arity(), vec![element.clone(); count])?;
        if !is_viewable_as(array_kind, trailing, true) {
            return Err(InvokeError::mismatch(
                "as_collector",
                format!("{} is not assignable to {}", array_kind, trailing),
                own,
                &collector,
            ));
        }

        let mut b = FormBuilder::new(last + count);
        let mut args = b.args(0..last);
        let collected = b.args(last..last + count);
        args.push(b.push(
            array_kind.clone(),
            Step::Collect {
                element: element.clone(),
                args: collected,
            },
        ));
        let result = b.push(
            own.return_kind().clone(),
            Step::Call {
                target: self.clone(),
                args,
            },
        );
        let form = b.finish(Some(result), own.return_kind());
        Ok(FunctionHandle::new(collector, form))
    }

    /// Text rendering of the step program.
    pub fn disassemble(&self) -> String {
        self.0.form.disassemble(self.signature())
    }
}

impl PartialEq for FunctionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_variable_arity() {
            write!(f, "FunctionHandle({}, varargs)", self.signature())
        } else {
            write!(f, "FunctionHandle({})", self.signature())
        }
    }
}
