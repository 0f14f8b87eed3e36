//! Step programs executed by function handles.
//!
//! A [`Form`] is a straight-line register program. Slots `0..arity` hold the
//! incoming arguments; every binding appends one slot holding the value its
//! step produced (`Void` for steps without a value). Forms are immutable once
//! built and shared between handles that view them under different
//! signatures.
use std::{fmt::Write, sync::Arc};

use crate::{
    callsite::CallSite,
    combinators::{control, loops::LoopPlan},
    diagnostics::InvokeError,
    handle::{FunctionHandle, leaf::LeafAction},
    runtime::{
        convert::{self, cast_error},
        value::Value,
    },
    signature::{Kind, RefType, Signature},
};

pub(crate) type Slot = usize;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// A bound constant.
    Const(Value),
    /// Loose conversion of a slot between two kinds.
    Convert { slot: Slot, from: Kind, to: Kind },
    /// Execute a raw action.
    Leaf { action: LeafAction, args: Vec<Slot> },
    /// Invoke another handle with already-typed arguments.
    Call {
        target: FunctionHandle,
        args: Vec<Slot>,
    },
    Guard {
        test: FunctionHandle,
        target: FunctionHandle,
        fallback: FunctionHandle,
        args: Vec<Slot>,
    },
    Catch {
        target: FunctionHandle,
        exception: RefType,
        handler: FunctionHandle,
        args: Vec<Slot>,
    },
    Finally {
        target: FunctionHandle,
        cleanup: FunctionHandle,
        args: Vec<Slot>,
    },
    Loop { plan: Arc<LoopPlan>, args: Vec<Slot> },
    /// Gather slots into a fresh array.
    Collect { element: Kind, args: Vec<Slot> },
    /// Element `index` of an array slot that must hold exactly `length`
    /// elements.
    Spread {
        slot: Slot,
        index: usize,
        length: usize,
    },
    /// Invoke the current target of a call site.
    Dynamic { site: CallSite, args: Vec<Slot> },
}

#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub kind: Kind,
    pub step: Step,
}

/// Immutable step program.
#[derive(Debug)]
pub struct Form {
    arity: usize,
    bindings: Vec<Binding>,
    result: Option<Slot>,
}

impl Form {
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Number of steps after the argument slots.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Executes the program over `args`, whose kinds were checked by the
    /// caller.
    pub(crate) fn run(&self, mut frame: Vec<Value>) -> Result<Value, InvokeError> {
        debug_assert_eq!(frame.len(), self.arity, "form arity");
        frame.reserve(self.bindings.len());
        for binding in &self.bindings {
            let value = eval(binding, &frame)?;
            frame.push(value);
        }
        Ok(match self.result {
            Some(slot) => frame.swap_remove(slot),
            None => Value::Void,
        })
    }

    /// Renders the program one binding per line.
    pub fn disassemble(&self, signature: &Signature) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", signature);
        for (i, binding) in self.bindings.iter().enumerate() {
            let slot = self.arity + i;
            let _ = writeln!(
                out,
                "  {}: {} = {}",
                slot_name(slot, self.arity),
                binding.kind,
                self.describe(&binding.step)
            );
        }
        match self.result {
            Some(slot) => {
                let _ = writeln!(out, "  return {}", slot_name(slot, self.arity));
            }
            None => {
                let _ = writeln!(out, "  return");
            }
        }
        out
    }

    fn describe(&self, step: &Step) -> String {
        let list = |slots: &[Slot]| -> String {
            slots
                .iter()
                .map(|s| slot_name(*s, self.arity))
                .collect::<Vec<_>>()
                .join(", ")
        };
        match step {
            Step::Const(value) => format!("const {}", value),
            Step::Convert { slot, from, to } => {
                format!("convert {} {} -> {}", slot_name(*slot, self.arity), from, to)
            }
            Step::Leaf { action, args } => format!("leaf {}({})", action, list(args)),
            Step::Call { target, args } => format!("call {}({})", target.signature(), list(args)),
            Step::Guard { args, .. } => format!("guard({})", list(args)),
            Step::Catch {
                exception, args, ..
            } => format!("catch {}({})", exception, list(args)),
            Step::Finally { args, .. } => format!("finally({})", list(args)),
            Step::Loop { plan, args } => {
                format!("loop[{} clauses]({})", plan.clause_count(), list(args))
            }
            Step::Collect { element, args } => format!("collect {}[]({})", element, list(args)),
            Step::Spread {
                slot,
                index,
                length,
            } => format!("spread {}[{}/{}]", slot_name(*slot, self.arity), index, length),
            Step::Dynamic { site, args } => {
                format!("dynamic {}({})", site.signature(), list(args))
            }
        }
    }
}

fn slot_name(slot: Slot, arity: usize) -> String {
    if slot < arity {
        format!("a{}", slot)
    } else {
        format!("t{}", slot)
    }
}

fn gather(frame: &[Value], slots: &[Slot]) -> Vec<Value> {
    slots.iter().map(|slot| frame[*slot].clone()).collect()
}

fn eval(binding: &Binding, frame: &[Value]) -> Result<Value, InvokeError> {
    match &binding.step {
        Step::Const(value) => Ok(value.clone()),
        Step::Convert { slot, from, to } => convert::convert(frame[*slot].clone(), from, to),
        Step::Leaf { action, args } => {
            let value = action.invoke(gather(frame, args))?;
            check_leaf_result(action, value, &binding.kind)
        }
        Step::Call { target, args } => target.call(gather(frame, args)),
        Step::Guard {
            test,
            target,
            fallback,
            args,
        } => control::run_guard(test, target, fallback, gather(frame, args)),
        Step::Catch {
            target,
            exception,
            handler,
            args,
        } => control::run_catch(target, exception, handler, gather(frame, args)),
        Step::Finally {
            target,
            cleanup,
            args,
        } => control::run_finally(target, cleanup, gather(frame, args)),
        Step::Loop { plan, args } => plan.run(gather(frame, args)),
        Step::Collect { element, args } => Ok(Value::array(element.clone(), gather(frame, args))),
        Step::Spread {
            slot,
            index,
            length,
        } => spread_element(&frame[*slot], *index, *length),
        Step::Dynamic { site, args } => site.target()?.call(gather(frame, args)),
    }
}

fn check_leaf_result(action: &LeafAction, value: Value, kind: &Kind) -> Result<Value, InvokeError> {
    if kind.is_void() {
        return Ok(Value::Void);
    }
    if convert::conforms(&value, kind) {
        Ok(value)
    } else {
        tracing::warn!(leaf = %action, expected = %kind, got = %value.type_name(), "leaf returned a value of the wrong kind");
        Err(cast_error(&value, kind))
    }
}

fn spread_element(array: &Value, index: usize, length: usize) -> Result<Value, InvokeError> {
    match array {
        Value::Array(items) if items.len() == length => Ok(items.items[index].clone()),
        Value::Array(items) => Err(InvokeError::WrongArgumentCount {
            expected: length,
            got: items.len(),
        }),
        other => Err(cast_error(other, &Kind::array_of(Kind::OBJECT))),
    }
}

/// Incremental builder for [`Form`].
pub(crate) struct FormBuilder {
    arity: usize,
    bindings: Vec<Binding>,
}

impl FormBuilder {
    pub fn new(arity: usize) -> Self {
        Self {
            arity,
            bindings: Vec::new(),
        }
    }

    /// Slots of the incoming arguments in `range`.
    pub fn args(&self, range: std::ops::Range<usize>) -> Vec<Slot> {
        debug_assert!(range.end <= self.arity);
        range.collect()
    }

    pub fn push(&mut self, kind: Kind, step: Step) -> Slot {
        self.bindings.push(Binding { kind, step });
        self.arity + self.bindings.len() - 1
    }

    /// Converts `slot` unless the kinds already agree.
    pub fn convert(&mut self, slot: Slot, from: &Kind, to: &Kind) -> Slot {
        if from == to {
            return slot;
        }
        self.push(
            to.clone(),
            Step::Convert {
                slot,
                from: from.clone(),
                to: to.clone(),
            },
        )
    }

    /// Finishes the program; a `void` result kind discards `result`.
    pub fn finish(self, result: Option<Slot>, ret: &Kind) -> Arc<Form> {
        Arc::new(Form {
            arity: self.arity,
            bindings: self.bindings,
            result: if ret.is_void() { None } else { result },
        })
    }
}
