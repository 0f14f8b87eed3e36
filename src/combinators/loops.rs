//! Clause-based loops and the loop shapes derived from them.
//!
//! A loop is a list of clauses, each optionally carrying one variable. The
//! loop frame is the carried variables `V...` in clause order followed by the
//! external parameters `A...` of the loop handle. Every clause function takes
//! a prefix of that frame (`init` a prefix of `A...`).
use std::{fmt, sync::Arc};

use crate::{
    combinators::{collect_arguments, drop_arguments, guard_with_test, permute_arguments},
    diagnostics::InvokeError,
    handle::{
        FunctionHandle, array_element_getter, array_length, constant,
        form::{FormBuilder, Step},
        identity,
    },
    runtime::{convert::zero_value, value::Value},
    signature::{Kind, Signature},
};

/// One loop clause. Missing functions default to: zero initial value,
/// unchanged variable, always true, no finalizer.
#[derive(Debug, Clone, Default)]
pub struct LoopClause {
    pub init: Option<FunctionHandle>,
    pub step: Option<FunctionHandle>,
    pub pred: Option<FunctionHandle>,
    pub fini: Option<FunctionHandle>,
}

impl LoopClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn init(mut self, handle: FunctionHandle) -> Self {
        self.init = Some(handle);
        self
    }

    pub fn step(mut self, handle: FunctionHandle) -> Self {
        self.step = Some(handle);
        self
    }

    pub fn pred(mut self, handle: FunctionHandle) -> Self {
        self.pred = Some(handle);
        self
    }

    pub fn fini(mut self, handle: FunctionHandle) -> Self {
        self.fini = Some(handle);
        self
    }

    fn is_empty(&self) -> bool {
        self.init.is_none() && self.step.is_none() && self.pred.is_none() && self.fini.is_none()
    }

    /// Kind of the carried variable: the step's return, else the init's.
    fn variable_kind(&self) -> Kind {
        self.step
            .as_ref()
            .or(self.init.as_ref())
            .map(|h| h.signature().return_kind().clone())
            .unwrap_or(Kind::Void)
    }

    fn body_functions(&self) -> impl Iterator<Item = &FunctionHandle> {
        [&self.step, &self.pred, &self.fini].into_iter().flatten()
    }
}

/// Validated loop ready to run.
pub(crate) struct LoopPlan {
    clauses: Vec<LoopClause>,
    /// Carried slot of each clause, if its variable is not `void`.
    slots: Vec<Option<usize>>,
    carried: Vec<Kind>,
    /// Clause whose finalizer produces the result.
    result: Option<usize>,
}

impl fmt::Debug for LoopPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopPlan")
            .field("clauses", &self.clauses.len())
            .field("carried", &self.carried)
            .finish()
    }
}

impl LoopPlan {
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn run(&self, args: Vec<Value>) -> Result<Value, InvokeError> {
        let mut frame = Vec::with_capacity(self.carried.len() + args.len());
        for (clause, slot) in self.clauses.iter().zip(&self.slots) {
            let value = match &clause.init {
                Some(init) => init.call(args[..init.arity()].to_vec())?,
                None => Value::Void,
            };
            if let Some(slot) = slot {
                frame.push(match clause.init {
                    Some(_) => value,
                    None => zero_value(&self.carried[*slot]),
                });
            }
        }
        frame.extend(args);

        loop {
            for clause in &self.clauses {
                if let Some(pred) = &clause.pred {
                    let go = pred.call(frame[..pred.arity()].to_vec())?;
                    if !go.as_bool().unwrap_or(false) {
                        return self.finish(&frame);
                    }
                }
            }
            for (clause, slot) in self.clauses.iter().zip(&self.slots) {
                if let Some(step) = &clause.step {
                    let value = step.call(frame[..step.arity()].to_vec())?;
                    if let Some(slot) = slot {
                        frame[*slot] = value;
                    }
                }
            }
        }
    }

    fn finish(&self, frame: &[Value]) -> Result<Value, InvokeError> {
        let mut result = Value::Void;
        for (index, clause) in self.clauses.iter().enumerate() {
            if let Some(fini) = &clause.fini {
                let value = fini.call(frame[..fini.arity()].to_vec())?;
                if self.result == Some(index) {
                    result = value;
                }
            }
        }
        Ok(result)
    }
}

fn frame_signature(ret: Kind, kinds: &[Kind]) -> Result<Signature, InvokeError> {
    Signature::make(ret, kinds.to_vec())
}

/// Builds a loop from clauses.
///
/// All inits run once. Each iteration then checks every predicate in clause
/// order, stopping at the first `false`, and runs every step in clause order,
/// updating carried variables in place. On stop every finalizer runs and the
/// single non-void finalizer result is returned (or nothing).
pub fn loop_clauses(clauses: Vec<LoopClause>) -> Result<FunctionHandle, InvokeError> {
    if clauses.is_empty() {
        return Err(InvokeError::illegal("loop needs at least one clause"));
    }
    if let Some(index) = clauses.iter().position(LoopClause::is_empty) {
        return Err(InvokeError::illegal(format!("loop clause {} is empty", index)));
    }

    let mut carried = Vec::new();
    let mut slots = Vec::with_capacity(clauses.len());
    for clause in &clauses {
        let kind = clause.variable_kind();
        if let (Some(init), Some(step)) = (&clause.init, &clause.step) {
            if init.signature().return_kind() != step.signature().return_kind() {
                return Err(InvokeError::mismatch(
                    "loop",
                    "init and step return different kinds",
                    step.signature(),
                    init.signature(),
                ));
            }
        }
        if kind.is_void() {
            slots.push(None);
        } else {
            slots.push(Some(carried.len()));
            carried.push(kind);
        }
    }

    let outer = outer_parameters(&clauses, &carried)?;
    let mut frame = carried.clone();
    frame.extend(outer.iter().cloned());
    let frame_sig = frame_signature(Kind::Void, &frame)?;

    let mut result = None;
    for (index, clause) in clauses.iter().enumerate() {
        if let Some(init) = &clause.init {
            if !outer.starts_with(init.signature().params()) {
                return Err(InvokeError::mismatch(
                    "loop",
                    format!("clause {} init does not take a prefix of the loop parameters", index),
                    &frame_signature(Kind::Void, &outer)?,
                    init.signature(),
                ));
            }
        }
        for function in clause.body_functions() {
            if !frame.starts_with(function.signature().params()) {
                return Err(InvokeError::mismatch(
                    "loop",
                    format!("clause {} function does not take a prefix of the loop frame", index),
                    &frame_sig,
                    function.signature(),
                ));
            }
        }
        if let Some(pred) = &clause.pred {
            if pred.signature().return_kind() != &Kind::BOOL {
                return Err(InvokeError::mismatch(
                    "loop",
                    format!("clause {} predicate does not return boolean", index),
                    &frame_sig,
                    pred.signature(),
                ));
            }
        }
        if let Some(fini) = &clause.fini {
            if !fini.signature().returns_void() {
                if result.is_some() {
                    return Err(InvokeError::mismatch(
                        "loop",
                        "more than one finalizer returns a value",
                        &frame_sig,
                        fini.signature(),
                    ));
                }
                result = Some(index);
            }
        }
    }

    let ret = match result.and_then(|index| clauses[index].fini.as_ref()) {
        Some(fini) => fini.signature().return_kind().clone(),
        None => Kind::Void,
    };
    let signature = Signature::make(ret.clone(), outer)?;
    let plan = Arc::new(LoopPlan {
        clauses,
        slots,
        carried,
        result,
    });
    let mut b = FormBuilder::new(signature.arity());
    let args = b.args(0..signature.arity());
    let value = b.push(ret.clone(), Step::Loop { plan, args });
    Ok(FunctionHandle::new(signature, b.finish(Some(value), &ret)))
}

/// External loop parameters: the longest init parameter list, or with no
/// init parameters the longest suffix after the carried kinds.
fn outer_parameters(clauses: &[LoopClause], carried: &[Kind]) -> Result<Vec<Kind>, InvokeError> {
    let longest_init = clauses
        .iter()
        .filter_map(|c| c.init.as_ref())
        .map(|h| h.signature().params())
        .max_by_key(|params| params.len())
        .unwrap_or(&[]);
    if !longest_init.is_empty() {
        return Ok(longest_init.to_vec());
    }
    let longest_body = clauses
        .iter()
        .flat_map(LoopClause::body_functions)
        .map(|h| h.signature().params())
        .max_by_key(|params| params.len())
        .unwrap_or(&[]);
    if longest_body.len() <= carried.len() {
        return Ok(Vec::new());
    }
    if !longest_body.starts_with(carried) {
        let carried_sig = frame_signature(Kind::Void, carried)?;
        let body_sig = frame_signature(Kind::Void, longest_body)?;
        return Err(InvokeError::mismatch(
            "loop",
            "loop functions do not start with the carried variables",
            &carried_sig,
            &body_sig,
        ));
    }
    Ok(longest_body[carried.len()..].to_vec())
}

fn int_less_than() -> Result<FunctionHandle, InvokeError> {
    let signature = Signature::make(Kind::BOOL, vec![Kind::INT, Kind::INT])?;
    Ok(FunctionHandle::native("int_less_than", signature, |args| {
        match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
            _ => Ok(Value::Bool(false)),
        }
    }))
}

fn int_increment() -> Result<FunctionHandle, InvokeError> {
    let signature = Signature::make(Kind::INT, vec![Kind::INT])?;
    Ok(FunctionHandle::native("int_increment", signature, |args| {
        Ok(Value::Int(args[0].as_int().unwrap_or(0).wrapping_add(1)))
    }))
}

fn carried_prefix(kind: &Kind) -> Vec<Kind> {
    if kind.is_void() { Vec::new() } else { vec![kind.clone()] }
}

/// `v = init(A...); while pred(v, A...) { v = body(v, A...) }; v`.
pub fn while_loop(
    init: Option<FunctionHandle>,
    pred: FunctionHandle,
    body: FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let kind = body.signature().return_kind().clone();
    let mut clause = LoopClause::new().step(body).pred(pred);
    clause.init = init;
    if !kind.is_void() {
        clause = clause.fini(identity(kind)?);
    }
    loop_clauses(vec![clause])
}

/// Like [`while_loop`] but `body` runs before the first `pred` check.
pub fn do_while_loop(
    init: Option<FunctionHandle>,
    body: FunctionHandle,
    pred: FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let kind = body.signature().return_kind().clone();
    let first = LoopClause::new()
        .init(constant(Kind::BOOL, Value::Bool(true))?)
        .step(constant(Kind::BOOL, Value::Bool(false))?);

    let pred = drop_arguments(&pred, 0, &[Kind::BOOL])?;
    let always = drop_arguments(
        &constant(Kind::BOOL, Value::Bool(true))?,
        0,
        pred.signature().params(),
    )?;
    let checked = guard_with_test(&identity(Kind::BOOL)?, &always, &pred)?;

    let mut clause = LoopClause::new()
        .step(drop_arguments(&body, 0, &[Kind::BOOL])?)
        .pred(checked);
    clause.init = init;
    if !kind.is_void() {
        clause = clause.fini(drop_arguments(&identity(kind)?, 0, &[Kind::BOOL])?);
    }
    loop_clauses(vec![first, clause])
}

/// `for i in 0..iterations(A...) { v = body(v, i, A...) }`.
pub fn counted_loop(
    iterations: FunctionHandle,
    init: Option<FunctionHandle>,
    body: FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    counted_loop_range(constant(Kind::INT, Value::Int(0))?, iterations, init, body)
}

/// `for i in start(A...)..end(A...) { v = body(v, i, A...) }`.
///
/// `body` takes `(V, int, A...)`, or `(int, A...)` when it returns `void`.
/// The end bound is evaluated once.
pub fn counted_loop_range(
    start: FunctionHandle,
    end: FunctionHandle,
    init: Option<FunctionHandle>,
    body: FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    for bound in [&start, &end] {
        if bound.signature().return_kind() != &Kind::INT {
            return Err(InvokeError::mismatch(
                "counted_loop",
                "loop bounds must return int",
                body.signature(),
                bound.signature(),
            ));
        }
    }
    let kind = body.signature().return_kind().clone();
    let value = carried_prefix(&kind);
    let counter_pos = 1 + value.len();
    let mut expected = value.clone();
    expected.push(Kind::INT);
    if !body.signature().has_param_prefix(&expected) {
        return Err(InvokeError::mismatch(
            "counted_loop",
            "body must take the loop variable and the counter first",
            &frame_signature(kind.clone(), &expected)?,
            body.signature(),
        ));
    }

    // frame: (limit, [v], i, A...)
    let mut counter_frame = vec![Kind::INT];
    counter_frame.extend(value.iter().cloned());
    counter_frame.push(Kind::INT);
    let less = permute_arguments(
        &int_less_than()?,
        &frame_signature(Kind::BOOL, &counter_frame)?,
        &[counter_pos, 0],
    )?;
    let mut skipped = vec![Kind::INT];
    skipped.extend(value.iter().cloned());
    let increment = drop_arguments(&int_increment()?, 0, &skipped)?;

    let limit = LoopClause::new().init(end);
    let mut accumulate = LoopClause::new().step(drop_arguments(&body, 0, &[Kind::INT])?);
    accumulate.init = init;
    if !kind.is_void() {
        accumulate = accumulate.fini(drop_arguments(&identity(kind)?, 0, &[Kind::INT])?);
    }
    let counter = LoopClause::new().init(start).step(increment).pred(less);
    loop_clauses(vec![limit, accumulate, counter])
}

/// `for e in array { v = body(v, e, A...) }` where the array is the first
/// loop parameter.
///
/// `body` takes `(V, T, A...)`, or `(T, A...)` when it returns `void`.
pub fn iterated_loop(
    array_kind: &Kind,
    init: Option<FunctionHandle>,
    body: FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    if array_kind.array_element().is_none() {
        return Err(InvokeError::illegal(format!("{} is not an array kind", array_kind)));
    }
    let body_sig = body.signature().clone();
    let kind = body_sig.return_kind().clone();
    let value = carried_prefix(&kind);
    let element_pos = value.len();
    if body_sig.arity() <= element_pos || !body_sig.has_param_prefix(&value) {
        return Err(InvokeError::mismatch(
            "iterated_loop",
            "body must take the loop variable and the element first",
            &frame_signature(kind.clone(), &value)?,
            &body_sig,
        ));
    }
    let element = body_sig.param(element_pos).clone();
    let getter = array_element_getter(array_kind.clone())?.as_type(&Signature::make(
        element,
        vec![array_kind.clone(), Kind::INT],
    )?)?;

    // body over (V?, array, int, A'...) then reordered to (V?, int, array, A'...)
    let fetched = collect_arguments(&body, element_pos, &getter)?;
    let mut reorder: Vec<usize> = (0..fetched.arity()).collect();
    reorder.swap(element_pos, element_pos + 1);
    let mut stepped = value.clone();
    stepped.push(Kind::INT);
    stepped.push(array_kind.clone());
    stepped.extend(body_sig.params_from(element_pos + 1).iter().cloned());
    let step = permute_arguments(&fetched, &frame_signature(kind.clone(), &stepped)?, &reorder)?;

    let in_bounds = collect_arguments(&int_less_than()?, 1, &array_length(array_kind.clone())?)?;
    let in_bounds = drop_arguments(&in_bounds, 0, &value)?;
    let increment = drop_arguments(&int_increment()?, 0, &value)?;

    let mut accumulate = LoopClause::new().step(step);
    accumulate.init = init;
    if !kind.is_void() {
        accumulate = accumulate.fini(identity(kind)?);
    }
    let counter = LoopClause::new()
        .init(constant(Kind::INT, Value::Int(0))?)
        .step(increment)
        .pred(in_bounds);
    loop_clauses(vec![accumulate, counter])
}
