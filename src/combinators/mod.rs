//! Adapter algebra over function handles.
//!
//! Every combinator validates its inputs completely before building anything
//! and reports incompatibilities as `CombinatorTypeMismatch` carrying both
//! offending signatures. Out-of-range positions are `IllegalArgument`.
use crate::{
    diagnostics::InvokeError,
    handle::{
        FunctionHandle,
        form::{FormBuilder, Slot, Step},
    },
    runtime::{convert::coerce, value::Value},
    signature::{Kind, Signature},
};

pub mod control;
pub mod loops;

pub use control::{catch_exception, guard_with_test, try_finally};
pub use loops::{
    LoopClause, counted_loop, counted_loop_range, do_while_loop, iterated_loop, loop_clauses,
    while_loop,
};

fn check_range(signature: &Signature, pos: usize, len: usize) -> Result<(), InvokeError> {
    if pos > signature.arity() || len > signature.arity() - pos {
        return Err(InvokeError::illegal(format!(
            "{} positions from {} out of range for {}",
            len, pos, signature
        )));
    }
    Ok(())
}

/// Builds `(new signature) -> call target(args)` where `args` are computed by
/// `wire` from a fresh builder.
fn wrap(
    signature: Signature,
    target: &FunctionHandle,
    wire: impl FnOnce(&mut FormBuilder) -> Vec<Slot>,
) -> FunctionHandle {
    let mut b = FormBuilder::new(signature.arity());
    let args = wire(&mut b);
    let ret = target.signature().return_kind().clone();
    let result = b.push(
        ret.clone(),
        Step::Call {
            target: target.clone(),
            args,
        },
    );
    let form = b.finish(Some(result), &ret);
    FunctionHandle::new(signature, form)
}

/// Fixes `values.len()` parameters of `target` starting at `pos`.
///
/// Each value is coerced to its parameter kind now; a value that cannot be
/// is a `ClassCast`.
pub fn insert_arguments(
    target: &FunctionHandle,
    pos: usize,
    values: Vec<Value>,
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    check_range(own, pos, values.len())?;
    let bound = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| coerce(value, own.param(pos + i)))
        .collect::<Result<Vec<_>, _>>()?;
    let signature = own.drop_params(pos, pos + bound.len())?;
    let arity = signature.arity();
    Ok(wrap(signature, target, |b| {
        let mut args = b.args(0..pos);
        for (i, value) in bound.into_iter().enumerate() {
            args.push(b.push(own.param(pos + i).clone(), Step::Const(value)));
        }
        args.extend(b.args(pos..arity));
        args
    }))
}

/// Adds parameters of `kinds` at `pos` that `target` never sees.
pub fn drop_arguments(
    target: &FunctionHandle,
    pos: usize,
    kinds: &[Kind],
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    check_range(own, pos, 0)?;
    if kinds.is_empty() {
        return Ok(target.clone());
    }
    let signature = own.insert_params(pos, kinds)?;
    let arity = signature.arity();
    Ok(wrap(signature, target, |b| {
        let mut args = b.args(0..pos);
        args.extend(b.args(pos + kinds.len()..arity));
        args
    }))
}

/// Adapts `target` to accept `new_params` after its first `skip`
/// parameters. Its remaining parameters must appear in `new_params` at
/// `pos`; everything else is dropped.
pub fn drop_arguments_to_match(
    target: &FunctionHandle,
    skip: usize,
    new_params: &[Kind],
    pos: usize,
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    check_range(own, skip, 0)?;
    let kept = &own.params()[skip..];
    if pos > new_params.len() || kept.len() > new_params.len() - pos {
        return Err(InvokeError::illegal(format!(
            "{} parameters at {} do not fit in {} new parameters",
            kept.len(),
            pos,
            new_params.len()
        )));
    }
    let mut wanted = own.params()[..skip].to_vec();
    wanted.extend_from_slice(new_params);
    let wanted = Signature::make(own.return_kind().clone(), wanted)?;
    if &new_params[pos..pos + kept.len()] != kept {
        return Err(InvokeError::mismatch(
            "drop_arguments_to_match",
            format!("parameters after {} must appear at {}", skip, pos),
            &wanted,
            own,
        ));
    }
    let leading = drop_arguments(target, skip, &new_params[..pos])?;
    drop_arguments(
        &leading,
        leading.arity(),
        &new_params[pos + kept.len()..],
    )
}

/// Reorders, duplicates or drops arguments.
///
/// `reorder[j]` is the parameter of `signature` passed as argument `j` of
/// `target`. Kinds must match exactly, as must the return kinds.
pub fn permute_arguments(
    target: &FunctionHandle,
    signature: &Signature,
    reorder: &[usize],
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    if reorder.len() != own.arity() {
        return Err(InvokeError::mismatch(
            "permute_arguments",
            format!("reorder has {} entries, target takes {}", reorder.len(), own.arity()),
            own,
            signature,
        ));
    }
    if signature.return_kind() != own.return_kind() {
        return Err(InvokeError::mismatch(
            "permute_arguments",
            "return kinds differ",
            own,
            signature,
        ));
    }
    for (slot, &source) in reorder.iter().enumerate() {
        if source >= signature.arity() {
            return Err(InvokeError::illegal(format!(
                "reorder index {} out of range for {}",
                source, signature
            )));
        }
        if signature.param(source) != own.param(slot) {
            return Err(InvokeError::mismatch(
                "permute_arguments",
                format!(
                    "parameter {} ({}) cannot feed argument {} ({})",
                    source,
                    signature.param(source),
                    slot,
                    own.param(slot)
                ),
                own,
                signature,
            ));
        }
    }
    Ok(wrap(signature.clone(), target, |_| reorder.to_vec()))
}

/// Pre-processes arguments `pos..` through unary filters; `None` entries
/// pass the argument through.
pub fn filter_arguments(
    target: &FunctionHandle,
    pos: usize,
    filters: Vec<Option<FunctionHandle>>,
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    check_range(own, pos, filters.len())?;
    let mut params = own.params().to_vec();
    for (i, filter) in filters.iter().enumerate() {
        let Some(filter) = filter else { continue };
        let slot = pos + i;
        if filter.arity() != 1 {
            return Err(InvokeError::mismatch(
                "filter_arguments",
                format!("filter for argument {} is not unary", slot),
                own,
                filter.signature(),
            ));
        }
        if filter.signature().return_kind() != own.param(slot) {
            return Err(InvokeError::mismatch(
                "filter_arguments",
                format!("filter for argument {} does not return {}", slot, own.param(slot)),
                own,
                filter.signature(),
            ));
        }
        params[slot] = filter.signature().param(0).clone();
    }
    let signature = Signature::make(own.return_kind().clone(), params)?;
    Ok(wrap(signature, target, |b| {
        (0..own.arity())
            .map(|slot| match slot.checked_sub(pos).and_then(|i| filters.get(i)) {
                Some(Some(filter)) => b.push(
                    own.param(slot).clone(),
                    Step::Call {
                        target: filter.clone(),
                        args: vec![slot],
                    },
                ),
                _ => slot,
            })
            .collect()
    }))
}

/// Post-processes the result of `target` through `filter`.
///
/// The filter takes the result, or nothing when `target` returns `void`.
pub fn filter_return_value(
    target: &FunctionHandle,
    filter: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    let accepted = if own.returns_void() {
        filter.arity() == 0
    } else {
        filter.arity() == 1 && filter.signature().param(0) == own.return_kind()
    };
    if !accepted {
        return Err(InvokeError::mismatch(
            "filter_return_value",
            format!("filter does not accept {}", own.return_kind()),
            own,
            filter.signature(),
        ));
    }
    let ret = filter.signature().return_kind().clone();
    let signature = own.change_return(ret.clone());
    let mut b = FormBuilder::new(own.arity());
    let args = b.args(0..own.arity());
    let value = b.push(
        own.return_kind().clone(),
        Step::Call {
            target: target.clone(),
            args,
        },
    );
    let filter_args = if own.returns_void() {
        Vec::new()
    } else {
        vec![value]
    };
    let result = b.push(
        ret.clone(),
        Step::Call {
            target: filter.clone(),
            args: filter_args,
        },
    );
    Ok(FunctionHandle::new(signature, b.finish(Some(result), &ret)))
}

/// Replaces argument `pos` with the result of `filter` applied to
/// `filter.arity()` caller arguments. A `void` filter feeds nothing and only
/// inserts its parameters.
pub fn collect_arguments(
    target: &FunctionHandle,
    pos: usize,
    filter: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    let filter_sig = filter.signature();
    let fed = usize::from(!filter_sig.returns_void());
    check_range(own, pos, fed)?;
    if fed == 1 && own.param(pos) != filter_sig.return_kind() {
        return Err(InvokeError::mismatch(
            "collect_arguments",
            format!("filter does not return {}", own.param(pos)),
            own,
            filter_sig,
        ));
    }
    let signature = own.replace_params(pos, pos + fed, filter_sig.params().to_vec())?;
    let width = filter.arity();
    let arity = signature.arity();
    Ok(wrap(signature, target, |b| {
        let consumed = b.args(pos..pos + width);
        let value = b.push(
            filter_sig.return_kind().clone(),
            Step::Call {
                target: filter.clone(),
                args: consumed,
            },
        );
        let mut args = b.args(0..pos);
        if fed == 1 {
            args.push(value);
        }
        args.extend(b.args(pos + width..arity));
        args
    }))
}

/// Computes an extra argument for `target` from its own arguments.
///
/// `combiner` receives the caller arguments starting at `pos`; its result is
/// passed to `target` at `pos` ahead of them. A `void` combiner runs for its
/// effect and the argument list is unchanged.
pub fn fold_arguments(
    target: &FunctionHandle,
    pos: usize,
    combiner: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    let own = target.signature();
    let combiner_sig = combiner.signature();
    let folded = usize::from(!combiner_sig.returns_void());
    check_range(own, pos, folded + combiner.arity())?;
    if folded == 1 && own.param(pos) != combiner_sig.return_kind() {
        return Err(InvokeError::mismatch(
            "fold_arguments",
            format!("combiner does not return {}", own.param(pos)),
            own,
            combiner_sig,
        ));
    }
    let start = pos + folded;
    if own.params()[start..start + combiner.arity()] != *combiner_sig.params() {
        return Err(InvokeError::mismatch(
            "fold_arguments",
            format!("combiner parameters do not match arguments from {}", start),
            own,
            combiner_sig,
        ));
    }
    let signature = own.drop_params(pos, pos + folded)?;
    let width = combiner.arity();
    let arity = signature.arity();
    Ok(wrap(signature, target, |b| {
        let consumed = b.args(pos..pos + width);
        let value = b.push(
            combiner_sig.return_kind().clone(),
            Step::Call {
                target: combiner.clone(),
                args: consumed,
            },
        );
        let mut args = b.args(0..pos);
        if folded == 1 {
            args.push(value);
        }
        args.extend(b.args(pos..arity));
        args
    }))
}

/// [`fold_arguments`] at position 0.
pub fn fold_arguments_prefix(
    target: &FunctionHandle,
    combiner: &FunctionHandle,
) -> Result<FunctionHandle, InvokeError> {
    fold_arguments(target, 0, combiner)
}
