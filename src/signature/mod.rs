//! Immutable function signatures and the kind lattice they range over.
use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{diagnostics::InvokeError, runtime::value::Value};

pub mod conversion;
pub mod kind;
pub mod table;

pub use conversion::{is_convertible_to, is_viewable_as};
pub use kind::{ClassBuilder, ClassDef, Kind, MethodDef, Prim, RefType};
pub use table::SignatureTable;

/// Upper bound on the number of parameters a signature may declare.
pub const MAX_ARITY: usize = 254;

#[derive(Debug, PartialEq, Eq, Hash)]
struct SignatureData {
    ret: Kind,
    params: Box<[Kind]>,
}

/// Ordered parameter kinds plus a return kind.
///
/// Signatures are cheap to clone and compare: equality checks the shared
/// pointer first and falls back to structural comparison, so signatures built
/// independently are interchangeable. A [`SignatureTable`] canonicalizes them
/// further so equal signatures share one allocation.
#[derive(Clone)]
pub struct Signature(Arc<SignatureData>);

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Signature {
    /// Builds a signature, validating arity and rejecting `void` parameters.
    pub fn make(ret: Kind, params: impl Into<Vec<Kind>>) -> Result<Self, InvokeError> {
        let params = params.into();
        if params.len() > MAX_ARITY {
            return Err(InvokeError::TooManyParameters {
                count: params.len(),
                limit: MAX_ARITY,
            });
        }
        if let Some(index) = params.iter().position(Kind::is_void) {
            return Err(InvokeError::DuplicateVoidParameter { index });
        }
        Ok(Self(Arc::new(SignatureData {
            ret,
            params: params.into_boxed_slice(),
        })))
    }

    /// Signature of a loose call with the given argument values.
    pub fn of_values(ret: Kind, args: &[Value]) -> Result<Self, InvokeError> {
        Self::make(ret, args.iter().map(Value::kind).collect::<Vec<_>>())
    }

    pub fn arity(&self) -> usize {
        self.0.params.len()
    }

    pub fn params(&self) -> &[Kind] {
        &self.0.params
    }

    /// Parameter kind at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; callers validate positions first.
    pub fn param(&self, index: usize) -> &Kind {
        &self.0.params[index]
    }

    pub fn return_kind(&self) -> &Kind {
        &self.0.ret
    }

    pub fn returns_void(&self) -> bool {
        self.0.ret.is_void()
    }

    /// Returns whether both values share one allocation.
    pub fn same_instance(&self, other: &Signature) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn change_return(&self, ret: Kind) -> Signature {
        Self(Arc::new(SignatureData {
            ret,
            params: self.0.params.clone(),
        }))
    }

    pub fn change_param(&self, index: usize, kind: Kind) -> Result<Signature, InvokeError> {
        let end = index.checked_add(1).ok_or_else(|| {
            InvokeError::illegal(format!("parameter {} out of bounds for {}", index, self))
        })?;
        self.replace_params(index, end, vec![kind])
    }

    /// Removes the parameters in `start..end`.
    pub fn drop_params(&self, start: usize, end: usize) -> Result<Signature, InvokeError> {
        self.replace_params(start, end, Vec::new())
    }

    /// Inserts `kinds` before position `pos`.
    pub fn insert_params(&self, pos: usize, kinds: &[Kind]) -> Result<Signature, InvokeError> {
        self.replace_params(pos, pos, kinds.to_vec())
    }

    pub fn append_params(&self, kinds: &[Kind]) -> Result<Signature, InvokeError> {
        self.insert_params(self.arity(), kinds)
    }

    /// Replaces the parameters in `start..end` with `kinds`.
    pub fn replace_params(
        &self,
        start: usize,
        end: usize,
        kinds: Vec<Kind>,
    ) -> Result<Signature, InvokeError> {
        if start > end || end > self.arity() {
            return Err(InvokeError::illegal(format!(
                "parameter range {}..{} out of bounds for {}",
                start, end, self
            )));
        }
        let mut params = Vec::with_capacity(self.arity() - (end - start) + kinds.len());
        params.extend_from_slice(&self.0.params[..start]);
        params.extend(kinds);
        params.extend_from_slice(&self.0.params[end..]);
        Self::make(self.0.ret.clone(), params)
    }

    /// Parameters `start..` as a slice, clamped to the arity.
    pub fn params_from(&self, start: usize) -> &[Kind] {
        &self.0.params[start.min(self.arity())..]
    }

    /// Returns whether `prefix` equals the leading parameters.
    pub fn has_param_prefix(&self, prefix: &[Kind]) -> bool {
        prefix.len() <= self.arity() && &self.0.params[..prefix.len()] == prefix
    }

    /// All reference kinds replaced by `Object`.
    pub fn erase(&self) -> Signature {
        Self(Arc::new(SignatureData {
            ret: self.0.ret.erase(),
            params: self.0.params.iter().map(Kind::erase).collect(),
        }))
    }

    /// Returns whether a handle of this signature can be adapted to `target`
    /// with `as_type`.
    pub fn is_convertible_to(&self, target: &Signature) -> bool {
        self.first_inconvertible(target).is_none()
    }

    /// First position (`Some(None)` for the return) blocking adaptation.
    pub(crate) fn first_inconvertible(&self, target: &Signature) -> Option<Option<usize>> {
        if self == target {
            return None;
        }
        if self.arity() != target.arity() {
            return Some(None);
        }
        for (i, (own, wanted)) in self.params().iter().zip(target.params()).enumerate() {
            if !is_convertible_to(wanted, own) {
                return Some(Some(i));
            }
        }
        if !is_convertible_to(self.return_kind(), target.return_kind()) {
            return Some(None);
        }
        None
    }

    /// Returns whether a handle of this signature can be re-typed to `target`
    /// without inserting conversions.
    pub fn is_viewable_as(&self, target: &Signature, strict: bool) -> bool {
        if self.arity() != target.arity() {
            return false;
        }
        let params_ok = self
            .params()
            .iter()
            .zip(target.params())
            .all(|(own, wanted)| is_viewable_as(wanted, own, strict));
        params_ok && is_viewable_as(self.return_kind(), target.return_kind(), strict)
    }

    /// Compact descriptor, e.g. `(int,String)long`.
    pub fn descriptor(&self) -> String {
        let params: Vec<String> = self.params().iter().map(|k| k.to_string()).collect();
        format!("({}){}", params.join(","), self.return_kind())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params().iter().map(|k| k.to_string()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.return_kind())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature{}", self.descriptor())
    }
}
