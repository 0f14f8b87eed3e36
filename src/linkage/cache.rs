//! Injectable lookaside cache for commonly requested handles.
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{
    diagnostics::InvokeError,
    handle::{self, FunctionHandle},
    runtime::{convert::coerce, constant_key::ConstantKey, value::Value},
    signature::Kind,
};

/// Shares constant and identity handles between lookups.
///
/// Owned by whoever builds [`Lookup`](super::Lookup)s; nothing in the crate
/// caches handles in global state.
#[derive(Debug, Default)]
pub struct HandleCache {
    /// Keyed by slot kind, value kind and value.
    constants: Mutex<HashMap<(Kind, Kind, ConstantKey), FunctionHandle>>,
    identities: Mutex<HashMap<Kind, FunctionHandle>>,
}

impl HandleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `() -> kind` returning `value`. Values with a constant key (after
    /// coercion to `kind`) are shared; others get a fresh handle.
    pub fn constant(&self, kind: &Kind, value: Value) -> Result<FunctionHandle, InvokeError> {
        let value = coerce(value, kind)?;
        let Some(key) = value.constant_key() else {
            return handle::constant(kind.clone(), value);
        };
        let key = (kind.clone(), value.kind(), key);
        let mut constants = self.constants.lock();
        if let Some(cached) = constants.get(&key) {
            return Ok(cached.clone());
        }
        let created = handle::constant(kind.clone(), value)?;
        constants.insert(key, created.clone());
        Ok(created)
    }

    pub fn identity(&self, kind: &Kind) -> Result<FunctionHandle, InvokeError> {
        let mut identities = self.identities.lock();
        if let Some(cached) = identities.get(kind) {
            return Ok(cached.clone());
        }
        let created = handle::identity(kind.clone())?;
        identities.insert(kind.clone(), created.clone());
        Ok(created)
    }

    pub fn len(&self) -> usize {
        self.constants.lock().len() + self.identities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.constants.lock().clear();
        self.identities.lock().clear();
    }
}
