use std::{
    collections::HashMap,
    hash::{BuildHasher, Hash, Hasher, RandomState},
};

use parking_lot::Mutex;

use crate::diagnostics::InvokeError;

use super::{Kind, Signature};

/// Interning table that canonicalizes signatures.
///
/// Uses the same hash-bucketing strategy as a string interner: a bucket per
/// structural hash holds the canonical instances that share it. The table is
/// an explicit object owned by whoever links code; there is no process-wide
/// table.
///
/// # Example
///
/// ```
/// use invoke::signature::{Kind, SignatureTable};
///
/// let table = SignatureTable::new();
/// let a = table.make(Kind::INT, vec![Kind::INT, Kind::INT]).unwrap();
/// let b = table.make(Kind::INT, vec![Kind::INT, Kind::INT]).unwrap();
/// assert!(a.same_instance(&b));
/// ```
#[derive(Debug, Default)]
pub struct SignatureTable {
    hasher: RandomState,
    buckets: Mutex<HashMap<u64, Vec<Signature>>>,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds and canonicalizes a signature.
    pub fn make(&self, ret: Kind, params: impl Into<Vec<Kind>>) -> Result<Signature, InvokeError> {
        Ok(self.intern(Signature::make(ret, params)?))
    }

    /// Returns the canonical instance equal to `signature`, registering it if
    /// it is new.
    pub fn intern(&self, signature: Signature) -> Signature {
        let hash = self.hash_signature(&signature);
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(hash).or_default();
        if let Some(existing) = bucket.iter().find(|candidate| **candidate == signature) {
            return existing.clone();
        }
        bucket.push(signature.clone());
        signature
    }

    /// Number of distinct canonical signatures.
    pub fn len(&self) -> usize {
        self.buckets.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every canonical instance. Signatures already handed out stay
    /// valid; they simply stop being canonical.
    pub fn clear(&self) {
        self.buckets.lock().clear();
    }

    fn hash_signature(&self, signature: &Signature) -> u64 {
        let mut state = self.hasher.build_hasher();
        signature.hash(&mut state);
        state.finish()
    }
}
