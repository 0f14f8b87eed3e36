//! Call sites: retargetable indirection cells for dynamic call points.
//!
//! A site's signature is fixed at construction and every target it ever
//! holds has exactly that signature. Call points invoke through
//! [`CallSite::dynamic_invoker`] (or read [`CallSite::target`]) so that a
//! retarget takes effect without touching them.
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering, fence},
    },
};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    diagnostics::InvokeError,
    handle::{
        FunctionHandle,
        form::{FormBuilder, Step},
    },
    signature::Signature,
};

/// Retargeting policy of a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSiteKind {
    /// Linked once; every retarget fails.
    Constant,
    /// Retargets with plain stores unless the volatile path is requested.
    Mutable,
    /// Every retarget is fenced.
    Volatile,
}

struct CallSiteInner {
    kind: CallSiteKind,
    signature: Signature,
    target: RwLock<Option<FunctionHandle>>,
    /// Bumped on every retarget.
    generation: AtomicU64,
}

#[derive(Clone)]
pub struct CallSite(Arc<CallSiteInner>);

impl CallSite {
    fn with_parts(kind: CallSiteKind, signature: Signature, target: Option<FunctionHandle>) -> Self {
        Self(Arc::new(CallSiteInner {
            kind,
            signature,
            target: RwLock::new(target),
            generation: AtomicU64::new(0),
        }))
    }

    /// Permanently linked site.
    pub fn constant(target: FunctionHandle) -> Self {
        Self::with_parts(CallSiteKind::Constant, target.signature().clone(), Some(target))
    }

    /// Unlinked mutable site.
    pub fn mutable(signature: Signature) -> Self {
        Self::with_parts(CallSiteKind::Mutable, signature, None)
    }

    pub fn mutable_with(target: FunctionHandle) -> Self {
        Self::with_parts(CallSiteKind::Mutable, target.signature().clone(), Some(target))
    }

    /// Unlinked volatile site.
    pub fn volatile(signature: Signature) -> Self {
        Self::with_parts(CallSiteKind::Volatile, signature, None)
    }

    pub fn volatile_with(target: FunctionHandle) -> Self {
        Self::with_parts(CallSiteKind::Volatile, target.signature().clone(), Some(target))
    }

    pub fn kind(&self) -> CallSiteKind {
        self.0.kind
    }

    pub fn signature(&self) -> &Signature {
        &self.0.signature
    }

    pub fn is_linked(&self) -> bool {
        self.0.target.read().is_some()
    }

    /// Number of completed retargets.
    pub fn generation(&self) -> u64 {
        self.0.generation.load(Ordering::Acquire)
    }

    pub fn ptr_eq(&self, other: &CallSite) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Current target; `UnlinkedCallSite` before the first target is set.
    pub fn target(&self) -> Result<FunctionHandle, InvokeError> {
        self.0
            .target
            .read()
            .clone()
            .ok_or_else(|| InvokeError::UnlinkedCallSite {
                signature: self.signature().clone(),
            })
    }

    /// Retargets along the path the site's kind prescribes.
    pub fn set_target(&self, target: FunctionHandle) -> Result<(), InvokeError> {
        match self.kind() {
            CallSiteKind::Volatile => self.set_target_volatile(target),
            _ => self.set_target_normal(target),
        }
    }

    /// Plain store. Readers racing this write may keep seeing the previous
    /// target until they synchronize with the writer some other way.
    /// Volatile sites always take the fenced path.
    pub fn set_target_normal(&self, target: FunctionHandle) -> Result<(), InvokeError> {
        if self.kind() == CallSiteKind::Volatile {
            return self.set_target_volatile(target);
        }
        self.check_retarget(&target)?;
        *self.0.target.write() = Some(target);
        let generation = self.0.generation.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(site = %self.signature(), generation, "call site retargeted");
        Ok(())
    }

    /// Store followed by a full fence: a reader that starts after this
    /// returns observes the new target.
    pub fn set_target_volatile(&self, target: FunctionHandle) -> Result<(), InvokeError> {
        self.check_retarget(&target)?;
        *self.0.target.write() = Some(target);
        let generation = self.0.generation.fetch_add(1, Ordering::SeqCst) + 1;
        fence(Ordering::SeqCst);
        debug!(site = %self.signature(), generation, "call site retargeted (fenced)");
        Ok(())
    }

    fn check_retarget(&self, target: &FunctionHandle) -> Result<(), InvokeError> {
        if self.kind() == CallSiteKind::Constant {
            return Err(InvokeError::IllegalRetarget(format!(
                "constant call site {} cannot be retargeted",
                self.signature()
            )));
        }
        if target.signature() != self.signature() {
            return Err(InvokeError::IllegalRetarget(format!(
                "target {} does not match call site {}",
                target.signature(),
                self.signature()
            )));
        }
        Ok(())
    }

    /// Handle of the site's signature that invokes whatever target is current
    /// at the moment of each invocation.
    pub fn dynamic_invoker(&self) -> FunctionHandle {
        let signature = self.signature().clone();
        let ret = signature.return_kind().clone();
        let mut b = FormBuilder::new(signature.arity());
        let args = b.args(0..signature.arity());
        let result = b.push(
            ret.clone(),
            Step::Dynamic {
                site: self.clone(),
                args,
            },
        );
        FunctionHandle::new(signature, b.finish(Some(result), &ret))
    }

    /// Makes plain retargets of `sites` visible to every thread that
    /// subsequently reads them.
    pub fn sync_all(sites: &[CallSite]) {
        for site in sites {
            site.0.generation.fetch_add(0, Ordering::SeqCst);
        }
        fence(Ordering::SeqCst);
    }
}

impl PartialEq for CallSite {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("kind", &self.kind())
            .field("signature", self.signature())
            .field("linked", &self.is_linked())
            .finish()
    }
}
