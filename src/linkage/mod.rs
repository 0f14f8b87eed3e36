//! Bootstrap linkage: mapping symbolic call points to call sites.
//!
//! A [`Linker`] resolves each [`CallPointId`] once by running the call
//! point's [`BootstrapMethod`] against its [`BootstrapDescriptor`]. The
//! resulting [`CallSite`] is published only after it has been validated;
//! later invocations through the call point read the site's current target
//! directly.
pub mod cache;
pub mod config;
pub mod lookup;
pub mod registry;

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{
    callsite::CallSite, diagnostics::InvokeError, runtime::value::Value, signature::Signature,
};

pub use cache::HandleCache;
pub use config::LinkerConfig;
pub use lookup::{AccessGate, Lookup, MemberKind, MemberRequest, ResolvedMember, SymbolResolver};
pub use registry::MemberRegistry;

/// Program-supplied resolver run once per call point.
///
/// Implementations return `Value::CallSite` whose signature equals
/// `signature`. Any other result is a protocol violation (a bare
/// `Value::Handle` is accepted only when the linker allows it).
pub trait BootstrapMethod: Send + Sync {
    fn bootstrap(
        &self,
        lookup: &Lookup,
        name: &str,
        signature: &Signature,
        static_args: &[Value],
    ) -> Result<Value, InvokeError>;
}

impl<F> BootstrapMethod for F
where
    F: Fn(&Lookup, &str, &Signature, &[Value]) -> Result<Value, InvokeError> + Send + Sync,
{
    fn bootstrap(
        &self,
        lookup: &Lookup,
        name: &str,
        signature: &Signature,
        static_args: &[Value],
    ) -> Result<Value, InvokeError> {
        self(lookup, name, signature, static_args)
    }
}

/// Symbolic description of a dynamic call point.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapDescriptor {
    pub name: Arc<str>,
    pub signature: Signature,
    pub static_args: Vec<Value>,
}

impl BootstrapDescriptor {
    pub fn new(name: &str, signature: Signature, static_args: Vec<Value>) -> Self {
        Self {
            name: Arc::from(name),
            signature,
            static_args,
        }
    }
}

/// Identity of a distinct call point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallPointId(pub u64);

impl fmt::Display for CallPointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-call-point linkage cache.
pub struct Linker {
    lookup: Lookup,
    config: LinkerConfig,
    linked: Mutex<HashMap<CallPointId, CallSite>>,
}

impl Linker {
    pub fn new(lookup: Lookup, config: LinkerConfig) -> Self {
        Self {
            lookup,
            config,
            linked: Mutex::new(HashMap::new()),
        }
    }

    pub fn lookup(&self) -> &Lookup {
        &self.lookup
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    /// Runs `bootstrap` for `descriptor` and validates what it returns.
    /// Nothing is cached.
    pub fn resolve(
        &self,
        descriptor: &BootstrapDescriptor,
        bootstrap: &dyn BootstrapMethod,
    ) -> Result<CallSite, InvokeError> {
        self.link_event(descriptor, "bootstrap started");
        let result = bootstrap
            .bootstrap(
                &self.lookup,
                &descriptor.name,
                &descriptor.signature,
                &descriptor.static_args,
            )
            .map_err(|cause| {
                if cause.is_fatal() {
                    return cause;
                }
                warn!(name = %descriptor.name, error = %cause, "bootstrap failed");
                InvokeError::BootstrapLinkage {
                    name: descriptor.name.to_string(),
                    cause: Box::new(cause),
                }
            })?;

        let site = match result {
            Value::CallSite(site) => {
                if site.signature() != &descriptor.signature {
                    warn!(
                        name = %descriptor.name,
                        returned = %site.signature(),
                        "bootstrap returned a call site of the wrong signature"
                    );
                    return Err(InvokeError::SignatureMismatch {
                        expected: descriptor.signature.clone(),
                        actual: site.signature().clone(),
                    });
                }
                site
            }
            Value::Handle(handle) if self.config.allow_handle_results => {
                if handle.signature() != &descriptor.signature {
                    return Err(InvokeError::SignatureMismatch {
                        expected: descriptor.signature.clone(),
                        actual: handle.signature().clone(),
                    });
                }
                CallSite::constant(handle)
            }
            other => {
                warn!(name = %descriptor.name, returned = %other.type_name(), "bootstrap protocol violation");
                return Err(InvokeError::BootstrapProtocol {
                    name: descriptor.name.to_string(),
                    detail: format!("expected a call site, got {}", other.type_name()),
                });
            }
        };
        self.link_event(descriptor, "bootstrap succeeded");
        Ok(site)
    }

    /// Call site for `point`, bootstrapping it on first use.
    ///
    /// Racing linkers may each run the bootstrap; the first site published
    /// wins and every caller receives it. Failures leave `point` unlinked.
    pub fn link(
        &self,
        point: CallPointId,
        descriptor: &BootstrapDescriptor,
        bootstrap: &dyn BootstrapMethod,
    ) -> Result<CallSite, InvokeError> {
        if let Some(site) = self.linked(point) {
            return Ok(site);
        }
        let site = self.resolve(descriptor, bootstrap)?;
        let published = self.linked.lock().entry(point).or_insert(site).clone();
        Ok(published)
    }

    pub fn linked(&self, point: CallPointId) -> Option<CallSite> {
        self.linked.lock().get(&point).cloned()
    }

    /// Forgets the site linked for `point`; the next link bootstraps again.
    pub fn unregister(&self, point: CallPointId) -> Option<CallSite> {
        let removed = self.linked.lock().remove(&point);
        if removed.is_some() {
            debug!(point = %point, "call point unregistered");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.linked.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn link_event(&self, descriptor: &BootstrapDescriptor, message: &str) {
        if self.config.trace_linkage {
            info!(name = %descriptor.name, signature = %descriptor.signature, "{}", message);
        } else {
            debug!(name = %descriptor.name, signature = %descriptor.signature, "{}", message);
        }
    }
}

impl fmt::Debug for Linker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linker")
            .field("lookup", &self.lookup)
            .field("config", &self.config)
            .field("linked", &self.len())
            .finish()
    }
}

/// A dynamic call point: descriptor plus the bootstrap that links it.
#[derive(Clone)]
pub struct DynamicCallPoint {
    pub id: CallPointId,
    pub descriptor: BootstrapDescriptor,
    pub bootstrap: Arc<dyn BootstrapMethod>,
}

impl DynamicCallPoint {
    pub fn new(id: CallPointId, descriptor: BootstrapDescriptor, bootstrap: Arc<dyn BootstrapMethod>) -> Self {
        Self {
            id,
            descriptor,
            bootstrap,
        }
    }

    /// Links on first execution, then invokes the site's current target
    /// with the call point's exact signature.
    pub fn invoke(&self, linker: &Linker, args: Vec<Value>) -> Result<Value, InvokeError> {
        let site = linker.link(self.id, &self.descriptor, self.bootstrap.as_ref())?;
        site.target()?.invoke_exact(args)
    }
}

impl fmt::Debug for DynamicCallPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicCallPoint")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("signature", &self.descriptor.signature)
            .finish()
    }
}
