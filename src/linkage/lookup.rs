//! Lookup contexts and the symbol resolution seams they call out to.
use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    diagnostics::InvokeError,
    handle::{FunctionHandle, LeafAction},
    linkage::cache::HandleCache,
    runtime::value::Value,
    signature::{Kind, Signature},
};

/// Shape of member a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Static,
    Virtual,
    Getter,
    Setter,
    Constructor,
}

/// Symbolic reference to a member of a declaring type.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRequest {
    pub owner: Arc<str>,
    pub name: Arc<str>,
    pub kind: MemberKind,
    /// Expected signature of the resulting handle (receiver included), when
    /// the caller knows it.
    pub signature: Option<Signature>,
}

impl fmt::Display for MemberRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}.{}", self.kind, self.owner, self.name)?;
        if let Some(signature) = &self.signature {
            write!(f, " {}", signature)?;
        }
        Ok(())
    }
}

/// Invocable result of resolving a member.
#[derive(Debug, Clone)]
pub struct ResolvedMember {
    /// Handle signature, receiver first for instance members.
    pub signature: Signature,
    pub action: LeafAction,
}

/// Resolves symbolic member references for a caller.
///
/// Fails with `NoSuchMember` or `AccessDenied`.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, caller: &str, request: &MemberRequest) -> Result<ResolvedMember, InvokeError>;
}

/// Optional veto consulted before a member handle is constructed.
pub trait AccessGate: Send + Sync {
    fn check(&self, caller: &str, request: &MemberRequest) -> Result<(), InvokeError>;
}

impl<F> AccessGate for F
where
    F: Fn(&str, &MemberRequest) -> Result<(), InvokeError> + Send + Sync,
{
    fn check(&self, caller: &str, request: &MemberRequest) -> Result<(), InvokeError> {
        self(caller, request)
    }
}

/// Capability to build member handles on behalf of one caller.
#[derive(Clone)]
pub struct Lookup {
    caller: Arc<str>,
    resolver: Arc<dyn SymbolResolver>,
    gate: Option<Arc<dyn AccessGate>>,
    cache: Arc<HandleCache>,
}

impl Lookup {
    pub fn new(caller: &str, resolver: Arc<dyn SymbolResolver>) -> Self {
        Self {
            caller: Arc::from(caller),
            resolver,
            gate: None,
            cache: Arc::new(HandleCache::new()),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AccessGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_cache(mut self, cache: Arc<HandleCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Same resolver, gate and cache on behalf of another caller.
    pub fn in_caller(&self, caller: &str) -> Self {
        Self {
            caller: Arc::from(caller),
            ..self.clone()
        }
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    pub fn cache(&self) -> &Arc<HandleCache> {
        &self.cache
    }

    /// Resolves `request` into a leaf handle.
    pub fn find(&self, request: &MemberRequest) -> Result<FunctionHandle, InvokeError> {
        if let Some(gate) = &self.gate {
            gate.check(&self.caller, request)?;
        }
        let member = self.resolver.resolve(&self.caller, request)?;
        if let Some(expected) = &request.signature {
            if &member.signature != expected {
                return Err(InvokeError::NoSuchMember {
                    owner: request.owner.to_string(),
                    name: format!("{}{}", request.name, expected.descriptor()),
                });
            }
        }
        debug!(caller = %self.caller, member = %request, "member resolved");
        Ok(FunctionHandle::from_leaf(member.signature, member.action))
    }

    fn request(
        owner: &str,
        name: &str,
        kind: MemberKind,
        signature: Option<Signature>,
    ) -> MemberRequest {
        MemberRequest {
            owner: Arc::from(owner),
            name: Arc::from(name),
            kind,
            signature,
        }
    }

    pub fn find_static(
        &self,
        owner: &str,
        name: &str,
        signature: &Signature,
    ) -> Result<FunctionHandle, InvokeError> {
        self.find(&Self::request(owner, name, MemberKind::Static, Some(signature.clone())))
    }

    /// `signature` excludes the receiver; the handle takes it first.
    pub fn find_virtual(
        &self,
        owner: &str,
        name: &str,
        signature: &Signature,
    ) -> Result<FunctionHandle, InvokeError> {
        let handle = self.find(&Self::request(owner, name, MemberKind::Virtual, None))?;
        if handle.signature().params_from(1) != signature.params()
            || handle.signature().return_kind() != signature.return_kind()
        {
            return Err(InvokeError::NoSuchMember {
                owner: owner.to_string(),
                name: format!("{}{}", name, signature.descriptor()),
            });
        }
        Ok(handle)
    }

    pub fn find_getter(&self, owner: &str, name: &str, kind: &Kind) -> Result<FunctionHandle, InvokeError> {
        let handle = self.find(&Self::request(owner, name, MemberKind::Getter, None))?;
        let field = Some(handle.signature().return_kind());
        check_field(field, owner, name, kind)?;
        Ok(handle)
    }

    pub fn find_setter(&self, owner: &str, name: &str, kind: &Kind) -> Result<FunctionHandle, InvokeError> {
        let handle = self.find(&Self::request(owner, name, MemberKind::Setter, None))?;
        check_field(handle.signature().params().get(1), owner, name, kind)?;
        Ok(handle)
    }

    /// The handle takes `params` and returns the new instance.
    pub fn find_constructor(&self, owner: &str, params: &[Kind]) -> Result<FunctionHandle, InvokeError> {
        let handle = self.find(&Self::request(owner, "<init>", MemberKind::Constructor, None))?;
        if handle.signature().params() != params {
            return Err(InvokeError::NoSuchMember {
                owner: owner.to_string(),
                name: "<init>".to_string(),
            });
        }
        Ok(handle)
    }

    /// Shared constant handle from this lookup's cache.
    pub fn constant(&self, kind: &Kind, value: Value) -> Result<FunctionHandle, InvokeError> {
        self.cache.constant(kind, value)
    }
}

fn check_field(found: Option<&Kind>, owner: &str, name: &str, kind: &Kind) -> Result<(), InvokeError> {
    if found != Some(kind) {
        return Err(InvokeError::NoSuchMember {
            owner: owner.to_string(),
            name: format!("{}: {}", name, kind),
        });
    }
    Ok(())
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup")
            .field("caller", &self.caller)
            .field("gated", &self.gate.is_some())
            .finish()
    }
}
