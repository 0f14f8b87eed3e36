//! In-memory symbol resolver over registered functions and classes.
use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    diagnostics::InvokeError,
    handle::LeafAction,
    linkage::lookup::{MemberKind, MemberRequest, ResolvedMember, SymbolResolver},
    runtime::native::NativeFunction,
    signature::{ClassDef, Kind, Signature},
};

#[derive(Debug, Clone)]
struct StaticEntry {
    signature: Signature,
    function: NativeFunction,
    private: bool,
}

/// Resolver backed by explicit registrations.
///
/// Private members resolve only for a caller whose name equals the owner.
#[derive(Debug, Default)]
pub struct MemberRegistry {
    statics: RwLock<HashMap<(Arc<str>, Arc<str>), StaticEntry>>,
    classes: RwLock<HashMap<Arc<str>, Arc<ClassDef>>>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_static(&self, owner: &str, name: &str, signature: Signature, function: NativeFunction) {
        self.insert_static(owner, name, signature, function, false);
    }

    pub fn register_private_static(
        &self,
        owner: &str,
        name: &str,
        signature: Signature,
        function: NativeFunction,
    ) {
        self.insert_static(owner, name, signature, function, true);
    }

    fn insert_static(
        &self,
        owner: &str,
        name: &str,
        signature: Signature,
        function: NativeFunction,
        private: bool,
    ) {
        self.statics.write().insert(
            (Arc::from(owner), Arc::from(name)),
            StaticEntry {
                signature,
                function,
                private,
            },
        );
    }

    /// Registers (or replaces) a class under its own name.
    pub fn register_class(&self, class: Arc<ClassDef>) {
        self.classes.write().insert(class.name.clone(), class);
    }

    pub fn class(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.classes.read().get(name).cloned()
    }

    fn require_class(&self, request: &MemberRequest) -> Result<Arc<ClassDef>, InvokeError> {
        self.class(&request.owner)
            .ok_or_else(|| no_such_member(request))
    }
}

impl SymbolResolver for MemberRegistry {
    fn resolve(&self, caller: &str, request: &MemberRequest) -> Result<ResolvedMember, InvokeError> {
        match request.kind {
            MemberKind::Static => {
                let entry = self
                    .statics
                    .read()
                    .get(&(request.owner.clone(), request.name.clone()))
                    .cloned()
                    .ok_or_else(|| no_such_member(request))?;
                check_private(entry.private, caller, request)?;
                Ok(ResolvedMember {
                    signature: entry.signature,
                    action: LeafAction::Static(entry.function),
                })
            }
            MemberKind::Virtual => {
                let class = self.require_class(request)?;
                let method = class
                    .find_method(&request.name)
                    .ok_or_else(|| no_such_member(request))?;
                check_private(method.private, caller, request)?;
                let signature = method.signature.insert_params(0, &[Kind::class(&class)])?;
                Ok(ResolvedMember {
                    signature,
                    action: LeafAction::Virtual {
                        owner: class.clone(),
                        name: request.name.clone(),
                    },
                })
            }
            MemberKind::Getter | MemberKind::Setter => {
                let class = self.require_class(request)?;
                let index = class
                    .field_index(&request.name)
                    .ok_or_else(|| no_such_member(request))?;
                let field = class.fields[index].1.clone();
                let receiver = Kind::class(&class);
                let (signature, action) = if request.kind == MemberKind::Getter {
                    (
                        Signature::make(field, vec![receiver])?,
                        LeafAction::GetField {
                            owner: class.clone(),
                            name: request.name.clone(),
                        },
                    )
                } else {
                    (
                        Signature::make(Kind::VOID, vec![receiver, field])?,
                        LeafAction::SetField {
                            owner: class.clone(),
                            name: request.name.clone(),
                        },
                    )
                };
                Ok(ResolvedMember { signature, action })
            }
            MemberKind::Constructor => {
                let class = self.require_class(request)?;
                let params: Vec<Kind> = class.fields.iter().map(|(_, kind)| kind.clone()).collect();
                Ok(ResolvedMember {
                    signature: Signature::make(Kind::class(&class), params)?,
                    action: LeafAction::Construct { class },
                })
            }
        }
    }
}

fn check_private(private: bool, caller: &str, request: &MemberRequest) -> Result<(), InvokeError> {
    if private && caller != request.owner.as_ref() {
        return Err(InvokeError::AccessDenied(format!(
            "{} is private to {} (caller {})",
            request.name, request.owner, caller
        )));
    }
    Ok(())
}

fn no_such_member(request: &MemberRequest) -> InvokeError {
    InvokeError::NoSuchMember {
        owner: request.owner.to_string(),
        name: request.name.to_string(),
    }
}
