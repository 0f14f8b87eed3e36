//! Typed function handles, an adapter algebra over them, and a call-site
//! linkage engine.
//!
//! A [`FunctionHandle`] is an immutable, signature-typed callable. Handles are
//! transformed by the combinators in [`combinators`] into new handles, invoked
//! directly, or installed as the target of a [`CallSite`] that dynamic call
//! points link against through the bootstrap protocol in [`linkage`].
pub mod callsite;
pub mod combinators;
pub mod diagnostics;
pub mod handle;
pub mod lambda;
pub mod linkage;
pub mod runtime;
pub mod signature;

pub use callsite::{CallSite, CallSiteKind};
pub use diagnostics::InvokeError;
pub use handle::FunctionHandle;
pub use runtime::value::Value;
pub use signature::{Kind, Prim, RefType, Signature};
