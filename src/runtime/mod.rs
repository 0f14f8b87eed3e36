//! Runtime value model shared by handles, call sites and linkage.
//!
//! # No-Cycle Invariant
//! Runtime values, handles and step programs are immutable graphs shared with
//! `Arc` and are expected to remain acyclic:
//! - Adapters own the handles they wrap; wrapped handles never own their
//!   adapters (memo edges back to adapters are weak).
//! - Captured constants must not reference the capturing handle.
//!
//! Mutable state is limited to instance fields, throwable suppression lists
//! and call-site targets.
pub mod constant_key;
pub mod convert;
pub mod exceptions;
pub mod native;
pub mod value;

pub use native::{NativeFn, NativeFunction};
pub use value::{ArrayValue, Instance, Throwable, Value};
