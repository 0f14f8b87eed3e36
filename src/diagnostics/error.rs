use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::{runtime::value::Throwable, signature::Signature};

use super::error_codes::{self, ErrorCode};

/// Position inside a functional-interface shape that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaSlot {
    /// Captured plus interface arity does not fill the implementation.
    Arity,
    /// Instantiated signature arity differs from the interface arity.
    InstantiatedArity,
    /// Captured argument at this index.
    Captured(usize),
    /// Interface-supplied argument at this index.
    Parameter(usize),
    /// Return slot.
    Return,
}

impl fmt::Display for LambdaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LambdaSlot::Arity => write!(f, "arity"),
            LambdaSlot::InstantiatedArity => write!(f, "instantiated arity"),
            LambdaSlot::Captured(i) => write!(f, "captured argument {}", i),
            LambdaSlot::Parameter(i) => write!(f, "parameter {}", i),
            LambdaSlot::Return => write!(f, "return"),
        }
    }
}

/// Every failure the handle runtime can report.
///
/// Construction and linkage errors are raised synchronously at the point of
/// construction. Only `Thrown`, `ClassCast`, `SignatureMismatch`,
/// `WrongArgumentCount`, `UnlinkedCallSite` and `Fatal` occur during
/// invocation.
#[derive(Debug, Clone, Error)]
pub enum InvokeError {
    #[error("signature mismatch: expected {expected}, found {actual}")]
    SignatureMismatch {
        expected: Signature,
        actual: Signature,
    },

    #[error("{combinator}: {detail} (target {expected}, adapter {actual})")]
    CombinatorTypeMismatch {
        combinator: &'static str,
        detail: String,
        expected: Signature,
        actual: Signature,
    },

    #[error("wrong number of arguments: want={expected}, got={got}")]
    WrongArgumentCount { expected: usize, got: usize },

    #[error("cannot cast {from} to {to}")]
    ClassCast { from: String, to: String },

    #[error("too many parameters: {count} exceeds the limit of {limit}")]
    TooManyParameters { count: usize, limit: usize },

    #[error("parameter {index} has kind void")]
    DuplicateVoidParameter { index: usize },

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("illegal retarget: {0}")]
    IllegalRetarget(String),

    #[error("call site {signature} is not linked")]
    UnlinkedCallSite { signature: Signature },

    #[error("bootstrap for `{name}` failed: {cause}")]
    BootstrapLinkage {
        name: String,
        cause: Box<InvokeError>,
    },

    #[error("bootstrap for `{name}` violated the protocol: {detail}")]
    BootstrapProtocol { name: String, detail: String },

    #[error("lambda shape mismatch at {slot}: {detail}")]
    LambdaShapeMismatch { slot: LambdaSlot, detail: String },

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("no such member: {owner}.{name}")]
    NoSuchMember { owner: String, name: String },

    #[error("{0}")]
    Thrown(Arc<Throwable>),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl InvokeError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static ErrorCode {
        match self {
            InvokeError::SignatureMismatch { .. } => &error_codes::SIGNATURE_MISMATCH,
            InvokeError::CombinatorTypeMismatch { .. } => &error_codes::COMBINATOR_TYPE_MISMATCH,
            InvokeError::WrongArgumentCount { .. } => &error_codes::WRONG_ARGUMENT_COUNT,
            InvokeError::ClassCast { .. } => &error_codes::CLASS_CAST,
            InvokeError::TooManyParameters { .. } => &error_codes::TOO_MANY_PARAMETERS,
            InvokeError::DuplicateVoidParameter { .. } => &error_codes::VOID_PARAMETER,
            InvokeError::IllegalArgument(_) => &error_codes::ILLEGAL_ARGUMENT,
            InvokeError::IllegalRetarget(_) => &error_codes::ILLEGAL_RETARGET,
            InvokeError::UnlinkedCallSite { .. } => &error_codes::UNLINKED_CALL_SITE,
            InvokeError::BootstrapLinkage { .. } => &error_codes::BOOTSTRAP_LINKAGE,
            InvokeError::BootstrapProtocol { .. } => &error_codes::BOOTSTRAP_PROTOCOL,
            InvokeError::LambdaShapeMismatch { .. } => &error_codes::LAMBDA_SHAPE_MISMATCH,
            InvokeError::AccessDenied(_) => &error_codes::ACCESS_DENIED,
            InvokeError::NoSuchMember { .. } => &error_codes::NO_SUCH_MEMBER,
            InvokeError::Thrown(_) => &error_codes::THROWN,
            InvokeError::Fatal(_) => &error_codes::FATAL,
        }
    }

    /// Fatal host errors are never caught, wrapped, or retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, InvokeError::Fatal(_))
    }

    /// Returns the throwable carried by a `Thrown` error.
    pub fn thrown(&self) -> Option<&Arc<Throwable>> {
        match self {
            InvokeError::Thrown(throwable) => Some(throwable),
            _ => None,
        }
    }

    pub(crate) fn mismatch(
        combinator: &'static str,
        detail: impl Into<String>,
        expected: &Signature,
        actual: &Signature,
    ) -> Self {
        InvokeError::CombinatorTypeMismatch {
            combinator,
            detail: detail.into(),
            expected: expected.clone(),
            actual: actual.clone(),
        }
    }

    pub fn illegal(detail: impl Into<String>) -> Self {
        InvokeError::IllegalArgument(detail.into())
    }
}
