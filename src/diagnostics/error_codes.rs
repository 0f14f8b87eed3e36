use serde::Serialize;

/// Stable identifier and title for one error kind.
///
/// Codes are user-visible and must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorCode {
    pub code: &'static str,
    pub title: &'static str,
}

// Construction-time errors (E2000-E2099)
pub const SIGNATURE_MISMATCH: ErrorCode = ErrorCode {
    code: "E2000",
    title: "SIGNATURE MISMATCH",
};
pub const COMBINATOR_TYPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E2001",
    title: "COMBINATOR TYPE MISMATCH",
};
pub const TOO_MANY_PARAMETERS: ErrorCode = ErrorCode {
    code: "E2002",
    title: "TOO MANY PARAMETERS",
};
pub const VOID_PARAMETER: ErrorCode = ErrorCode {
    code: "E2003",
    title: "VOID PARAMETER",
};
pub const ILLEGAL_ARGUMENT: ErrorCode = ErrorCode {
    code: "E2004",
    title: "ILLEGAL ARGUMENT",
};
pub const LAMBDA_SHAPE_MISMATCH: ErrorCode = ErrorCode {
    code: "E2005",
    title: "LAMBDA SHAPE MISMATCH",
};

// Invocation-time errors (E2100-E2199)
pub const WRONG_ARGUMENT_COUNT: ErrorCode = ErrorCode {
    code: "E2100",
    title: "WRONG NUMBER OF ARGUMENTS",
};
pub const CLASS_CAST: ErrorCode = ErrorCode {
    code: "E2101",
    title: "CLASS CAST",
};
pub const THROWN: ErrorCode = ErrorCode {
    code: "E2102",
    title: "UNCAUGHT THROWABLE",
};
pub const FATAL: ErrorCode = ErrorCode {
    code: "E2103",
    title: "FATAL RUNTIME ERROR",
};

// Linkage errors (E2200-E2299)
pub const ILLEGAL_RETARGET: ErrorCode = ErrorCode {
    code: "E2200",
    title: "ILLEGAL RETARGET",
};
pub const UNLINKED_CALL_SITE: ErrorCode = ErrorCode {
    code: "E2201",
    title: "UNLINKED CALL SITE",
};
pub const BOOTSTRAP_LINKAGE: ErrorCode = ErrorCode {
    code: "E2202",
    title: "BOOTSTRAP LINKAGE",
};
pub const BOOTSTRAP_PROTOCOL: ErrorCode = ErrorCode {
    code: "E2203",
    title: "BOOTSTRAP PROTOCOL",
};
pub const ACCESS_DENIED: ErrorCode = ErrorCode {
    code: "E2204",
    title: "ACCESS DENIED",
};
pub const NO_SUCH_MEMBER: ErrorCode = ErrorCode {
    code: "E2205",
    title: "NO SUCH MEMBER",
};
