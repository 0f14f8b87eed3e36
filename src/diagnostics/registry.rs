use super::error_codes::*;

/// Central registry of every error code the crate can report.
pub const ERROR_CODES: &[ErrorCode] = &[
    // Construction (E2000-E2099)
    SIGNATURE_MISMATCH,
    COMBINATOR_TYPE_MISMATCH,
    TOO_MANY_PARAMETERS,
    VOID_PARAMETER,
    ILLEGAL_ARGUMENT,
    LAMBDA_SHAPE_MISMATCH,
    // Invocation (E2100-E2199)
    WRONG_ARGUMENT_COUNT,
    CLASS_CAST,
    THROWN,
    FATAL,
    // Linkage (E2200-E2299)
    ILLEGAL_RETARGET,
    UNLINKED_CALL_SITE,
    BOOTSTRAP_LINKAGE,
    BOOTSTRAP_PROTOCOL,
    ACCESS_DENIED,
    NO_SUCH_MEMBER,
];

/// Look up an error code by its code string (e.g. "E2001").
pub fn lookup_code(code: &str) -> Option<&'static ErrorCode> {
    ERROR_CODES.iter().find(|item| item.code == code)
}

/// Renders the registry as JSON, one object per code.
pub fn registry_json() -> String {
    serde_json::to_string_pretty(ERROR_CODES).unwrap_or_else(|_| String::from("[]"))
}
