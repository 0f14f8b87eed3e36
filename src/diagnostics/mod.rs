//! Error taxonomy and stable error codes.
pub mod error;
pub mod error_codes;
pub mod registry;

pub use error::{InvokeError, LambdaSlot};
pub use error_codes::ErrorCode;
pub use registry::{ERROR_CODES, lookup_code};
