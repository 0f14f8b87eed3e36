use std::{fmt, sync::Arc};

/// Structural identity of a primitive, string or null value.
///
/// Floating-point values key by bit pattern, so `0.0` and `-0.0` are distinct
/// and a NaN matches only the same NaN payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantKey {
    Null,
    Integral(i64),
    Bits(u64),
    Bool(bool),
    Str(Arc<str>),
}

impl fmt::Display for ConstantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantKey::Null => f.write_str("null"),
            ConstantKey::Integral(v) => write!(f, "{}", v),
            ConstantKey::Bits(bits) => write!(f, "0x{:016x}", bits),
            ConstantKey::Bool(v) => write!(f, "{}", v),
            ConstantKey::Str(v) => write!(f, "{:?}", v),
        }
    }
}
