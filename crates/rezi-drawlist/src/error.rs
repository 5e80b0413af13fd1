use thiserror::Error;

/// Sticky builder failure. Once recorded, every subsequent operation on the
/// builder is a no-op and `build()` keeps returning this same failure until
/// `reset()`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawlistError {
    #[error("ZRDL_INVALID_OP: {0}")]
    InvalidOp(String),

    #[error("ZRDL_TOO_LARGE: {0}")]
    TooLarge(String),
}

impl DrawlistError {
    pub fn code(&self) -> &'static str {
        match self {
            DrawlistError::InvalidOp(_) => "ZRDL_INVALID_OP",
            DrawlistError::TooLarge(_) => "ZRDL_TOO_LARGE",
        }
    }
}

/// Wire-format parse failures, distinct from builder-side sticky failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("ZRUI_PROTOCOL_ERROR: buffer too short for a 64-byte header ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("ZRUI_PROTOCOL_ERROR: bad magic {0:#010x}")]
    BadMagic(u32),

    #[error("ZRUI_PROTOCOL_ERROR: unsupported version {0} (builder emits up to {1})")]
    UnsupportedVersion(u32, u32),

    #[error("ZRUI_PROTOCOL_ERROR: {0}")]
    Malformed(String),

    #[error("ZRUI_PROTOCOL_ERROR: string/blob index {index} out of bounds (table has {count})")]
    IndexOutOfBounds { index: u32, count: u32 },
}
