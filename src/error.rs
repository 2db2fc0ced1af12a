//! Core error taxonomy (see `spec.md` §7 and `SPEC_FULL.md` §7).

use std::fmt;

/// Fatal, initialization-time errors. Everything past construction is
/// infallible: out-of-range keyboard input and speaker buffer overflow are
/// silently absorbed rather than reported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// `Memory48k::load_rom` was handed an image that isn't exactly 16 KiB.
    RomSize { expected: usize, actual: usize },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::RomSize { expected, actual } => write!(
                f,
                "ROM image must be exactly {expected} bytes, got {actual}"
            ),
        }
    }
}

impl std::error::Error for CoreError {}
