//! Error types for gbx-common.

use thiserror::Error;

/// Common error type for byte-level GBX operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading.
    #[error("unexpected end of buffer at offset {offset}: needed {needed} bytes but only {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Invalid magic bytes encountered.
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    /// A length prefix does not fit in the writer's `u32` field.
    #[error("length {0} does not fit in a u32 prefix")]
    LengthOverflow(usize),

    /// Back-patch target outside of the written buffer.
    #[error("patch offset {offset} out of bounds (buffer length {len})")]
    PatchOutOfBounds { offset: usize, len: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
