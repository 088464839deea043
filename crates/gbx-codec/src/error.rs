//! Error types for GBX decoding and encoding.

use thiserror::Error;

/// Errors that can occur when decoding, encoding or editing GBX data.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Byte-level reader or writer error.
    #[error("{0}")]
    Common(#[from] gbx_common::Error),

    /// Container version other than 6.
    #[error("unsupported GBX version {0}")]
    UnsupportedVersion(u16),

    /// Unexpected format byte in the header.
    #[error("invalid format byte {:?}", char::from(*.0))]
    InvalidFormat(u8),

    /// Valid GBX feature this codec does not handle.
    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    /// A declared section size disagrees with its content.
    #[error("{section} size mismatch: declared {expected}, got {actual}")]
    SizeMismatch {
        section: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Data left over after a section was fully decoded.
    #[error("{count} trailing bytes after {section}")]
    TrailingBytes { section: &'static str, count: usize },

    /// Chunk without a schema that is not marked skippable.
    #[error("unknown chunk 0x{chunk_id:08X} at offset {offset}")]
    UnknownChunk { chunk_id: u32, offset: usize },

    /// Node reference outside the node pool.
    #[error("node index {index} out of bounds (pool size: {count})")]
    InvalidNodeIndex { index: u32, count: usize },

    /// Declared node count the body is too small to hold.
    #[error("header declares {declared} nodes, body can hold at most {limit}")]
    TooManyNodes { declared: u32, limit: usize },

    /// Nesting beyond what any real file uses.
    #[error("{section} nested deeper than {limit} levels")]
    NestingTooDeep { section: &'static str, limit: usize },

    /// Node reference with nothing to write: the slot is empty, not external
    /// and was not written earlier.
    #[error("dangling node reference to global index {index}")]
    DanglingNodeRef { index: u32 },

    /// Lookback index pointing past the string table.
    #[error("invalid lookback id 0x{0:08X}")]
    InvalidLookback(u32),

    /// Lookback table version other than 3.
    #[error("unsupported lookback version {0}")]
    UnsupportedLookbackVersion(u32),

    /// Mapping lacks a field its chunk layout requires.
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    /// Value does not match the declared field kind.
    #[error("field `{field}`: expected {expected}, found {actual}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    /// Chunk access or encoding of a file decoded header-only.
    #[error("body was not parsed")]
    OpaqueBody,

    /// Compression failure.
    #[error("compression error: {0}")]
    Compression(String),

    /// Decompression failure.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Byte edit outside the inspected span.
    #[error("edit of {len} bytes at offset {offset} exceeds span of {size} bytes")]
    EditOutOfRange {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Leaf whose bytes depend on stream context.
    #[error("{0} values cannot be edited byte-wise")]
    NotByteEditable(&'static str),

    /// Edit that would change the encoded length of a leaf.
    #[error("edit changes the encoded length of a {0} value")]
    EditChangesLength(&'static str),
}

/// Result type for GBX codec operations.
pub type Result<T> = std::result::Result<T, Error>;
