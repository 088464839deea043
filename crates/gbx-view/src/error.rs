//! Error types for the view layer.

use thiserror::Error;

/// Errors that can occur when projecting or editing a decoded file.
#[derive(Debug, Error)]
pub enum Error {
    /// Codec error, including rejected leaf edits.
    #[error("{0}")]
    Codec(#[from] gbx_codec::Error),

    /// No editable value at the given path.
    #[error("no editable value at `{0}`")]
    UnknownPath(String),

    /// JSON serialization error.
    #[cfg(feature = "json")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, Error>;
