//! Error types for GBX resolution.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a resolution or verification pass.
///
/// Every variant carries the breadcrumb of file names from the top-level file
/// down to the file that failed, e.g. `A.Item.Gbx > B.Mesh.Gbx`.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced file is missing or unreadable.
    #[error("{breadcrumb}: cannot read {}: {source}", path.display())]
    MissingReference {
        breadcrumb: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// The codec rejected a file, or a rebuilt graph could not be encoded.
    #[error("{breadcrumb}: {source}")]
    Codec {
        breadcrumb: String,
        source: gbx_codec::Error,
    },

    /// A file is referenced while it is still being loaded.
    #[error("{breadcrumb}: cyclic reference to {}", path.display())]
    CyclicReference { breadcrumb: String, path: PathBuf },

    /// External node pointing at a game resource instead of a file.
    #[error("{breadcrumb}: external node {node_index} refers to resource {resource}")]
    UnsupportedReference {
        breadcrumb: String,
        node_index: u32,
        resource: u32,
    },

    /// External node naming a folder the table does not have.
    #[error("{breadcrumb}: folder index {folder_index} out of range ({count} folders)")]
    InvalidFolderIndex {
        breadcrumb: String,
        folder_index: u32,
        count: usize,
    },

    /// External node slot outside the file's node pool.
    #[error("{breadcrumb}: external node index {node_index} out of range (pool size: {count})")]
    InvalidNodeIndex {
        breadcrumb: String,
        node_index: u32,
        count: usize,
    },
}

impl Error {
    /// Breadcrumb of the file that failed.
    pub fn breadcrumb(&self) -> &str {
        match self {
            Error::MissingReference { breadcrumb, .. }
            | Error::Codec { breadcrumb, .. }
            | Error::CyclicReference { breadcrumb, .. }
            | Error::UnsupportedReference { breadcrumb, .. }
            | Error::InvalidFolderIndex { breadcrumb, .. }
            | Error::InvalidNodeIndex { breadcrumb, .. } => breadcrumb,
        }
    }
}

/// Result type for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;
