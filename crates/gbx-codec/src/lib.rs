//! Codec for GBX, the chunked binary container used by the Trackmania games.
//!
//! A GBX file is a header, a reference table naming external files, and a
//! (usually compressed) body. The body is a list of versioned chunks whose
//! fields may reference other nodes; those nodes are serialized inline at
//! their first reference and by index afterwards.
//!
//! # Example
//!
//! ```no_run
//! use gbx_codec::{FieldPath, GbxFile};
//!
//! let file = GbxFile::open("Cactus.Item.Gbx")?;
//! println!("{} nodes", file.nb_nodes());
//!
//! let path: FieldPath = "body/0/version".parse()?;
//! if let Some(value) = file.lookup(&path) {
//!     println!("{:?}", value);
//! }
//!
//! // decoding then encoding an unmodified file reproduces it byte for byte
//! assert_eq!(file.to_bytes()?, std::fs::read("Cactus.Item.Gbx")?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod compress;
mod context;
mod decode;
mod encode;
mod error;
mod file;
mod header;
mod node;
mod path;
mod reference;
pub mod schema;
mod value;

pub use context::CrossRefContext;
pub use decode::{decode, Schema};
pub use encode::encode;
pub use error::{Error, Result};
pub use file::GbxFile;
pub use header::{Compression, Format, Header, HeaderChunk, HeaderChunkEntry, GBX_MAGIC, SUPPORTED_VERSION};
pub use node::{Body, Chunk, Node, NodeBody, NodePool};
pub use path::{FieldPath, Segment};
pub use reference::{ExternalNodeRef, ExternalTarget, FolderNode, ReferenceTable};
pub use value::{Leaf, LookbackId, Mapping, RawCopy, Scalar, Value};
