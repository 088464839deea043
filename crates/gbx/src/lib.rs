//! GBX - node graph resolution and round-trip serialization for the chunked
//! binary containers of the Trackmania games.
//!
//! This crate provides a unified interface to the GBX library ecosystem.
//!
//! # Crates
//!
//! - [`gbx_common`] - Little-endian binary reading and writing
//! - [`gbx_codec`] - Header, reference table and body chunk codec
//! - [`gbx_resolve`] - External node loading, synthetic materials, verification
//! - [`gbx_view`] - Display projection and byte-level editing
//!
//! # Example
//!
//! ```no_run
//! use gbx::prelude::*;
//!
//! // Resolve an item and every file it references
//! let mut file = load("Cactus.Item.Gbx")?;
//! println!("{} nodes", file.nb_nodes());
//!
//! // Inline the external nodes and check the output decodes again
//! file.merge_external_nodes();
//! let report = build_and_check(&file)?;
//! std::fs::write("Cactus.Merged.Item.Gbx", &report.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use gbx_codec as codec;
pub use gbx_common as common;
pub use gbx_resolve as resolve;
pub use gbx_view as view;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use gbx_codec::{Body, Chunk, Compression, FieldPath, GbxFile, Node, Scalar, Value};
    pub use gbx_common::{BinaryReader, BinaryWriter};
    pub use gbx_resolve::{
        build_and_check, load, normalize_compression, CheckReport, LoadOptions, Loader,
        MaterialVariant,
    };
    pub use gbx_view::{apply_edit, project_file, ByteInspector, ByteSpan, DisplayNode};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
