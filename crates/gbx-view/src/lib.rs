//! Tree view and byte editing for decoded GBX files.
//!
//! [`project_file`] turns a [`GbxFile`](gbx_codec::GbxFile) into a tree of
//! [`DisplayNode`]s suitable for any tree widget or a text dump. Byte leaves
//! carry a [`ByteSpan`]; activating them hands the bytes to a
//! [`ByteInspector`], and [`apply_edit`] routes the edited bytes back to the
//! owning value.
//!
//! # Example
//!
//! ```no_run
//! use gbx_codec::GbxFile;
//! use gbx_view::{apply_edit, byte_spans, project_file};
//!
//! let mut file = GbxFile::open("Cactus.Item.Gbx")?;
//! let tree = project_file(&file);
//! print!("{}", tree.render(Some(3)));
//!
//! if let Some(span) = byte_spans(&tree).first() {
//!     let path = span.path.clone();
//!     apply_edit(&mut file, &path, 0, &[0x00])?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod display;
mod edit;
mod error;
mod inspect;

pub use display::{
    project_file, project_leaf, project_mapping, project_value, ByteSpan, DisplayKind,
    DisplayNode, TreeText,
};
pub use edit::apply_edit;
pub use error::{Error, Result};
pub use inspect::{activate, byte_spans, hex_dump, ByteInspector};

/// Pretty-printed JSON of a display tree.
#[cfg(feature = "json")]
pub fn to_json(node: &DisplayNode) -> Result<String> {
    Ok(serde_json::to_string_pretty(node)?)
}
