//! Chunks, node bodies and the node pool.

use crate::schema::{self, ChunkSchema, END_MARKER};
use crate::value::{Mapping, RawCopy, Scalar};
use crate::GbxFile;

/// One versioned body chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chunk_id: u32,
    /// Whether the chunk is framed with a `"PIKS"` tag and size.
    pub skippable: bool,
    /// Parsed fields. Chunks without a schema hold a single `data` blob.
    pub fields: Mapping,
    /// Exact bytes of the chunk, including its id.
    pub raw: RawCopy,
}

impl Chunk {
    /// A non-skippable chunk built in memory.
    pub fn new(chunk_id: u32, fields: Mapping) -> Self {
        Self {
            chunk_id,
            skippable: false,
            fields,
            raw: RawCopy::default(),
        }
    }

    /// The `0xFACADE01` terminator.
    pub fn end_marker() -> Self {
        Self::new(END_MARKER, Mapping::new())
    }

    pub fn is_end_marker(&self) -> bool {
        self.chunk_id == END_MARKER
    }

    /// Catalog layout for this chunk, if known.
    pub fn schema(&self) -> Option<&'static ChunkSchema> {
        schema::lookup(self.chunk_id)
    }

    /// The chunk's `version` field, when it has one.
    pub fn version(&self) -> Option<u32> {
        self.fields.scalar("version").and_then(Scalar::as_u32)
    }
}

/// An in-file node: a class id and its chunk list.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBody {
    pub class_id: u32,
    pub chunks: Vec<Chunk>,
    /// Diagnostic breadcrumb set by the resolver.
    pub path: Option<String>,
}

impl NodeBody {
    pub fn new(class_id: u32, chunks: Vec<Chunk>) -> Self {
        Self {
            class_id,
            chunks,
            path: None,
        }
    }

    /// First chunk with the given id.
    pub fn chunk(&self, chunk_id: u32) -> Option<&Chunk> {
        self.chunks.iter().find(|c| c.chunk_id == chunk_id)
    }

    pub fn chunk_mut(&mut self, chunk_id: u32) -> Option<&mut Chunk> {
        self.chunks.iter_mut().find(|c| c.chunk_id == chunk_id)
    }
}

/// Content of one node pool slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Node decoded inline, or synthesized in memory.
    Body(NodeBody),
    /// A referenced file loaded into this slot.
    File(Box<GbxFile>),
}

impl Node {
    pub fn class_id(&self) -> u32 {
        match self {
            Node::Body(body) => body.class_id,
            Node::File(file) => file.header.class_id,
        }
    }

    /// Chunk list; empty for a file whose body was not parsed.
    pub fn chunks(&self) -> &[Chunk] {
        match self {
            Node::Body(body) => &body.chunks,
            Node::File(file) => file.chunks(),
        }
    }

    pub fn chunks_mut(&mut self) -> Option<&mut Vec<Chunk>> {
        match self {
            Node::Body(body) => Some(&mut body.chunks),
            Node::File(file) => file.chunks_mut(),
        }
    }

    /// Human-readable breadcrumb, if one was assigned.
    pub fn path_label(&self) -> Option<String> {
        match self {
            Node::Body(body) => body.path.clone(),
            Node::File(file) if file.path.is_empty() => None,
            Node::File(file) => Some(file.path.join(" > ")),
        }
    }
}

/// Locally or globally numbered node slots. Index 0 is the owning file's
/// body and stays empty.
pub type NodePool = Vec<Option<Node>>;

/// A file body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Chunks parsed with the full schema.
    Chunks(Vec<Chunk>),
    /// Decompressed body bytes left unparsed by the header-only schema.
    Opaque(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_chunk_version() {
        let chunk = Chunk::new(
            0x090F_D001,
            Mapping::new().with("version", Value::scalar(Scalar::U32(5))),
        );
        assert_eq!(chunk.version(), Some(5));
        assert!(chunk.schema().is_some());
        assert!(Chunk::new(0x1234, Mapping::new()).schema().is_none());
    }

    #[test]
    fn test_node_body_lookup() {
        let mut body = NodeBody::new(0x090F_D000, vec![Chunk::end_marker()]);
        assert!(body.chunk(END_MARKER).unwrap().is_end_marker());
        assert!(body.chunk_mut(0x090F_D000).is_none());
        assert_eq!(Node::Body(body).class_id(), 0x090F_D000);
    }
}
