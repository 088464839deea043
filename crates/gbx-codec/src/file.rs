//! Decoded GBX file.

use std::path::Path;

use crate::context::CrossRefContext;
use crate::decode::{decode, Schema};
use crate::encode::encode;
use crate::header::{Compression, Header};
use crate::node::{Body, Chunk, Node, NodePool};
use crate::path::{FieldPath, Segment};
use crate::reference::ReferenceTable;
use crate::value::{Leaf, Value};
use crate::{Error, Result};

/// A decoded GBX file together with its node pool.
#[derive(Debug, Clone, PartialEq)]
pub struct GbxFile {
    pub header: Header,
    pub reference_table: ReferenceTable,
    pub body: Body,
    /// Node slots; index 0 stands for this file's own body and stays empty.
    /// After resolution the pool also holds the nodes of every loaded file.
    pub nodes: NodePool,
    /// Global index of this file's node 0.
    pub node_offset: u32,
    /// File names from the top-level file down to this one.
    pub path: Vec<String>,
}

impl GbxFile {
    /// A file built in memory, with a compressed body and no other nodes.
    pub fn new(class_id: u32, chunks: Vec<Chunk>) -> Self {
        Self {
            header: Header::new(class_id, 1),
            reference_table: ReferenceTable::default(),
            body: Body::Chunks(chunks),
            nodes: vec![None],
            node_offset: 0,
            path: Vec::new(),
        }
    }

    /// Replace the node pool, keeping the header's node count in sync.
    pub fn with_nodes(mut self, nodes: NodePool) -> Self {
        self.header.num_nodes = nodes.len() as u32;
        self.nodes = nodes;
        self
    }

    /// Decode a file with the full schema using a fresh context.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, Schema::Full)
    }

    /// Decode only the header and reference table.
    pub fn parse_header_only(data: &[u8]) -> Result<Self> {
        Self::parse_with(data, Schema::HeaderOnly)
    }

    fn parse_with(data: &[u8], schema: Schema) -> Result<Self> {
        let mut ctx = CrossRefContext::new();
        let mut nodes = NodePool::new();
        let mut file = decode(data, schema, &mut ctx, &mut nodes)?;
        file.nodes = nodes;
        Ok(file)
    }

    /// Read and decode a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Encode with a fresh context and a scratch copy of the pool.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut ctx = CrossRefContext::new();
        let mut nodes = self.nodes.clone();
        encode(self, &mut ctx, &mut nodes)
    }

    /// Encode and write to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Body chunks; empty when the body was not parsed.
    pub fn chunks(&self) -> &[Chunk] {
        match &self.body {
            Body::Chunks(chunks) => chunks,
            Body::Opaque(_) => &[],
        }
    }

    pub fn chunks_mut(&mut self) -> Option<&mut Vec<Chunk>> {
        match &mut self.body {
            Body::Chunks(chunks) => Some(chunks),
            Body::Opaque(_) => None,
        }
    }

    /// First body chunk with the given id.
    pub fn chunk(&self, chunk_id: u32) -> Option<&Chunk> {
        self.chunks().iter().find(|c| c.chunk_id == chunk_id)
    }

    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.nodes.get_mut(index).and_then(Option::as_mut)
    }

    /// Number of node slots excluding the body slot.
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// `A.Item.Gbx > B.Mesh.Gbx` style label of this file.
    pub fn breadcrumb(&self) -> String {
        self.path.join(" > ")
    }

    /// Drop the reference table and declare every pooled node as internal.
    ///
    /// Use after resolution so that the encoder writes externally loaded
    /// nodes inline.
    pub fn merge_external_nodes(&mut self) {
        self.reference_table = ReferenceTable::default();
        self.header.num_nodes = self.nodes.len().max(1) as u32;
    }

    pub fn set_body_compression(&mut self, compression: Compression) {
        self.header.format.body_compression = compression;
    }

    /// Value at `path`, e.g. `body/0/materials/1` or
    /// `nodes/3/body/0/link`.
    pub fn lookup(&self, path: &FieldPath) -> Option<&Value> {
        self.lookup_segments(path.segments())
    }

    /// Mutable leaf at `path`.
    pub fn leaf_mut(&mut self, path: &FieldPath) -> Option<&mut Leaf> {
        match self.lookup_segments_mut(path.segments())? {
            Value::Scalar(leaf) => Some(leaf),
            _ => None,
        }
    }

    fn lookup_segments(&self, segments: &[Segment]) -> Option<&Value> {
        match segments {
            [Segment::Key(k), rest @ ..] if k == "body" => chunk_value(self.chunks(), rest),
            [Segment::Key(k), Segment::Index(i), rest @ ..] if k == "nodes" => {
                match self.node(*i)? {
                    Node::Body(body) => match rest {
                        [Segment::Key(k), rest @ ..] if k == "body" => chunk_value(&body.chunks, rest),
                        _ => None,
                    },
                    Node::File(file) => file.lookup_segments(rest),
                }
            }
            _ => None,
        }
    }

    fn lookup_segments_mut(&mut self, segments: &[Segment]) -> Option<&mut Value> {
        match segments {
            [Segment::Key(k), rest @ ..] if k == "body" => chunk_value_mut(self.chunks_mut()?, rest),
            [Segment::Key(k), Segment::Index(i), rest @ ..] if k == "nodes" => {
                match self.node_mut(*i)? {
                    Node::Body(body) => match rest {
                        [Segment::Key(k), rest @ ..] if k == "body" => {
                            chunk_value_mut(&mut body.chunks, rest)
                        }
                        _ => None,
                    },
                    Node::File(file) => file.lookup_segments_mut(rest),
                }
            }
            _ => None,
        }
    }

    /// Decompressed body bytes of a header-only decode.
    pub fn opaque_body(&self) -> Result<&[u8]> {
        match &self.body {
            Body::Opaque(bytes) => Ok(bytes),
            Body::Chunks(_) => Err(Error::Unsupported("body was parsed")),
        }
    }
}

fn chunk_value<'a>(chunks: &'a [Chunk], segments: &[Segment]) -> Option<&'a Value> {
    match segments {
        [Segment::Index(c), rest @ ..] => chunks.get(*c)?.fields.get_path(rest),
        _ => None,
    }
}

fn chunk_value_mut<'a>(chunks: &'a mut [Chunk], segments: &[Segment]) -> Option<&'a mut Value> {
    match segments {
        [Segment::Index(c), rest @ ..] => chunks.get_mut(*c)?.fields.get_path_mut(rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeBody;
    use crate::schema::{
        CHUNK_ITEM_ENTITY, CHUNK_MATERIAL_MARKER, CHUNK_STATIC_OBJECT, CLASS_ITEM_MODEL,
        CLASS_MATERIAL, CLASS_STATIC_OBJECT, SKIP_MARKER,
    };
    use crate::value::{Mapping, Scalar};

    fn node_ref(index: Option<u32>) -> Value {
        Value::scalar(Scalar::NodeRef(index))
    }

    fn u32_value(v: u32) -> Value {
        Value::scalar(Scalar::U32(v))
    }

    fn item_with_nodes() -> GbxFile {
        let entity = Chunk::new(
            CHUNK_ITEM_ENTITY,
            Mapping::new()
                .with("version", u32_value(1))
                .with("entity_model", node_ref(Some(1)))
                .with(
                    "materials",
                    Value::Sequence(vec![node_ref(Some(2)), node_ref(Some(2)), node_ref(None)]),
                ),
        );
        let object = Chunk::new(
            CHUNK_STATIC_OBJECT,
            Mapping::new()
                .with("version", u32_value(3))
                .with("mesh", node_ref(None))
                .with("collidable", Value::scalar(Scalar::Bool(true)))
                .with("shape", node_ref(None)),
        );
        let marker = Chunk::new(
            CHUNK_MATERIAL_MARKER,
            Mapping::new().with("version", u32_value(0)).with("u01", u32_value(7)),
        );

        GbxFile::new(CLASS_ITEM_MODEL, vec![entity, Chunk::end_marker()]).with_nodes(vec![
            None,
            Some(Node::Body(NodeBody::new(CLASS_STATIC_OBJECT, vec![object]))),
            Some(Node::Body(NodeBody::new(CLASS_MATERIAL, vec![marker]))),
        ])
    }

    #[test]
    fn test_encode_decode_encode_is_stable() {
        let bytes = item_with_nodes().to_bytes().unwrap();
        let parsed = GbxFile::parse(&bytes).unwrap();

        assert_eq!(parsed.header.num_nodes, 3);
        assert_eq!(parsed.nb_nodes(), 2);
        assert_eq!(parsed.node(1).unwrap().class_id(), CLASS_STATIC_OBJECT);
        assert_eq!(parsed.node(2).unwrap().class_id(), CLASS_MATERIAL);
        // the encoder terminates node chunk lists even when the caller did not
        assert!(parsed.node(1).unwrap().chunks()[1].is_end_marker());

        assert_eq!(parsed.to_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_lookup_paths() {
        let bytes = item_with_nodes().to_bytes().unwrap();
        let parsed = GbxFile::parse(&bytes).unwrap();

        let materials_1: FieldPath = "body/0/materials/1".parse().unwrap();
        assert_eq!(
            parsed.lookup(&materials_1).and_then(Value::as_scalar),
            Some(&Scalar::NodeRef(Some(2)))
        );

        let u01: FieldPath = "nodes/2/body/0/u01".parse().unwrap();
        assert_eq!(
            parsed.lookup(&u01).and_then(Value::as_scalar),
            Some(&Scalar::U32(7))
        );
        assert!(parsed.lookup(&"nodes/0/body/0".parse().unwrap()).is_none());
    }

    #[test]
    fn test_leaf_edit_survives_round_trip() {
        let bytes = item_with_nodes().to_bytes().unwrap();
        let mut parsed = GbxFile::parse(&bytes).unwrap();

        let path: FieldPath = "nodes/1/body/0/collidable".parse().unwrap();
        parsed.leaf_mut(&path).unwrap().apply_bytes(0, &[0]).unwrap();

        let reparsed = GbxFile::parse(&parsed.to_bytes().unwrap()).unwrap();
        assert_eq!(
            reparsed.lookup(&path).and_then(Value::as_scalar),
            Some(&Scalar::Bool(false))
        );
    }

    #[test]
    fn test_uncompressed_body() {
        let mut file = item_with_nodes();
        file.set_body_compression(Compression::Uncompressed);
        let bytes = file.to_bytes().unwrap();

        let parsed = GbxFile::parse(&bytes).unwrap();
        assert_eq!(parsed.header.format.body_compression, Compression::Uncompressed);
        // the body is the file tail, ending with the root's end marker
        assert_eq!(bytes[bytes.len() - 4..], 0xFACA_DE01u32.to_le_bytes());
    }

    #[test]
    fn test_unknown_skippable_chunk_is_carried() {
        let mut body = Vec::new();
        body.extend_from_slice(&0x0301_9000u32.to_le_bytes());
        body.extend_from_slice(&SKIP_MARKER.to_le_bytes());
        body.extend_from_slice(&3u32.to_le_bytes());
        body.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        body.extend_from_slice(&0xFACA_DE01u32.to_le_bytes());

        let mut file = GbxFile::new(CLASS_ITEM_MODEL, Vec::new());
        file.set_body_compression(Compression::Uncompressed);
        let mut data = file.to_bytes().unwrap();
        // replace the lone end marker with the handcrafted body
        data.truncate(data.len() - 4);
        data.extend_from_slice(&body);

        let parsed = GbxFile::parse(&data).unwrap();
        let chunk = &parsed.chunks()[0];
        assert!(chunk.skippable);
        assert_eq!(chunk.fields.scalar("data"), Some(&Scalar::Bytes(vec![0xAA, 0xBB, 0xCC])));
        assert_eq!(parsed.to_bytes().unwrap(), data);
    }

    #[test]
    fn test_unknown_chunk_is_an_error() {
        let mut file = GbxFile::new(CLASS_ITEM_MODEL, Vec::new());
        file.set_body_compression(Compression::Uncompressed);
        let mut data = file.to_bytes().unwrap();
        data.truncate(data.len() - 4);
        data.extend_from_slice(&0x0301_9000u32.to_le_bytes());
        data.extend_from_slice(&[0; 8]);

        assert!(matches!(
            GbxFile::parse(&data),
            Err(Error::UnknownChunk { chunk_id: 0x0301_9000, .. })
        ));
    }

    #[test]
    fn test_dangling_reference() {
        let mut file = item_with_nodes();
        file.nodes[2] = None;
        assert!(matches!(
            file.to_bytes(),
            Err(Error::DanglingNodeRef { index: 2 })
        ));
    }

    #[test]
    fn test_out_of_range_reference() {
        let bytes = item_with_nodes().to_bytes().unwrap();
        let mut parsed = GbxFile::parse_header_only(&bytes).unwrap();
        assert_eq!(parsed.nodes.len(), 3);

        // shrink the declared pool so that node 2 no longer fits
        parsed.header.num_nodes = 2;
        parsed.set_body_compression(Compression::Uncompressed);
        let data = parsed.to_bytes().unwrap();
        assert!(matches!(
            GbxFile::parse(&data),
            Err(Error::InvalidNodeIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_header_only_keeps_body_bytes() {
        let bytes = item_with_nodes().to_bytes().unwrap();
        let mut parsed = GbxFile::parse_header_only(&bytes).unwrap();
        assert!(parsed.chunks().is_empty());
        assert!(parsed.chunks_mut().is_none());

        parsed.set_body_compression(Compression::Uncompressed);
        let normalized = parsed.to_bytes().unwrap();
        let full = GbxFile::parse(&normalized).unwrap();
        assert_eq!(full.node(2).unwrap().class_id(), CLASS_MATERIAL);
        assert!(full.opaque_body().is_err());
    }

    #[test]
    fn test_merge_external_nodes() {
        let mut file = item_with_nodes();
        file.reference_table.external_nodes.push(
            crate::reference::ExternalNodeRef::file(0, "Other.Mesh.Gbx", 3),
        );
        file.nodes.push(None);
        file.merge_external_nodes();
        assert!(file.reference_table.is_empty());
        assert_eq!(file.header.num_nodes, 4);
    }

    #[test]
    fn test_node_count_larger_than_body() {
        let bytes = item_with_nodes().to_bytes().unwrap();
        let mut parsed = GbxFile::parse_header_only(&bytes).unwrap();
        parsed.header.num_nodes = u32::MAX;
        parsed.set_body_compression(Compression::Uncompressed);
        let data = parsed.to_bytes().unwrap();

        assert!(matches!(
            GbxFile::parse(&data),
            Err(Error::TooManyNodes { declared: u32::MAX, .. })
        ));
        assert!(matches!(
            GbxFile::parse_header_only(&data),
            Err(Error::TooManyNodes { .. })
        ));
    }
}
