//! GBX decoder.

use gbx_common::BinaryReader;

use crate::compress;
use crate::context::{CrossRefContext, LOOKBACK_VERSION};
use crate::header::{Compression, Header};
use crate::node::{Body, Chunk, Node, NodeBody, NodePool};
use crate::reference::ReferenceTable;
use crate::schema::{self, FieldDef, FieldKind, END_MARKER, SKIP_MARKER};
use crate::value::{Leaf, LookbackId, Mapping, RawCopy, Scalar, Value};
use crate::{Error, GbxFile, Result};

/// Null node reference.
pub(crate) const NULL_NODE: u32 = 0xFFFF_FFFF;
/// Empty lookback id.
pub(crate) const EMPTY_LOOKBACK: u32 = 0xFFFF_FFFF;
/// Top bits marking a lookback id as a string.
pub(crate) const LOOKBACK_STRING: u32 = 0x4000_0000;
pub(crate) const LOOKBACK_FLAGS: u32 = 0xC000_0000;
/// Deepest chain of inline nodes accepted when reading.
pub(crate) const MAX_NODE_DEPTH: usize = 64;
/// Smallest encoding of an inline node: class id and end marker.
const MIN_NODE_SIZE: usize = 8;

/// How much of a file to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Header, reference table and every body chunk.
    Full,
    /// Header and reference table; the body stays as decompressed bytes.
    HeaderOnly,
}

/// Decode a complete GBX file.
///
/// `nodes` is resized to the header's node count and receives every node
/// decoded inline. The returned file has an empty pool and breadcrumb; callers
/// attach the pool (see [`GbxFile::parse`]) once they are done with it.
pub fn decode(
    data: &[u8],
    schema: Schema,
    ctx: &mut CrossRefContext,
    nodes: &mut NodePool,
) -> Result<GbxFile> {
    let mut reader = BinaryReader::new(data);
    let header = Header::read(&mut reader)?;

    if header.format.ref_table_compression == Compression::Compressed {
        return Err(Error::Unsupported("compressed reference table"));
    }
    let reference_table = ReferenceTable::read(&mut reader)?;

    let body_bytes = match header.format.body_compression {
        Compression::Compressed => {
            let uncompressed_size = reader.read_u32()? as usize;
            let compressed_size = reader.read_u32()? as usize;
            let compressed = reader.read_bytes(compressed_size)?;
            if !reader.is_empty() {
                return Err(Error::TrailingBytes {
                    section: "compressed body",
                    count: reader.remaining(),
                });
            }
            compress::decompress(compressed, uncompressed_size)?
        }
        Compression::Uncompressed => reader.remaining_bytes().to_vec(),
    };

    let limit = body_bytes.len() / MIN_NODE_SIZE + 1 + reference_table.external_nodes.len();
    if header.num_nodes as usize > limit {
        return Err(Error::TooManyNodes {
            declared: header.num_nodes,
            limit,
        });
    }
    nodes.clear();
    nodes.resize_with(header.num_nodes as usize, || None);

    let body = match schema {
        Schema::HeaderOnly => Body::Opaque(body_bytes),
        Schema::Full => {
            ctx.begin_body(reference_table.external_nodes.iter().map(|r| r.node_index));
            let mut decoder = BodyDecoder {
                reader: BinaryReader::new(&body_bytes),
                ctx,
                nodes,
                depth: 0,
            };
            let chunks = decoder.read_chunks()?;
            if !decoder.reader.is_empty() {
                return Err(Error::TrailingBytes {
                    section: "body",
                    count: decoder.reader.remaining(),
                });
            }
            Body::Chunks(chunks)
        }
    };

    Ok(GbxFile {
        header,
        reference_table,
        body,
        nodes: Vec::new(),
        node_offset: 0,
        path: Vec::new(),
    })
}

struct BodyDecoder<'a, 'c> {
    reader: BinaryReader<'a>,
    ctx: &'c mut CrossRefContext,
    nodes: &'c mut NodePool,
    /// Inline nodes currently being decoded.
    depth: usize,
}

impl BodyDecoder<'_, '_> {
    /// Read chunks up to and including the end marker.
    fn read_chunks(&mut self) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        loop {
            let start = self.reader.position();
            let chunk_id = self.reader.read_u32()?;

            if chunk_id == END_MARKER {
                chunks.push(Chunk {
                    chunk_id,
                    skippable: false,
                    fields: Mapping::new(),
                    raw: RawCopy::new(start, self.reader.consumed_since(start)),
                });
                return Ok(chunks);
            }

            let skippable = self.reader.peek_u32().ok() == Some(SKIP_MARKER);
            let fields = if skippable {
                self.reader.read_u32()?;
                self.read_skippable(chunk_id)?
            } else {
                let layout = schema::lookup(chunk_id).ok_or(Error::UnknownChunk {
                    chunk_id,
                    offset: start,
                })?;
                self.read_fields(layout.fields)?
            };

            chunks.push(Chunk {
                chunk_id,
                skippable,
                fields,
                raw: RawCopy::new(start, self.reader.consumed_since(start)),
            });
        }
    }

    fn read_skippable(&mut self, chunk_id: u32) -> Result<Mapping> {
        let Some(layout) = schema::lookup(chunk_id) else {
            let start = self.reader.position();
            let data = self.reader.read_data()?;
            tracing::debug!(
                chunk_id = format_args!("0x{chunk_id:08X}"),
                size = data.len(),
                "keeping unknown skippable chunk as bytes"
            );
            let leaf = Leaf {
                scalar: Scalar::Bytes(data.to_vec()),
                raw: RawCopy::new(start, self.reader.consumed_since(start)),
            };
            return Ok(Mapping::new().with("data", Value::Scalar(leaf)));
        };

        let size = self.reader.read_u32()? as usize;
        let start = self.reader.position();
        let fields = self.read_fields(layout.fields)?;
        let consumed = self.reader.position() - start;
        if consumed != size {
            return Err(Error::SizeMismatch {
                section: layout.name,
                expected: size,
                actual: consumed,
            });
        }
        Ok(fields)
    }

    fn read_fields(&mut self, fields: &'static [FieldDef]) -> Result<Mapping> {
        let mut mapping = Mapping::new();
        for def in fields {
            let value = self.read_value(def.kind)?;
            mapping.insert(def.name, value);
        }
        Ok(mapping)
    }

    fn read_value(&mut self, kind: FieldKind) -> Result<Value> {
        match kind {
            FieldKind::List(element) => {
                let count = self.reader.read_u32()? as usize;
                let mut items = Vec::with_capacity(count.min(self.reader.remaining()));
                for _ in 0..count {
                    items.push(self.read_value(*element)?);
                }
                Ok(Value::Sequence(items))
            }
            FieldKind::Struct(fields) => Ok(Value::Mapping(self.read_fields(fields)?)),
            scalar_kind => {
                let start = self.reader.position();
                let scalar = self.read_scalar(scalar_kind)?;
                Ok(Value::Scalar(Leaf {
                    scalar,
                    raw: RawCopy::new(start, self.reader.consumed_since(start)),
                }))
            }
        }
    }

    fn read_scalar(&mut self, kind: FieldKind) -> Result<Scalar> {
        Ok(match kind {
            FieldKind::Bool => Scalar::Bool(self.reader.read_bool()?),
            FieldKind::U8 => Scalar::U8(self.reader.read_u8()?),
            FieldKind::U16 => Scalar::U16(self.reader.read_u16()?),
            FieldKind::U32 => Scalar::U32(self.reader.read_u32()?),
            FieldKind::I32 => Scalar::I32(self.reader.read_i32()?),
            FieldKind::F32 => Scalar::F32(self.reader.read_f32()?),
            FieldKind::String => Scalar::String(self.reader.read_string()?.to_owned()),
            FieldKind::Data => Scalar::Bytes(self.reader.read_data()?.to_vec()),
            FieldKind::Id => Scalar::Id(self.read_lookback()?),
            FieldKind::NodeRef => Scalar::NodeRef(self.read_node_ref()?),
            FieldKind::List(_) | FieldKind::Struct(_) => {
                return Err(Error::Unsupported("nested value where a scalar was expected"))
            }
        })
    }

    fn read_lookback(&mut self) -> Result<LookbackId> {
        if self.ctx.start_lookback() {
            let version = self.reader.read_u32()?;
            if version != LOOKBACK_VERSION {
                return Err(Error::UnsupportedLookbackVersion(version));
            }
        }

        let raw = self.reader.read_u32()?;
        if raw == EMPTY_LOOKBACK {
            return Ok(LookbackId::Empty);
        }
        if raw & LOOKBACK_FLAGS == 0 {
            return Ok(LookbackId::Number(raw));
        }

        let index = raw & !LOOKBACK_FLAGS;
        if index == 0 {
            let name = self.reader.read_string()?.to_owned();
            self.ctx.intern(name.clone());
            return Ok(LookbackId::Name(name));
        }

        self.ctx
            .lookup_string(index as usize - 1)
            .map(|s| LookbackId::Name(s.to_owned()))
            .ok_or(Error::InvalidLookback(raw))
    }

    /// Read a node reference, decoding the node inline on first sight.
    fn read_node_ref(&mut self) -> Result<Option<u32>> {
        let index = self.reader.read_u32()?;
        if index == NULL_NODE {
            return Ok(None);
        }
        if self.ctx.is_external(index) {
            return Ok(Some(index));
        }

        let slot = index as usize;
        if slot == 0 || slot >= self.nodes.len() {
            return Err(Error::InvalidNodeIndex {
                index,
                count: self.nodes.len(),
            });
        }
        if self.nodes[slot].is_some() || self.ctx.is_in_progress(index) {
            return Ok(Some(index));
        }

        if self.depth >= MAX_NODE_DEPTH {
            return Err(Error::NestingTooDeep {
                section: "inline nodes",
                limit: MAX_NODE_DEPTH,
            });
        }

        self.ctx.enter_node(index);
        self.depth += 1;
        let class_id = self.reader.read_u32()?;
        let chunks = self.read_chunks()?;
        self.depth -= 1;
        self.ctx.leave_node(index);

        self.nodes[slot] = Some(Node::Body(NodeBody::new(class_id, chunks)));
        Ok(Some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder<'a, 'c>(
        data: &'a [u8],
        ctx: &'c mut CrossRefContext,
        nodes: &'c mut NodePool,
    ) -> BodyDecoder<'a, 'c> {
        BodyDecoder {
            reader: BinaryReader::new(data),
            ctx,
            nodes,
            depth: 0,
        }
    }

    #[test]
    fn test_lookback_ids() {
        let mut bytes = Vec::new();
        for word in [LOOKBACK_VERSION, LOOKBACK_STRING, 7] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(b"Stadium");
        for word in [26, LOOKBACK_STRING | 1, EMPTY_LOOKBACK] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }

        let mut ctx = CrossRefContext::new();
        let mut nodes = NodePool::new();
        ctx.begin_body([]);
        let mut d = decoder(&bytes, &mut ctx, &mut nodes);

        let stadium = LookbackId::Name("Stadium".into());
        assert_eq!(d.read_lookback().unwrap(), stadium);
        assert_eq!(d.read_lookback().unwrap(), LookbackId::Number(26));
        assert_eq!(d.read_lookback().unwrap(), stadium);
        assert_eq!(d.read_lookback().unwrap(), LookbackId::Empty);
        assert!(d.reader.is_empty());
    }

    #[test]
    fn test_lookback_past_table() {
        let mut bytes = LOOKBACK_VERSION.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(LOOKBACK_STRING | 2).to_le_bytes());

        let mut ctx = CrossRefContext::new();
        let mut nodes = NodePool::new();
        ctx.begin_body([]);
        let mut d = decoder(&bytes, &mut ctx, &mut nodes);
        assert!(matches!(
            d.read_lookback(),
            Err(Error::InvalidLookback(0x4000_0002))
        ));
    }

    #[test]
    fn test_external_and_null_refs_read_no_body() {
        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&NULL_NODE.to_le_bytes());

        let mut ctx = CrossRefContext::new();
        let mut nodes: NodePool = vec![None, None, None];
        ctx.begin_body([2]);
        let mut d = decoder(&bytes, &mut ctx, &mut nodes);
        assert_eq!(d.read_node_ref().unwrap(), Some(2));
        assert_eq!(d.read_node_ref().unwrap(), None);
        assert!(d.reader.is_empty());
        assert!(nodes[2].is_none());
    }

    #[test]
    fn test_self_reference_is_a_backref() {
        // node 1 holds a static object whose mesh points back at node 1
        let mut bytes = Vec::new();
        for word in [1, schema::CLASS_STATIC_OBJECT, schema::CHUNK_STATIC_OBJECT, 3, 1, 0] {
            bytes.extend_from_slice(&u32::to_le_bytes(word));
        }
        for word in [NULL_NODE, END_MARKER] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }

        let mut ctx = CrossRefContext::new();
        let mut nodes: NodePool = vec![None, None];
        ctx.begin_body([]);
        let mut d = decoder(&bytes, &mut ctx, &mut nodes);
        assert_eq!(d.read_node_ref().unwrap(), Some(1));
        assert!(d.reader.is_empty());

        let node = nodes[1].as_ref().unwrap();
        assert_eq!(
            node.chunks()[0].fields.scalar("mesh"),
            Some(&Scalar::NodeRef(Some(1)))
        );
    }

    fn static_object_chain(len: u32) -> Vec<u8> {
        // node i is a static object whose mesh is node i + 1
        let mut bytes = Vec::new();
        for i in 1..=len {
            for word in [i, schema::CLASS_STATIC_OBJECT, schema::CHUNK_STATIC_OBJECT, 3] {
                bytes.extend_from_slice(&word.to_le_bytes());
            }
        }
        bytes.extend_from_slice(&NULL_NODE.to_le_bytes());
        for _ in 0..len {
            for word in [0, NULL_NODE, END_MARKER] {
                bytes.extend_from_slice(&u32::to_le_bytes(word));
            }
        }
        bytes
    }

    #[test]
    fn test_inline_node_chain_within_limit() {
        let len = MAX_NODE_DEPTH as u32;
        let bytes = static_object_chain(len);

        let mut ctx = CrossRefContext::new();
        let mut nodes: NodePool = (0..=len).map(|_| None).collect();
        ctx.begin_body([]);
        let mut d = decoder(&bytes, &mut ctx, &mut nodes);
        assert_eq!(d.read_node_ref().unwrap(), Some(1));
        assert!(d.reader.is_empty());
        assert!(nodes.iter().skip(1).all(Option::is_some));
    }

    #[test]
    fn test_inline_node_chain_too_deep() {
        let len = MAX_NODE_DEPTH as u32 + 1;
        let bytes = static_object_chain(len);

        let mut ctx = CrossRefContext::new();
        let mut nodes: NodePool = (0..=len).map(|_| None).collect();
        ctx.begin_body([]);
        let mut d = decoder(&bytes, &mut ctx, &mut nodes);
        assert!(matches!(
            d.read_node_ref(),
            Err(Error::NestingTooDeep { section: "inline nodes", .. })
        ));
    }
}
