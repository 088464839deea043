//! GBX encoder.

use std::borrow::Cow;

use gbx_common::BinaryWriter;

use crate::compress;
use crate::context::{CrossRefContext, LOOKBACK_VERSION};
use crate::decode::{EMPTY_LOOKBACK, LOOKBACK_FLAGS, LOOKBACK_STRING, NULL_NODE};
use crate::header::Compression;
use crate::node::{Body, Chunk, Node, NodePool};
use crate::schema::{self, FieldDef, FieldKind, END_MARKER, SKIP_MARKER};
use crate::value::{LookbackId, Mapping, Scalar, Value};
use crate::{Error, GbxFile, Result};

/// Encode a file to bytes.
///
/// `nodes` is a scratch copy of the node pool indexed globally: every node
/// written inline is taken out of it, so whatever remains afterwards was never
/// referenced. Node references in `file` and in nested files are shifted by
/// their owning file's `node_offset` before being looked up and written.
pub fn encode(file: &GbxFile, ctx: &mut CrossRefContext, nodes: &mut NodePool) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::new();
    file.header.write(&mut writer)?;

    if file.header.format.ref_table_compression == Compression::Compressed {
        return Err(Error::Unsupported("compressed reference table"));
    }
    file.reference_table.write(&mut writer)?;

    let body: Cow<'_, [u8]> = match &file.body {
        Body::Opaque(bytes) => Cow::Borrowed(bytes.as_slice()),
        Body::Chunks(chunks) => {
            let offset = file.node_offset;
            ctx.begin_body(
                file.reference_table
                    .external_nodes
                    .iter()
                    .map(|r| r.node_index + offset),
            );
            let mut encoder = BodyEncoder {
                writer: BinaryWriter::new(),
                ctx,
                nodes,
            };
            encoder.write_chunks(chunks, offset)?;
            Cow::Owned(encoder.writer.into_bytes())
        }
    };

    match file.header.format.body_compression {
        Compression::Compressed => {
            let compressed = compress::compress(&body)?;
            writer.write_len(body.len())?;
            writer.write_len(compressed.len())?;
            writer.write_bytes(&compressed);
        }
        Compression::Uncompressed => writer.write_bytes(&body),
    }

    Ok(writer.into_bytes())
}

struct BodyEncoder<'c> {
    writer: BinaryWriter,
    ctx: &'c mut CrossRefContext,
    nodes: &'c mut NodePool,
}

impl BodyEncoder<'_> {
    /// Write a chunk list, always terminated by the end marker.
    fn write_chunks(&mut self, chunks: &[Chunk], offset: u32) -> Result<()> {
        for chunk in chunks {
            if chunk.is_end_marker() {
                break;
            }
            self.write_chunk(chunk, offset)?;
        }
        self.writer.write_u32(END_MARKER)?;
        Ok(())
    }

    fn write_chunk(&mut self, chunk: &Chunk, offset: u32) -> Result<()> {
        self.writer.write_u32(chunk.chunk_id)?;

        let Some(layout) = schema::lookup(chunk.chunk_id) else {
            if !chunk.skippable {
                return Err(Error::UnknownChunk {
                    chunk_id: chunk.chunk_id,
                    offset: self.writer.position() - 4,
                });
            }
            let data = match chunk.fields.scalar("data") {
                Some(Scalar::Bytes(data)) => data,
                _ => return Err(Error::MissingField { field: "data" }),
            };
            self.writer.write_u32(SKIP_MARKER)?;
            self.writer.write_data(data)?;
            return Ok(());
        };

        if chunk.skippable {
            self.writer.write_u32(SKIP_MARKER)?;
            let size_slot = self.writer.reserve_u32();
            let start = self.writer.position();
            self.write_fields(layout.fields, &chunk.fields, offset)?;
            let size = self.writer.position() - start;
            self.writer.patch_u32(size_slot, size as u32)?;
        } else {
            self.write_fields(layout.fields, &chunk.fields, offset)?;
        }
        Ok(())
    }

    fn write_fields(&mut self, fields: &'static [FieldDef], mapping: &Mapping, offset: u32) -> Result<()> {
        for def in fields {
            let value = mapping
                .get(def.name)
                .ok_or(Error::MissingField { field: def.name })?;
            self.write_value(def, def.kind, value, offset)?;
        }
        Ok(())
    }

    fn write_value(&mut self, def: &FieldDef, kind: FieldKind, value: &Value, offset: u32) -> Result<()> {
        match (kind, value) {
            (FieldKind::List(element), Value::Sequence(items)) => {
                self.writer.write_len(items.len())?;
                for item in items {
                    self.write_value(def, *element, item, offset)?;
                }
                Ok(())
            }
            (FieldKind::Struct(fields), Value::Mapping(mapping)) => {
                self.write_fields(fields, mapping, offset)
            }
            (kind, Value::Scalar(leaf)) => self.write_scalar(def, kind, &leaf.scalar, offset),
            (kind, other) => Err(Error::TypeMismatch {
                field: def.name,
                expected: kind_name(kind),
                actual: match other {
                    Value::Mapping(_) => "mapping",
                    Value::Sequence(_) => "sequence",
                    Value::Scalar(leaf) => leaf.scalar.type_name(),
                },
            }),
        }
    }

    fn write_scalar(&mut self, def: &FieldDef, kind: FieldKind, scalar: &Scalar, offset: u32) -> Result<()> {
        match (kind, scalar) {
            (FieldKind::Bool, Scalar::Bool(v)) => self.writer.write_bool(*v)?,
            (FieldKind::U8, Scalar::U8(v)) => self.writer.write_u8(*v)?,
            (FieldKind::U16, Scalar::U16(v)) => self.writer.write_u16(*v)?,
            (FieldKind::U32, Scalar::U32(v)) => self.writer.write_u32(*v)?,
            (FieldKind::I32, Scalar::I32(v)) => self.writer.write_i32(*v)?,
            (FieldKind::F32, Scalar::F32(v)) => self.writer.write_f32(*v)?,
            (FieldKind::String, Scalar::String(v)) => self.writer.write_string(v)?,
            (FieldKind::Data, Scalar::Bytes(v)) => self.writer.write_data(v)?,
            (FieldKind::Id, Scalar::Id(id)) => self.write_lookback(id)?,
            (FieldKind::NodeRef, Scalar::NodeRef(index)) => self.write_node_ref(*index, offset)?,
            (kind, scalar) => {
                return Err(Error::TypeMismatch {
                    field: def.name,
                    expected: kind_name(kind),
                    actual: scalar.type_name(),
                })
            }
        }
        Ok(())
    }

    fn write_lookback(&mut self, id: &LookbackId) -> Result<()> {
        if self.ctx.start_lookback() {
            self.writer.write_u32(LOOKBACK_VERSION)?;
        }

        match id {
            LookbackId::Empty => self.writer.write_u32(EMPTY_LOOKBACK)?,
            LookbackId::Number(n) if n & LOOKBACK_FLAGS != 0 => {
                return Err(Error::InvalidLookback(*n));
            }
            LookbackId::Number(n) => self.writer.write_u32(*n)?,
            LookbackId::Name(name) => match self.ctx.position_of(name) {
                Some(position) => {
                    let index = u32::try_from(position + 1)
                        .ok()
                        .filter(|i| i & LOOKBACK_FLAGS == 0)
                        .ok_or(gbx_common::Error::LengthOverflow(position + 1))?;
                    self.writer.write_u32(LOOKBACK_STRING | index)?;
                }
                None => {
                    self.writer.write_u32(LOOKBACK_STRING)?;
                    self.writer.write_string(name)?;
                    self.ctx.intern(name.clone());
                }
            },
        }
        Ok(())
    }

    /// Write a node reference and, on its first occurrence, the node itself.
    fn write_node_ref(&mut self, local: Option<u32>, offset: u32) -> Result<()> {
        let Some(local) = local else {
            return Ok(self.writer.write_u32(NULL_NODE)?);
        };
        let global = local
            .checked_add(offset)
            .ok_or(Error::DanglingNodeRef { index: local })?;
        self.writer.write_u32(global)?;

        if self.ctx.is_external(global) {
            // the slot belongs to the reference table; only the index is written
            if let Some(slot) = self.nodes.get_mut(global as usize) {
                slot.take();
            }
            self.ctx.mark_written(global);
            return Ok(());
        }

        let node = self
            .nodes
            .get_mut(global as usize)
            .and_then(Option::take);
        let Some(node) = node else {
            if self.ctx.is_written(global) {
                return Ok(());
            }
            return Err(Error::DanglingNodeRef { index: global });
        };

        self.ctx.mark_written(global);
        match &node {
            Node::Body(body) => {
                self.writer.write_u32(body.class_id)?;
                self.write_chunks(&body.chunks, offset)
            }
            Node::File(file) => {
                let Body::Chunks(chunks) = &file.body else {
                    return Err(Error::OpaqueBody);
                };
                self.writer.write_u32(file.header.class_id)?;
                self.write_chunks(chunks, file.node_offset)
            }
        }
    }
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool => "bool",
        FieldKind::U8 => "u8",
        FieldKind::U16 => "u16",
        FieldKind::U32 => "u32",
        FieldKind::I32 => "i32",
        FieldKind::F32 => "f32",
        FieldKind::String => "str",
        FieldKind::Id => "id",
        FieldKind::Data => "bytes",
        FieldKind::NodeRef => "node",
        FieldKind::List(_) => "sequence",
        FieldKind::Struct(_) => "mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeBody;

    fn lookback_stream() -> Vec<u8> {
        let mut bytes = Vec::new();
        for word in [LOOKBACK_VERSION, LOOKBACK_STRING, 7] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes.extend_from_slice(b"Stadium");
        for word in [26, LOOKBACK_STRING | 1, EMPTY_LOOKBACK] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_lookback_strings_are_interned() {
        let mut ctx = CrossRefContext::new();
        let mut nodes = NodePool::new();
        ctx.begin_body([]);

        let mut encoder = BodyEncoder {
            writer: BinaryWriter::new(),
            ctx: &mut ctx,
            nodes: &mut nodes,
        };
        let stadium = LookbackId::Name("Stadium".into());
        encoder.write_lookback(&stadium).unwrap();
        encoder.write_lookback(&LookbackId::Number(26)).unwrap();
        encoder.write_lookback(&stadium).unwrap();
        encoder.write_lookback(&LookbackId::Empty).unwrap();
        let bytes = encoder.writer.into_bytes();

        assert_eq!(bytes, lookback_stream());
        assert_eq!(ctx.strings(), ["Stadium"]);
    }

    #[test]
    fn test_external_slot_writes_index_only() {
        let mut ctx = CrossRefContext::new();
        let mut nodes: NodePool = vec![
            None,
            None,
            Some(Node::Body(NodeBody::new(0x090F_D000, Vec::new()))),
        ];
        // slot 2 of a file placed at global offset 3
        ctx.begin_body([5]);
        nodes.resize_with(6, || None);
        nodes[5] = nodes[2].take();

        let mut encoder = BodyEncoder {
            writer: BinaryWriter::new(),
            ctx: &mut ctx,
            nodes: &mut nodes,
        };
        encoder.write_node_ref(Some(2), 3).unwrap();
        encoder.write_node_ref(Some(2), 3).unwrap();
        assert_eq!(encoder.writer.into_bytes(), [5, 0, 0, 0, 5, 0, 0, 0]);
        assert!(nodes[5].is_none());
    }

    #[test]
    fn test_type_mismatch() {
        let mut ctx = CrossRefContext::new();
        let mut nodes = NodePool::new();
        let mut encoder = BodyEncoder {
            writer: BinaryWriter::new(),
            ctx: &mut ctx,
            nodes: &mut nodes,
        };
        let chunk = Chunk::new(
            crate::schema::CHUNK_MATERIAL_MARKER,
            Mapping::new()
                .with("version", Value::scalar(Scalar::U32(0)))
                .with("u01", Value::scalar(Scalar::F32(1.0))),
        );
        assert!(matches!(
            encoder.write_chunk(&chunk, 0),
            Err(Error::TypeMismatch {
                field: "u01",
                expected: "u32",
                actual: "f32"
            })
        ));
    }
}
