//! Routing byte edits back into a decoded file.

use gbx_codec::{Body, FieldPath, GbxFile, Node, Segment};

use crate::{Error, Result};

/// Overwrite bytes of the value at `path`, starting at `offset`.
///
/// `path` is the path carried by a [`ByteSpan`](crate::ByteSpan). Header
/// chunks and opaque bodies are patched in place; parsed leaves re-derive
/// their scalar from the patched bytes. Edits never change a value's length.
pub fn apply_edit(file: &mut GbxFile, path: &FieldPath, offset: usize, bytes: &[u8]) -> Result<()> {
    edit(file, path.segments(), path, offset, bytes)
}

fn edit(
    file: &mut GbxFile,
    segments: &[Segment],
    full: &FieldPath,
    offset: usize,
    bytes: &[u8],
) -> Result<()> {
    let unknown = || Error::UnknownPath(full.to_string());

    match segments {
        [Segment::Key(header), Segment::Key(chunks), Segment::Index(i)]
            if header == "header" && chunks == "chunks" =>
        {
            let chunk = file.header.chunks.get_mut(*i).ok_or_else(unknown)?;
            patch(&mut chunk.data, offset, bytes)
        }
        [Segment::Key(body)] if body == "body" => match &mut file.body {
            Body::Opaque(data) => patch(data, offset, bytes),
            Body::Chunks(_) => Err(unknown()),
        },
        [Segment::Key(nodes), Segment::Index(i), rest @ ..]
            if nodes == "nodes" && matches!(file.node(*i), Some(Node::File(_))) =>
        {
            match file.node_mut(*i) {
                Some(Node::File(sub)) => edit(sub, rest, full, offset, bytes),
                _ => Err(unknown()),
            }
        }
        _ => {
            let local = FieldPath::from(segments.to_vec());
            let leaf = file.leaf_mut(&local).ok_or_else(unknown)?;
            leaf.apply_bytes(offset, bytes)?;
            Ok(())
        }
    }
}

fn patch(data: &mut [u8], offset: usize, bytes: &[u8]) -> Result<()> {
    let size = data.len();
    let out_of_range = || gbx_codec::Error::EditOutOfRange {
        offset,
        len: bytes.len(),
        size,
    };
    let end = offset.checked_add(bytes.len()).ok_or_else(out_of_range)?;
    if end > size {
        return Err(out_of_range().into());
    }
    data[offset..end].copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbx_codec::schema::{CHUNK_MATERIAL_MARKER, CLASS_MATERIAL};
    use gbx_codec::{Chunk, HeaderChunk, Mapping, Scalar, Value};

    fn parsed() -> GbxFile {
        let marker = Chunk::new(
            CHUNK_MATERIAL_MARKER,
            Mapping::new()
                .with("version", Value::scalar(Scalar::U32(0)))
                .with("u01", Value::scalar(Scalar::U32(7))),
        );
        let mut file = GbxFile::new(CLASS_MATERIAL, vec![marker, Chunk::end_marker()]);
        file.header.chunks.push(HeaderChunk {
            chunk_id: 0x090F_D003,
            heavy: false,
            data: vec![0; 4],
        });
        GbxFile::parse(&file.to_bytes().unwrap()).unwrap()
    }

    fn path(s: &str) -> FieldPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_edit_body_leaf() {
        let mut file = parsed();
        apply_edit(&mut file, &path("body/0/u01"), 0, &[0x2A]).unwrap();

        let reparsed = GbxFile::parse(&file.to_bytes().unwrap()).unwrap();
        assert_eq!(reparsed.chunks()[0].fields.scalar("u01"), Some(&Scalar::U32(0x2A)));
    }

    #[test]
    fn test_edit_header_chunk() {
        let mut file = parsed();
        apply_edit(&mut file, &path("header/chunks/0"), 2, &[0xAB, 0xCD]).unwrap();
        assert_eq!(file.header.chunks[0].data, [0, 0, 0xAB, 0xCD]);

        let err = apply_edit(&mut file, &path("header/chunks/0"), 3, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            Error::Codec(gbx_codec::Error::EditOutOfRange { offset: 3, len: 2, size: 4 })
        ));
    }

    #[test]
    fn test_edit_opaque_body() {
        let bytes = parsed().to_bytes().unwrap();
        let mut file = GbxFile::parse_header_only(&bytes).unwrap();
        apply_edit(&mut file, &path("body"), 4, &[0xFF]).unwrap();
        assert_eq!(file.opaque_body().unwrap()[4], 0xFF);
    }

    #[test]
    fn test_unknown_path() {
        let mut file = parsed();
        for bad in ["body/0/missing", "body", "header/chunks/9", "nodes/4/body/0/u01"] {
            let err = apply_edit(&mut file, &path(bad), 0, &[0]).unwrap_err();
            assert!(matches!(err, Error::UnknownPath(p) if p == bad), "{bad}");
        }
    }
}
