//! Round-trip verification.

use gbx_codec::{encode, Compression, CrossRefContext, GbxFile, NodePool};

use crate::{Error, Result};

/// A pool entry no reference slot consumed during encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreferencedNode {
    pub index: usize,
    pub path: Option<String>,
}

/// Outcome of [`build_and_check`].
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Encoded file.
    pub bytes: Vec<u8>,
    /// `bytes` decoded again with a fresh context.
    pub rebuilt: GbxFile,
    /// `bytes` with the body stored uncompressed, for byte inspection.
    pub normalized: Vec<u8>,
    /// Pool entries left over after encoding.
    pub unreferenced: Vec<UnreferencedNode>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.unreferenced.is_empty()
    }
}

/// Encode `file`, report unreferenced nodes and decode the result again.
///
/// Encoding works on a scratch copy of the pool so `file` stays intact. When
/// the reference table is still populated only the file's own slots are
/// copied, since nodes of loaded files are written by their own files. After
/// [`GbxFile::merge_external_nodes`] the whole pool is encoded inline.
pub fn build_and_check(file: &GbxFile) -> Result<CheckReport> {
    let codec_error = |source| Error::Codec {
        breadcrumb: file.breadcrumb(),
        source,
    };

    let mut scratch: NodePool = if file.reference_table.is_empty() {
        file.nodes.clone()
    } else {
        file.nodes
            .iter()
            .take(file.header.num_nodes as usize)
            .cloned()
            .collect()
    };

    let mut ctx = CrossRefContext::new();
    let bytes = encode(file, &mut ctx, &mut scratch).map_err(codec_error)?;

    let unreferenced: Vec<UnreferencedNode> = scratch
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            slot.as_ref().map(|node| UnreferencedNode {
                index,
                path: node.path_label(),
            })
        })
        .collect();
    for node in &unreferenced {
        tracing::warn!(
            index = node.index,
            path = node.path.as_deref().unwrap_or("?"),
            "node was never referenced"
        );
    }

    let rebuilt = GbxFile::parse(&bytes).map_err(codec_error)?;
    let normalized = normalize_compression(&bytes).map_err(codec_error)?;

    Ok(CheckReport {
        bytes,
        rebuilt,
        normalized,
        unreferenced,
    })
}

/// Re-encode `raw` with an uncompressed body, leaving the body bytes as is.
///
/// Uses the header-only schema and a fresh context, so nothing is shared with
/// a full decode of the same bytes.
pub fn normalize_compression(raw: &[u8]) -> gbx_codec::Result<Vec<u8>> {
    let mut file = GbxFile::parse_header_only(raw)?;
    file.set_body_compression(Compression::Uncompressed);
    file.to_bytes()
}
