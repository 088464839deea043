//! Display projection of decoded files.
//!
//! Turns the codec's value tree into [`DisplayNode`]s: mappings become
//! branches with one child per key, sequences become branches summarised as
//! `Array(n)`, and scalars become leaves carrying their declared type and
//! rendered value. Byte leaves also carry a [`ByteSpan`] so an edit made in a
//! byte inspector can be routed back to them.

use std::fmt;

use gbx_codec::{
    Body, Chunk, FieldPath, FolderNode, GbxFile, Header, Leaf, Mapping, Node, NodePool,
    ReferenceTable, Scalar, Value,
};

/// Exact bytes of a leaf and the path that owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ByteSpan {
    pub path: FieldPath,
    /// Offset of the first byte within its section.
    pub offset: usize,
    pub bytes: Vec<u8>,
}

/// One node of the display tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct DisplayNode {
    pub label: String,
    #[cfg_attr(feature = "json", serde(flatten))]
    pub kind: DisplayKind,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "json",
    derive(serde::Serialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum DisplayKind {
    Branch {
        summary: Option<String>,
        children: Vec<DisplayNode>,
    },
    Leaf {
        type_name: &'static str,
        value: String,
        span: Option<ByteSpan>,
    },
}

impl DisplayNode {
    pub fn branch(label: impl Into<String>, summary: Option<String>, children: Vec<DisplayNode>) -> Self {
        Self {
            label: label.into(),
            kind: DisplayKind::Branch { summary, children },
        }
    }

    pub fn leaf(label: impl Into<String>, type_name: &'static str, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: DisplayKind::Leaf {
                type_name,
                value: value.into(),
                span: None,
            },
        }
    }

    pub fn children(&self) -> &[DisplayNode] {
        match &self.kind {
            DisplayKind::Branch { children, .. } => children,
            DisplayKind::Leaf { .. } => &[],
        }
    }

    pub fn span(&self) -> Option<&ByteSpan> {
        match &self.kind {
            DisplayKind::Leaf { span, .. } => span.as_ref(),
            DisplayKind::Branch { .. } => None,
        }
    }

    /// Child with the given label.
    pub fn child(&self, label: &str) -> Option<&DisplayNode> {
        self.children().iter().find(|c| c.label == label)
    }

    /// Indented text rendering, cut off below `max_depth` levels.
    pub fn render(&self, max_depth: Option<usize>) -> TreeText<'_> {
        TreeText {
            node: self,
            max_depth,
        }
    }
}

/// Project any decoded value.
pub fn project_value(label: impl Into<String>, value: &Value, path: &FieldPath) -> DisplayNode {
    match value {
        Value::Mapping(mapping) => DisplayNode::branch(label, None, project_mapping(mapping, path)),
        Value::Sequence(items) => DisplayNode::branch(
            label,
            Some(format!("Array({})", items.len())),
            items
                .iter()
                .enumerate()
                .map(|(i, item)| project_value(i.to_string(), item, &path.index(i)))
                .collect(),
        ),
        Value::Scalar(leaf) => project_leaf(label, leaf, path),
    }
}

/// Project the fields of a mapping, skipping `_`-prefixed bookkeeping keys.
pub fn project_mapping(mapping: &Mapping, path: &FieldPath) -> Vec<DisplayNode> {
    mapping
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .map(|(key, value)| project_value(key, value, &path.key(key)))
        .collect()
}

pub fn project_leaf(label: impl Into<String>, leaf: &Leaf, path: &FieldPath) -> DisplayNode {
    let span = leaf.scalar.is_bytes().then(|| {
        let bytes = leaf.inspect_bytes();
        ByteSpan {
            path: path.clone(),
            // skip the length prefix held in the raw copy
            offset: leaf.raw.offset + leaf.raw.bytes.len().saturating_sub(bytes.len()),
            bytes: bytes.to_vec(),
        }
    });

    DisplayNode {
        label: label.into(),
        kind: DisplayKind::Leaf {
            type_name: leaf.scalar.type_name(),
            value: leaf.scalar.to_string(),
            span,
        },
    }
}

/// Project a whole file, including every node of its pool.
pub fn project_file(file: &GbxFile) -> DisplayNode {
    let label = if file.path.is_empty() {
        "GbxFile".to_owned()
    } else {
        file.breadcrumb()
    };
    DisplayNode::branch(
        label,
        Some(format!(
            "class 0x{:08X}, {} nodes",
            file.header.class_id,
            file.nb_nodes()
        )),
        file_children(file, &FieldPath::new()),
    )
}

fn file_children(file: &GbxFile, path: &FieldPath) -> Vec<DisplayNode> {
    vec![
        project_header(&file.header, &path.key("header")),
        project_references(&file.reference_table),
        project_body(&file.body, &path.key("body")),
        project_nodes(&file.nodes, &path.key("nodes")),
    ]
}

fn project_header(header: &Header, path: &FieldPath) -> DisplayNode {
    let format = [
        b'B',
        compression_byte(header.format.ref_table_compression),
        compression_byte(header.format.body_compression),
        header.format.trailer,
    ];
    let chunks_path = path.key("chunks");
    let chunks = header
        .chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let heavy = if chunk.heavy { " (heavy)" } else { "" };
            DisplayNode {
                label: format!("0x{:08X}{heavy}", chunk.chunk_id),
                kind: DisplayKind::Leaf {
                    type_name: "bytes",
                    value: Scalar::Bytes(chunk.data.clone()).to_string(),
                    span: Some(ByteSpan {
                        path: chunks_path.index(i),
                        offset: 0,
                        bytes: chunk.data.clone(),
                    }),
                },
            }
        })
        .collect();

    DisplayNode::branch(
        "header",
        None,
        vec![
            DisplayNode::leaf("version", "u16", header.version.to_string()),
            DisplayNode::leaf("format", "str", String::from_utf8_lossy(&format)),
            DisplayNode::leaf("class_id", "u32", format!("0x{:08X}", header.class_id)),
            DisplayNode::branch("chunks", Some(format!("Array({})", header.chunks.len())), chunks),
            DisplayNode::leaf("num_nodes", "u32", header.num_nodes.to_string()),
        ],
    )
}

fn compression_byte(compression: gbx_codec::Compression) -> u8 {
    match compression {
        gbx_codec::Compression::Uncompressed => b'U',
        gbx_codec::Compression::Compressed => b'C',
    }
}

fn project_references(table: &ReferenceTable) -> DisplayNode {
    let mut children = Vec::new();
    if let Some(root) = &table.external_folders {
        children.push(project_folder("folders", root));
    }

    let externals = table
        .external_nodes
        .iter()
        .enumerate()
        .map(|(i, external)| {
            let target = match &external.target {
                gbx_codec::ExternalTarget::File(name) => DisplayNode::leaf("ref", "str", format!("{name:?}")),
                gbx_codec::ExternalTarget::Resource(index) => {
                    DisplayNode::leaf("resource", "u32", index.to_string())
                }
            };
            DisplayNode::branch(
                i.to_string(),
                None,
                vec![
                    DisplayNode::leaf("flags", "u32", external.flags.to_string()),
                    target,
                    DisplayNode::leaf("node_index", "u32", external.node_index.to_string()),
                    DisplayNode::leaf("use_file", "bool", external.use_file.to_string()),
                    DisplayNode::leaf("folder_index", "u32", external.folder_index.to_string()),
                ],
            )
        })
        .collect();
    children.push(DisplayNode::branch(
        "external_nodes",
        Some(format!("Array({})", table.external_nodes.len())),
        externals,
    ));

    DisplayNode::branch("reference_table", None, children)
}

fn project_folder(label: &str, folder: &FolderNode) -> DisplayNode {
    let summary = (folder.ancestor_level > 0).then(|| format!("ancestor level {}", folder.ancestor_level));
    DisplayNode::branch(
        label,
        summary,
        folder
            .folders
            .iter()
            .map(|child| project_folder(&child.name, child))
            .collect(),
    )
}

fn project_body(body: &Body, path: &FieldPath) -> DisplayNode {
    match body {
        Body::Chunks(chunks) => project_chunks("body", chunks, path),
        Body::Opaque(bytes) => DisplayNode {
            label: "body".to_owned(),
            kind: DisplayKind::Leaf {
                type_name: "bytes",
                value: Scalar::Bytes(bytes.clone()).to_string(),
                span: Some(ByteSpan {
                    path: path.clone(),
                    offset: 0,
                    bytes: bytes.clone(),
                }),
            },
        },
    }
}

fn project_chunks(label: &str, chunks: &[Chunk], path: &FieldPath) -> DisplayNode {
    let children = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let name = chunk
                .schema()
                .map(|schema| schema.name)
                .unwrap_or(if chunk.is_end_marker() { "end" } else { "unknown" });
            let skippable = if chunk.skippable { ", skippable" } else { "" };
            DisplayNode::branch(
                i.to_string(),
                Some(format!("0x{:08X} {name}{skippable}", chunk.chunk_id)),
                project_mapping(&chunk.fields, &path.index(i)),
            )
        })
        .collect();
    DisplayNode::branch(label, Some(format!("Array({})", chunks.len())), children)
}

fn project_nodes(nodes: &NodePool, path: &FieldPath) -> DisplayNode {
    let children = nodes
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| Some((i, slot.as_ref()?)))
        .map(|(i, node)| {
            let node_path = path.index(i);
            match node {
                Node::Body(body) => DisplayNode::branch(
                    i.to_string(),
                    Some(summary(body.class_id, body.path.as_deref())),
                    vec![project_chunks("body", &body.chunks, &node_path.key("body"))],
                ),
                Node::File(file) => DisplayNode::branch(
                    i.to_string(),
                    Some(summary(file.header.class_id, Some(&file.breadcrumb()))),
                    file_children(file, &node_path),
                ),
            }
        })
        .collect();
    DisplayNode::branch("nodes", Some(format!("Array({})", nodes.len())), children)
}

fn summary(class_id: u32, path: Option<&str>) -> String {
    match path {
        Some(path) => format!("0x{class_id:08X} {path}"),
        None => format!("0x{class_id:08X}"),
    }
}

/// Text rendering returned by [`DisplayNode::render`].
pub struct TreeText<'a> {
    node: &'a DisplayNode,
    max_depth: Option<usize>,
}

impl fmt::Display for TreeText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self.node, 0, self.max_depth)
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &DisplayNode, depth: usize, max_depth: Option<usize>) -> fmt::Result {
    let indent = depth * 2;
    match &node.kind {
        DisplayKind::Leaf { type_name, value, .. } => {
            writeln!(f, "{:indent$}{} ({}) = {}", "", node.label, type_name, value)
        }
        DisplayKind::Branch { summary, children } => {
            write!(f, "{:indent$}{}", "", node.label)?;
            if let Some(summary) = summary {
                write!(f, ": {}", summary)?;
            }
            if max_depth.is_some_and(|max| depth >= max) && !children.is_empty() {
                return writeln!(f, " ...");
            }
            writeln!(f)?;
            children
                .iter()
                .try_for_each(|child| write_node(f, child, depth + 1, max_depth))
        }
    }
}
