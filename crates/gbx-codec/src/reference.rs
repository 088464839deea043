//! Reference table: the external files a GBX file points at.
//!
//! The table is a folder tree (relative to the file's own directory, raised
//! by `ancestor_level` parent steps) followed by one descriptor per external
//! node. Each descriptor names a file inside one of those folders and the
//! local node slot the loaded file fills.

use gbx_common::{BinaryReader, BinaryWriter};

use crate::{Error, Result};

/// Flag bit marking a descriptor that refers to a resource index instead of
/// a file name.
const FLAG_RESOURCE: u32 = 0x4;

/// Deepest folder tree accepted when reading.
pub(crate) const MAX_FOLDER_DEPTH: usize = 64;

/// A folder in the reference table's folder tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderNode {
    pub name: String,
    /// Parent-directory steps above the referencing file. Only meaningful on
    /// the root of the tree.
    pub ancestor_level: u32,
    pub folders: Vec<FolderNode>,
}

impl FolderNode {
    /// Create a named folder without children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ancestor_level: 0,
            folders: Vec::new(),
        }
    }

    /// Builder-style child insertion.
    pub fn with_folder(mut self, folder: FolderNode) -> Self {
        self.folders.push(folder);
        self
    }

    /// Number of folders in this tree, including this one.
    pub fn count(&self) -> usize {
        1 + self.folders.iter().map(FolderNode::count).sum::<usize>()
    }

    fn read_children(reader: &mut BinaryReader<'_>, depth: usize) -> Result<Vec<FolderNode>> {
        if depth > MAX_FOLDER_DEPTH {
            return Err(Error::NestingTooDeep {
                section: "folder tree",
                limit: MAX_FOLDER_DEPTH,
            });
        }
        let count = reader.read_u32()? as usize;
        let mut folders = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let name = reader.read_string()?.to_owned();
            let folders_below = Self::read_children(reader, depth + 1)?;
            folders.push(FolderNode {
                name,
                ancestor_level: 0,
                folders: folders_below,
            });
        }
        Ok(folders)
    }

    fn write_children(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_len(self.folders.len())?;
        for folder in &self.folders {
            writer.write_string(&folder.name)?;
            folder.write_children(writer)?;
        }
        Ok(())
    }
}

/// What an external node descriptor points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalTarget {
    /// File name relative to a folder of the table.
    File(String),
    /// Index into the game's resource list.
    Resource(u32),
}

/// One external node descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalNodeRef {
    pub flags: u32,
    pub target: ExternalTarget,
    /// Local node slot filled by the referenced file.
    pub node_index: u32,
    pub use_file: bool,
    /// Index into the resolved folder list; 0 is the file's own directory.
    pub folder_index: u32,
}

impl ExternalNodeRef {
    /// Descriptor for a file reference.
    pub fn file(folder_index: u32, name: impl Into<String>, node_index: u32) -> Self {
        Self {
            flags: 0,
            target: ExternalTarget::File(name.into()),
            node_index,
            use_file: false,
            folder_index,
        }
    }

    /// Referenced file name, if this is a file reference.
    pub fn file_name(&self) -> Option<&str> {
        match &self.target {
            ExternalTarget::File(name) => Some(name),
            ExternalTarget::Resource(_) => None,
        }
    }

    fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let flags = reader.read_u32()?;
        let target = if flags & FLAG_RESOURCE == 0 {
            ExternalTarget::File(reader.read_string()?.to_owned())
        } else {
            ExternalTarget::Resource(reader.read_u32()?)
        };
        let node_index = reader.read_u32()?;
        let use_file = reader.read_bool()?;
        let folder_index = match target {
            ExternalTarget::File(_) => reader.read_u32()?,
            ExternalTarget::Resource(_) => 0,
        };

        Ok(Self {
            flags,
            target,
            node_index,
            use_file,
            folder_index,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        match &self.target {
            ExternalTarget::File(name) => {
                writer.write_u32(self.flags & !FLAG_RESOURCE)?;
                writer.write_string(name)?;
            }
            ExternalTarget::Resource(index) => {
                writer.write_u32(self.flags | FLAG_RESOURCE)?;
                writer.write_u32(*index)?;
            }
        }
        writer.write_u32(self.node_index)?;
        writer.write_bool(self.use_file)?;
        if let ExternalTarget::File(_) = self.target {
            writer.write_u32(self.folder_index)?;
        }
        Ok(())
    }
}

/// Decoded reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceTable {
    /// Folder tree root; present whenever the table lists external nodes.
    pub external_folders: Option<FolderNode>,
    pub external_nodes: Vec<ExternalNodeRef>,
}

impl ReferenceTable {
    pub fn is_empty(&self) -> bool {
        self.external_nodes.is_empty()
    }

    pub(crate) fn read(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let count = reader.read_u32()? as usize;
        if count == 0 {
            return Ok(Self::default());
        }

        let ancestor_level = reader.read_u32()?;
        let folders = FolderNode::read_children(reader, 1)?;
        let root = FolderNode {
            name: String::new(),
            ancestor_level,
            folders,
        };

        let mut external_nodes = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            external_nodes.push(ExternalNodeRef::read(reader)?);
        }

        Ok(Self {
            external_folders: Some(root),
            external_nodes,
        })
    }

    pub(crate) fn write(&self, writer: &mut BinaryWriter) -> Result<()> {
        writer.write_len(self.external_nodes.len())?;
        if self.external_nodes.is_empty() {
            return Ok(());
        }

        match &self.external_folders {
            Some(root) => {
                writer.write_u32(root.ancestor_level)?;
                root.write_children(writer)?;
            }
            None => {
                writer.write_u32(0)?;
                writer.write_u32(0)?;
            }
        }

        for node in &self.external_nodes {
            node.write(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ReferenceTable {
        let mut root = FolderNode::new("")
            .with_folder(FolderNode::new("Media").with_folder(FolderNode::new("Material")))
            .with_folder(FolderNode::new("Meshes"));
        root.ancestor_level = 2;

        let mut resource = ExternalNodeRef::file(0, "", 4);
        resource.target = ExternalTarget::Resource(17);

        ReferenceTable {
            external_folders: Some(root),
            external_nodes: vec![
                ExternalNodeRef::file(2, "Wood.Material.Gbx", 2),
                ExternalNodeRef::file(3, "Cactus.Mesh.Gbx", 3),
                resource,
            ],
        }
    }

    #[test]
    fn test_round_trip() {
        let table = sample_table();
        let mut writer = BinaryWriter::new();
        table.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();

        let mut reader = BinaryReader::new(&bytes);
        let decoded = ReferenceTable::read(&mut reader).unwrap();
        assert!(reader.is_empty());

        assert_eq!(decoded.external_nodes[2].flags & FLAG_RESOURCE, FLAG_RESOURCE);
        assert_eq!(decoded.external_folders, table.external_folders);
        assert_eq!(decoded.external_nodes[0], table.external_nodes[0]);
        assert_eq!(decoded.external_nodes[2].target, ExternalTarget::Resource(17));
    }

    #[test]
    fn test_empty_table_is_a_single_zero() {
        let mut writer = BinaryWriter::new();
        ReferenceTable::default().write(&mut writer).unwrap();
        assert_eq!(writer.as_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_folder_count() {
        let table = sample_table();
        assert_eq!(table.external_folders.unwrap().count(), 4);
    }

    #[test]
    fn test_deep_folder_tree_is_an_error() {
        let mut bytes = Vec::new();
        // one external node, ancestor level 0
        for word in [1u32, 0] {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        for _ in 0..MAX_FOLDER_DEPTH + 8 {
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.extend_from_slice(&1u32.to_le_bytes());
            bytes.push(b'a');
        }

        let result = ReferenceTable::read(&mut BinaryReader::new(&bytes));
        assert!(matches!(
            result,
            Err(Error::NestingTooDeep { section: "folder tree", limit: MAX_FOLDER_DEPTH })
        ));
    }

    #[test]
    fn test_folder_tree_at_depth_limit() {
        let mut folder = FolderNode::new("leaf");
        for _ in 1..MAX_FOLDER_DEPTH - 1 {
            folder = FolderNode::new("a").with_folder(folder);
        }
        let table = ReferenceTable {
            external_folders: Some(FolderNode::new("").with_folder(folder)),
            external_nodes: vec![ExternalNodeRef::file(0, "A.Item.Gbx", 1)],
        };

        let mut writer = BinaryWriter::new();
        table.write(&mut writer).unwrap();
        let bytes = writer.into_bytes();
        let decoded = ReferenceTable::read(&mut BinaryReader::new(&bytes)).unwrap();
        assert_eq!(decoded.external_folders, table.external_folders);
    }
}
