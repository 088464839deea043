//! Folder tree expansion.

use std::path::{Path, MAIN_SEPARATOR};

use gbx_codec::FolderNode;

/// Expand a reference table's folder tree into one path per folder index.
///
/// Index 0 is `dir` itself. The remaining entries follow the tree in
/// pre-order; each is its parent's path plus the folder name and a separator.
/// Top-level folders hang below `dir` raised by the root's `ancestor_level`.
/// Every entry ends with the platform separator so a file name can be
/// appended directly.
pub fn resolve_folders(root: Option<&FolderNode>, dir: &Path) -> Vec<String> {
    let base = format!("{}{}", dir.display(), MAIN_SEPARATOR);
    let mut folders = vec![base.clone()];

    let Some(root) = root else {
        return folders;
    };

    let mut top = base;
    for _ in 0..root.ancestor_level {
        top.push_str("..");
        top.push(MAIN_SEPARATOR);
    }
    push_children(root, &top, &mut folders);

    tracing::debug!(count = folders.len(), dir = %dir.display(), "resolved reference folders");
    folders
}

fn push_children(folder: &FolderNode, parent: &str, out: &mut Vec<String>) {
    for child in &folder.folders {
        let path = format!("{parent}{}{MAIN_SEPARATOR}", child.name);
        out.push(path.clone());
        push_children(child, &path, out);
    }
}
