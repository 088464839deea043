//! Recursive external node loading.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use gbx_codec::{ExternalTarget, GbxFile, Node};

use crate::folders::resolve_folders;
use crate::material::{build_material, material_base_name, MaterialVariant};
use crate::{Error, Result};

/// Options controlling how external references are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Variant used for synthetic materials.
    pub material_variant: MaterialVariant,
    /// Replace `*.Material.Gbx` references with synthetic nodes. When off,
    /// material files are loaded from disk like any other reference.
    pub substitute_materials: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            material_variant: MaterialVariant::Asset,
            substitute_materials: true,
        }
    }
}

/// Load a file and every file it references with default options.
pub fn load(path: impl AsRef<Path>) -> Result<GbxFile> {
    Loader::new(LoadOptions::default()).load(path)
}

/// Resolves a GBX file into one globally indexed node graph.
///
/// Each referenced file is decoded and its nodes are moved into the
/// referencing file's pool: the file itself fills the referencing slot, its
/// other nodes are appended at `node_offset + local index`. A file's
/// `node_offset` is the number of nodes resolved before it was reached.
#[derive(Debug, Default)]
pub struct Loader {
    options: LoadOptions,
    loading: FxHashSet<PathBuf>,
}

impl Loader {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            options,
            loading: FxHashSet::default(),
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load `path` and resolve all of its external nodes.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<GbxFile> {
        let (file, _) = self.parse_node(path.as_ref(), 0, &[], 0)?;
        Ok(file)
    }

    /// Returns the file and the number of nodes it contributes.
    fn parse_node(
        &mut self,
        path: &Path,
        node_offset: u32,
        breadcrumb: &[String],
        depth: usize,
    ) -> Result<(GbxFile, u32)> {
        let mut crumbs = breadcrumb.to_vec();
        crumbs.push(file_name(path));

        let canonical = fs::canonicalize(path).map_err(|source| Error::MissingReference {
            breadcrumb: crumbs.join(" > "),
            path: path.to_path_buf(),
            source,
        })?;

        if !self.loading.insert(canonical.clone()) {
            return Err(Error::CyclicReference {
                breadcrumb: crumbs.join(" > "),
                path: path.to_path_buf(),
            });
        }
        let result = self.parse_file(&canonical, node_offset, crumbs, depth);
        self.loading.remove(&canonical);
        result
    }

    fn parse_file(
        &mut self,
        path: &Path,
        mut node_offset: u32,
        crumbs: Vec<String>,
        depth: usize,
    ) -> Result<(GbxFile, u32)> {
        let label = crumbs.join(" > ");

        let data = fs::read(path).map_err(|source| Error::MissingReference {
            breadcrumb: label.clone(),
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = GbxFile::parse(&data).map_err(|source| Error::Codec {
            breadcrumb: label.clone(),
            source,
        })?;
        file.node_offset = node_offset;

        let own_nodes = file.nb_nodes() as u32;
        tracing::info!(
            "{:indent$}- {} ({} nodes)",
            "",
            crumbs.last().map(String::as_str).unwrap_or_default(),
            own_nodes,
            indent = depth * 2
        );
        file.path = crumbs;

        let mut nb_nodes = own_nodes;
        node_offset += own_nodes;

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        let folders = resolve_folders(file.reference_table.external_folders.as_ref(), dir);
        let external_nodes = file.reference_table.external_nodes.clone();

        for external in &external_nodes {
            let slot = external.node_index as usize;
            if slot == 0 || slot >= file.nodes.len() {
                return Err(Error::InvalidNodeIndex {
                    breadcrumb: label,
                    node_index: external.node_index,
                    count: file.nodes.len(),
                });
            }

            let reference = match &external.target {
                ExternalTarget::File(name) => name,
                ExternalTarget::Resource(resource) => {
                    return Err(Error::UnsupportedReference {
                        breadcrumb: label,
                        node_index: external.node_index,
                        resource: *resource,
                    })
                }
            };

            if self.options.substitute_materials {
                if let Some(name) = material_base_name(reference) {
                    tracing::debug!(
                        material = name,
                        variant = self.options.material_variant.name(),
                        slot,
                        "substituting material reference"
                    );
                    file.nodes[slot] = Some(build_material(name, self.options.material_variant));
                    continue;
                }
            }

            let folder = folders.get(external.folder_index as usize).ok_or_else(|| {
                Error::InvalidFolderIndex {
                    breadcrumb: label.clone(),
                    folder_index: external.folder_index,
                    count: folders.len(),
                }
            })?;
            let child_path = PathBuf::from(format!("{folder}{reference}"));

            let (mut child, nb_sub) =
                self.parse_node(&child_path, node_offset, &file.path, depth + 1)?;
            let child_nodes = std::mem::take(&mut child.nodes);
            file.nodes[slot] = Some(Node::File(Box::new(child)));
            file.nodes.extend(child_nodes.into_iter().skip(1));

            nb_nodes += nb_sub;
            node_offset += nb_sub;
        }

        for (index, slot) in file.nodes.iter_mut().enumerate() {
            if let Some(Node::Body(body)) = slot {
                if body.path.is_none() {
                    body.path = Some(format!("{label} [node={index}]"));
                }
            }
        }

        Ok((file, nb_nodes))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
