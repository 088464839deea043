//! Synthetic material nodes.
//!
//! References to `*.Material.Gbx` files are common and their content is
//! fully determined by the material name, so the loader replaces them with a
//! node built here instead of opening the file.

use gbx_codec::schema::{
    CHUNK_MATERIAL_MARKER, CHUNK_MATERIAL_PARAMS, CHUNK_MATERIAL_TILING, CLASS_MATERIAL,
};
use gbx_codec::{Chunk, LookbackId, Mapping, Node, NodeBody, Scalar, Value};

/// File name suffix of material references.
pub const MATERIAL_SUFFIX: &str = ".Material.Gbx";

/// In-game material library the linked variant points into.
const GAME_MATERIAL_LINK: &str = "Stadium\\Media\\Material\\";

/// How a synthetic material refers to its texture set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MaterialVariant {
    /// Use the game's own material of that name.
    Linked,
    /// Treat the name as an asset of the item itself.
    #[default]
    Asset,
}

impl MaterialVariant {
    pub fn name(self) -> &'static str {
        match self {
            MaterialVariant::Linked => "linked",
            MaterialVariant::Asset => "asset",
        }
    }
}

/// Material name of a `Name.Material.Gbx` reference.
pub fn material_base_name(reference: &str) -> Option<&str> {
    if !reference.ends_with(MATERIAL_SUFFIX) {
        return None;
    }
    reference.split('.').next().filter(|name| !name.is_empty())
}

/// Build the node standing in for material `name`.
///
/// The result depends only on `name` and `variant`.
pub fn build_material(name: &str, variant: MaterialVariant) -> Node {
    let (is_using_game_material, material_name, surface_physic_id, link) = match variant {
        MaterialVariant::Linked => (
            true,
            LookbackId::Empty,
            16,
            format!("{GAME_MATERIAL_LINK}{name}"),
        ),
        MaterialVariant::Asset => (
            false,
            LookbackId::Name(format!("TM_{name}_asset")),
            6,
            name.to_owned(),
        ),
    };

    let params = Mapping::new()
        .with("version", scalar(Scalar::U32(11)))
        .with("is_using_game_material", scalar(Scalar::Bool(is_using_game_material)))
        .with("material_name", scalar(Scalar::Id(material_name)))
        .with("model", scalar(Scalar::Id(LookbackId::Empty)))
        .with("base_texture", scalar(Scalar::String(String::new())))
        .with("surface_physic_id", scalar(Scalar::U8(surface_physic_id)))
        .with("surface_gameplay_id", scalar(Scalar::U8(0)))
        .with("link", scalar(Scalar::String(link)))
        .with("csts", Value::Sequence(Vec::new()))
        .with("color", Value::Sequence(Vec::new()))
        .with("uv_anim", Value::Sequence(Vec::new()))
        .with("u07", Value::Sequence(Vec::new()))
        .with("user_textures", Value::Sequence(Vec::new()))
        .with("hiding_group", scalar(Scalar::String(String::new())));

    let tiling = Mapping::new()
        .with("version", scalar(Scalar::U32(5)))
        .with("u01", scalar(Scalar::I32(-1)))
        .with("tiling_u", scalar(Scalar::U32(0)))
        .with("tiling_v", scalar(Scalar::U32(0)))
        .with("texture_size", scalar(Scalar::F32(1.0)))
        .with("u02", scalar(Scalar::U32(0)))
        .with("is_natural", scalar(Scalar::Bool(false)));

    let marker = Mapping::new()
        .with("version", scalar(Scalar::U32(0)))
        .with("u01", scalar(Scalar::U32(0)));

    Node::Body(NodeBody::new(
        CLASS_MATERIAL,
        vec![
            Chunk::new(CHUNK_MATERIAL_PARAMS, params),
            Chunk::new(CHUNK_MATERIAL_TILING, tiling),
            Chunk::new(CHUNK_MATERIAL_MARKER, marker),
            Chunk::end_marker(),
        ],
    ))
}

fn scalar(value: Scalar) -> Value {
    Value::scalar(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbx_codec::GbxFile;

    fn params(node: &Node) -> &Mapping {
        &node.chunks()[0].fields
    }

    #[test]
    fn test_base_name() {
        assert_eq!(material_base_name("Wood.Material.Gbx"), Some("Wood"));
        assert_eq!(material_base_name("Wood.Mesh.Gbx"), None);
        assert_eq!(material_base_name(".Material.Gbx"), None);
    }

    #[test]
    fn test_asset_variant() {
        let node = build_material("Wood", MaterialVariant::Asset);
        let params = params(&node);
        assert_eq!(node.class_id(), CLASS_MATERIAL);
        assert_eq!(params.scalar("link").and_then(Scalar::as_str), Some("Wood"));
        assert_eq!(
            params.scalar("material_name").and_then(Scalar::as_str),
            Some("TM_Wood_asset")
        );
        assert_eq!(params.scalar("is_using_game_material"), Some(&Scalar::Bool(false)));
        assert_eq!(params.scalar("surface_physic_id"), Some(&Scalar::U8(6)));
    }

    #[test]
    fn test_linked_variant() {
        let node = build_material("Grass", MaterialVariant::Linked);
        let params = params(&node);
        assert_eq!(
            params.scalar("link").and_then(Scalar::as_str),
            Some("Stadium\\Media\\Material\\Grass")
        );
        assert_eq!(params.scalar("material_name").and_then(Scalar::as_str), Some(""));
        assert_eq!(params.scalar("is_using_game_material"), Some(&Scalar::Bool(true)));
    }

    #[test]
    fn test_variants_share_chunk_layout() {
        let ids = |node: &Node| node.chunks().iter().map(|c| c.chunk_id).collect::<Vec<_>>();
        let linked = build_material("Wood", MaterialVariant::Linked);
        let asset = build_material("Wood", MaterialVariant::Asset);
        assert_eq!(ids(&linked), ids(&asset));
        assert!(asset.chunks().last().unwrap().is_end_marker());
    }

    #[test]
    fn test_pure_function_of_name_and_variant() {
        assert_eq!(
            build_material("Wood", MaterialVariant::Asset),
            build_material("Wood", MaterialVariant::Asset)
        );
        assert_ne!(
            build_material("Wood", MaterialVariant::Asset),
            build_material("Wood", MaterialVariant::Linked)
        );
    }

    #[test]
    fn test_encodes_as_inline_node() {
        let Node::Body(body) = build_material("Wood", MaterialVariant::Asset) else {
            unreachable!()
        };
        let file = GbxFile::new(CLASS_MATERIAL, body.chunks);

        let parsed = GbxFile::parse(&file.to_bytes().unwrap()).unwrap();
        let tiling = &parsed.chunks()[1].fields;
        assert_eq!(tiling.scalar("texture_size"), Some(&Scalar::F32(1.0)));
        assert_eq!(tiling.scalar("u01"), Some(&Scalar::I32(-1)));
    }
}
