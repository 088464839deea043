//! Declarative chunk layouts.
//!
//! A [`ChunkSchema`] lists the fields of one body chunk in stream order. The
//! decoder and encoder walk these lists, so adding support for a chunk is a
//! matter of adding an entry to the catalog. Chunks missing from the catalog
//! can still be carried through a round trip when the file marks them as
//! skippable.

/// Class id of material instances (`CPlugMaterialUserInst`).
pub const CLASS_MATERIAL: u32 = 0x090F_D000;
/// Class id of item models (`CGameItemModel`).
pub const CLASS_ITEM_MODEL: u32 = 0x2E00_2000;
/// Class id of static object models (`CPlugStaticObjectModel`).
pub const CLASS_STATIC_OBJECT: u32 = 0x0915_9000;
/// Class id of solid meshes (`CPlugSolid2Model`).
pub const CLASS_SOLID2_MODEL: u32 = 0x090B_B000;

/// Material parameters chunk.
pub const CHUNK_MATERIAL_PARAMS: u32 = 0x090F_D000;
/// Material texture tiling chunk.
pub const CHUNK_MATERIAL_TILING: u32 = 0x090F_D001;
/// Material version marker chunk.
pub const CHUNK_MATERIAL_MARKER: u32 = 0x090F_D002;
/// Item model entity chunk.
pub const CHUNK_ITEM_ENTITY: u32 = 0x2E00_2019;
/// Static object mesh/shape chunk.
pub const CHUNK_STATIC_OBJECT: u32 = 0x0915_9000;
/// Solid mesh geometry chunk.
pub const CHUNK_SOLID2_GEOMETRY: u32 = 0x090B_B000;

/// Terminates every node's chunk list.
pub const END_MARKER: u32 = 0xFACA_DE01;
/// `"PIKS"` tag announcing a skippable chunk.
pub const SKIP_MARKER: u32 = u32::from_le_bytes(*b"PIKS");

/// Wire representation of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 32-bit boolean.
    Bool,
    U8,
    U16,
    U32,
    I32,
    F32,
    /// `u32` length-prefixed UTF-8.
    String,
    /// Lookback string resolved through the cross-reference context.
    Id,
    /// `u32` length-prefixed byte blob.
    Data,
    /// Node reference, possibly followed by an inline node.
    NodeRef,
    /// `u32` count followed by that many elements.
    List(&'static FieldKind),
    /// Fixed sequence of named fields.
    Struct(&'static [FieldDef]),
}

/// A named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

macro_rules! field {
    ($name:expr, $kind:expr $(,)?) => {
        FieldDef {
            name: $name,
            kind: $kind,
        }
    };
}

/// Layout of one body chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSchema {
    pub chunk_id: u32,
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

const VEC2: FieldKind = FieldKind::Struct(&[field!("x", FieldKind::F32), field!("y", FieldKind::F32)]);

const VEC3: FieldKind = FieldKind::Struct(&[
    field!("x", FieldKind::F32),
    field!("y", FieldKind::F32),
    field!("z", FieldKind::F32),
]);

static CATALOG: &[ChunkSchema] = &[
    ChunkSchema {
        chunk_id: CHUNK_MATERIAL_PARAMS,
        name: "material params",
        fields: &[
            field!("version", FieldKind::U32),
            field!("is_using_game_material", FieldKind::Bool),
            field!("material_name", FieldKind::Id),
            field!("model", FieldKind::Id),
            field!("base_texture", FieldKind::String),
            field!("surface_physic_id", FieldKind::U8),
            field!("surface_gameplay_id", FieldKind::U8),
            field!("link", FieldKind::String),
            field!(
                "csts",
                FieldKind::List(&FieldKind::Struct(&[
                    field!("name", FieldKind::Id),
                    field!("type", FieldKind::U32),
                    field!("count", FieldKind::U32),
                ])),
            ),
            field!(
                "color",
                FieldKind::List(&FieldKind::Struct(&[
                    field!("name", FieldKind::Id),
                    field!("value", FieldKind::U32),
                ])),
            ),
            field!(
                "uv_anim",
                FieldKind::List(&FieldKind::Struct(&[
                    field!("name", FieldKind::Id),
                    field!("kind", FieldKind::Id),
                    field!("speed", FieldKind::F32),
                ])),
            ),
            field!("u07", FieldKind::List(&FieldKind::U32)),
            field!(
                "user_textures",
                FieldKind::List(&FieldKind::Struct(&[
                    field!("slot", FieldKind::U32),
                    field!("texture", FieldKind::String),
                ])),
            ),
            field!("hiding_group", FieldKind::String),
        ],
    },
    ChunkSchema {
        chunk_id: CHUNK_MATERIAL_TILING,
        name: "material tiling",
        fields: &[
            field!("version", FieldKind::U32),
            field!("u01", FieldKind::I32),
            field!("tiling_u", FieldKind::U32),
            field!("tiling_v", FieldKind::U32),
            field!("texture_size", FieldKind::F32),
            field!("u02", FieldKind::U32),
            field!("is_natural", FieldKind::Bool),
        ],
    },
    ChunkSchema {
        chunk_id: CHUNK_MATERIAL_MARKER,
        name: "material marker",
        fields: &[field!("version", FieldKind::U32), field!("u01", FieldKind::U32)],
    },
    ChunkSchema {
        chunk_id: CHUNK_ITEM_ENTITY,
        name: "item entity",
        fields: &[
            field!("version", FieldKind::U32),
            field!("entity_model", FieldKind::NodeRef),
            field!("materials", FieldKind::List(&FieldKind::NodeRef)),
        ],
    },
    ChunkSchema {
        chunk_id: CHUNK_STATIC_OBJECT,
        name: "static object",
        fields: &[
            field!("version", FieldKind::U32),
            field!("mesh", FieldKind::NodeRef),
            field!("collidable", FieldKind::Bool),
            field!("shape", FieldKind::NodeRef),
        ],
    },
    ChunkSchema {
        chunk_id: CHUNK_SOLID2_GEOMETRY,
        name: "solid geometry",
        fields: &[
            field!("version", FieldKind::U32),
            field!("vertices_coords", FieldKind::List(&VEC3)),
            field!("normals", FieldKind::List(&VEC3)),
            field!("uv0", FieldKind::List(&VEC2)),
            field!("indices", FieldKind::List(&FieldKind::U16)),
        ],
    },
];

/// All chunk layouts known to the codec.
pub fn catalog() -> &'static [ChunkSchema] {
    CATALOG
}

/// Find the layout for a chunk id.
pub fn lookup(chunk_id: u32) -> Option<&'static ChunkSchema> {
    CATALOG.iter().find(|schema| schema.chunk_id == chunk_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_marker_spells_piks() {
        assert_eq!(SKIP_MARKER.to_le_bytes(), *b"PIKS");
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<u32> = catalog().iter().map(|s| s.chunk_id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), catalog().len());
    }

    #[test]
    fn test_lookup() {
        let schema = lookup(CHUNK_MATERIAL_TILING).unwrap();
        assert_eq!(schema.fields[0].name, "version");
        assert!(lookup(0xDEAD_BEEF).is_none());
        assert!(lookup(END_MARKER).is_none());
    }

    #[test]
    fn test_material_params_nested_layouts() {
        let params = lookup(CHUNK_MATERIAL_PARAMS).unwrap();
        let uv_anim = params.fields.iter().find(|f| f.name == "uv_anim").unwrap();
        let FieldKind::List(FieldKind::Struct(fields)) = uv_anim.kind else {
            panic!("uv_anim is not a list of structs");
        };
        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["name", "kind", "speed"]);
    }
}
