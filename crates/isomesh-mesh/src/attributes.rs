//! Render attributes for generated faces.
//!
//! A smoothed face has no voxel of its own, so its texture, tint, and light
//! are borrowed from a voxel near the cell it came from. The search order is
//! a heuristic: changing [`OFFSETS_ORDERED`] changes which texture wins on
//! ties.

use glam::IVec3;
use isomesh_core::{BlockId, Material, PackedLight, Result, VoxelState};
use serde::{Deserialize, Serialize};

use crate::access::{TextureProvider, UvRect};
use crate::cache::{PackedLightCache, PaddedFieldCache};
use crate::config::MeshConfig;

/// The 26 neighbors of a voxel, faces first, then edges, then corners.
pub const OFFSETS_ORDERED: [IVec3; 26] = [
    // Faces
    IVec3::new(0, -1, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
    // Edges
    IVec3::new(-1, -1, 0),
    IVec3::new(-1, 0, -1),
    IVec3::new(-1, 0, 1),
    IVec3::new(-1, 1, 0),
    IVec3::new(0, -1, -1),
    IVec3::new(0, -1, 1),
    IVec3::new(0, 1, -1),
    IVec3::new(0, 1, 1),
    IVec3::new(1, -1, 0),
    IVec3::new(1, 0, -1),
    IVec3::new(1, 0, 1),
    IVec3::new(1, 1, 0),
    // Corners
    IVec3::new(1, 1, 1),
    IVec3::new(1, 1, -1),
    IVec3::new(-1, 1, 1),
    IVec3::new(-1, 1, -1),
    IVec3::new(1, -1, 1),
    IVec3::new(1, -1, -1),
    IVec3::new(-1, -1, 1),
    IVec3::new(-1, -1, -1),
];

/// Render pass a face is drawn in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderLayer {
    /// Opaque geometry
    #[default]
    Solid,
    /// Alpha-tested geometry sampled with mipmaps
    CutoutMipped,
    /// Alpha-tested geometry sampled without mipmaps
    Cutout,
    /// Blended geometry
    Translucent,
}

impl RenderLayer {
    /// All layers, in draw order
    pub const ALL: [Self; 4] = [
        Self::Solid,
        Self::CutoutMipped,
        Self::Cutout,
        Self::Translucent,
    ];

    /// Position in [`Self::ALL`]
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Layer a material is normally drawn in
    pub const fn for_material(material: Material) -> Self {
        match material {
            Material::Grass | Material::Leaves | Material::Plants | Material::Vine => {
                Self::CutoutMipped
            }
            Material::Glass | Material::Web | Material::Fire | Material::Circuits => Self::Cutout,
            Material::Water | Material::Ice | Material::Portal => Self::Translucent,
            _ => Self::Solid,
        }
    }

    /// Fold the two cutout layers into whichever one the mipmap setting uses.
    #[inline]
    pub const fn coalesce(self, mipmap_level: u8) -> Self {
        match self {
            Self::CutoutMipped if mipmap_level == 0 => Self::Cutout,
            Self::Cutout if mipmap_level != 0 => Self::CutoutMipped,
            other => other,
        }
    }
}

/// How the texture voxel of a face was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// A snow-like voxel was preferred
    BetterSnow,
    /// A grass-like voxel was preferred
    BetterGrass,
    /// The cell's own voxel is smoothable
    Origin,
    /// The first smoothable neighbor in search order
    Neighbor,
    /// Nothing smoothable nearby; the cell's own voxel is used anyway
    Fallback,
}

impl Resolution {
    /// Whether a better-texture preference decided the choice
    #[inline]
    pub const fn is_better_texture(self) -> bool {
        matches!(self, Self::BetterSnow | Self::BetterGrass)
    }
}

/// Attributes shared by every face generated in one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderAttributes {
    /// Render pass
    pub layer: RenderLayer,
    /// RGBA tint
    pub tint: [u8; 4],
    /// Atlas rectangle
    pub uv: UvRect,
    /// Sky and block light at the texture voxel
    pub light: PackedLight,
    /// Chunk-relative position of the texture voxel
    pub source: IVec3,
    /// Why that voxel was chosen
    pub resolution: Resolution,
}

/// Snow layers and snow-covered grass or podzol.
#[inline]
pub fn is_snow_like(state: VoxelState) -> bool {
    state.block_id == BlockId::SNOW_LAYER
        || (state.is_snowy() && matches!(state.block_id, BlockId::GRASS | BlockId::PODZOL))
}

/// Plain grass blocks.
#[inline]
pub fn is_grass_like(state: VoxelState) -> bool {
    state.block_id == BlockId::GRASS && !state.is_snowy()
}

/// Picks the voxel whose texture and light a cell's faces use.
pub struct FaceAttributeResolver<'a, T: ?Sized> {
    fields: &'a PaddedFieldCache,
    light: &'a PackedLightCache,
    textures: &'a T,
    config: &'a MeshConfig,
}

impl<'a, T: TextureProvider + ?Sized> FaceAttributeResolver<'a, T> {
    pub fn new(
        fields: &'a PaddedFieldCache,
        light: &'a PackedLightCache,
        textures: &'a T,
        config: &'a MeshConfig,
    ) -> Self {
        Self {
            fields,
            light,
            textures,
            config,
        }
    }

    /// Chunk-relative position of the texture voxel for `cell`.
    ///
    /// Reads `cell` and its 26 neighbors, which the cache padding covers for
    /// every cell of the chunk.
    pub fn choose(&self, cell: IVec3) -> (IVec3, Resolution) {
        if self.config.prefers_snow() {
            if let Some(pos) = self.search(cell, is_snow_like) {
                return (pos, Resolution::BetterSnow);
            }
        }
        if self.config.prefers_grass() {
            if let Some(pos) = self.search(cell, is_grass_like) {
                return (pos, Resolution::BetterGrass);
            }
        }

        if self.fields.is_smoothable(cell) {
            return (cell, Resolution::Origin);
        }
        OFFSETS_ORDERED
            .iter()
            .map(|offset| cell + *offset)
            .find(|pos| self.fields.is_smoothable(*pos))
            .map_or((cell, Resolution::Fallback), |pos| (pos, Resolution::Neighbor))
    }

    /// First voxel matching `wanted`, looking at `cell` itself before its neighbors
    fn search(&self, cell: IVec3, wanted: fn(VoxelState) -> bool) -> Option<IVec3> {
        std::iter::once(cell)
            .chain(OFFSETS_ORDERED.iter().map(|offset| cell + *offset))
            .find(|pos| wanted(self.fields.state(*pos)))
    }

    /// Resolve the render attributes for the faces of `cell`.
    pub fn resolve(&self, cell: IVec3) -> Result<RenderAttributes> {
        let (source, resolution) = self.choose(cell);
        let state = self.fields.state(source);
        if resolution == Resolution::Fallback {
            tracing::trace!(?cell, block = state.block_id.0, "no smoothable voxel near cell");
        }

        let model_state = if is_snow_like(state) {
            VoxelState::SNOW_LAYER
        } else {
            state
        };
        let texture = self
            .textures
            .texture(model_state, self.fields.bounds().world(source))?;

        Ok(RenderAttributes {
            layer: RenderLayer::for_material(state.material).coalesce(self.config.mipmap_level),
            tint: texture.tint,
            uv: texture.uv,
            light: self.light.get(source),
            source,
            resolution,
        })
    }
}
