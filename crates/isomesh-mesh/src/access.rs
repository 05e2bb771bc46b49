//! Boundary traits for the data the mesher reads.
//!
//! Implementations live outside this crate. Every query returns a
//! [`Result`] so a provider that can fail aborts the chunk instead of
//! producing a partial mesh. Unloaded regions should answer with a sentinel
//! state (usually air) rather than an error.

use isomesh_core::{PackedLight, Result, VoxelState, WorldPos};

/// Read access to voxel states.
pub trait VoxelAccess {
    /// Voxel state at a world position
    fn voxel(&self, pos: WorldPos) -> Result<VoxelState>;
}

/// Read access to packed sky and block light.
pub trait LightAccess {
    /// Packed light at a world position
    fn packed_light(&self, pos: WorldPos) -> Result<PackedLight>;
}

/// Texture-atlas rectangle in normalized coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UvRect {
    pub min_u: f32,
    pub min_v: f32,
    pub max_u: f32,
    pub max_v: f32,
}

impl UvRect {
    /// The full texture
    pub const FULL: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    #[inline]
    pub const fn new(min_u: f32, min_v: f32, max_u: f32, max_v: f32) -> Self {
        Self {
            min_u,
            min_v,
            max_u,
            max_v,
        }
    }
}

/// Texture data for one voxel state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureInfo {
    /// Atlas rectangle
    pub uv: UvRect,
    /// RGBA tint
    pub tint: [u8; 4],
}

impl TextureInfo {
    /// Untinted (opaque white)
    pub const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[inline]
    pub const fn new(uv: UvRect, tint: [u8; 4]) -> Self {
        Self { uv, tint }
    }
}

/// Supplies baked textures for voxel states.
///
/// Must answer for every state the classifier can mark smoothable, plus the
/// states the texture search prefers.
pub trait TextureProvider {
    /// Texture for `state` as placed at `pos` (position drives tints)
    fn texture(&self, state: VoxelState, pos: WorldPos) -> Result<TextureInfo>;
}
