//! Coordinate systems for the voxel world.
//!
//! - [`WorldPos`]: absolute voxel coordinates.
//! - [`ChunkPos`]: chunk coordinates, one unit per `CHUNK_SIZE` voxels.
//!
//! Chunk-relative coordinates are plain [`IVec3`] values. The mesher's padded
//! caches address voxels up to the padding margin outside the chunk, so they
//! may be negative or reach past `CHUNK_SIZE`.

use crate::constants::{CHUNK_BITS, CHUNK_SIZE};
use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Chunk position in chunk coordinates.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub _pad: i32,
}

impl ChunkPos {
    /// Create a new chunk position
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z, _pad: 0 }
    }

    /// World position of the chunk's minimum corner
    #[inline]
    pub const fn to_world_pos(self) -> WorldPos {
        WorldPos::new(
            self.x << CHUNK_BITS,
            self.y << CHUNK_BITS,
            self.z << CHUNK_BITS,
        )
    }
}

impl std::fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// World position in voxel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    /// Create a new world position
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Get the chunk containing this position
    #[inline]
    pub const fn chunk_pos(self) -> ChunkPos {
        ChunkPos::new(
            self.x >> CHUNK_BITS,
            self.y >> CHUNK_BITS,
            self.z >> CHUNK_BITS,
        )
    }

    /// Position inside its chunk, each axis in `0..CHUNK_SIZE`
    #[inline]
    pub const fn in_chunk(self) -> IVec3 {
        let mask = (CHUNK_SIZE - 1) as i32;
        IVec3::new(self.x & mask, self.y & mask, self.z & mask)
    }

    /// Offset of this position from the minimum corner of `chunk`.
    ///
    /// The result is negative or at least `CHUNK_SIZE` for positions outside
    /// the chunk, which is how padded caches address their margin.
    #[inline]
    pub const fn relative_to(self, chunk: ChunkPos) -> IVec3 {
        let origin = chunk.to_world_pos();
        IVec3::new(self.x - origin.x, self.y - origin.y, self.z - origin.z)
    }

    /// Offset by a relative vector
    #[inline]
    pub const fn offset(self, by: IVec3) -> Self {
        Self::new(self.x + by.x, self.y + by.y, self.z + by.z)
    }


    /// Convert to floating point Vec3
    #[inline]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl From<Vec3> for WorldPos {
    fn from(v: Vec3) -> Self {
        Self::new(v.x.floor() as i32, v.y.floor() as i32, v.z.floor() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_and_in_chunk_recompose() {
        let positions = [
            WorldPos::new(100, -50, 200),
            WorldPos::new(-1, -1, -1),
            WorldPos::new(0, 15, 16),
        ];
        for world in positions {
            let chunk = world.chunk_pos();
            let inner = world.in_chunk();
            assert!(inner.min_element() >= 0 && inner.max_element() < CHUNK_SIZE as i32);
            assert_eq!(chunk.to_world_pos().offset(inner), world);
            assert_eq!(world.relative_to(chunk), inner);
        }
        assert_eq!(WorldPos::new(-1, -1, -1).chunk_pos(), ChunkPos::new(-1, -1, -1));
    }

    #[test]
    fn chunk_pos_display() {
        assert_eq!(ChunkPos::new(3, -2, 7).to_string(), "(3, -2, 7)");
    }

    #[test]
    fn relative_to_reaches_into_padding() {
        let chunk = ChunkPos::new(2, 0, -1);
        let origin = chunk.to_world_pos();
        assert_eq!(origin, WorldPos::new(32, 0, -16));

        assert_eq!(origin.relative_to(chunk), IVec3::ZERO);
        assert_eq!(
            origin.offset(IVec3::new(-1, 16, 3)).relative_to(chunk),
            IVec3::new(-1, 16, 3)
        );
    }

    #[test]
    fn world_pos_from_vec3_floors() {
        assert_eq!(
            WorldPos::from(Vec3::new(-0.5, 1.9, 0.0)),
            WorldPos::new(-1, 1, 0)
        );
    }
}
