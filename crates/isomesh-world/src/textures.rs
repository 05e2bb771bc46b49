//! Square texture atlas with one tile per block.

use hashbrown::HashMap;
use isomesh_core::{BlockId, Error, Result, VoxelState, WorldPos};
use isomesh_mesh::{TextureInfo, TextureProvider, UvRect};

/// Atlas layout and biome tints.
///
/// Block `n` uses tile `n` (row-major) unless it has an explicit tile.
/// Grass and foliage are tinted, with a small per-column variation so large
/// meadows don't look flat.
#[derive(Clone, Debug)]
pub struct AtlasTextures {
    tiles_per_row: u32,
    tiles: HashMap<BlockId, u32>,
    grass_tint: [u8; 4],
    foliage_tint: [u8; 4],
    tint_variation: u8,
}

impl Default for AtlasTextures {
    fn default() -> Self {
        Self::new(16)
    }
}

impl AtlasTextures {
    pub fn new(tiles_per_row: u32) -> Self {
        Self {
            tiles_per_row: tiles_per_row.max(1),
            tiles: HashMap::new(),
            grass_tint: [124, 189, 107, 255],
            foliage_tint: [72, 181, 24, 255],
            tint_variation: 12,
        }
    }

    /// Place `block` on an explicit tile.
    #[must_use]
    pub fn with_tile(mut self, block: BlockId, tile: u32) -> Self {
        self.tiles.insert(block, tile);
        self
    }

    /// Set the base grass and foliage tints.
    #[must_use]
    pub const fn with_tints(mut self, grass: [u8; 4], foliage: [u8; 4]) -> Self {
        self.grass_tint = grass;
        self.foliage_tint = foliage;
        self
    }

    /// Set the largest per-column tint offset (0 disables variation).
    #[must_use]
    pub const fn with_tint_variation(mut self, variation: u8) -> Self {
        self.tint_variation = variation;
        self
    }

    /// Number of tiles in the atlas.
    pub const fn capacity(&self) -> u32 {
        self.tiles_per_row * self.tiles_per_row
    }

    /// Tile a block is drawn with.
    pub fn tile_of(&self, block: BlockId) -> Result<u32> {
        let tile = self
            .tiles
            .get(&block)
            .copied()
            .unwrap_or_else(|| u32::from(block.0));
        if tile >= self.capacity() {
            return Err(Error::external(format!(
                "block {} has no atlas tile ({tile} >= {})",
                block.0,
                self.capacity()
            )));
        }
        Ok(tile)
    }

    /// Normalized rectangle of a tile.
    pub fn tile_uv(&self, tile: u32) -> UvRect {
        let size = 1.0 / self.tiles_per_row as f32;
        let u = (tile % self.tiles_per_row) as f32 * size;
        let v = (tile / self.tiles_per_row) as f32 * size;
        UvRect::new(u, v, u + size, v + size)
    }

    fn tint(&self, state: VoxelState, pos: WorldPos) -> [u8; 4] {
        let base = match state.block_id {
            BlockId::GRASS | BlockId::TALL_GRASS => self.grass_tint,
            BlockId::LEAVES => self.foliage_tint,
            _ => return TextureInfo::WHITE,
        };
        if self.tint_variation == 0 {
            return base;
        }

        let span = 2 * i32::from(self.tint_variation) + 1;
        let offset = column_hash(pos.x, pos.z).rem_euclid(span) - i32::from(self.tint_variation);
        let shift = |channel: u8| (i32::from(channel) + offset).clamp(0, 255) as u8;
        [shift(base[0]), shift(base[1]), shift(base[2]), base[3]]
    }
}

fn column_hash(x: i32, z: i32) -> i32 {
    let h = x.wrapping_mul(73_856_093) ^ z.wrapping_mul(19_349_663);
    h ^ (h >> 13)
}

impl TextureProvider for AtlasTextures {
    fn texture(&self, state: VoxelState, pos: WorldPos) -> Result<TextureInfo> {
        let tile = self.tile_of(state.block_id)?;
        Ok(TextureInfo::new(self.tile_uv(tile), self.tint(state, pos)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tiles_are_row_major() {
        let atlas = AtlasTextures::default();
        let first = atlas.tile_uv(0);
        assert_relative_eq!(first.min_u, 0.0);
        assert_relative_eq!(first.max_u, 0.0625);

        let uv = atlas.tile_uv(17);
        assert_relative_eq!(uv.min_u, 0.0625);
        assert_relative_eq!(uv.min_v, 0.0625);
        assert_relative_eq!(uv.max_u, 0.125);
        assert_relative_eq!(uv.max_v, 0.125);
    }

    #[test]
    fn explicit_tiles_override_block_ids() {
        let atlas = AtlasTextures::default().with_tile(BlockId::STONE, 40);
        assert_eq!(atlas.tile_of(BlockId::STONE).unwrap(), 40);
        assert_eq!(atlas.tile_of(BlockId::DIRT).unwrap(), 2);
    }

    #[test]
    fn blocks_outside_atlas_fail() {
        let atlas = AtlasTextures::new(4);
        let err = atlas
            .texture(VoxelState::COBBLESTONE, WorldPos::new(0, 0, 0))
            .unwrap_err();
        assert!(matches!(err, Error::ExternalAccessor(_)));
    }

    #[test]
    fn only_vegetation_is_tinted() {
        let atlas = AtlasTextures::default().with_tint_variation(0);
        let pos = WorldPos::new(3, 4, 5);
        assert_eq!(
            atlas.texture(VoxelState::STONE, pos).unwrap().tint,
            TextureInfo::WHITE
        );
        assert_eq!(
            atlas.texture(VoxelState::GRASS, pos).unwrap().tint,
            [124, 189, 107, 255]
        );
        assert_eq!(
            atlas.texture(VoxelState::LEAVES, pos).unwrap().tint,
            [72, 181, 24, 255]
        );
    }

    #[test]
    fn tint_varies_per_column_only() {
        let atlas = AtlasTextures::default();
        let tint = |x, y, z| atlas.texture(VoxelState::GRASS, WorldPos::new(x, y, z)).unwrap().tint;

        assert_eq!(tint(10, 0, -4), tint(10, 30, -4));
        for x in -20..20 {
            let [r, g, b, a] = tint(x, 0, x * 3);
            assert!((112..=136).contains(&r));
            assert!((177..=201).contains(&g));
            assert!((95..=119).contains(&b));
            assert_eq!(a, 255);
        }
        assert!((0..8).any(|x| tint(x, 0, 0) != tint(0, 0, 0)));
    }
}
