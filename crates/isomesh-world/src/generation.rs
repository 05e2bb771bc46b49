//! Procedural terrain generation.

use glam::IVec2;
use hashbrown::HashMap;
use isomesh_core::constants::{CHUNK_SIZE, MAX_LIGHT};
use isomesh_core::{ChunkPos, PackedLight, Result, VoxelState, WorldPos};
use isomesh_mesh::{LightAccess, VoxelAccess};
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::WorldSeed;

/// Terrain generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Seed for noise generation.
    pub seed: WorldSeed,
    /// Average surface height.
    pub base_height: i32,
    /// Columns at or below this height are flooded with water.
    pub sea_level: i32,
    /// Horizontal scale of terrain features.
    pub terrain_scale: f64,
    /// Peak-to-peak terrain height variation.
    pub terrain_height: f64,
    /// Number of noise octaves for detail.
    pub octaves: usize,
    /// Frequency multiplier between octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves.
    pub persistence: f64,
    /// Depth of dirt layer below surface.
    pub dirt_depth: i32,
    /// Surfaces up to this many blocks above sea level are sand.
    pub beach_height: i32,
    /// Surfaces at or above this height are snowy and carry a snow layer.
    pub snow_line: i32,
    /// Everything at or below this height is bedrock.
    pub bedrock_level: i32,
    /// Sky light lost per block below the surface.
    pub sky_falloff: u8,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            base_height: 40,
            sea_level: 32,
            terrain_scale: 64.0,
            terrain_height: 32.0,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            dirt_depth: 3,
            beach_height: 1,
            snow_line: 52,
            bedrock_level: 0,
            sky_falloff: 4,
        }
    }
}

/// Noise heightmap world.
///
/// Column heights are computed on first use and cached, so the repeated
/// queries of a chunk build (and of its neighbors' padding) hit the noise
/// function once per column.
pub struct TerrainWorld {
    config: TerrainConfig,
    height_noise: Fbm<Perlin>,
    columns: RwLock<HashMap<IVec2, i32>>,
}

impl TerrainWorld {
    /// Create a new terrain world with the given configuration.
    pub fn new(config: TerrainConfig) -> Self {
        let height_noise = Fbm::<Perlin>::new(config.seed)
            .set_octaves(config.octaves)
            .set_lacunarity(config.lacunarity)
            .set_persistence(config.persistence);

        Self {
            config,
            height_noise,
            columns: RwLock::new(HashMap::new()),
        }
    }

    /// Create a terrain world with default configuration.
    pub fn with_seed(seed: WorldSeed) -> Self {
        Self::new(TerrainConfig {
            seed,
            ..Default::default()
        })
    }

    /// Get the terrain configuration.
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    fn noise_height(&self, x: i32, z: i32) -> i32 {
        let nx = f64::from(x) / self.config.terrain_scale;
        let nz = f64::from(z) / self.config.terrain_scale;
        let offset = self.height_noise.get([nx, nz]) * 0.5 * self.config.terrain_height;
        self.config.base_height + offset.round() as i32
    }

    /// Y coordinate of the topmost terrain block of a column.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let column = IVec2::new(x, z);
        if let Some(&height) = self.columns.read().get(&column) {
            return height;
        }
        let height = self.noise_height(x, z);
        self.columns.write().insert(column, height);
        height
    }

    /// Number of cached columns.
    pub fn cached_columns(&self) -> usize {
        self.columns.read().len()
    }

    /// Compute the heights of every column touched by `chunks`, widened by
    /// `margin` blocks, in parallel.
    ///
    /// Returns the number of columns that were not cached yet.
    pub fn prefetch_columns(&self, chunks: &[ChunkPos], margin: i32) -> usize {
        let size = CHUNK_SIZE as i32;
        let missing: Vec<IVec2> = {
            let columns = self.columns.read();
            let mut wanted = hashbrown::HashSet::new();
            for chunk in chunks {
                let base = chunk.to_world_pos();
                for z in base.z - margin..base.z + size + margin {
                    for x in base.x - margin..base.x + size + margin {
                        let column = IVec2::new(x, z);
                        if !columns.contains_key(&column) {
                            wanted.insert(column);
                        }
                    }
                }
            }
            wanted.into_iter().collect()
        };

        let heights: Vec<(IVec2, i32)> = missing
            .par_iter()
            .map(|&column| (column, self.noise_height(column.x, column.y)))
            .collect();

        let count = heights.len();
        self.columns.write().extend(heights);
        debug!(chunks = chunks.len(), columns = count, "prefetched terrain columns");
        count
    }

    /// Voxel state at a world position.
    pub fn block_at(&self, pos: WorldPos) -> VoxelState {
        let config = &self.config;
        if pos.y <= config.bedrock_level {
            return VoxelState::BEDROCK;
        }

        let surface = self.height_at(pos.x, pos.z);
        let beach = surface <= config.sea_level + config.beach_height;
        let snowy = !beach && surface >= config.snow_line;

        if pos.y > surface {
            if pos.y == surface + 1 && snowy {
                VoxelState::SNOW_LAYER
            } else if pos.y <= config.sea_level {
                VoxelState::WATER
            } else {
                VoxelState::AIR
            }
        } else if pos.y == surface {
            if beach {
                VoxelState::SAND
            } else if snowy {
                VoxelState::SNOWY_GRASS
            } else {
                VoxelState::GRASS
            }
        } else if pos.y > surface - config.dirt_depth {
            if beach {
                VoxelState::SAND
            } else {
                VoxelState::DIRT
            }
        } else {
            VoxelState::STONE
        }
    }

    /// Packed light at a world position.
    ///
    /// Open air is fully sky-lit. Sky light fades with depth below the
    /// water surface (one level per block) and below the ground
    /// (`sky_falloff` levels per block). There are no block light sources.
    pub fn light_at(&self, pos: WorldPos) -> PackedLight {
        let surface = self.height_at(pos.x, pos.z);
        let config = &self.config;

        let sky = if pos.y > surface {
            let water_depth = (config.sea_level - pos.y + 1).max(0);
            i32::from(MAX_LIGHT) - water_depth
        } else {
            let depth = surface - pos.y + 1;
            i32::from(MAX_LIGHT) - depth * i32::from(config.sky_falloff)
        };
        PackedLight::new(sky.clamp(0, i32::from(MAX_LIGHT)) as u8, 0)
    }
}

impl VoxelAccess for TerrainWorld {
    fn voxel(&self, pos: WorldPos) -> Result<VoxelState> {
        Ok(self.block_at(pos))
    }
}

impl LightAccess for TerrainWorld {
    fn packed_light(&self, pos: WorldPos) -> Result<PackedLight> {
        Ok(self.light_at(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::AtlasTextures;
    use approx::assert_relative_eq;
    use isomesh_mesh::{ArenaCounters, BuildArena, MeshBuilder, MeshConfig, RenderLayer};

    fn flat(height: i32, snow_line: i32) -> TerrainWorld {
        TerrainWorld::new(TerrainConfig {
            base_height: height,
            sea_level: 0,
            terrain_height: 0.0,
            snow_line,
            ..TerrainConfig::default()
        })
    }

    #[test]
    fn world_deterministic() {
        let a = TerrainWorld::with_seed(12345);
        let b = TerrainWorld::with_seed(12345);

        for x in -50..50 {
            for z in -50..50 {
                assert_eq!(a.height_at(x, z), b.height_at(x, z));
            }
        }
    }

    #[test]
    fn different_seeds_different_terrain() {
        let a = TerrainWorld::with_seed(12345);
        let b = TerrainWorld::with_seed(54321);

        let mut differences = 0;
        for x in 0..10 {
            for z in 0..10 {
                if a.height_at(x * 7, z * 7) != b.height_at(x * 7, z * 7) {
                    differences += 1;
                }
            }
        }
        assert!(differences > 50, "Seeds should produce different terrain");
    }

    #[test]
    fn column_layers() {
        let world = TerrainWorld::with_seed(7);
        let config = world.config().clone();

        for x in 0..16 {
            let surface = world.height_at(x, 3);
            let top = world.block_at(WorldPos::new(x, surface, 3));
            assert!(
                [VoxelState::GRASS, VoxelState::SNOWY_GRASS, VoxelState::SAND].contains(&top),
                "unexpected surface block {top:?}"
            );

            let deep = WorldPos::new(x, surface - config.dirt_depth, 3);
            if deep.y > config.bedrock_level {
                assert_eq!(world.block_at(deep), VoxelState::STONE);
            }
            assert_eq!(
                world.block_at(WorldPos::new(x, config.bedrock_level, 3)),
                VoxelState::BEDROCK
            );
            let above = world.block_at(WorldPos::new(x, surface + 2, 3));
            assert!(above == VoxelState::AIR || above == VoxelState::WATER);
        }
    }

    #[test]
    fn snow_line_adds_snow_layer() {
        let world = flat(20, 10);
        assert_eq!(world.block_at(WorldPos::new(0, 20, 0)), VoxelState::SNOWY_GRASS);
        assert_eq!(world.block_at(WorldPos::new(0, 21, 0)), VoxelState::SNOW_LAYER);
        assert_eq!(world.block_at(WorldPos::new(0, 22, 0)), VoxelState::AIR);
        assert_eq!(world.block_at(WorldPos::new(0, 19, 0)), VoxelState::DIRT);
    }

    #[test]
    fn water_fills_below_sea_level() {
        let world = TerrainWorld::new(TerrainConfig {
            base_height: 10,
            sea_level: 14,
            terrain_height: 0.0,
            ..TerrainConfig::default()
        });
        assert_eq!(world.block_at(WorldPos::new(0, 10, 0)), VoxelState::SAND);
        assert_eq!(world.block_at(WorldPos::new(0, 14, 0)), VoxelState::WATER);
        assert_eq!(world.block_at(WorldPos::new(0, 15, 0)), VoxelState::AIR);

        assert_eq!(world.light_at(WorldPos::new(0, 15, 0)).sky(), 15);
        assert_eq!(world.light_at(WorldPos::new(0, 14, 0)).sky(), 14);
        assert_eq!(world.light_at(WorldPos::new(0, 11, 0)).sky(), 11);
    }

    #[test]
    fn sky_light_fades_underground() {
        let world = flat(20, i32::MAX);
        assert_eq!(world.light_at(WorldPos::new(0, 40, 0)), PackedLight::FULL_SKY);
        assert_eq!(world.light_at(WorldPos::new(0, 20, 0)).sky(), 11);
        assert_eq!(world.light_at(WorldPos::new(0, 19, 0)).sky(), 7);
        assert_eq!(world.light_at(WorldPos::new(0, 5, 0)), PackedLight::DARK);
    }

    #[test]
    fn prefetch_matches_lazy_heights() {
        let world = TerrainWorld::with_seed(99);
        let chunks = [ChunkPos::new(0, 0, 0), ChunkPos::new(1, 0, 0)];
        let computed = world.prefetch_columns(&chunks, 1);
        assert_eq!(computed, 34 * 18);
        assert_eq!(world.cached_columns(), computed);
        assert_eq!(world.prefetch_columns(&chunks, 1), 0);

        let lazy = TerrainWorld::with_seed(99);
        for x in -1..33 {
            assert_eq!(world.height_at(x, 5), lazy.height_at(x, 5));
        }
    }

    #[test]
    fn flat_world_meshes_at_surface() {
        let world = flat(20, i32::MAX);
        let builder = MeshBuilder::new(MeshConfig::default());
        let arena = BuildArena::new();

        let mesh = builder
            .mesh_chunk(&arena, &world, &AtlasTextures::default(), ChunkPos::new(0, 1, 0))
            .unwrap();

        assert_eq!(mesh.stats().surface_cells, 256);
        assert_eq!(mesh.triangle_count(), 512);
        let vertices = mesh.vertices(RenderLayer::CutoutMipped);
        assert_eq!(vertices.len(), 512 * 3);
        for vertex in vertices {
            assert_relative_eq!(vertex.position[1], 21.0);
        }

        let above = builder
            .mesh_chunk(&arena, &world, &AtlasTextures::default(), ChunkPos::new(0, 2, 0))
            .unwrap();
        assert!(above.is_empty());
    }

    #[test]
    fn snow_cover_prefers_snow_texture() {
        let world = flat(20, 10);
        let builder = MeshBuilder::new(MeshConfig {
            better_textures: true,
            ..MeshConfig::default()
        });

        let mesh = builder
            .mesh_chunk(
                &BuildArena::new(),
                &world,
                &AtlasTextures::default(),
                ChunkPos::new(0, 1, 0),
            )
            .unwrap();

        let stats = mesh.stats();
        assert_eq!(stats.surface_cells, 256);
        assert_eq!(stats.better_texture_cells, 256);
        // Grass below contributes 4, the snow layer 4 * 0.125, air above -4.
        for vertex in mesh.vertices(RenderLayer::Solid) {
            assert_relative_eq!(vertex.position[1], 21.5625);
        }
        assert_eq!(mesh.vertices(RenderLayer::Solid).len(), 512 * 3);
    }

    #[test]
    fn noisy_region_builds_deterministically() {
        let world = TerrainWorld::with_seed(3);
        let textures = AtlasTextures::default();
        let builder = MeshBuilder::new(MeshConfig {
            offset_vertices: true,
            better_textures: true,
            ..MeshConfig::default()
        });
        let chunks: Vec<ChunkPos> = (0..2)
            .flat_map(|x| (1..4).map(move |y| ChunkPos::new(x, y, 0)))
            .collect();
        world.prefetch_columns(&chunks, 1);

        let counters = ArenaCounters::new();
        let first = builder.build_chunks_parallel(&world, &textures, &chunks, &counters);
        let second = builder.build_chunks_parallel(&world, &textures, &chunks, &counters);

        let mut triangles = 0;
        for ((pos_a, a), (pos_b, b)) in first.iter().zip(&second) {
            assert_eq!(pos_a, pos_b);
            let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
            for layer in RenderLayer::ALL {
                assert_eq!(a.as_bytes(layer), b.as_bytes(layer));
            }
            triangles += a.triangle_count();
        }
        assert!(triangles > 0);
        assert!(counters.snapshot().iter().all(|(_, stats)| stats.live == 0));
    }
}
