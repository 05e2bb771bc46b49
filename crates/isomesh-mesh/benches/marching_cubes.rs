//! Benchmarks for the chunk meshing hot path.
//!
//! Run with: cargo bench --package isomesh-mesh --bench marching_cubes

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use glam::{IVec3, Vec3};
use isomesh_core::{ChunkPos, PackedLight, Result, VoxelState, WorldPos};
use isomesh_mesh::{
    BuildArena, DensityGrid, LightAccess, MaterialClassifier, MeshBuilder, MeshConfig,
    PaddedBounds, PaddedFieldCache, TextureInfo, TextureProvider, Triangulator, UvRect,
    VoxelAccess,
};

/// Rolling hills around y = 8, enough to cross most cells of a chunk layer.
struct Hills;

impl Hills {
    fn height(x: i32, z: i32) -> i32 {
        let h = (x as f32 * 0.3).sin() * 3.0 + (z as f32 * 0.2).cos() * 3.0;
        8 + h as i32
    }
}

impl VoxelAccess for Hills {
    fn voxel(&self, pos: WorldPos) -> Result<VoxelState> {
        let height = Self::height(pos.x, pos.z);
        Ok(if pos.y < height {
            VoxelState::STONE
        } else if pos.y == height {
            VoxelState::GRASS
        } else {
            VoxelState::AIR
        })
    }
}

impl LightAccess for Hills {
    fn packed_light(&self, pos: WorldPos) -> Result<PackedLight> {
        Ok(if pos.y > Self::height(pos.x, pos.z) {
            PackedLight::FULL_SKY
        } else {
            PackedLight::DARK
        })
    }
}

struct Plain;

impl TextureProvider for Plain {
    fn texture(&self, _state: VoxelState, _pos: WorldPos) -> Result<TextureInfo> {
        Ok(TextureInfo::new(UvRect::FULL, TextureInfo::WHITE))
    }
}

fn benchmark_density(c: &mut Criterion) {
    let classifier = MaterialClassifier::default();
    let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
    let cache = PaddedFieldCache::build(&Hills, &classifier, bounds).unwrap();
    let mut grid = DensityGrid::default();

    c.bench_function("density_grid_chunk", |b| {
        b.iter(|| {
            grid.fill_from(black_box(&cache));
            black_box(grid.sample(IVec3::splat(8)))
        });
    });
}

fn benchmark_triangulation(c: &mut Criterion) {
    let classifier = MaterialClassifier::default();
    let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
    let cache = PaddedFieldCache::build(&Hills, &classifier, bounds).unwrap();
    let grid = DensityGrid::build(&cache);
    let config = MeshConfig::default();
    let mut vertices = Vec::new();

    c.bench_function("triangulate_chunk", |b| {
        b.iter(|| {
            vertices.clear();
            let count = Triangulator::new(&grid, Vec3::ZERO, &config, &mut vertices).count();
            black_box(count)
        });
    });
}

fn benchmark_full_build(c: &mut Criterion) {
    let builder = MeshBuilder::new(MeshConfig {
        better_textures: true,
        offset_vertices: true,
        ..MeshConfig::default()
    });
    let arena = BuildArena::new();

    let mut group = c.benchmark_group("chunk_build");
    group.throughput(Throughput::Elements(16));
    group.bench_function("4x4_chunks", |b| {
        b.iter(|| {
            for z in 0..4 {
                for x in 0..4 {
                    let mesh = builder
                        .mesh_chunk(&arena, &Hills, &Plain, ChunkPos::new(x, 0, z))
                        .unwrap();
                    black_box(mesh.triangle_count());
                }
            }
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_density,
    benchmark_triangulation,
    benchmark_full_build,
);
criterion_main!(benches);
