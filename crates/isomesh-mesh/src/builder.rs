//! Chunk mesh builds.
//!
//! A build runs on one thread from start to finish:
//!
//! 1. Cache voxel classifications and light around the chunk.
//! 2. Compute the density grid from the cache.
//! 3. Triangulate, resolving attributes once per surface cell.
//! 4. Hand the staged faces to the sink.
//!
//! Everything a build allocates comes from a [`BuildArena`] and goes back
//! to it when the build returns, whether it succeeded or not. The sink only
//! sees faces from builds that succeeded.

use std::ops::AddAssign;

use glam::IVec3;
use isomesh_core::{ChunkPos, Error, Result};
use rayon::prelude::*;
use tracing::{debug, trace_span, warn};

use crate::access::{LightAccess, TextureProvider, VoxelAccess};
use crate::arena::{with_thread_arena, ArenaCounters, BuildArena};
use crate::attributes::{FaceAttributeResolver, RenderAttributes, Resolution};
use crate::cache::PaddedBounds;
use crate::chunk_mesh::ChunkMesh;
use crate::classifier::MaterialClassifier;
use crate::config::{MeshConfig, MIN_PADDING};
use crate::face::{Face, FaceSink};
use crate::marching_cubes::Triangulator;

/// Counters describing one build (or the sum of several).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Cells visited
    pub cells: usize,
    /// Cells the surface crosses
    pub surface_cells: usize,
    /// Triangles emitted
    pub triangles: usize,
    /// Edge vertices computed
    pub vertices: usize,
    /// Surface cells with no smoothable voxel nearby
    pub unresolved_cells: usize,
    /// Surface cells textured by a better-texture preference
    pub better_texture_cells: usize,
}

impl AddAssign for MeshStats {
    fn add_assign(&mut self, other: Self) {
        self.cells += other.cells;
        self.surface_cells += other.surface_cells;
        self.triangles += other.triangles;
        self.vertices += other.vertices;
        self.unresolved_cells += other.unresolved_cells;
        self.better_texture_cells += other.better_texture_cells;
    }
}

/// Builds chunk meshes with a fixed configuration.
///
/// The builder is immutable and can be shared by any number of build
/// threads.
#[derive(Clone, Debug, Default)]
pub struct MeshBuilder {
    config: MeshConfig,
    classifier: MaterialClassifier,
}

impl MeshBuilder {
    /// Create a builder whose classifier follows the config's smoothable options
    pub fn new(config: MeshConfig) -> Self {
        let classifier = MaterialClassifier::from_config(&config);
        Self { config, classifier }
    }

    /// Create a builder with an explicit classifier
    pub const fn with_classifier(config: MeshConfig, classifier: MaterialClassifier) -> Self {
        Self { config, classifier }
    }

    #[inline]
    pub const fn config(&self) -> &MeshConfig {
        &self.config
    }

    #[inline]
    pub const fn classifier(&self) -> &MaterialClassifier {
        &self.classifier
    }

    /// Mesh one chunk and deliver its faces to `sink`.
    ///
    /// Fails with [`Error::OutOfBounds`] when the configured padding cannot
    /// cover the neighbor reads, and with whatever error a provider returns.
    /// On failure the sink is not called.
    pub fn build_chunk<W, T, S>(
        &self,
        arena: &BuildArena,
        world: &W,
        textures: &T,
        chunk: ChunkPos,
        sink: &mut S,
    ) -> Result<MeshStats>
    where
        W: VoxelAccess + LightAccess + ?Sized,
        T: TextureProvider + ?Sized,
        S: FaceSink + ?Sized,
    {
        let span = trace_span!("chunk_build", x = chunk.x, y = chunk.y, z = chunk.z);
        let _enter = span.enter();

        let bounds = PaddedBounds::chunk(chunk, self.config.padding);
        if self.config.padding < MIN_PADDING {
            return Err(Error::out_of_bounds(
                IVec3::splat(-MIN_PADDING),
                bounds.min(),
                bounds.max(),
            ));
        }

        let mut fields = arena.field_cache();
        fields.prepare(bounds);
        fields.fill(world, &self.classifier)?;

        let mut light = arena.light_cache();
        light.prepare(bounds);
        light.fill(world)?;

        let mut density = arena.density_grid();
        density.fill_from(&fields);

        let mut vertices = arena.vertex_buffer();
        let mut faces = arena.face_list();
        let resolver = FaceAttributeResolver::new(&fields, &light, textures, &self.config);

        let mut stats = MeshStats::default();
        let mut triangulator = Triangulator::new(
            &density,
            chunk.to_world_pos().to_vec3(),
            &self.config,
            &mut vertices,
        );
        let mut current: Option<(IVec3, RenderAttributes)> = None;
        for triangle in triangulator.by_ref() {
            let attributes = match current {
                Some((cell, attributes)) if cell == triangle.cell => attributes,
                _ => {
                    let attributes = resolver.resolve(triangle.cell)?;
                    if attributes.resolution == Resolution::Fallback {
                        stats.unresolved_cells += 1;
                    } else if attributes.resolution.is_better_texture() {
                        stats.better_texture_cells += 1;
                    }
                    current = Some((triangle.cell, attributes));
                    attributes
                }
            };
            faces.push(Face::new(&triangle, &attributes));
        }
        stats.cells = triangulator.cell_count();
        stats.surface_cells = triangulator.surface_cells();
        stats.vertices = triangulator.vertex_count();
        stats.triangles = faces.len();

        sink.begin_chunk(chunk);
        for face in faces.as_slice() {
            sink.push_face(face);
        }
        sink.finish_chunk(chunk, &stats);

        debug!(
            triangles = stats.triangles,
            surface_cells = stats.surface_cells,
            unresolved = stats.unresolved_cells,
            "chunk meshed"
        );
        Ok(stats)
    }

    /// [`Self::build_chunk`] using the calling thread's arena.
    pub fn build_chunk_local<W, T, S>(
        &self,
        world: &W,
        textures: &T,
        chunk: ChunkPos,
        sink: &mut S,
    ) -> Result<MeshStats>
    where
        W: VoxelAccess + LightAccess + ?Sized,
        T: TextureProvider + ?Sized,
        S: FaceSink + ?Sized,
    {
        with_thread_arena(|arena| self.build_chunk(arena, world, textures, chunk, sink))
    }

    /// Mesh one chunk into a fresh [`ChunkMesh`].
    pub fn mesh_chunk<W, T>(
        &self,
        arena: &BuildArena,
        world: &W,
        textures: &T,
        chunk: ChunkPos,
    ) -> Result<ChunkMesh>
    where
        W: VoxelAccess + LightAccess + ?Sized,
        T: TextureProvider + ?Sized,
    {
        let mut mesh = ChunkMesh::new(chunk);
        self.build_chunk(arena, world, textures, chunk, &mut mesh)?;
        Ok(mesh)
    }

    /// Mesh many chunks on the rayon thread pool.
    ///
    /// Each worker builds with its thread's arena, which outlives the call
    /// and reports into `counters` for its duration, so repeated batches on
    /// the same pool stop allocating once warmed up. Results come back in
    /// input order; a failed chunk does not affect the others.
    pub fn build_chunks_parallel<W, T>(
        &self,
        world: &W,
        textures: &T,
        chunks: &[ChunkPos],
        counters: &ArenaCounters,
    ) -> Vec<(ChunkPos, Result<ChunkMesh>)>
    where
        W: VoxelAccess + LightAccess + Sync + ?Sized,
        T: TextureProvider + Sync + ?Sized,
    {
        chunks
            .par_iter()
            .map(|&chunk| {
                let result = with_thread_arena(|arena| match arena.report_to(counters) {
                    Ok(()) => self.mesh_chunk(arena, world, textures, chunk),
                    // A provider re-entered rayon while this thread's arena
                    // was in use.
                    Err(_) => {
                        let arena = BuildArena::with_counters(counters);
                        self.mesh_chunk(&arena, world, textures, chunk)
                    }
                });
                if let Err(err) = &result {
                    warn!(%chunk, %err, "chunk build failed");
                }
                (chunk, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{TextureInfo, UvRect};
    use crate::attributes::RenderLayer;
    use isomesh_core::constants::CHUNK_SIZE;
    use isomesh_core::{PackedLight, VoxelState, WorldPos};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Stone below `height`, grass at `height`, air above; optionally fails
    /// inside one chunk.
    struct Flat {
        height: i32,
        broken: Option<ChunkPos>,
    }

    impl Flat {
        const fn new(height: i32) -> Self {
            Self {
                height,
                broken: None,
            }
        }
    }

    impl VoxelAccess for Flat {
        fn voxel(&self, pos: WorldPos) -> Result<VoxelState> {
            if self.broken == Some(pos.chunk_pos()) {
                return Err(Error::external("region file corrupt"));
            }
            Ok(match pos.y {
                y if y < self.height => VoxelState::STONE,
                y if y == self.height => VoxelState::GRASS,
                _ => VoxelState::AIR,
            })
        }
    }

    impl LightAccess for Flat {
        fn packed_light(&self, pos: WorldPos) -> Result<PackedLight> {
            Ok(if pos.y > self.height {
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

    /// Counts faces and chunk callbacks.
    #[derive(Default)]
    struct Recorder {
        begun: usize,
        finished: usize,
        faces: Vec<Face>,
    }

    impl FaceSink for Recorder {
        fn begin_chunk(&mut self, _chunk: ChunkPos) {
            self.begun += 1;
        }

        fn push_face(&mut self, face: &Face) {
            self.faces.push(*face);
        }

        fn finish_chunk(&mut self, _chunk: ChunkPos, stats: &MeshStats) {
            self.finished += 1;
            assert_eq!(stats.triangles, self.faces.len());
        }
    }

    #[test]
    fn flat_ground_meshes_a_horizontal_surface() {
        let builder = MeshBuilder::default();
        let arena = BuildArena::new();
        let mut faces = Vec::new();
        let stats = builder
            .build_chunk(&arena, &Flat::new(7), &Plain, ChunkPos::new(0, 0, 0), &mut faces)
            .unwrap();

        assert_eq!(stats.cells, CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE);
        assert_eq!(stats.surface_cells, CHUNK_SIZE * CHUNK_SIZE);
        assert_eq!(stats.triangles, 2 * CHUNK_SIZE * CHUNK_SIZE);
        assert_eq!(faces.len(), stats.triangles);
        assert_eq!(stats.unresolved_cells, 0);

        // Grid points at y = 8 touch four solid and four empty voxels, so their
        // density is exactly zero and the surface passes through them.
        for face in &faces {
            for position in face.positions() {
                assert_eq!(position.y, 8.0);
            }
            assert!(face.to_quad().len() == 4);
            assert!(face.vertices.iter().all(|v| (0.0..=1.0).contains(&v.uv.x)));
        }
        // Grass is drawn cutout-mipped at the default mipmap level.
        assert!(faces.iter().all(|face| face.layer == RenderLayer::CutoutMipped));
        // Upward-facing
        assert!(faces.iter().all(|face| {
            let [a, b, c] = face.positions();
            (b - a).cross(c - a).y > 0.0
        }));
    }

    #[test]
    fn chunk_without_surface_emits_nothing() {
        let builder = MeshBuilder::default();
        let mut recorder = Recorder::default();
        let stats = builder
            .build_chunk_local(&Flat::new(200), &Plain, ChunkPos::new(0, 0, 0), &mut recorder)
            .unwrap();
        assert_eq!(stats.triangles, 0);
        assert_eq!(recorder.begun, 1);
        assert_eq!(recorder.finished, 1);
    }

    #[test]
    fn failed_build_releases_everything_and_skips_sink() {
        let builder = MeshBuilder::default();
        let arena = BuildArena::new();
        let world = Flat {
            height: 7,
            broken: Some(ChunkPos::new(1, 0, 0)),
        };

        // The padding of chunk 0 reaches one voxel into chunk 1.
        let mut recorder = Recorder::default();
        let result = builder.build_chunk(&arena, &world, &Plain, ChunkPos::new(0, 0, 0), &mut recorder);
        assert!(matches!(result, Err(Error::ExternalAccessor(_))));
        assert_eq!(recorder.begun, 0);
        assert!(recorder.faces.is_empty());
        assert_eq!(arena.live(), 0);
    }

    #[test]
    fn texture_failure_discards_the_chunk() {
        struct FailAfter(AtomicUsize);

        impl TextureProvider for FailAfter {
            fn texture(&self, _state: VoxelState, _pos: WorldPos) -> Result<TextureInfo> {
                if self.0.fetch_sub(1, Ordering::Relaxed) == 0 {
                    return Err(Error::external("missing sprite"));
                }
                Ok(TextureInfo::new(UvRect::FULL, TextureInfo::WHITE))
            }
        }

        let builder = MeshBuilder::default();
        let arena = BuildArena::new();
        let mut faces = Vec::new();
        let result = builder.build_chunk(
            &arena,
            &Flat::new(7),
            &FailAfter(AtomicUsize::new(10)),
            ChunkPos::new(0, 0, 0),
            &mut faces,
        );
        assert!(result.is_err());
        assert!(faces.is_empty());
        assert_eq!(arena.live(), 0);
    }

    #[test]
    fn too_little_padding_fails_loudly() {
        let builder = MeshBuilder::new(MeshConfig {
            padding: 0,
            ..MeshConfig::default()
        });
        let mut faces = Vec::new();
        let result = builder.build_chunk_local(&Flat::new(7), &Plain, ChunkPos::new(0, 0, 0), &mut faces);
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn parallel_batches_stop_allocating_once_warm() {
        let workers = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let builder = MeshBuilder::default();
        let counters = ArenaCounters::new();
        let chunks: Vec<ChunkPos> = (0..16).map(|x| ChunkPos::new(x, 0, 0)).collect();

        for pass in 1..=3u64 {
            let results = workers.install(|| {
                builder.build_chunks_parallel(&Flat::new(7), &Plain, &chunks, &counters)
            });
            assert!(results.iter().all(|(_, result)| result.is_ok()));

            for (kind, stats) in counters.snapshot() {
                // At most one instance per kind and worker, however many batches run.
                assert!(stats.allocations <= 2, "{kind} pass {pass}: {stats:?}");
                assert_eq!(stats.allocations + stats.reuses, 16 * pass, "{kind}");
                assert_eq!(stats.live, 0, "{kind}");
            }
        }
    }

    #[test]
    fn repeated_builds_reuse_pooled_storage() {
        let builder = MeshBuilder::default();
        let arena = BuildArena::new();
        for x in 0..3 {
            builder
                .mesh_chunk(&arena, &Flat::new(7), &Plain, ChunkPos::new(x, 0, 0))
                .unwrap();
        }
        for (kind, stats) in arena.stats() {
            assert_eq!(stats.allocations, 1, "{kind}");
            assert_eq!(stats.reuses, 2, "{kind}");
            assert_eq!(stats.live, 0, "{kind}");
        }
    }

    #[test]
    fn builds_are_deterministic_with_jitter() {
        let builder = MeshBuilder::new(MeshConfig {
            offset_vertices: true,
            better_textures: true,
            ..MeshConfig::default()
        });
        let arena = BuildArena::new();
        let world = Flat::new(20);
        let chunk = ChunkPos::new(-1, 1, 2);

        let first = builder.mesh_chunk(&arena, &world, &Plain, chunk).unwrap();
        let second = builder.mesh_chunk(&arena, &world, &Plain, chunk).unwrap();
        assert!(!first.is_empty());
        for layer in RenderLayer::ALL {
            assert_eq!(first.as_bytes(layer), second.as_bytes(layer));
        }
    }

    #[test]
    fn parallel_builds_report_failures_per_chunk() {
        let builder = MeshBuilder::default();
        let world = Flat {
            height: 7,
            broken: Some(ChunkPos::new(5, 0, 0)),
        };
        let chunks: Vec<ChunkPos> = (0..8).map(|x| ChunkPos::new(x, 0, 0)).collect();
        let counters = ArenaCounters::new();

        let results = builder.build_chunks_parallel(&world, &Plain, &chunks, &counters);
        assert_eq!(results.len(), chunks.len());
        for ((chunk, result), expected) in results.iter().zip(&chunks) {
            assert_eq!(chunk, expected);
            // Chunks 4 and 6 pad into chunk 5.
            if (4..=6).contains(&chunk.x) {
                assert!(result.is_err(), "{chunk}");
            } else {
                let mesh = result.as_ref().unwrap();
                assert_eq!(mesh.triangle_count(), 2 * CHUNK_SIZE * CHUNK_SIZE);
                assert_eq!(mesh.stats().triangles, mesh.triangle_count());
            }
        }
        for (kind, stats) in counters.snapshot() {
            assert_eq!(stats.live, 0, "{kind}");
        }
    }
}
