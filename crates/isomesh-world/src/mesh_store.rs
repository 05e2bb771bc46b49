//! Latest chunk meshes, with supersession of stale builds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;
use isomesh_core::ChunkPos;
use isomesh_mesh::{
    ArenaCounters, ChunkMesh, LightAccess, MeshBuilder, MeshVertex, TextureProvider, VoxelAccess,
};
use parking_lot::RwLock;
use tracing::{debug, info};

/// Permission to store the result of one chunk build.
///
/// A ticket goes stale as soon as a newer one is requested for the same
/// chunk; results submitted with a stale ticket are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildTicket {
    pub chunk: ChunkPos,
    pub revision: u64,
}

#[derive(Debug, Default)]
struct Slot {
    /// Revision of the newest ticket handed out
    requested: u64,
    /// Revision the stored mesh was built for
    built: u64,
    mesh: Option<Arc<ChunkMesh>>,
}

/// Outcome of [`MeshStore::rebuild`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Meshes stored
    pub stored: usize,
    /// Meshes dropped because a newer build was requested meanwhile
    pub superseded: usize,
    /// Chunks whose build failed; their previous mesh is kept
    pub failed: usize,
    /// Triangles over all stored meshes
    pub triangles: usize,
}

/// Thread-safe map from chunk position to its newest mesh.
///
/// Revisions are unique across the whole store, so a ticket issued before a
/// chunk was removed can never match a slot created after.
pub struct MeshStore {
    slots: RwLock<HashMap<ChunkPos, Slot>>,
    next_revision: AtomicU64,
}

impl MeshStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_revision: AtomicU64::new(1),
        }
    }

    /// Start a new build of `chunk`, superseding any build still running.
    pub fn request(&self, chunk: ChunkPos) -> BuildTicket {
        let mut slots = self.slots.write();
        let revision = self.next_revision.fetch_add(1, Ordering::Relaxed);
        slots.entry(chunk).or_default().requested = revision;
        BuildTicket { chunk, revision }
    }

    /// Check whether `ticket` is still the newest for its chunk.
    pub fn is_current(&self, ticket: BuildTicket) -> bool {
        self.slots
            .read()
            .get(&ticket.chunk)
            .is_some_and(|slot| slot.requested == ticket.revision)
    }

    /// Store a finished mesh if its ticket is still current.
    ///
    /// Returns false (and drops the mesh) for stale tickets.
    pub fn submit(&self, ticket: BuildTicket, mesh: ChunkMesh) -> bool {
        let mut slots = self.slots.write();
        match slots.get_mut(&ticket.chunk) {
            Some(slot) if slot.requested == ticket.revision => {
                slot.built = ticket.revision;
                slot.mesh = Some(Arc::new(mesh));
                true
            }
            _ => {
                debug!(chunk = %ticket.chunk, revision = ticket.revision, "dropping superseded mesh");
                false
            }
        }
    }

    /// Newest stored mesh of a chunk.
    pub fn get(&self, chunk: ChunkPos) -> Option<Arc<ChunkMesh>> {
        self.slots.read().get(&chunk).and_then(|slot| slot.mesh.clone())
    }

    /// Check if a mesh is stored for the given chunk.
    pub fn contains(&self, chunk: ChunkPos) -> bool {
        self.slots
            .read()
            .get(&chunk)
            .is_some_and(|slot| slot.mesh.is_some())
    }

    /// Number of stored meshes.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.mesh.is_some())
            .count()
    }

    /// Check if no meshes are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget a chunk entirely. Builds still running for it become stale.
    pub fn remove(&self, chunk: ChunkPos) -> Option<Arc<ChunkMesh>> {
        self.slots.write().remove(&chunk).and_then(|slot| slot.mesh)
    }

    /// Chunks whose stored mesh is missing or older than the newest request.
    pub fn pending(&self) -> Vec<ChunkPos> {
        self.slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.built < slot.requested)
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Stored chunks within a cubic radius of a center position.
    pub fn chunks_in_radius(&self, center: ChunkPos, radius: i32) -> Vec<ChunkPos> {
        self.slots
            .read()
            .iter()
            .filter(|(pos, slot)| {
                slot.mesh.is_some()
                    && (pos.x - center.x).abs() <= radius
                    && (pos.y - center.y).abs() <= radius
                    && (pos.z - center.z).abs() <= radius
            })
            .map(|(pos, _)| *pos)
            .collect()
    }

    /// Bytes of vertex data over all stored meshes.
    pub fn memory_usage(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter_map(|slot| slot.mesh.as_deref())
            .map(|mesh| mesh.triangle_count() * 3 * std::mem::size_of::<MeshVertex>())
            .sum()
    }

    /// Request, build, and submit `chunks` on the rayon pool.
    pub fn rebuild<W, T>(
        &self,
        builder: &MeshBuilder,
        world: &W,
        textures: &T,
        chunks: &[ChunkPos],
        counters: &ArenaCounters,
    ) -> RebuildReport
    where
        W: VoxelAccess + LightAccess + Sync + ?Sized,
        T: TextureProvider + Sync + ?Sized,
    {
        let tickets: Vec<BuildTicket> = chunks.iter().map(|&chunk| self.request(chunk)).collect();
        let results = builder.build_chunks_parallel(world, textures, chunks, counters);

        let mut report = RebuildReport::default();
        for (ticket, (_, result)) in tickets.into_iter().zip(results) {
            match result {
                Ok(mesh) => {
                    let triangles = mesh.triangle_count();
                    if self.submit(ticket, mesh) {
                        report.stored += 1;
                        report.triangles += triangles;
                    } else {
                        report.superseded += 1;
                    }
                }
                Err(_) => report.failed += 1,
            }
        }

        info!(
            stored = report.stored,
            superseded = report.superseded,
            failed = report.failed,
            triangles = report.triangles,
            "rebuilt chunk meshes"
        );
        report
    }
}

impl Default for MeshStore {
    fn default() -> Self {
        Self::new()
    }
}
