//! Per-thread set of pools used by chunk builds.

use std::cell::RefCell;
use std::sync::Arc;

use glam::Vec3;
use isomesh_core::Result;

use crate::cache::{PackedLightCache, PaddedFieldCache};
use crate::density::DensityGrid;
use crate::face::FaceList;
use crate::pool::{Pool, PoolCounters, PoolStats, Poolable, Pooled};

/// Shared diagnostics for every pool kind of a [`BuildArena`].
///
/// Cloning shares the counters, so many per-thread arenas can report into one
/// set.
#[derive(Clone, Debug, Default)]
pub struct ArenaCounters {
    pub fields: Arc<PoolCounters>,
    pub lights: Arc<PoolCounters>,
    pub densities: Arc<PoolCounters>,
    pub vertices: Arc<PoolCounters>,
    pub faces: Arc<PoolCounters>,
}

impl ArenaCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every pool kind, labelled for logging
    pub fn snapshot(&self) -> [(&'static str, PoolStats); 5] {
        [
            ("field_cache", self.fields.snapshot()),
            ("light_cache", self.lights.snapshot()),
            ("density_grid", self.densities.snapshot()),
            ("vertex_buffer", self.vertices.snapshot()),
            ("face_list", self.faces.snapshot()),
        ]
    }
}

/// Pools for everything a chunk build needs.
///
/// An arena is `!Sync`; give each worker thread its own (see
/// [`with_thread_arena`]). Values are handed out as [`Pooled`] guards that
/// return to the arena when dropped.
#[derive(Default)]
pub struct BuildArena {
    fields: RefCell<Pool<PaddedFieldCache>>,
    lights: RefCell<Pool<PackedLightCache>>,
    densities: RefCell<Pool<DensityGrid>>,
    vertices: RefCell<Pool<Vec<Vec3>>>,
    faces: RefCell<Pool<FaceList>>,
}

impl BuildArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arena whose pools also report into `counters`
    pub fn with_counters(counters: &ArenaCounters) -> Self {
        fn pool<T: Poolable>(counters: &Arc<PoolCounters>) -> RefCell<Pool<T>> {
            RefCell::new(Pool::with_counters(Arc::clone(counters)))
        }

        Self {
            fields: pool(&counters.fields),
            lights: pool(&counters.lights),
            densities: pool(&counters.densities),
            vertices: pool(&counters.vertices),
            faces: pool(&counters.faces),
        }
    }

    /// Point every pool at `counters`, keeping the free lists.
    ///
    /// Fails while anything is checked out of the arena.
    pub fn report_to(&self, counters: &ArenaCounters) -> Result<()> {
        self.fields.borrow_mut().report_to(&counters.fields)?;
        self.lights.borrow_mut().report_to(&counters.lights)?;
        self.densities.borrow_mut().report_to(&counters.densities)?;
        self.vertices.borrow_mut().report_to(&counters.vertices)?;
        self.faces.borrow_mut().report_to(&counters.faces)
    }

    pub fn field_cache(&self) -> Pooled<'_, PaddedFieldCache> {
        Pooled::acquire(&self.fields)
    }

    pub fn light_cache(&self) -> Pooled<'_, PackedLightCache> {
        Pooled::acquire(&self.lights)
    }

    pub fn density_grid(&self) -> Pooled<'_, DensityGrid> {
        Pooled::acquire(&self.densities)
    }

    pub fn vertex_buffer(&self) -> Pooled<'_, Vec<Vec3>> {
        Pooled::acquire(&self.vertices)
    }

    pub fn face_list(&self) -> Pooled<'_, FaceList> {
        Pooled::acquire(&self.faces)
    }

    /// Local statistics of every pool kind
    pub fn stats(&self) -> [(&'static str, PoolStats); 5] {
        [
            ("field_cache", self.fields.borrow().stats()),
            ("light_cache", self.lights.borrow().stats()),
            ("density_grid", self.densities.borrow().stats()),
            ("vertex_buffer", self.vertices.borrow().stats()),
            ("face_list", self.faces.borrow().stats()),
        ]
    }

    /// Instances currently handed out across all pools
    pub fn live(&self) -> usize {
        self.stats().iter().map(|(_, stats)| stats.live).sum()
    }
}

thread_local! {
    static THREAD_ARENA: BuildArena = BuildArena::new();
}

/// Run `f` with this thread's arena.
pub fn with_thread_arena<R>(f: impl FnOnce(&BuildArena) -> R) -> R {
    THREAD_ARENA.with(f)
}
