//! Padded per-chunk caches.
//!
//! A [`PaddedCache`] covers a box of voxels plus a margin on every side and
//! is addressed in coordinates relative to the box origin, so valid
//! coordinates run from `-padding` to `size + padding` (exclusive). Filling a
//! cache is the only place the mesher talks to the world; everything
//! downstream reads the cache.
//!
//! Hot-path reads ([`PaddedCache::get`]) are only checked with
//! `debug_assert!`. Use [`PaddedCache::try_get`] where a coordinate is not
//! already known to be covered.

use glam::IVec3;
use isomesh_core::constants::CHUNK_SIZE;
use isomesh_core::{ChunkPos, Error, PackedLight, Result, VoxelState, WorldPos};

use crate::access::{LightAccess, VoxelAccess};
use crate::classifier::MaterialClassifier;
use crate::pool::Poolable;

/// Placement and extent of a padded cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaddedBounds {
    /// World position of relative coordinate zero
    pub origin: WorldPos,
    /// Size of the unpadded box in voxels
    pub size: IVec3,
    /// Margin on every side
    pub padding: i32,
}

impl PaddedBounds {
    /// Create bounds for an arbitrary box
    #[inline]
    pub const fn new(origin: WorldPos, size: IVec3, padding: i32) -> Self {
        Self {
            origin,
            size,
            padding,
        }
    }

    /// Bounds of one chunk
    #[inline]
    pub const fn chunk(pos: ChunkPos, padding: i32) -> Self {
        Self::new(pos.to_world_pos(), IVec3::splat(CHUNK_SIZE as i32), padding)
    }

    /// Lowest covered relative coordinate (inclusive)
    #[inline]
    pub const fn min(&self) -> IVec3 {
        IVec3::splat(-self.padding)
    }

    /// Highest covered relative coordinate (exclusive)
    #[inline]
    pub fn max(&self) -> IVec3 {
        self.size + IVec3::splat(self.padding)
    }

    /// Padded extent per axis
    #[inline]
    pub fn extent(&self) -> IVec3 {
        self.size + IVec3::splat(2 * self.padding)
    }

    /// Number of covered voxels
    #[inline]
    pub fn volume(&self) -> usize {
        let extent = self.extent().max(IVec3::ZERO);
        extent.x as usize * extent.y as usize * extent.z as usize
    }

    /// Returns true if `rel` is covered
    #[inline]
    pub fn contains(&self, rel: IVec3) -> bool {
        rel.cmpge(self.min()).all() && rel.cmplt(self.max()).all()
    }

    /// Flat index of a covered coordinate, x fastest then y then z.
    #[inline]
    pub fn index(&self, rel: IVec3) -> usize {
        debug_assert!(self.contains(rel), "{rel} outside padded cache");
        let extent = self.extent();
        let p = rel + IVec3::splat(self.padding);
        ((p.z * extent.y + p.y) * extent.x + p.x) as usize
    }

    /// Flat index, or [`Error::OutOfBounds`] for uncovered coordinates
    #[inline]
    pub fn try_index(&self, rel: IVec3) -> Result<usize> {
        if self.contains(rel) {
            Ok(self.index(rel))
        } else {
            Err(Error::out_of_bounds(rel, self.min(), self.max()))
        }
    }

    /// World position of a relative coordinate
    #[inline]
    pub const fn world(&self, rel: IVec3) -> WorldPos {
        self.origin.offset(rel)
    }

    /// Every covered relative coordinate in storage order
    pub fn iter(&self) -> impl Iterator<Item = IVec3> {
        let min = self.min();
        let max = self.max();
        (min.z..max.z).flat_map(move |z| {
            (min.y..max.y).flat_map(move |y| (min.x..max.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}

/// Cached classification of one voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldEntry {
    /// Whether the classifier marked the voxel smoothable
    pub smoothable: bool,
    /// The voxel state itself
    pub state: VoxelState,
}

/// Dense padded storage of one value per voxel.
#[derive(Clone, Debug, Default)]
pub struct PaddedCache<T> {
    bounds: PaddedBounds,
    data: Vec<T>,
}

/// Classifier results around a chunk.
pub type PaddedFieldCache = PaddedCache<FieldEntry>;

/// Packed light values around a chunk.
pub type PackedLightCache = PaddedCache<PackedLight>;

impl<T: Copy + Default> PaddedCache<T> {
    /// Resize for `bounds`, keeping the backing allocation when it is big enough.
    ///
    /// Contents are reset to the default value.
    pub fn prepare(&mut self, bounds: PaddedBounds) {
        self.bounds = bounds;
        self.data.clear();
        self.data.resize(bounds.volume(), T::default());
    }

    /// Bounds this cache covers
    #[inline]
    pub const fn bounds(&self) -> &PaddedBounds {
        &self.bounds
    }

    /// Value at a covered coordinate
    #[inline]
    pub fn get(&self, rel: IVec3) -> T {
        self.data[self.bounds.index(rel)]
    }

    /// Value at `rel`, or [`Error::OutOfBounds`]
    #[inline]
    pub fn try_get(&self, rel: IVec3) -> Result<T> {
        let index = self.bounds.try_index(rel)?;
        Ok(self.data[index])
    }

    /// Overwrite the value at a covered coordinate
    #[inline]
    pub fn set(&mut self, rel: IVec3, value: T) {
        let index = self.bounds.index(rel);
        self.data[index] = value;
    }

    fn fill_with(&mut self, mut value_at: impl FnMut(WorldPos) -> Result<T>) -> Result<()> {
        let bounds = self.bounds;
        for (slot, rel) in self.data.iter_mut().zip(bounds.iter()) {
            *slot = value_at(bounds.world(rel))?;
        }
        Ok(())
    }
}

impl<T: Copy + Default + Send> Poolable for PaddedCache<T> {
    fn reset(&mut self) {
        self.bounds = PaddedBounds::default();
        self.data.clear();
    }
}

impl PaddedFieldCache {
    /// Build a field cache in one step.
    pub fn build<W: VoxelAccess + ?Sized>(
        world: &W,
        classifier: &MaterialClassifier,
        bounds: PaddedBounds,
    ) -> Result<Self> {
        let mut cache = Self::default();
        cache.prepare(bounds);
        cache.fill(world, classifier)?;
        Ok(cache)
    }

    /// Query the world once per covered voxel and store the classification.
    pub fn fill<W: VoxelAccess + ?Sized>(
        &mut self,
        world: &W,
        classifier: &MaterialClassifier,
    ) -> Result<()> {
        self.fill_with(|pos| {
            let state = world.voxel(pos)?;
            Ok(FieldEntry {
                smoothable: classifier.is_smoothable(state),
                state,
            })
        })
    }

    /// Classifier result at a covered coordinate
    #[inline]
    pub fn classifier_result(&self, rel: IVec3) -> FieldEntry {
        self.get(rel)
    }

    /// Whether the voxel at `rel` is smoothable
    #[inline]
    pub fn is_smoothable(&self, rel: IVec3) -> bool {
        self.get(rel).smoothable
    }

    /// Voxel state at `rel`
    #[inline]
    pub fn state(&self, rel: IVec3) -> VoxelState {
        self.get(rel).state
    }
}

impl PackedLightCache {
    /// Query the light provider once per covered voxel.
    pub fn fill<L: LightAccess + ?Sized>(&mut self, light: &L) -> Result<()> {
        self.fill_with(|pos| light.packed_light(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Solid below y = 8 in world space, air above.
    struct Slab;

    impl VoxelAccess for Slab {
        fn voxel(&self, pos: WorldPos) -> Result<VoxelState> {
            Ok(if pos.y < 8 {
                VoxelState::STONE
            } else {
                VoxelState::AIR
            })
        }
    }

    impl LightAccess for Slab {
        fn packed_light(&self, pos: WorldPos) -> Result<PackedLight> {
            Ok(PackedLight::new(if pos.y < 8 { 0 } else { 15 }, 0))
        }
    }

    struct Unloaded;

    impl VoxelAccess for Unloaded {
        fn voxel(&self, pos: WorldPos) -> Result<VoxelState> {
            Err(Error::external(format!("chunk at {pos:?} not loaded")))
        }
    }

    #[test]
    fn bounds_cover_padding() {
        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
        assert_eq!(bounds.min(), IVec3::splat(-1));
        assert_eq!(bounds.max(), IVec3::splat(17));
        assert_eq!(bounds.volume(), 18 * 18 * 18);
        assert_eq!(bounds.index(IVec3::splat(-1)), 0);
        assert_eq!(bounds.index(IVec3::splat(16)), bounds.volume() - 1);
    }

    #[test]
    fn iteration_matches_index_order() {
        let bounds = PaddedBounds::new(WorldPos::new(4, 5, 6), IVec3::new(3, 2, 4), 2);
        for (expected, rel) in bounds.iter().enumerate() {
            assert_eq!(bounds.index(rel), expected);
        }
        assert_eq!(bounds.iter().count(), bounds.volume());
    }

    #[test]
    fn every_padded_coordinate_is_readable() {
        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
        let cache = PaddedFieldCache::build(&Slab, &MaterialClassifier::default(), bounds).unwrap();

        for z in -1..17 {
            for y in -1..17 {
                for x in -1..17 {
                    let entry = cache.try_get(IVec3::new(x, y, z)).unwrap();
                    assert_eq!(entry.smoothable, y < 8);
                }
            }
        }
    }

    #[test]
    fn reads_past_padding_are_rejected() {
        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
        let cache = PaddedFieldCache::build(&Slab, &MaterialClassifier::default(), bounds).unwrap();

        for rel in [
            IVec3::new(-2, 0, 0),
            IVec3::new(0, 17, 0),
            IVec3::new(0, 0, 17),
            IVec3::new(5, -2, 5),
        ] {
            assert!(matches!(
                cache.try_get(rel),
                Err(Error::OutOfBounds { pos, .. }) if pos == rel
            ));
        }
    }

    #[test]
    fn cache_uses_world_coordinates() {
        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 1, 0), 1);
        let cache = PaddedFieldCache::build(&Slab, &MaterialClassifier::default(), bounds).unwrap();
        // World y = 15
        assert_eq!(cache.state(IVec3::new(0, -1, 0)), VoxelState::AIR);
        assert_eq!(cache.bounds().world(IVec3::new(2, -1, 3)), WorldPos::new(2, 15, 3));

        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
        let mut light = PackedLightCache::default();
        light.prepare(bounds);
        light.fill(&Slab).unwrap();
        assert_eq!(light.get(IVec3::new(3, 7, 3)).sky(), 0);
        assert_eq!(light.get(IVec3::new(3, 8, 3)).sky(), 15);
    }

    #[test]
    fn accessor_failure_propagates() {
        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
        let result = PaddedFieldCache::build(&Unloaded, &MaterialClassifier::default(), bounds);
        assert!(matches!(result, Err(Error::ExternalAccessor(_))));
    }

    #[test]
    fn prepare_reuses_allocation() {
        let bounds = PaddedBounds::chunk(ChunkPos::new(0, 0, 0), 1);
        let mut cache = PaddedFieldCache::build(&Slab, &MaterialClassifier::default(), bounds).unwrap();
        let capacity = cache.data.capacity();

        cache.reset();
        cache.prepare(PaddedBounds::chunk(ChunkPos::new(1, 0, 0), 1));
        assert_eq!(cache.data.capacity(), capacity);
        assert!(cache.data.iter().all(|entry| *entry == FieldEntry::default()));
    }
}
