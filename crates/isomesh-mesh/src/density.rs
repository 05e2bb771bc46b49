//! Scalar density field over the corners of a chunk's cells.
//!
//! Grid point `g` sits on the corner shared by the voxels `g - d` for every
//! `d` in `{0, 1}³`. Its density is the sum of their contributions, so a
//! chunk of `N` cells per axis needs `N + 1` points per axis and reads the
//! voxels from `-1` to `N` inclusive.

use glam::IVec3;
use isomesh_core::{Error, Result};

use crate::cache::PaddedFieldCache;
use crate::classifier::{contribution, tie_break};
use crate::pool::Poolable;
use crate::tables::CORNER_OFFSETS;

/// Density samples at the grid points of a box of cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DensityGrid {
    cells: IVec3,
    samples: Vec<f32>,
}

impl DensityGrid {
    /// A grid of zero samples covering `cells`
    pub fn new(cells: IVec3) -> Self {
        let mut grid = Self::default();
        grid.prepare(cells);
        grid
    }

    /// A grid whose samples come from a function of the grid point
    pub fn from_fn(cells: IVec3, mut sample: impl FnMut(IVec3) -> f32) -> Self {
        let mut grid = Self::new(cells);
        let points = grid.points();
        for z in 0..points.z {
            for y in 0..points.y {
                for x in 0..points.x {
                    let point = IVec3::new(x, y, z);
                    grid.set(point, sample(point));
                }
            }
        }
        grid
    }

    /// Build the density field for the box a field cache was prepared for.
    pub fn build(cache: &PaddedFieldCache) -> Self {
        let mut grid = Self::default();
        grid.fill_from(cache);
        grid
    }

    /// Resize for `cells`, keeping the allocation. Samples reset to zero.
    pub fn prepare(&mut self, cells: IVec3) {
        let cells = cells.max(IVec3::ZERO);
        self.cells = cells;
        self.samples.clear();
        let points = cells + IVec3::ONE;
        self.samples
            .resize(points.x as usize * points.y as usize * points.z as usize, 0.0);
    }

    /// Recompute every sample from the cache contents.
    ///
    /// The cache padding must be at least one voxel.
    pub fn fill_from(&mut self, cache: &PaddedFieldCache) {
        self.prepare(cache.bounds().size);
        let points = self.points();
        let mut index = 0;
        for z in 0..points.z {
            for y in 0..points.y {
                for x in 0..points.x {
                    self.samples[index] = point_density(cache, IVec3::new(x, y, z));
                    index += 1;
                }
            }
        }
    }

    /// Number of cells per axis
    #[inline]
    pub const fn cells(&self) -> IVec3 {
        self.cells
    }

    /// Number of grid points per axis (`cells + 1`)
    #[inline]
    pub fn points(&self) -> IVec3 {
        self.cells + IVec3::ONE
    }

    /// Returns true if `point` is a grid point of this grid
    #[inline]
    pub fn contains(&self, point: IVec3) -> bool {
        point.cmpge(IVec3::ZERO).all() && point.cmplt(self.points()).all()
    }

    #[inline]
    fn index(&self, point: IVec3) -> usize {
        debug_assert!(self.contains(point), "{point} outside density grid");
        let points = self.points();
        ((point.z * points.y + point.y) * points.x + point.x) as usize
    }

    /// Density at a grid point
    #[inline]
    pub fn sample(&self, point: IVec3) -> f32 {
        self.samples[self.index(point)]
    }

    /// Density at `point`, or [`Error::OutOfBounds`]
    pub fn try_sample(&self, point: IVec3) -> Result<f32> {
        if self.contains(point) {
            Ok(self.sample(point))
        } else {
            Err(Error::out_of_bounds(point, IVec3::ZERO, self.points()))
        }
    }

    /// Overwrite the density at a grid point
    #[inline]
    pub fn set(&mut self, point: IVec3, density: f32) {
        let index = self.index(point);
        self.samples[index] = density;
    }

    /// Densities at the 8 corners of `cell`, in corner-table order
    #[inline]
    pub fn corners(&self, cell: IVec3) -> [f32; 8] {
        CORNER_OFFSETS.map(|[x, y, z]| {
            self.sample(cell + IVec3::new(i32::from(x), i32::from(y), i32::from(z)))
        })
    }
}

impl Poolable for DensityGrid {
    fn reset(&mut self) {
        self.cells = IVec3::ZERO;
        self.samples.clear();
    }
}

/// Sum of the contributions of the 8 voxels sharing `point` as a corner.
#[inline]
fn point_density(cache: &PaddedFieldCache, point: IVec3) -> f32 {
    let mut density = 0.0;
    for dx in 0..2 {
        for dy in 0..2 {
            for dz in 0..2 {
                let entry = cache.get(point - IVec3::new(dx, dy, dz));
                density += contribution(entry.smoothable, entry.state);
                density += tie_break(entry.state);
            }
        }
    }
    density
}
