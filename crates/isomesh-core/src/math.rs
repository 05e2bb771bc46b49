//! Math utilities and helpers.

use glam::Vec3;

/// Largest absolute offset [`vertex_roughness`] applies on any axis.
pub const MAX_ROUGHNESS: f32 = 0.25;

/// Axis-Aligned Bounding Box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// An inverted box that any point expands into a valid one.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new AABB from min and max corners
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Returns true if no point has been added to this box
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    /// Get the size of the AABB
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Expand AABB to include a point
    #[inline]
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Merge two AABBs
    #[inline]
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Deterministic pseudo-random offset for a mesh vertex.
///
/// The offset is a pure function of the point's own coordinates and is
/// sensitive to its last bits: callers must compute a shared vertex
/// bit-identically everywhere it appears. Each component lies in
/// `[-MAX_ROUGHNESS, MAX_ROUGHNESS]`.
pub fn vertex_roughness(point: Vec3) -> Vec3 {
    let mut hash = ((f64::from(point.x) * 3_129_871.0) as i64)
        ^ (point.y as i64).wrapping_mul(116_129_781)
        ^ (point.z as i64);
    hash = hash
        .wrapping_mul(hash)
        .wrapping_mul(42_317_861)
        .wrapping_add(hash.wrapping_mul(11));

    let channel = |shift: u32| (((hash >> shift) & 15) as f32 / 15.0 - 0.5) * 0.5;
    Vec3::new(channel(16), channel(20), channel(24))
}
