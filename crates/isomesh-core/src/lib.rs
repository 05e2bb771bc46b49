//! Core types, coordinates, and errors for the isomesh engine.
//!
//! This crate provides the foundational types shared by the mesher and the
//! world implementations that feed it:
//! - Block ids, materials, and voxel states
//! - World and chunk coordinates
//! - Packed light values
//! - Math helpers used by the mesher
//! - The engine-wide error type

pub mod coords;
pub mod error;
pub mod math;
pub mod types;

pub use coords::{ChunkPos, WorldPos};
pub use error::{Error, Result};
pub use types::{BlockId, Material, PackedLight, VoxelState};

/// Engine-wide constants
pub mod constants {
    /// Size of a chunk in voxels per axis
    pub const CHUNK_SIZE: usize = 16;
    /// Shift between world and chunk coordinates
    pub const CHUNK_BITS: u32 = 4;
    /// Largest value of a single light channel
    pub const MAX_LIGHT: u8 = 15;
}
