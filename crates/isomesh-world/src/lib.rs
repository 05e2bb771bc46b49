//! Terrain, textures, and mesh storage for the isomesh engine.
//!
//! These are the pieces a host provides around the mesher: a world to read
//! voxels and light from, an atlas to texture faces with, and a store that
//! keeps the newest mesh of every chunk.

pub mod generation;
pub mod mesh_store;
pub mod textures;

pub use generation::{TerrainConfig, TerrainWorld};
pub use mesh_store::{BuildTicket, MeshStore, RebuildReport};
pub use textures::AtlasTextures;

/// World seed for procedural generation.
pub type WorldSeed = u32;
