//! Smooth voxel meshing for the isomesh engine.
//!
//! A chunk build flows through these stages:
//! - [`cache`]: classifier results and light around the chunk, read once
//!   from the world
//! - [`density`]: signed density at every cell corner
//! - [`marching_cubes`]: surface triangles from the density grid
//! - [`attributes`]: texture, tint, and light for each surface cell
//! - [`face`] / [`chunk_mesh`]: output faces and GPU vertex buffers
//!
//! [`builder::MeshBuilder`] runs the stages; [`arena`] and [`pool`] keep the
//! build free of per-chunk allocations once warmed up.

pub mod access;
pub mod arena;
pub mod attributes;
pub mod builder;
pub mod cache;
pub mod chunk_mesh;
pub mod classifier;
pub mod config;
pub mod density;
pub mod face;
pub mod marching_cubes;
pub mod pool;
pub mod tables;

pub use access::{LightAccess, TextureInfo, TextureProvider, UvRect, VoxelAccess};
pub use arena::{with_thread_arena, ArenaCounters, BuildArena};
pub use attributes::{FaceAttributeResolver, RenderAttributes, RenderLayer, Resolution};
pub use builder::{MeshBuilder, MeshStats};
pub use cache::{FieldEntry, PackedLightCache, PaddedBounds, PaddedFieldCache};
pub use chunk_mesh::{ChunkMesh, MeshVertex};
pub use classifier::MaterialClassifier;
pub use config::MeshConfig;
pub use density::DensityGrid;
pub use face::{Face, FaceList, FaceSink, FaceVertex};
pub use marching_cubes::{triangulate_cell, Triangle, Triangulator};
pub use pool::{Pool, PoolCounters, PoolStats, Poolable, Pooled};
