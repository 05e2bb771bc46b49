//! GPU-ready vertex buffers grouped by render layer.

use bytemuck::{Pod, Zeroable};
use isomesh_core::math::Aabb;
use isomesh_core::ChunkPos;

use crate::attributes::RenderLayer;
use crate::builder::MeshStats;
use crate::face::{Face, FaceSink};

/// Interleaved vertex layout for upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct MeshVertex {
    /// World-space position
    pub position: [f32; 3],
    /// RGBA tint
    pub color: [u8; 4],
    /// Atlas coordinates
    pub uv: [f32; 2],
    /// Sky light, block light
    pub light: [u16; 2],
}

/// Triangle-list mesh of one chunk, one vertex buffer per render layer.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    chunk: ChunkPos,
    layers: [Vec<MeshVertex>; 4],
    bounds: Aabb,
    stats: MeshStats,
}

impl ChunkMesh {
    /// Create an empty mesh for `chunk`
    pub fn new(chunk: ChunkPos) -> Self {
        Self {
            chunk,
            ..Self::default()
        }
    }

    /// Chunk this mesh belongs to
    #[inline]
    pub const fn chunk(&self) -> ChunkPos {
        self.chunk
    }

    /// Vertices of one layer, three per triangle
    #[inline]
    pub fn vertices(&self, layer: RenderLayer) -> &[MeshVertex] {
        &self.layers[layer.index()]
    }

    /// Raw bytes of one layer's vertex buffer
    #[inline]
    pub fn as_bytes(&self, layer: RenderLayer) -> &[u8] {
        bytemuck::cast_slice(self.vertices(layer))
    }

    /// Total triangles over all layers
    pub fn triangle_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum::<usize>() / 3
    }

    /// Returns true if no layer has geometry
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(Vec::is_empty)
    }

    /// Layers that have geometry
    pub fn used_layers(&self) -> impl Iterator<Item = RenderLayer> + '_ {
        RenderLayer::ALL
            .into_iter()
            .filter(|layer| !self.layers[layer.index()].is_empty())
    }

    /// Bounds of all vertices (empty when the mesh is empty)
    #[inline]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Statistics of the build that produced this mesh
    #[inline]
    pub const fn stats(&self) -> &MeshStats {
        &self.stats
    }
}

impl FaceSink for ChunkMesh {
    fn begin_chunk(&mut self, chunk: ChunkPos) {
        self.chunk = chunk;
        for layer in &mut self.layers {
            layer.clear();
        }
        self.bounds = Aabb::EMPTY;
    }

    fn push_face(&mut self, face: &Face) {
        let buffer = &mut self.layers[face.layer.index()];
        let light = [face.light.sky(), face.light.block()];
        for vertex in &face.vertices {
            self.bounds.expand_to_include(vertex.position);
            buffer.push(MeshVertex {
                position: vertex.position.to_array(),
                color: face.tint,
                uv: vertex.uv.to_array(),
                light,
            });
        }
    }

    fn finish_chunk(&mut self, _chunk: ChunkPos, stats: &MeshStats) {
        self.stats = *stats;
    }
}
