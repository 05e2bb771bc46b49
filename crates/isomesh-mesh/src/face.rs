//! Output faces and the sink they are delivered to.

use glam::{Vec2, Vec3};
use isomesh_core::{ChunkPos, PackedLight};

use crate::access::UvRect;
use crate::attributes::{RenderAttributes, RenderLayer};
use crate::builder::MeshStats;
use crate::marching_cubes::Triangle;
use crate::pool::Poolable;

/// One corner of a face.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceVertex {
    /// World-space position
    pub position: Vec3,
    /// Atlas coordinates
    pub uv: Vec2,
}

/// A triangle with its resolved render attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
    pub vertices: [FaceVertex; 3],
    pub layer: RenderLayer,
    /// RGBA tint
    pub tint: [u8; 4],
    pub light: PackedLight,
}

impl Face {
    /// Attach attributes to a triangle.
    ///
    /// Consecutive triangles of a cell are textured as the two halves of a
    /// quad: even ordinals take the lower-right half of the UV rectangle and
    /// odd ordinals the upper-left half.
    pub fn new(triangle: &Triangle, attributes: &RenderAttributes) -> Self {
        let uvs = quad_half_uvs(attributes.uv, triangle.ordinal % 2 == 0);
        let [a, b, c] = triangle.positions;
        Self {
            vertices: [
                FaceVertex {
                    position: a,
                    uv: uvs[0],
                },
                FaceVertex {
                    position: b,
                    uv: uvs[1],
                },
                FaceVertex {
                    position: c,
                    uv: uvs[2],
                },
            ],
            layer: attributes.layer,
            tint: attributes.tint,
            light: attributes.light,
        }
    }

    /// Four-vertex form for quad-only consumers; the first vertex is repeated.
    #[inline]
    pub fn to_quad(&self) -> [FaceVertex; 4] {
        let [a, b, c] = self.vertices;
        [a, a, b, c]
    }

    /// Vertex positions
    #[inline]
    pub fn positions(&self) -> [Vec3; 3] {
        self.vertices.map(|v| v.position)
    }
}

fn quad_half_uvs(uv: UvRect, first_half: bool) -> [Vec2; 3] {
    if first_half {
        [
            Vec2::new(uv.max_u, uv.max_v),
            Vec2::new(uv.max_u, uv.min_v),
            Vec2::new(uv.min_u, uv.max_v),
        ]
    } else {
        [
            Vec2::new(uv.min_u, uv.max_v),
            Vec2::new(uv.max_u, uv.min_v),
            Vec2::new(uv.min_u, uv.min_v),
        ]
    }
}

/// Faces staged during a build before they reach the sink.
#[derive(Clone, Debug, Default)]
pub struct FaceList {
    faces: Vec<Face>,
}

impl FaceList {
    #[inline]
    pub fn push(&mut self, face: Face) {
        self.faces.push(face);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Face] {
        &self.faces
    }
}

impl Poolable for FaceList {
    fn reset(&mut self) {
        self.faces.clear();
    }
}

/// Receives the faces of finished chunk builds.
///
/// Faces are only delivered once the whole chunk has been meshed; a failed
/// build never calls the sink.
pub trait FaceSink {
    /// Called before the first face of a chunk
    fn begin_chunk(&mut self, _chunk: ChunkPos) {}

    /// Called once per face
    fn push_face(&mut self, face: &Face);

    /// Called after the last face of a chunk
    fn finish_chunk(&mut self, _chunk: ChunkPos, _stats: &MeshStats) {}
}

impl FaceSink for Vec<Face> {
    fn push_face(&mut self, face: &Face) {
        self.push(*face);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Resolution;
    use glam::IVec3;

    fn attributes() -> RenderAttributes {
        RenderAttributes {
            layer: RenderLayer::CutoutMipped,
            tint: [10, 20, 30, 255],
            uv: UvRect::new(0.25, 0.5, 0.375, 0.625),
            light: PackedLight::new(15, 2),
            source: IVec3::ZERO,
            resolution: Resolution::Origin,
        }
    }

    fn triangle(ordinal: u8) -> Triangle {
        Triangle {
            cell: IVec3::ZERO,
            ordinal,
            indices: [0, 1, 2],
            positions: [Vec3::X, Vec3::Y, Vec3::Z],
        }
    }

    #[test]
    fn even_and_odd_triangles_split_the_quad() {
        let even = Face::new(&triangle(0), &attributes());
        let odd = Face::new(&triangle(1), &attributes());

        let uv = |face: &Face| face.vertices.map(|v| (v.uv.x, v.uv.y));
        assert_eq!(uv(&even), [(0.375, 0.625), (0.375, 0.5), (0.25, 0.625)]);
        assert_eq!(uv(&odd), [(0.25, 0.625), (0.375, 0.5), (0.25, 0.5)]);
        assert_eq!(uv(&Face::new(&triangle(2), &attributes())), uv(&even));
    }

    #[test]
    fn face_keeps_triangle_winding_and_attributes() {
        let face = Face::new(&triangle(0), &attributes());
        assert_eq!(face.positions(), [Vec3::X, Vec3::Y, Vec3::Z]);
        assert_eq!(face.layer, RenderLayer::CutoutMipped);
        assert_eq!(face.tint, [10, 20, 30, 255]);
        assert_eq!(face.light.block(), 2);
    }

    #[test]
    fn quad_repeats_first_vertex() {
        let face = Face::new(&triangle(1), &attributes());
        let quad = face.to_quad();
        assert_eq!(quad[0], quad[1]);
        assert_eq!(&quad[1..], &face.vertices);
    }

    #[test]
    fn face_list_resets_for_reuse() {
        let mut list = FaceList::default();
        list.push(Face::new(&triangle(0), &attributes()));
        assert_eq!(list.len(), 1);
        list.reset();
        assert!(list.is_empty());
    }
}
