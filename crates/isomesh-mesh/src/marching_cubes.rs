//! Marching Cubes surface extraction.
//!
//! Cells are visited z-major, then y, then x. Each cell is classified by the
//! signs of its 8 corner densities (a corner is inside when its density is
//! strictly positive). Cells the surface does not cross are skipped, and the
//! rest get one vertex per crossed edge and up to five triangles from the
//! lookup tables.
//!
//! Triangles are emitted with the table's edge order reversed. With the
//! corner layout in [`crate::tables`] that order winds counter-clockwise when
//! seen from outside the surface.

use glam::{IVec3, Vec3};
use isomesh_core::math::vertex_roughness;

use crate::config::MeshConfig;
use crate::density::DensityGrid;
use crate::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRIANGLE_TABLE};

/// Differences at or below this magnitude interpolate to the lower corner.
pub const INTERPOLATION_EPSILON: f32 = 1e-6;

/// One triangle produced by the triangulator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    /// Cell the triangle was generated in, relative to the grid
    pub cell: IVec3,
    /// Position of the triangle within its cell's triangle list
    pub ordinal: u8,
    /// Indices of the vertices in the triangulator's vertex buffer
    pub indices: [u32; 3],
    /// World-space vertex positions
    pub positions: [Vec3; 3],
}

impl Triangle {
    /// Unnormalized face normal following the winding
    #[inline]
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = self.positions;
        (b - a).cross(c - a)
    }
}

/// Cell classification: bit `i` is set when corner `i` is inside.
#[inline]
pub fn classify(corners: &[f32; 8]) -> u8 {
    corners
        .iter()
        .enumerate()
        .fold(0, |mask, (i, &density)| if density > 0.0 { mask | (1 << i) } else { mask })
}

/// Interpolation parameter of the surface crossing between densities `a` and `b`.
///
/// Lies in `[0, 1]` whenever `a` and `b` are on different sides of zero.
#[inline]
pub fn edge_parameter(a: f32, b: f32) -> f32 {
    let difference = a - b;
    if difference.abs() > INTERPOLATION_EPSILON {
        a / difference
    } else {
        0.0
    }
}

/// Compute the vertex of every crossed edge of one cell.
///
/// Edges are interpolated from their lower corner to their upper one, so
/// neighboring cells (and chunks) sharing an edge compute bit-identical
/// positions before jitter is applied.
///
/// `push` stores a vertex and returns its index; the returned array maps edge
/// number to vertex index (entries of uncrossed edges are left at zero).
fn cell_vertices(
    corners: &[f32; 8],
    edge_mask: u16,
    cell_origin: Vec3,
    offset_vertices: bool,
    mut push: impl FnMut(Vec3) -> u32,
) -> [u32; 12] {
    let mut edges = [0u32; 12];
    for edge in 0..EDGE_CORNERS.len() {
        if edge_mask & (1 << edge) == 0 {
            continue;
        }
        let [low, high] = edge_endpoints(edge);
        let p0 = corner_offset(low);
        let p1 = corner_offset(high);
        let t = edge_parameter(corners[low as usize], corners[high as usize]);

        let mut position = cell_origin + p0 + t * (p1 - p0);
        if offset_vertices {
            position += vertex_roughness(position);
        }
        edges[edge] = push(position);
    }
    edges
}

/// Corners of `edge`, lower coordinate first.
#[inline]
fn edge_endpoints(edge: usize) -> [u8; 2] {
    let [a, b] = EDGE_CORNERS[edge];
    let rank = |corner: u8| CORNER_OFFSETS[corner as usize].iter().sum::<u8>();
    if rank(a) <= rank(b) {
        [a, b]
    } else {
        [b, a]
    }
}

#[inline]
fn corner_offset(corner: u8) -> Vec3 {
    let [x, y, z] = CORNER_OFFSETS[corner as usize];
    Vec3::new(f32::from(x), f32::from(y), f32::from(z))
}

/// Mesh a single cube from its 8 corner densities.
///
/// Needs no grid, cache, or pool; returns the triangles in emission order.
pub fn triangulate_cell(corners: [f32; 8], origin: Vec3, config: &MeshConfig) -> Vec<[Vec3; 3]> {
    let mask = classify(&corners);
    let edge_mask = EDGE_TABLE[mask as usize];
    if edge_mask == 0 {
        return Vec::new();
    }

    let mut vertices = Vec::with_capacity(12);
    let edges = cell_vertices(&corners, edge_mask, origin, config.offset_vertices, |v| {
        vertices.push(v);
        (vertices.len() - 1) as u32
    });

    TRIANGLE_TABLE[mask as usize]
        .chunks_exact(3)
        .map(|f| {
            [
                vertices[edges[f[2] as usize] as usize],
                vertices[edges[f[1] as usize] as usize],
                vertices[edges[f[0] as usize] as usize],
            ]
        })
        .collect()
}

/// Triangles still to emit for the current surface cell.
struct PendingCell {
    cell: IVec3,
    mask: u8,
    edges: [u32; 12],
    next: usize,
}

/// Lazy, single-pass triangulation of a [`DensityGrid`].
///
/// Vertices are appended to a caller-supplied buffer (usually pooled) and
/// each [`Triangle`] refers to them by index.
pub struct Triangulator<'a> {
    grid: &'a DensityGrid,
    origin: Vec3,
    offset_vertices: bool,
    vertices: &'a mut Vec<Vec3>,
    next_cell: usize,
    cell_count: usize,
    surface_cells: usize,
    pending: Option<PendingCell>,
}

impl<'a> Triangulator<'a> {
    /// Triangulate `grid`, whose cell (0, 0, 0) sits at world position `origin`.
    pub fn new(
        grid: &'a DensityGrid,
        origin: Vec3,
        config: &MeshConfig,
        vertices: &'a mut Vec<Vec3>,
    ) -> Self {
        let cells = grid.cells();
        Self {
            grid,
            origin,
            offset_vertices: config.offset_vertices,
            vertices,
            next_cell: 0,
            cell_count: cells.x as usize * cells.y as usize * cells.z as usize,
            surface_cells: 0,
            pending: None,
        }
    }

    /// Cells visited so far that the surface crosses
    #[inline]
    pub const fn surface_cells(&self) -> usize {
        self.surface_cells
    }

    /// Total cells in the grid
    #[inline]
    pub const fn cell_count(&self) -> usize {
        self.cell_count
    }

    /// Vertices written so far
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    fn cell_at(&self, index: usize) -> IVec3 {
        let cells = self.grid.cells();
        let (sx, sy) = (cells.x as usize, cells.y as usize);
        IVec3::new(
            (index % sx) as i32,
            ((index / sx) % sy) as i32,
            (index / (sx * sy)) as i32,
        )
    }

    /// Advance to the next cell the surface crosses.
    fn next_surface_cell(&mut self) -> Option<PendingCell> {
        while self.next_cell < self.cell_count {
            let cell = self.cell_at(self.next_cell);
            self.next_cell += 1;

            let corners = self.grid.corners(cell);
            let mask = classify(&corners);
            let edge_mask = EDGE_TABLE[mask as usize];
            if edge_mask == 0 {
                continue;
            }

            self.surface_cells += 1;
            let vertices = &mut *self.vertices;
            let edges = cell_vertices(
                &corners,
                edge_mask,
                self.origin + cell.as_vec3(),
                self.offset_vertices,
                |v| {
                    vertices.push(v);
                    (vertices.len() - 1) as u32
                },
            );
            return Some(PendingCell {
                cell,
                mask,
                edges,
                next: 0,
            });
        }
        None
    }
}

impl Iterator for Triangulator<'_> {
    type Item = Triangle;

    fn next(&mut self) -> Option<Triangle> {
        loop {
            if let Some(pending) = &mut self.pending {
                let table = TRIANGLE_TABLE[pending.mask as usize];
                if pending.next < table.len() {
                    let f = &table[pending.next..pending.next + 3];
                    let indices = [
                        pending.edges[f[2] as usize],
                        pending.edges[f[1] as usize],
                        pending.edges[f[0] as usize],
                    ];
                    let ordinal = (pending.next / 3) as u8;
                    pending.next += 3;
                    return Some(Triangle {
                        cell: pending.cell,
                        ordinal,
                        indices,
                        positions: indices.map(|i| self.vertices[i as usize]),
                    });
                }
            }
            self.pending = Some(self.next_surface_cell()?);
        }
    }
}
