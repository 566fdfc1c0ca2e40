//! Regular-grid mesh backend.
//!
//! Vertices live on a W×H lattice with 4-connected adjacency. Boundary
//! status is index arithmetic (outer ring), so the classification pass is
//! a no-op and queries are always O(1).

use glam::{Vec3, Vec4};

use crate::types::{TopologyError, VertexId};
use crate::{MeshTopology, NeighborBuffer};

/// A regular W×H grid of vertices.
#[derive(Debug, Clone)]
pub struct GridTopology {
    width: u32,
    height: u32,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    masks: Option<Vec<f32>>,
    colors: Option<Vec<Vec4>>,
}

impl GridTopology {
    /// Create a grid from row-major positions. Normals default to +Z.
    pub fn new(width: u32, height: u32, positions: Vec<Vec3>) -> Result<Self, TopologyError> {
        if width < 2 || height < 2 {
            return Err(TopologyError::GridTooSmall { width, height });
        }
        let expected = (width * height) as usize;
        if positions.len() != expected {
            return Err(TopologyError::AttributeCountMismatch {
                expected,
                got: positions.len(),
            });
        }
        let count = positions.len();
        Ok(Self {
            width,
            height,
            positions,
            normals: vec![Vec3::Z; count],
            masks: None,
            colors: None,
        })
    }

    /// Convenience constructor: a flat grid in the XY plane at z = 0 with
    /// `spacing` between adjacent vertices.
    pub fn planar(width: u32, height: u32, spacing: f32) -> Self {
        let mut positions = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                positions.push(Vec3::new(x as f32 * spacing, y as f32 * spacing, 0.0));
            }
        }
        Self::new(width, height, positions).expect("planar grid requires width/height >= 2")
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Allocate mask storage filled with `initial`.
    pub fn init_masks(&mut self, initial: f32) {
        self.masks = Some(vec![initial; self.positions.len()]);
    }

    /// Allocate color storage filled with `initial`.
    pub fn init_colors(&mut self, initial: Vec4) {
        self.colors = Some(vec![initial; self.positions.len()]);
    }

    pub fn set_normal(&mut self, v: VertexId, normal: Vec3) {
        self.normals[v.index()] = normal;
    }

    fn coords(&self, v: VertexId) -> (u32, u32) {
        let i = v.0;
        (i % self.width, i / self.width)
    }

    fn id_at(&self, x: u32, y: u32) -> VertexId {
        VertexId(y * self.width + x)
    }
}

impl MeshTopology for GridTopology {
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    fn position(&self, v: VertexId) -> Vec3 {
        self.positions[v.index()]
    }

    fn set_position(&mut self, v: VertexId, position: Vec3) {
        self.positions[v.index()] = position;
    }

    fn normal(&self, v: VertexId) -> Vec3 {
        self.normals[v.index()]
    }

    fn mask(&self, v: VertexId) -> Option<f32> {
        self.masks.as_ref().map(|m| m[v.index()])
    }

    fn set_mask(&mut self, v: VertexId, mask: f32) {
        if let Some(masks) = self.masks.as_mut() {
            masks[v.index()] = mask;
        }
    }

    fn color(&self, v: VertexId) -> Option<Vec4> {
        self.colors.as_ref().map(|c| c[v.index()])
    }

    fn set_color(&mut self, v: VertexId, color: Vec4) {
        if let Some(colors) = self.colors.as_mut() {
            colors[v.index()] = color;
        }
    }

    fn neighbors(&self, v: VertexId, out: &mut NeighborBuffer) {
        out.clear();
        let (x, y) = self.coords(v);
        if x > 0 {
            out.push(self.id_at(x - 1, y));
        }
        if x + 1 < self.width {
            out.push(self.id_at(x + 1, y));
        }
        if y > 0 {
            out.push(self.id_at(x, y - 1));
        }
        if y + 1 < self.height {
            out.push(self.id_at(x, y + 1));
        }
    }

    fn edge_is_boundary(&self, a: VertexId, b: VertexId) -> bool {
        let (ax, ay) = self.coords(a);
        let (bx, by) = self.coords(b);
        // A grid edge is boundary when it runs along the outer ring.
        (ay == by && (ay == 0 || ay == self.height - 1))
            || (ax == bx && (ax == 0 || ax == self.width - 1))
    }

    fn is_boundary(&self, v: VertexId) -> bool {
        let (x, y) = self.coords(v);
        x == 0 || y == 0 || x == self.width - 1 || y == self.height - 1
    }

    fn ensure_boundary_info(&mut self) {
        // Boundary status is derived from indices; nothing to cache.
    }
}
