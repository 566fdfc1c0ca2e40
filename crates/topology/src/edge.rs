//! Dynamic edge-based mesh backend.
//!
//! Connectivity is an explicit edge list with per-vertex incident-edge
//! lists, so vertices and edges can be inserted incrementally (the dynamic
//! sculpting case). Each edge records its incident-face count; an edge with
//! fewer than two faces is boundary. Insertions invalidate the cached
//! per-vertex boundary flags, which [`EdgeTopology::ensure_boundary_info`]
//! rebuilds.

use std::collections::HashMap;

use glam::{Vec3, Vec4};

use crate::boundary::BoundaryFlags;
use crate::types::{TopologyError, VertexId};
use crate::{MeshTopology, NeighborBuffer};

#[derive(Debug, Clone, Copy)]
struct Edge {
    verts: [u32; 2],
    face_count: u8,
}

impl Edge {
    fn other(&self, v: u32) -> u32 {
        if self.verts[0] == v {
            self.verts[1]
        } else {
            self.verts[0]
        }
    }

    fn is_boundary(&self) -> bool {
        self.face_count < 2
    }
}

/// An edge-based mesh supporting incremental topology edits.
#[derive(Debug, Clone, Default)]
pub struct EdgeTopology {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    masks: Option<Vec<f32>>,
    colors: Option<Vec<Vec4>>,
    edges: Vec<Edge>,
    /// Incident edge indices per vertex, in insertion order.
    vert_edges: Vec<Vec<u32>>,
    /// Cached vertex flags; `None` after a topology edit.
    boundary: Option<BoundaryFlags>,
}

impl EdgeTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a triangle index buffer, deriving edges and their
    /// incident-face counts.
    pub fn from_triangles(positions: Vec<Vec3>, indices: &[u32]) -> Result<Self, TopologyError> {
        if indices.len() % 3 != 0 {
            return Err(TopologyError::IncompleteTriangle(indices.len()));
        }
        let vertex_count = positions.len();
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(TopologyError::IndexOutOfRange {
                index: bad,
                vertex_count,
            });
        }

        let mut mesh = Self {
            normals: vec![Vec3::Z; vertex_count],
            vert_edges: vec![Vec::new(); vertex_count],
            positions,
            ..Self::default()
        };

        let mut edge_lookup: HashMap<(u32, u32), u32> = HashMap::new();
        for tri in indices.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let key = if a < b { (a, b) } else { (b, a) };
                match edge_lookup.get(&key) {
                    Some(&e) => mesh.edges[e as usize].face_count += 1,
                    None => {
                        let e = mesh.push_edge(a, b, 1);
                        edge_lookup.insert(key, e);
                    }
                }
            }
        }
        Ok(mesh)
    }

    /// Insert a vertex, returning its handle. Invalidates boundary flags.
    pub fn add_vertex(&mut self, position: Vec3, normal: Vec3) -> VertexId {
        let id = VertexId(self.positions.len() as u32);
        self.positions.push(position);
        self.normals.push(normal);
        self.vert_edges.push(Vec::new());
        if let Some(masks) = self.masks.as_mut() {
            masks.push(0.0);
        }
        if let Some(colors) = self.colors.as_mut() {
            colors.push(Vec4::ZERO);
        }
        self.boundary = None;
        id
    }

    /// Insert an edge with the given incident-face count. Invalidates
    /// boundary flags.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId, face_count: u8) {
        self.push_edge(a.0, b.0, face_count);
        self.boundary = None;
    }

    fn push_edge(&mut self, a: u32, b: u32, face_count: u8) -> u32 {
        let e = self.edges.len() as u32;
        self.edges.push(Edge {
            verts: [a, b],
            face_count,
        });
        self.vert_edges[a as usize].push(e);
        self.vert_edges[b as usize].push(e);
        e
    }

    fn find_edge(&self, a: u32, b: u32) -> Option<&Edge> {
        self.vert_edges[a as usize]
            .iter()
            .map(|&e| &self.edges[e as usize])
            .find(|edge| edge.other(a) == b)
    }

    fn vertex_touches_boundary(&self, v: u32) -> bool {
        self.vert_edges[v as usize]
            .iter()
            .any(|&e| self.edges[e as usize].is_boundary())
    }

    pub fn init_masks(&mut self, initial: f32) {
        self.masks = Some(vec![initial; self.positions.len()]);
    }

    pub fn init_colors(&mut self, initial: Vec4) {
        self.colors = Some(vec![initial; self.positions.len()]);
    }

    pub fn set_normal(&mut self, v: VertexId, normal: Vec3) {
        self.normals[v.index()] = normal;
    }
}

impl MeshTopology for EdgeTopology {
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
        for &e in &self.vert_edges[v.index()] {
            out.push(VertexId(self.edges[e as usize].other(v.0)));
        }
    }

    fn edge_is_boundary(&self, a: VertexId, b: VertexId) -> bool {
        self.find_edge(a.0, b.0).is_some_and(|e| e.is_boundary())
    }

    fn is_boundary(&self, v: VertexId) -> bool {
        match self.boundary.as_ref() {
            Some(flags) => flags.get(v.index()),
            // Cache invalidated mid-query; fall back to a direct scan of
            // this vertex's incident edges.
            None => self.vertex_touches_boundary(v.0),
        }
    }

    fn ensure_boundary_info(&mut self) {
        if self.boundary.is_some() {
            return;
        }
        let mut flags = BoundaryFlags::new(self.positions.len());
        for edge in &self.edges {
            if edge.is_boundary() {
                flags.set(edge.verts[0] as usize);
                flags.set(edge.verts[1] as usize);
            }
        }
        tracing::trace!(
            vertices = self.positions.len(),
            edges = self.edges.len(),
            "rebuilt boundary flags"
        );
        self.boundary = Some(flags);
    }
}
