//! Mesh topology backends for the smoothing/relaxation engine.
//!
//! The relaxation kernels only need one capability from a mesh: enumerate
//! the vertices adjacent to a given vertex, plus per-vertex attribute
//! access. This crate expresses that capability as the [`MeshTopology`]
//! trait with three concrete backends:
//!
//! - [`GridTopology`] - regular W×H grids (4-connected)
//! - [`FaceTopology`] - unstructured triangle meshes
//! - [`EdgeTopology`] - dynamic edge-based meshes with incremental edits
//!
//! A backend is selected once per session and held as a single polymorphic
//! handle; all three must yield identical averaging results for identical
//! connectivity.

mod boundary;
mod edge;
mod face;
mod grid;
mod types;

pub use boundary::BoundaryFlags;
pub use edge::EdgeTopology;
pub use face::FaceTopology;
pub use grid::GridTopology;
pub use types::{TopologyError, VertexId};

use glam::{Vec3, Vec4};

/// Reusable scratch buffer for neighbor enumeration.
///
/// Neighbor sets are small (typically 3-8 vertices) and queried once per
/// vertex per kernel invocation; reusing one buffer per task keeps the hot
/// loop free of allocations.
#[derive(Debug, Clone, Default)]
pub struct NeighborBuffer {
    items: Vec<VertexId>,
}

impl NeighborBuffer {
    /// Typical valence of a manifold triangle-mesh vertex.
    pub const TYPICAL_CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(Self::TYPICAL_CAPACITY),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, v: VertexId) {
        self.items.push(v);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[VertexId] {
        &self.items
    }
}

/// Capability contract of a mesh backend: adjacent-vertex enumeration and
/// per-vertex attribute access.
///
/// Neighbor traversal order carries no contract for callers (every consumer
/// is an order-independent reduction) but must be deterministic per call so
/// frame-to-frame results are reproducible.
pub trait MeshTopology: Send + Sync {
    /// Total number of vertices in the backend.
    fn vertex_count(&self) -> usize;

    fn position(&self, v: VertexId) -> Vec3;

    fn set_position(&mut self, v: VertexId, position: Vec3);

    fn normal(&self, v: VertexId) -> Vec3;

    /// Per-vertex paint mask, if the backend carries one.
    fn mask(&self, v: VertexId) -> Option<f32> {
        let _ = v;
        None
    }

    fn set_mask(&mut self, v: VertexId, mask: f32) {
        let _ = (v, mask);
    }

    /// Per-vertex color, if the backend carries one.
    fn color(&self, v: VertexId) -> Option<Vec4> {
        let _ = v;
        None
    }

    fn set_color(&mut self, v: VertexId, color: Vec4) {
        let _ = (v, color);
    }

    /// Append the vertices adjacent to `v` onto `out` (which is cleared
    /// first). Deterministic order per call.
    fn neighbors(&self, v: VertexId, out: &mut NeighborBuffer);

    /// Whether the edge between two adjacent vertices lies on an open
    /// (single-face) edge or a designated seam.
    fn edge_is_boundary(&self, a: VertexId, b: VertexId) -> bool;

    /// Whether `v` lies on a mesh boundary or seam. O(1) once
    /// [`ensure_boundary_info`](Self::ensure_boundary_info) has run.
    fn is_boundary(&self, v: VertexId) -> bool;

    /// Run the one-time boundary classification pass if it has not run
    /// since the last topology change. Idempotent.
    fn ensure_boundary_info(&mut self);

    /// Whether the per-vertex adjacency map is available. Smoothing a
    /// face backend without it is a programming-contract violation.
    fn has_adjacency(&self) -> bool {
        true
    }
}
