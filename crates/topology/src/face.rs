//! Unstructured triangle-mesh backend.
//!
//! Connectivity comes from an index buffer of triangle triples. The
//! per-vertex adjacency map is built explicitly by
//! [`FaceTopology::ensure_adjacency`]; smoothing this backend without it is
//! a programming-contract violation, not a runtime error. Boundary
//! classification (edges with a single incident face, plus caller-marked
//! seams) happens once at construction since this backend's topology is
//! immutable.

use std::collections::{HashMap, HashSet};

use glam::{Vec3, Vec4};

use crate::boundary::BoundaryFlags;
use crate::types::{TopologyError, VertexId};
use crate::{MeshTopology, NeighborBuffer};

/// An unstructured triangle mesh with explicit adjacency.
#[derive(Debug, Clone)]
pub struct FaceTopology {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    masks: Option<Vec<f32>>,
    colors: Option<Vec<Vec4>>,
    /// Sorted, deduplicated neighbor list per vertex. Built on demand.
    adjacency: Option<Vec<Vec<u32>>>,
    /// Undirected edges (min, max) with exactly one incident face.
    boundary_edges: HashSet<(u32, u32)>,
    boundary: BoundaryFlags,
    seams: HashSet<u32>,
}

impl FaceTopology {
    /// Build from positions and a triangle index buffer.
    ///
    /// Vertex normals are area-weighted face-normal averages. Boundary
    /// classification runs here; the adjacency map does not (call
    /// [`ensure_adjacency`](Self::ensure_adjacency) before smoothing).
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, TopologyError> {
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

        let normals = vertex_normals(&positions, &indices);
        let (boundary_edges, boundary) = classify_boundary(vertex_count, &indices);

        Ok(Self {
            positions,
            normals,
            indices,
            masks: None,
            colors: None,
            adjacency: None,
            boundary_edges,
            boundary,
            seams: HashSet::new(),
        })
    }

    /// Build the per-vertex adjacency map if missing. Idempotent.
    pub fn ensure_adjacency(&mut self) {
        if self.adjacency.is_some() {
            return;
        }
        let mut adjacency = vec![Vec::new(); self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0], tri[1], tri[2]);
            adjacency[a as usize].extend([b, c]);
            adjacency[b as usize].extend([a, c]);
            adjacency[c as usize].extend([a, b]);
        }
        for list in &mut adjacency {
            list.sort_unstable();
            list.dedup();
        }
        tracing::debug!(
            vertices = self.positions.len(),
            triangles = self.triangle_count(),
            "built vertex adjacency map"
        );
        self.adjacency = Some(adjacency);
    }

    /// Mark a vertex as lying on a UV/face-set seam. Seam vertices are
    /// treated as boundary by the smoothing kernels.
    pub fn mark_seam(&mut self, v: VertexId) {
        self.seams.insert(v.0);
        self.boundary.set(v.index());
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn init_masks(&mut self, initial: f32) {
        self.masks = Some(vec![initial; self.positions.len()]);
    }

    pub fn init_colors(&mut self, initial: Vec4) {
        self.colors = Some(vec![initial; self.positions.len()]);
    }
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Count faces per undirected edge; an edge with one incident face is
/// boundary, and so is every vertex touching one.
fn classify_boundary(
    vertex_count: usize,
    indices: &[u32],
) -> (HashSet<(u32, u32)>, BoundaryFlags) {
    let mut edge_faces: HashMap<(u32, u32), u32> = HashMap::new();
    for tri in indices.chunks_exact(3) {
        for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            *edge_faces.entry(edge_key(a, b)).or_insert(0) += 1;
        }
    }

    let mut boundary_edges = HashSet::new();
    let mut flags = BoundaryFlags::new(vertex_count);
    for (&edge, &faces) in &edge_faces {
        if faces < 2 {
            boundary_edges.insert(edge);
            flags.set(edge.0 as usize);
            flags.set(edge.1 as usize);
        }
    }
    (boundary_edges, flags)
}

fn vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        // Cross product length is twice the face area, so accumulating the
        // raw cross gives area weighting.
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    for n in &mut normals {
        *n = n.normalize_or_zero();
    }
    normals
}

impl MeshTopology for FaceTopology {
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
        let Some(adjacency) = self.adjacency.as_ref() else {
            debug_assert!(false, "face topology adjacency map missing");
            return;
        };
        for &n in &adjacency[v.index()] {
            out.push(VertexId(n));
        }
    }

    fn edge_is_boundary(&self, a: VertexId, b: VertexId) -> bool {
        self.boundary_edges.contains(&edge_key(a.0, b.0))
            || self.seams.contains(&a.0)
            || self.seams.contains(&b.0)
    }

    fn is_boundary(&self, v: VertexId) -> bool {
        self.boundary.get(v.index())
    }

    fn ensure_boundary_info(&mut self) {
        // Classified at construction; topology is immutable here.
    }

    fn has_adjacency(&self) -> bool {
        self.adjacency.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles sharing the edge (1, 2):
    ///
    /// ```text
    /// 3---2
    /// | / |
    /// 0---1
    /// ```
    fn quad() -> FaceTopology {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        FaceTopology::new(positions, vec![0, 1, 2, 0, 2, 3]).unwrap()
    }

    #[test]
    fn test_construction_errors() {
        assert!(FaceTopology::new(vec![Vec3::ZERO; 3], vec![0, 1]).is_err());
        assert!(FaceTopology::new(vec![Vec3::ZERO; 3], vec![0, 1, 9]).is_err());
    }

    #[test]
    fn test_adjacency_is_sorted_and_deduped() {
        let mut mesh = quad();
        assert!(!mesh.has_adjacency());
        mesh.ensure_adjacency();
        assert!(mesh.has_adjacency());

        let mut buf = NeighborBuffer::new();
        // Vertex 0 appears in both triangles; 2 must not be duplicated.
        mesh.neighbors(VertexId(0), &mut buf);
        assert_eq!(buf.as_slice(), &[VertexId(1), VertexId(2), VertexId(3)]);

        mesh.neighbors(VertexId(1), &mut buf);
        assert_eq!(buf.as_slice(), &[VertexId(0), VertexId(2)]);
    }

    #[test]
    fn test_boundary_classification() {
        let mesh = quad();
        // Every vertex of an open quad touches a boundary edge.
        for i in 0..4 {
            assert!(mesh.is_boundary(VertexId(i)));
        }
        // The shared diagonal has two incident faces.
        assert!(!mesh.edge_is_boundary(VertexId(0), VertexId(2)));
        assert!(mesh.edge_is_boundary(VertexId(0), VertexId(1)));
    }

    #[test]
    fn test_seam_marking() {
        let mut mesh = quad();
        assert!(!mesh.edge_is_boundary(VertexId(0), VertexId(2)));
        mesh.mark_seam(VertexId(2));
        assert!(mesh.edge_is_boundary(VertexId(0), VertexId(2)));
        assert!(mesh.is_boundary(VertexId(2)));
    }

    #[test]
    fn test_normals_face_up() {
        let mesh = quad();
        for i in 0..4 {
            let n = mesh.normal(VertexId(i));
            assert!((n - Vec3::Z).length() < 1e-5, "normal {n:?}");
        }
    }
}
