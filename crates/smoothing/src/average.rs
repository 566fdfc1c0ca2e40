//! Neighbor-averaging primitives.
//!
//! Every primitive is a pure query over an immutable topology: it reads
//! positions and attributes, never writes. Degenerate inputs (no
//! neighbors, no contributors) collapse to the vertex's own value, so
//! callers can apply results unconditionally.

use glam::{Vec3, Vec4};
use topology::{MeshTopology, NeighborBuffer, VertexId};

/// Unweighted average of all neighbor positions. A vertex with no
/// neighbors averages to its own position.
pub fn neighbor_average(topo: &dyn MeshTopology, v: VertexId, scratch: &mut NeighborBuffer) -> Vec3 {
    topo.neighbors(v, scratch);
    if scratch.is_empty() {
        return topo.position(v);
    }
    let mut avg = Vec3::ZERO;
    for &n in scratch.as_slice() {
        avg += topo.position(n);
    }
    avg / scratch.len() as f32
}

/// Boundary-aware position average.
///
/// Interior vertices average all neighbors. Boundary vertices average only
/// their boundary neighbors, which keeps open borders from being pulled
/// inward. Any vertex with two or fewer neighbors is a corner and stays
/// pinned; a vertex with no contributors averages to itself.
pub fn neighbor_average_interior(
    topo: &dyn MeshTopology,
    v: VertexId,
    scratch: &mut NeighborBuffer,
) -> Vec3 {
    let is_boundary = topo.is_boundary(v);
    topo.neighbors(v, scratch);

    // Corners keep their position regardless of boundary status.
    if scratch.len() <= 2 {
        return topo.position(v);
    }

    let mut avg = Vec3::ZERO;
    let mut total = 0usize;
    for &n in scratch.as_slice() {
        if !is_boundary || topo.is_boundary(n) {
            avg += topo.position(n);
            total += 1;
        }
    }

    if total > 0 {
        avg / total as f32
    } else {
        topo.position(v)
    }
}

/// Unweighted average of neighbor masks; falls back to the vertex's own
/// mask when it has no neighbors. Returns 0.0 if the mesh carries no mask
/// layer.
pub fn neighbor_mask_average(
    topo: &dyn MeshTopology,
    v: VertexId,
    scratch: &mut NeighborBuffer,
) -> f32 {
    topo.neighbors(v, scratch);
    if scratch.is_empty() {
        return topo.mask(v).unwrap_or(0.0);
    }
    let mut avg = 0.0;
    for &n in scratch.as_slice() {
        avg += topo.mask(n).unwrap_or(0.0);
    }
    avg / scratch.len() as f32
}

/// Unweighted average of neighbor colors; falls back to the vertex's own
/// color when it has no neighbors.
pub fn neighbor_color_average(
    topo: &dyn MeshTopology,
    v: VertexId,
    scratch: &mut NeighborBuffer,
) -> Vec4 {
    topo.neighbors(v, scratch);
    if scratch.is_empty() {
        return topo.color(v).unwrap_or(Vec4::ZERO);
    }
    let mut avg = Vec4::ZERO;
    for &n in scratch.as_slice() {
        avg += topo.color(n).unwrap_or(Vec4::ZERO);
    }
    avg / scratch.len() as f32
}

/// Directionally weighted average for edge relaxation.
///
/// Neighbors are weighted by how well their (tangent-projected) edge
/// direction aligns with `direction`: weight `(d² - 0.5)²` peaks for
/// edges parallel or antiparallel to the flow and vanishes at 45°. Any
/// incident boundary edge pins the vertex. The returned position has the
/// normal component of its displacement removed, preserving volume.
pub fn four_neighbor_average(
    topo: &dyn MeshTopology,
    v: VertexId,
    direction: Vec3,
    scratch: &mut NeighborBuffer,
) -> Vec3 {
    let co = topo.position(v);
    let no = topo.normal(v);

    topo.neighbors(v, scratch);

    let mut avg = Vec3::ZERO;
    let mut total = 0.0f32;
    for &n in scratch.as_slice() {
        if topo.edge_is_boundary(v, n) {
            return co;
        }
        let edge = topo.position(n) - co;
        // Project onto the tangent plane before measuring alignment.
        let tangent = (edge - no * edge.dot(no)).normalize_or_zero();
        let d = tangent.dot(direction);
        let fac = (d * d - 0.5) * (d * d - 0.5);
        avg += topo.position(n) * fac;
        total += fac;
    }

    if total > 0.0 {
        let avg = avg / total;
        let disp = avg - co;
        co + (disp - no * disp.dot(no))
    } else {
        co
    }
}
