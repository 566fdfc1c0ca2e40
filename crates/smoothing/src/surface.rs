//! Two-pass HC surface smoothing.
//!
//! Each outer iteration runs two full dispatches. The Laplacian pass
//! moves every vertex toward its neighbor average and records how far the
//! shape-preserving target was overshot; the displace pass then pulls the
//! vertex back along a blend of its own recorded displacement and its
//! neighbors', which smooths without the volume loss of plain Laplacian
//! relaxation.

use glam::Vec3;
use tracing::{debug, error};

use topology::{MeshTopology, NeighborBuffer, VertexId};

use crate::average::neighbor_average;
use crate::batch::NodeBatch;
use crate::brush::{SmoothBrush, StrengthEvaluator};
use crate::cache::StrokeCache;
use crate::dispatch::drive_batches;

/// First HC pass for one vertex.
///
/// Returns the smoothed position and the Laplacian displacement `avg - d`,
/// where `d` blends the pre-stroke position `orig` against the current one
/// by the shape preservation factor `alpha`.
pub fn laplacian_step(
    topo: &dyn MeshTopology,
    v: VertexId,
    orig: Vec3,
    alpha: f32,
    fade: f32,
    scratch: &mut NeighborBuffer,
) -> (Vec3, Vec3) {
    let co = topo.position(v);
    let avg = neighbor_average(topo, v, scratch);
    let d = orig * alpha + co * (1.0 - alpha);
    let new_co = co + (avg - co) * fade.clamp(0.0, 1.0);
    (new_co, avg - d)
}

/// Second HC pass for one vertex: the correction to subtract, blending
/// the vertex's own Laplacian displacement against its neighbors' by
/// `beta`. `None` for a vertex with no neighbors.
pub fn displace_step(
    topo: &dyn MeshTopology,
    v: VertexId,
    laplacian_disp: &[Vec3],
    beta: f32,
    scratch: &mut NeighborBuffer,
) -> Option<Vec3> {
    topo.neighbors(v, scratch);
    if scratch.is_empty() {
        return None;
    }
    let mut average = Vec3::ZERO;
    for &n in scratch.as_slice() {
        average += laplacian_disp[n.index()];
    }
    average /= scratch.len() as f32;
    Some(laplacian_disp[v.index()] * beta + average * (1.0 - beta))
}

/// One stroke step of surface smoothing over `batches`.
///
/// The first step of a stroke snapshots vertex positions as the shape to
/// preserve. Requires vertex adjacency; a backend without it makes this a
/// no-op.
pub fn surface_smooth(
    brush: &SmoothBrush,
    topo: &mut dyn MeshTopology,
    cache: &mut StrokeCache,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
) {
    if !topo.has_adjacency() {
        debug_assert!(false, "surface smoothing requires vertex adjacency");
        error!("surface smoothing requires vertex adjacency, skipping");
        return;
    }
    topo.ensure_boundary_info();

    if cache.is_first_step() {
        cache.capture_original_positions(topo);
    }
    cache.ensure_laplacian_disp(topo.vertex_count());

    let alpha = brush.surface_smooth_shape_preservation;
    let beta = brush.surface_smooth_current_vertex;
    let iterations = brush.surface_smooth_iterations;
    debug!(alpha, beta, iterations, "surface smooth step");

    for _ in 0..iterations {
        laplacian_iteration(brush, topo, cache, eval, batches, alpha);
        displace_iteration(brush, topo, cache, eval, batches, beta);
    }

    cache.finish_step();
}

fn laplacian_iteration(
    brush: &SmoothBrush,
    topo: &mut dyn MeshTopology,
    cache: &mut StrokeCache,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
    alpha: f32,
) {
    let snapshot: &dyn MeshTopology = topo;
    let originals = cache.original_positions();
    let edits = drive_batches(batches, brush.use_threading, |_, batch, thread_id| {
        let mut scratch = NeighborBuffer::new();
        let mut edits: Vec<(VertexId, Vec3, Vec3)> = Vec::with_capacity(batch.len());
        for &v in batch.vertices() {
            let co = snapshot.position(v);
            let mask = snapshot.mask(v).unwrap_or(0.0);
            let fade = eval.strength_factor(co, snapshot.normal(v), mask, thread_id);
            // The displacement is recorded even at zero fade: the second
            // pass averages it from every neighbor, so a stale entry would
            // leak into adjacent vertices on later iterations.
            let orig = originals.map_or(co, |origs| origs[v.index()]);
            let (new_co, disp) = laplacian_step(snapshot, v, orig, alpha, fade, &mut scratch);
            edits.push((v, new_co, disp));
        }
        edits
    });

    let Some(laplacian_disp) = cache.laplacian_disp_mut() else {
        return;
    };
    for batch_edits in edits {
        for (v, position, disp) in batch_edits {
            topo.set_position(v, position);
            laplacian_disp[v.index()] = disp;
        }
    }
}

fn displace_iteration(
    brush: &SmoothBrush,
    topo: &mut dyn MeshTopology,
    cache: &StrokeCache,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
    beta: f32,
) {
    let Some(laplacian_disp) = cache.laplacian_disp() else {
        return;
    };
    let snapshot: &dyn MeshTopology = topo;
    let edits = drive_batches(batches, brush.use_threading, |_, batch, thread_id| {
        let mut scratch = NeighborBuffer::new();
        let mut edits: Vec<(VertexId, Vec3)> = Vec::with_capacity(batch.len());
        for &v in batch.vertices() {
            let co = snapshot.position(v);
            let mask = snapshot.mask(v).unwrap_or(0.0);
            let fade = eval
                .strength_factor(co, snapshot.normal(v), mask, thread_id)
                .clamp(0.0, 1.0);
            if fade == 0.0 {
                continue;
            }
            if let Some(b) = displace_step(snapshot, v, laplacian_disp, beta, &mut scratch) {
                edits.push((v, co - b * fade));
            }
        }
        edits
    });

    for batch_edits in edits {
        for (v, position) in batch_edits {
            topo.set_position(v, position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::partition_all;
    use crate::brush::ConstantStrength;
    use topology::GridTopology;

    const EPSILON: f32 = 1e-4;

    fn bumped_grid() -> GridTopology {
        let mut grid = GridTopology::planar(5, 5, 1.0);
        for i in [6u32, 8, 12, 16, 18] {
            let v = VertexId(i);
            let p = grid.position(v);
            grid.set_position(v, p + Vec3::new(0.0, 0.0, if i == 12 { 0.3 } else { -0.1 }));
        }
        grid
    }

    #[test]
    fn test_laplacian_step_full_shape_preservation_targets_original() {
        let grid = bumped_grid();
        let v = VertexId(12);
        let orig = Vec3::new(2.0, 2.0, 0.0);
        let mut buf = NeighborBuffer::new();

        let (_, disp) = laplacian_step(&grid, v, orig, 1.0, 1.0, &mut buf);
        let avg = neighbor_average(&grid, v, &mut buf);
        assert!((disp - (avg - orig)).length() < EPSILON);
    }

    #[test]
    fn test_displace_step_isolated_vertex_is_none() {
        let mut mesh = topology::EdgeTopology::new();
        let v = mesh.add_vertex(Vec3::ZERO, Vec3::Z);
        let mut buf = NeighborBuffer::new();
        assert!(displace_step(&mesh, v, &[Vec3::ZERO], 0.5, &mut buf).is_none());
    }

    #[test]
    fn test_full_preservation_round_trip_is_identity() {
        // alpha = 1: the Laplacian displacement measures overshoot past the
        // pre-stroke shape. beta = 1: the displace pass subtracts exactly
        // that overshoot. Net effect per iteration is the identity.
        let mut grid = bumped_grid();
        let before: Vec<Vec3> = (0..25u32).map(|i| grid.position(VertexId(i))).collect();

        let brush = SmoothBrush {
            surface_smooth_shape_preservation: 1.0,
            surface_smooth_current_vertex: 1.0,
            surface_smooth_iterations: 2,
            ..Default::default()
        };
        let batches = partition_all(25, 6);
        let mut cache = StrokeCache::new(1.0);
        surface_smooth(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);

        for (i, &p) in before.iter().enumerate() {
            let q = grid.position(VertexId(i as u32));
            assert!((q - p).length() < EPSILON, "vertex {i}: {p} -> {q}");
        }
    }

    #[test]
    fn test_surface_smooth_flattens_bump_less_than_laplacian() {
        let mut hc_grid = bumped_grid();
        let mut lap_grid = bumped_grid();
        let batches = partition_all(25, 6);
        let center = VertexId(12);
        let start_z = hc_grid.position(center).z;

        let brush = SmoothBrush {
            surface_smooth_iterations: 1,
            ..Default::default()
        };
        let mut cache = StrokeCache::new(1.0);
        surface_smooth(&brush, &mut hc_grid, &mut cache, &ConstantStrength(1.0), &batches);

        crate::smooth::smooth(
            &brush,
            &mut lap_grid,
            &ConstantStrength(1.0),
            &batches,
            0.25,
            false,
        );

        let hc_z = hc_grid.position(center).z;
        let lap_z = lap_grid.position(center).z;
        assert!(hc_z < start_z, "bump should shrink, got {hc_z}");
        assert!(
            hc_z > lap_z - EPSILON,
            "shape preservation should retain more of the bump: hc {hc_z}, laplacian {lap_z}"
        );
    }

    #[test]
    fn test_laplacian_disp_recorded_at_zero_fade() {
        // A vertex outside the brush influence must still refresh its
        // recorded displacement each iteration, since neighbors read it in
        // the damping average.
        let mut grid = bumped_grid();
        let batches = partition_all(25, 6);
        let brush = SmoothBrush {
            surface_smooth_iterations: 1,
            ..Default::default()
        };
        let mut cache = StrokeCache::new(1.0);
        surface_smooth(&brush, &mut grid, &mut cache, &ConstantStrength(0.0), &batches);

        // Zero fade: no positions move.
        assert_eq!(grid.position(VertexId(12)).z, 0.3);

        // The bump's displacement still reflects the current geometry.
        let disp = cache.laplacian_disp().unwrap()[12];
        let mut buf = NeighborBuffer::new();
        let avg = neighbor_average(&grid, VertexId(12), &mut buf);
        let co = grid.position(VertexId(12));
        let expected = avg - (co * 0.5 + co * 0.5);
        assert!((disp - expected).length() < EPSILON, "stale disp {disp}");
        assert!(disp.length() > 0.1, "disp should be nonzero for the bump");
    }

    #[test]
    fn test_zero_iterations_is_a_no_op() {
        let mut grid = bumped_grid();
        let before: Vec<Vec3> = (0..25u32).map(|i| grid.position(VertexId(i))).collect();

        let brush = SmoothBrush {
            surface_smooth_iterations: 0,
            ..Default::default()
        };
        let batches = partition_all(25, 6);
        let mut cache = StrokeCache::new(1.0);
        surface_smooth(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);

        for (i, &p) in before.iter().enumerate() {
            assert_eq!(grid.position(VertexId(i as u32)), p, "vertex {i}");
        }
    }

    #[test]
    fn test_stroke_snapshot_taken_once() {
        let mut grid = bumped_grid();
        let batches = partition_all(25, 6);
        let brush = SmoothBrush::default();
        let mut cache = StrokeCache::new(1.0);

        surface_smooth(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);
        let snapshot_after_first = cache.original_position(VertexId(12));

        surface_smooth(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);
        assert_eq!(cache.original_position(VertexId(12)), snapshot_after_first);
        // The snapshot holds the pre-stroke bump, not the smoothed position.
        assert_eq!(snapshot_after_first.map(|p| p.z), Some(0.3));
    }
}
