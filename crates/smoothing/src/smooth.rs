//! Smooth-brush orchestration.
//!
//! One stroke step runs a fractional-strength iteration schedule over the
//! node batches. Each iteration is a full dispatch: kernels read a
//! consistent snapshot of the mesh and emit per-batch edit lists, which
//! are applied after the join. Negative stroke strength inverts the brush
//! into detail enhancement.

use glam::Vec3;
use tracing::{debug, error};

use topology::{MeshTopology, NeighborBuffer, VertexId};

use crate::average::{neighbor_average, neighbor_average_interior, neighbor_mask_average};
use crate::batch::NodeBatch;
use crate::brush::{SmoothBrush, StrengthEvaluator};
use crate::cache::StrokeCache;
use crate::dispatch::drive_batches;

/// Upper bound on smoothing iterations per stroke step.
pub const MAX_SMOOTH_ITERATIONS: usize = 4;

/// Split a strength in [0, 1] into full-strength iterations plus a
/// fractional remainder applied on the final iteration.
///
/// `strength = 0.6` runs two iterations at 1.0 and a last one at 0.4, so
/// perceived smoothing scales continuously with the slider.
pub fn iteration_schedule(strength: f32) -> (usize, f32) {
    let count = (strength * MAX_SMOOTH_ITERATIONS as f32) as usize;
    let last = MAX_SMOOTH_ITERATIONS as f32 * (strength - count as f32 / MAX_SMOOTH_ITERATIONS as f32);
    (count, last)
}

/// Run the iterated Laplacian smooth over `batches`.
///
/// With `smooth_mask` set the pass relaxes the paint mask layer instead
/// of positions. Requires vertex adjacency; a backend without it makes
/// this a no-op.
pub fn smooth(
    brush: &SmoothBrush,
    topo: &mut dyn MeshTopology,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
    strength: f32,
    smooth_mask: bool,
) {
    if !topo.has_adjacency() {
        debug_assert!(false, "smoothing requires vertex adjacency");
        error!("smoothing requires vertex adjacency, skipping");
        return;
    }
    topo.ensure_boundary_info();

    let strength = strength.clamp(0.0, 1.0);
    let (count, last) = iteration_schedule(strength);
    debug!(strength, count, last, smooth_mask, "smooth step");

    for iteration in 0..=count {
        let iter_strength = if iteration != count { 1.0 } else { last };
        if iter_strength <= 0.0 {
            continue;
        }
        if smooth_mask {
            smooth_mask_iteration(topo, eval, batches, brush.use_threading, iter_strength);
        } else {
            smooth_position_iteration(topo, eval, batches, brush.use_threading, iter_strength);
        }
    }
}

fn smooth_position_iteration(
    topo: &mut dyn MeshTopology,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
    use_threading: bool,
    iter_strength: f32,
) {
    let snapshot: &dyn MeshTopology = topo;
    let edits = drive_batches(batches, use_threading, |_, batch, thread_id| {
        let mut scratch = NeighborBuffer::new();
        let mut edits: Vec<(VertexId, Vec3)> = Vec::with_capacity(batch.len());
        for &v in batch.vertices() {
            let co = snapshot.position(v);
            let mask = snapshot.mask(v).unwrap_or(0.0);
            let fade =
                iter_strength * eval.strength_factor(co, snapshot.normal(v), mask, thread_id);
            if fade == 0.0 {
                continue;
            }
            let avg = neighbor_average_interior(snapshot, v, &mut scratch);
            edits.push((v, co + (avg - co) * fade));
        }
        edits
    });

    for batch_edits in edits {
        for (v, position) in batch_edits {
            topo.set_position(v, position);
        }
    }
}

fn smooth_mask_iteration(
    topo: &mut dyn MeshTopology,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
    use_threading: bool,
    iter_strength: f32,
) {
    let snapshot: &dyn MeshTopology = topo;
    let edits = drive_batches(batches, use_threading, |_, batch, thread_id| {
        let mut scratch = NeighborBuffer::new();
        let mut edits: Vec<(VertexId, f32)> = Vec::with_capacity(batch.len());
        for &v in batch.vertices() {
            let Some(mask) = snapshot.mask(v) else {
                continue;
            };
            // Mask smoothing ignores the mask itself as a protection term.
            let fade = iter_strength
                * eval.strength_factor(snapshot.position(v), snapshot.normal(v), 0.0, thread_id);
            if fade == 0.0 {
                continue;
            }
            let avg = neighbor_mask_average(snapshot, v, &mut scratch);
            // The iteration strength enters twice, matching the coordinate
            // path where it scales both the fade and the final blend.
            let delta = (avg - mask) * fade * iter_strength;
            edits.push((v, (mask + delta).clamp(0.0, 1.0)));
        }
        edits
    });

    for batch_edits in edits {
        for (v, mask) in batch_edits {
            topo.set_mask(v, mask);
        }
    }
}

/// Detail enhancement: the smooth brush with negative strength.
///
/// The first step captures each vertex's displacement toward its neighbor
/// average; every step then pushes vertices along the inverse of that
/// fixed direction, exaggerating surface detail instead of erasing it.
pub fn enhance_details(
    brush: &SmoothBrush,
    topo: &mut dyn MeshTopology,
    cache: &mut StrokeCache,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
) {
    if !topo.has_adjacency() {
        debug_assert!(false, "detail enhancement requires vertex adjacency");
        error!("detail enhancement requires vertex adjacency, skipping");
        return;
    }
    topo.ensure_boundary_info();

    let bstrength = cache.bstrength().clamp(-1.0, 1.0);

    if cache.is_first_step() {
        cache.ensure_detail_directions(topo.vertex_count());
        if let Some(directions) = cache.detail_directions_mut() {
            let snapshot: &dyn MeshTopology = topo;
            let mut scratch = NeighborBuffer::new();
            for (i, dir) in directions.iter_mut().enumerate() {
                let v = VertexId(i as u32);
                *dir = neighbor_average(snapshot, v, &mut scratch) - snapshot.position(v);
            }
        }
    }

    let Some(directions) = cache.detail_directions() else {
        return;
    };

    let snapshot: &dyn MeshTopology = topo;
    let edits = drive_batches(batches, brush.use_threading, |_, batch, thread_id| {
        let mut edits: Vec<(VertexId, Vec3)> = Vec::with_capacity(batch.len());
        for &v in batch.vertices() {
            let co = snapshot.position(v);
            let mask = snapshot.mask(v).unwrap_or(0.0);
            let fade = bstrength * eval.strength_factor(co, snapshot.normal(v), mask, thread_id);
            if fade == 0.0 {
                continue;
            }
            edits.push((v, co + directions[v.index()] * fade));
        }
        edits
    });

    for batch_edits in edits {
        for (v, position) in batch_edits {
            topo.set_position(v, position);
        }
    }

    cache.finish_step();
}

/// One stroke step of the smooth brush.
///
/// Positive stroke strength smooths; zero or negative strength enhances
/// detail instead.
pub fn do_smooth_brush(
    brush: &SmoothBrush,
    topo: &mut dyn MeshTopology,
    cache: &mut StrokeCache,
    eval: &dyn StrengthEvaluator,
    batches: &[NodeBatch],
) {
    let bstrength = cache.bstrength();
    if bstrength <= 0.0 {
        enhance_details(brush, topo, cache, eval, batches);
    } else {
        smooth(brush, topo, eval, batches, bstrength.min(1.0), false);
        cache.finish_step();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::partition_all;
    use crate::brush::ConstantStrength;
    use topology::GridTopology;

    fn perturbed_grid(width: u32, height: u32, amplitude: f32) -> GridTopology {
        let mut grid = GridTopology::planar(width, height, 1.0);
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let v = VertexId(y * width + x);
                let p = grid.position(v);
                let bump = amplitude * ((x * 7 + y * 13) as f32).sin();
                grid.set_position(v, p + Vec3::new(0.0, 0.0, bump));
            }
        }
        grid
    }

    fn squared_height(grid: &GridTopology) -> f32 {
        (0..grid.vertex_count())
            .map(|i| grid.position(VertexId(i as u32)).z.powi(2))
            .sum()
    }

    #[test]
    fn test_iteration_schedule() {
        assert_eq!(iteration_schedule(1.0), (4, 0.0));
        assert_eq!(iteration_schedule(0.25), (1, 0.0));

        let (count, last) = iteration_schedule(0.6);
        assert_eq!(count, 2);
        assert!((last - 0.4).abs() < 1e-5);

        assert_eq!(iteration_schedule(0.0), (0, 0.0));
    }

    #[test]
    fn test_zero_strength_is_identity() {
        let mut grid = perturbed_grid(5, 5, 0.3);
        let before: Vec<Vec3> = (0..25u32).map(|i| grid.position(VertexId(i))).collect();

        let brush = SmoothBrush::default();
        let batches = partition_all(25, 6);
        smooth(&brush, &mut grid, &ConstantStrength(1.0), &batches, 0.0, false);

        for (i, &p) in before.iter().enumerate() {
            assert_eq!(grid.position(VertexId(i as u32)), p);
        }
    }

    #[test]
    fn test_smoothing_reduces_roughness() {
        let mut grid = perturbed_grid(7, 7, 0.3);
        let before = squared_height(&grid);

        let brush = SmoothBrush::default();
        let batches = partition_all(49, 8);
        smooth(&brush, &mut grid, &ConstantStrength(1.0), &batches, 1.0, false);

        let after = squared_height(&grid);
        assert!(after < before * 0.5, "before {before}, after {after}");
    }

    #[test]
    fn test_threaded_matches_sequential() {
        let mut threaded_grid = perturbed_grid(6, 6, 0.25);
        let mut sequential_grid = perturbed_grid(6, 6, 0.25);
        let batches = partition_all(36, 5);

        let threaded_brush = SmoothBrush::default();
        let sequential_brush = SmoothBrush {
            use_threading: false,
            ..Default::default()
        };
        smooth(
            &threaded_brush,
            &mut threaded_grid,
            &ConstantStrength(1.0),
            &batches,
            0.7,
            false,
        );
        smooth(
            &sequential_brush,
            &mut sequential_grid,
            &ConstantStrength(1.0),
            &batches,
            0.7,
            false,
        );

        for i in 0..36u32 {
            assert_eq!(
                threaded_grid.position(VertexId(i)),
                sequential_grid.position(VertexId(i)),
                "vertex {i}"
            );
        }
    }

    #[test]
    fn test_mask_smoothing_diffuses_and_stays_in_range() {
        let mut grid = GridTopology::planar(3, 3, 1.0);
        grid.init_masks(0.0);
        grid.set_mask(VertexId(4), 1.0);

        let brush = SmoothBrush::default();
        let batches = partition_all(9, 3);
        // Strength 0.25 schedules exactly one iteration; half-strength
        // falloff keeps the diffusion damped.
        smooth(&brush, &mut grid, &ConstantStrength(0.5), &batches, 0.25, true);

        let center = grid.mask(VertexId(4)).unwrap();
        let edge = grid.mask(VertexId(1)).unwrap();
        assert!((center - 0.5).abs() < 1e-5, "center mask {center}");
        assert!((edge - 1.0 / 6.0).abs() < 1e-5, "edge mask {edge}");
        for i in 0..9u32 {
            let m = grid.mask(VertexId(i)).unwrap();
            assert!((0.0..=1.0).contains(&m));
        }
    }

    #[test]
    fn test_mask_fractional_iteration_scales_quadratically() {
        let mut grid = GridTopology::planar(3, 3, 1.0);
        grid.init_masks(0.0);
        grid.set_mask(VertexId(4), 1.0);

        // Strength 0.125 schedules a single iteration at 0.5; the delta
        // picks up that factor twice, so the center loses 0.25, not 0.5.
        let brush = SmoothBrush::default();
        let batches = partition_all(9, 3);
        smooth(&brush, &mut grid, &ConstantStrength(1.0), &batches, 0.125, true);

        let center = grid.mask(VertexId(4)).unwrap();
        assert!((center - 0.75).abs() < 1e-5, "center mask {center}");
        for i in 0..9u32 {
            let m = grid.mask(VertexId(i)).unwrap();
            assert!((0.0..=1.0).contains(&m));
        }
    }

    #[test]
    fn test_enhance_then_smooth_roughly_cancels() {
        let t = 0.05;
        let mut grid = perturbed_grid(5, 5, 0.1);
        let before: Vec<Vec3> = (0..25u32).map(|i| grid.position(VertexId(i))).collect();

        let brush = SmoothBrush::default();
        let batches = partition_all(25, 7);

        let mut cache = StrokeCache::new(-t);
        do_smooth_brush(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);

        // Strength t/4 schedules a single smoothing pass at fade t.
        let mut cache = StrokeCache::new(t / 4.0);
        do_smooth_brush(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);

        // First-order terms cancel; the residual is O(t^2). Boundary
        // vertices use a different average than the enhancement capture,
        // so only interior vertices are compared.
        for y in 1..4u32 {
            for x in 1..4u32 {
                let v = VertexId(y * 5 + x);
                let residual = (grid.position(v) - before[v.index()]).length();
                assert!(residual < 3.0 * t * t, "vertex {v:?} residual {residual}");
            }
        }
    }

    #[test]
    fn test_enhance_details_exaggerates_a_bump() {
        let mut grid = GridTopology::planar(5, 5, 1.0);
        let center = VertexId(12);
        let p = grid.position(center);
        grid.set_position(center, p + Vec3::new(0.0, 0.0, 0.2));

        let brush = SmoothBrush::default();
        let batches = partition_all(25, 25);
        let mut cache = StrokeCache::new(-1.0);
        do_smooth_brush(&brush, &mut grid, &mut cache, &ConstantStrength(1.0), &batches);

        // The bump's neighbor average sits below it, so the inverted
        // direction pushes the bump higher.
        assert!(grid.position(center).z > p.z + 0.2);
    }
}
