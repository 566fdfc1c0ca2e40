//! Mesh relaxation engine for interactive sculpting.
//!
//! The engine smooths vertex positions and attributes over an abstract
//! mesh backend ([`topology::MeshTopology`]), driven by a brush:
//!
//! - [`average`] — boundary-aware and directionally-weighted neighbor
//!   averages, the pure kernels everything else composes
//! - [`smooth`] — the iterated Laplacian smooth brush, its mask mode and
//!   the detail-enhancement inversion
//! - [`surface`] — two-pass HC smoothing with shape preservation
//! - [`dispatch`] — fork-join execution of per-batch kernels over the
//!   thread pool
//!
//! Kernels never write the mesh; they emit per-batch edit lists applied
//! after each dispatch joins, so results are deterministic regardless of
//! thread count.

pub mod average;
pub mod batch;
pub mod brush;
pub mod cache;
pub mod dispatch;
pub mod smooth;
pub mod surface;

pub use average::{
    four_neighbor_average, neighbor_average, neighbor_average_interior, neighbor_color_average,
    neighbor_mask_average,
};
pub use batch::{NodeBatch, partition_all};
pub use brush::{
    BrushError, BrushFalloff, ConstantStrength, FalloffCurve, SmoothBrush, StrengthEvaluator,
};
pub use cache::StrokeCache;
pub use dispatch::{PARALLEL_BATCH_THRESHOLD, drive_batches};
pub use smooth::{MAX_SMOOTH_ITERATIONS, do_smooth_brush, enhance_details, iteration_schedule};
pub use surface::{displace_step, laplacian_step, surface_smooth};
