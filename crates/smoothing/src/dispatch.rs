//! Fork-join dispatch of per-batch kernels.
//!
//! One dispatch call runs a kernel over every node batch exactly once and
//! returns only when all tasks have finished (implicit barrier). Batches
//! are independent; there is no ordering between them within a call, and
//! sequential dispatch calls are fully ordered with respect to each other.

use rayon::prelude::*;

use crate::batch::NodeBatch;

/// Below this many batches the threading overhead outweighs the work;
/// fall back to sequential execution.
pub const PARALLEL_BATCH_THRESHOLD: usize = 2;

/// Execute `kernel(batch_index, batch, thread_id)` for every batch.
///
/// Outputs are returned indexed by batch, so results are deterministic
/// regardless of scheduling. `thread_id` is a per-task slot bounded by the
/// pool width (0 on the sequential path), suitable for indexing per-slot
/// scratch arenas without locking.
pub fn drive_batches<R, F>(batches: &[NodeBatch], use_threading: bool, kernel: F) -> Vec<R>
where
    R: Send,
    F: Fn(usize, &NodeBatch, usize) -> R + Sync,
{
    if use_threading && batches.len() >= PARALLEL_BATCH_THRESHOLD {
        batches
            .par_iter()
            .enumerate()
            .map(|(n, batch)| kernel(n, batch, rayon::current_thread_index().unwrap_or(0)))
            .collect()
    } else {
        batches
            .iter()
            .enumerate()
            .map(|(n, batch)| kernel(n, batch, 0))
            .collect()
    }
}
