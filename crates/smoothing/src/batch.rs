//! Node batches: the unit of parallel work.
//!
//! The external spatial partition hands the engine a list of batches, each
//! owning a disjoint set of vertices. A batch's vertices are touched by
//! exactly one task per dispatch, so mutation needs no locking.

use topology::VertexId;

/// A disjoint partition of affected vertices.
#[derive(Debug, Clone, Default)]
pub struct NodeBatch {
    vertices: Vec<VertexId>,
}

impl NodeBatch {
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Partition the full vertex range `0..vertex_count` into batches of at
/// most `batch_size` vertices. Stands in for the external spatial
/// structure when every vertex is affected.
pub fn partition_all(vertex_count: usize, batch_size: usize) -> Vec<NodeBatch> {
    debug_assert!(batch_size > 0);
    let ids: Vec<VertexId> = (0..vertex_count as u32).map(VertexId).collect();
    ids.chunks(batch_size.max(1))
        .map(|chunk| NodeBatch::new(chunk.to_vec()))
        .collect()
}
