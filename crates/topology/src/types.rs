//! Core topology types shared by all mesh backends.

/// Identifier for a vertex within a mesh backend.
///
/// Handles index externally-owned per-vertex arrays; the smoothing core
/// never owns the vertices it relaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl VertexId {
    /// The handle as an array index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised while constructing a mesh backend.
///
/// Runtime smoothing never returns these: degenerate geometry is recovered
/// locally with identity values, and contract violations abort the
/// operation instead of propagating.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Grid must be at least 2x2, got {width}x{height}")]
    GridTooSmall { width: u32, height: u32 },
    #[error("Expected {expected} per-vertex values, got {got}")]
    AttributeCountMismatch { expected: usize, got: usize },
    #[error("Index buffer length {0} is not a multiple of 3")]
    IncompleteTriangle(usize),
    #[error("Vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}
