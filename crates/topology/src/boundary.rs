//! Cached per-vertex boundary classification.
//!
//! Boundary status is queried once per neighbor per smoothing kernel
//! invocation, which makes it the hottest read in the relaxation core.
//! Backends classify once per session and answer from this bitset.

/// One boundary bit per vertex.
#[derive(Debug, Clone, Default)]
pub struct BoundaryFlags {
    bits: Vec<u64>,
    len: usize,
}

impl BoundaryFlags {
    /// Create a flag set for `len` vertices, all initially interior.
    pub fn new(len: usize) -> Self {
        Self {
            bits: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// Number of vertices covered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mark a vertex as boundary.
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.len);
        self.bits[index / 64] |= 1 << (index % 64);
    }

    /// Read a vertex's boundary bit. O(1).
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len);
        self.bits[index / 64] & (1 << (index % 64)) != 0
    }
}
