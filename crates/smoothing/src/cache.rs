//! Per-stroke state shared by every step of a stroke.
//!
//! A stroke owns one [`StrokeCache`]; the buffers it carries (original
//! positions, Laplacian displacements, detail directions) are allocated
//! lazily on the first step that needs them and live until
//! [`StrokeCache::end_stroke`].

use glam::Vec3;
use topology::{MeshTopology, VertexId};

/// State carried across the steps of a single stroke.
#[derive(Debug, Default)]
pub struct StrokeCache {
    /// Signed stroke strength; negative values invert the smooth brush
    /// into detail enhancement.
    bstrength: f32,
    first_step: bool,
    /// Per-vertex Laplacian displacement, written by the first surface
    /// smoothing pass and read by the second.
    laplacian_disp: Option<Vec<Vec3>>,
    /// Per-vertex displacement captured on the first step of an
    /// enhance-details stroke.
    detail_directions: Option<Vec<Vec3>>,
    /// Vertex positions at stroke start, for shape preservation.
    original_positions: Option<Vec<Vec3>>,
}

impl StrokeCache {
    pub fn new(bstrength: f32) -> Self {
        Self {
            bstrength,
            first_step: true,
            ..Self::default()
        }
    }

    pub fn bstrength(&self) -> f32 {
        self.bstrength
    }

    /// True until the first step of the stroke completes.
    pub fn is_first_step(&self) -> bool {
        self.first_step
    }

    /// Mark the current step finished.
    pub fn finish_step(&mut self) {
        self.first_step = false;
    }

    /// Allocate the Laplacian displacement buffer if this stroke doesn't
    /// have one yet.
    pub fn ensure_laplacian_disp(&mut self, vertex_count: usize) {
        if self.laplacian_disp.is_none() {
            self.laplacian_disp = Some(vec![Vec3::ZERO; vertex_count]);
        }
    }

    pub fn laplacian_disp(&self) -> Option<&[Vec3]> {
        self.laplacian_disp.as_deref()
    }

    pub fn laplacian_disp_mut(&mut self) -> Option<&mut [Vec3]> {
        self.laplacian_disp.as_deref_mut()
    }

    /// Allocate the detail direction buffer if this stroke doesn't have
    /// one yet.
    pub fn ensure_detail_directions(&mut self, vertex_count: usize) {
        if self.detail_directions.is_none() {
            self.detail_directions = Some(vec![Vec3::ZERO; vertex_count]);
        }
    }

    pub fn detail_directions(&self) -> Option<&[Vec3]> {
        self.detail_directions.as_deref()
    }

    pub fn detail_directions_mut(&mut self) -> Option<&mut [Vec3]> {
        self.detail_directions.as_deref_mut()
    }

    /// Snapshot every vertex position as the pre-stroke shape.
    pub fn capture_original_positions(&mut self, topo: &dyn MeshTopology) {
        let count = topo.vertex_count();
        let mut originals = Vec::with_capacity(count);
        for i in 0..count {
            originals.push(topo.position(VertexId(i as u32)));
        }
        self.original_positions = Some(originals);
    }

    pub fn original_position(&self, v: VertexId) -> Option<Vec3> {
        self.original_positions
            .as_ref()
            .map(|origs| origs[v.index()])
    }

    pub fn original_positions(&self) -> Option<&[Vec3]> {
        self.original_positions.as_deref()
    }

    /// Release the per-stroke buffers.
    pub fn end_stroke(&mut self) {
        self.laplacian_disp = None;
        self.detail_directions = None;
        self.original_positions = None;
    }
}
