//! Brush parameters and per-vertex strength evaluation.
//!
//! The smoothing kernels never compute falloff themselves; they ask a
//! [`StrengthEvaluator`] for a per-vertex scalar. The provided
//! [`BrushFalloff`] combines a spherical influence test, a falloff curve
//! and the vertex paint mask; tests use [`ConstantStrength`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Falloff curve for brush influence.
///
/// Determines how brush strength decreases from center to edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum FalloffCurve {
    /// Linear falloff: strength = 1 - distance/radius
    Linear = 0,
    /// Smooth falloff: hermite interpolation
    #[default]
    Smooth = 1,
    /// Sharp falloff: quadratic decay
    Sharp = 2,
    /// Constant: full strength within radius
    Constant = 3,
    /// Sphere: spherical falloff (sqrt-based)
    Sphere = 4,
}

impl FalloffCurve {
    /// Calculate falloff strength at a normalized distance
    /// (0.0 = center, 1.0 = edge).
    pub fn evaluate(&self, normalized_distance: f32) -> f32 {
        let d = normalized_distance.clamp(0.0, 1.0);
        match self {
            FalloffCurve::Linear => 1.0 - d,
            FalloffCurve::Smooth => {
                // Hermite smoothstep: 3t² - 2t³
                let t = 1.0 - d;
                t * t * (3.0 - 2.0 * t)
            }
            FalloffCurve::Sharp => {
                let t = 1.0 - d;
                t * t
            }
            FalloffCurve::Constant => 1.0,
            FalloffCurve::Sphere => (1.0 - d * d).max(0.0).sqrt(),
        }
    }
}

/// Parameter validation errors for [`SmoothBrush`].
#[derive(Debug, thiserror::Error)]
pub enum BrushError {
    #[error("Brush radius must be positive, got {0}")]
    InvalidRadius(f32),
    #[error("Shape preservation must be in [0, 1], got {0}")]
    InvalidShapePreservation(f32),
    #[error("Displacement damping must be in [0, 1], got {0}")]
    InvalidDamping(f32),
}

/// Smooth-brush configuration.
///
/// `strength` drives the fractional iteration schedule of the orchestrator;
/// the `surface_smooth_*` coefficients belong to the two-pass HC scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothBrush {
    /// Brush radius in world units
    pub radius: f32,
    /// Strength multiplier (0.0 to 1.0)
    pub strength: f32,
    /// Falloff curve
    pub falloff: FalloffCurve,
    /// Dispatch node batches across the thread pool
    pub use_threading: bool,
    /// Outer iterations of the two-pass surface smoothing
    pub surface_smooth_iterations: u32,
    /// Shape preservation α: weight of the pre-stroke position in the
    /// Laplacian target (1.0 = full preservation)
    pub surface_smooth_shape_preservation: f32,
    /// Displacement damping β: weight of the vertex's own correction
    /// against its neighbors' average in the second pass
    pub surface_smooth_current_vertex: f32,
}

impl Default for SmoothBrush {
    fn default() -> Self {
        Self {
            radius: 1.0,
            strength: 0.5,
            falloff: FalloffCurve::Smooth,
            use_threading: true,
            surface_smooth_iterations: 4,
            surface_smooth_shape_preservation: 0.5,
            surface_smooth_current_vertex: 0.5,
        }
    }
}

impl SmoothBrush {
    /// Check parameter ranges before starting a stroke.
    pub fn validate(&self) -> Result<(), BrushError> {
        if !(self.radius > 0.0) {
            return Err(BrushError::InvalidRadius(self.radius));
        }
        let alpha = self.surface_smooth_shape_preservation;
        if !(0.0..=1.0).contains(&alpha) {
            return Err(BrushError::InvalidShapePreservation(alpha));
        }
        let beta = self.surface_smooth_current_vertex;
        if !(0.0..=1.0).contains(&beta) {
            return Err(BrushError::InvalidDamping(beta));
        }
        Ok(())
    }
}

/// Per-vertex strength supplier for the smoothing kernels.
///
/// `thread_id` is an explicit per-task slot index (bounded by the worker
/// pool width, distinct per concurrently-running task) usable for any
/// per-slot caching an implementation needs; it must never require locking.
pub trait StrengthEvaluator: Send + Sync {
    /// Strength factor in [0, 1] for a vertex at `position` (signed
    /// evaluators may exceed this for detail-enhancement use).
    fn strength_factor(&self, position: Vec3, normal: Vec3, mask: f32, thread_id: usize) -> f32;
}

/// Distance/curve/mask falloff around a brush center.
#[derive(Debug, Clone, Copy)]
pub struct BrushFalloff {
    pub center: Vec3,
    pub radius: f32,
    pub curve: FalloffCurve,
}

impl BrushFalloff {
    pub fn new(center: Vec3, radius: f32, curve: FalloffCurve) -> Self {
        Self {
            center,
            radius,
            curve,
        }
    }
}

impl StrengthEvaluator for BrushFalloff {
    fn strength_factor(&self, position: Vec3, _normal: Vec3, mask: f32, _thread_id: usize) -> f32 {
        let distance = position.distance(self.center);
        if distance > self.radius {
            return 0.0;
        }
        let fade = self.curve.evaluate(distance / self.radius);
        fade * (1.0 - mask.clamp(0.0, 1.0))
    }
}

/// Uniform strength everywhere; ignores distance and mask.
#[derive(Debug, Clone, Copy)]
pub struct ConstantStrength(pub f32);

impl StrengthEvaluator for ConstantStrength {
    fn strength_factor(&self, _position: Vec3, _normal: Vec3, _mask: f32, _thread_id: usize) -> f32 {
        self.0
    }
}
