//! Handoff to the external alignment and fusion collaborators.
//!
//! The core conditions the stack; it never aligns or merges pixels itself.
//! Alignment is modeled as a synchronous call returning one pixel offset
//! per item, fusion as an opaque function consuming the conditioned stack
//! and a configuration. Neither result is interpreted here.

use serde::{Deserialize, Serialize};

use crate::pixels::RadianceChannels;
use crate::stack::ExposureStack;
use crate::types::{PixelOffset, Result};

/// Weighting function applied to pixel values during fusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightingFunction {
    /// Triangle weighting, peaked at mid-range.
    Triangular,
    /// Gaussian weighting.
    Gaussian,
    /// Plateau weighting, flat mid-range with soft shoulders.
    Plateau,
}

/// Camera response curve assumed or recovered by the fusion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCurve {
    /// Gamma response.
    Gamma,
    /// Linear response.
    Linear,
    /// Logarithmic response.
    Log,
}

/// Radiance-map estimation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HdrModel {
    /// Debevec-Malik weighted averaging.
    Debevec,
    /// Robertson iterative estimation.
    Robertson,
}

/// Configuration handed to the fusion collaborator together with the
/// conditioned stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Pixel weighting function.
    pub weighting: WeightingFunction,
    /// Assumed camera response curve.
    pub response: ResponseCurve,
    /// Estimation model.
    pub model: HdrModel,
    /// Iteration count for iterative models.
    pub iterations: u32,
    /// Whether anti-ghosting ran (or should run) before fusion.
    pub anti_ghosting: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::presets()[0].clone()
    }
}

impl FusionConfig {
    /// The predefined weighting/response/model profiles, most general
    /// first. Iterative settings start at one pass with anti-ghosting off.
    pub fn presets() -> [FusionConfig; 6] {
        let base = |weighting, response| FusionConfig {
            weighting,
            response,
            model: HdrModel::Debevec,
            iterations: 1,
            anti_ghosting: false,
        };
        [
            base(WeightingFunction::Triangular, ResponseCurve::Gamma),
            base(WeightingFunction::Triangular, ResponseCurve::Linear),
            base(WeightingFunction::Plateau, ResponseCurve::Linear),
            base(WeightingFunction::Plateau, ResponseCurve::Gamma),
            base(WeightingFunction::Gaussian, ResponseCurve::Linear),
            base(WeightingFunction::Gaussian, ResponseCurve::Gamma),
        ]
    }
}

/// External geometric-alignment collaborator.
///
/// Produces one integer pixel offset per item, in stack order; the caller
/// applies them via [`ExposureStack::apply_alignment`]. Implementations
/// wrap whatever alignment process is available; the core carries no
/// dependency on how the result is produced.
pub trait AlignmentEngine {
    /// Compute per-item offsets for the given stack.
    fn align(&self, stack: &ExposureStack) -> Result<Vec<PixelOffset>>;
}

/// External exposure-fusion collaborator.
///
/// Consumes the conditioned stack (calibrated exposure times, corrected
/// pixel buffers, shared geometry and kind tag) and produces the merged
/// radiance frame. The core does not interpret the result.
pub trait FusionEngine {
    /// Fuse the conditioned stack into a single radiance frame.
    fn fuse(&self, stack: &ExposureStack, config: &FusionConfig) -> Result<RadianceChannels>;
}
