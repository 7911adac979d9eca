//! Exposure-stack conditioning and anti-ghosting for HDR merging.
//!
//! A stack of differently-exposed photographs of one scene must be
//! conditioned before it can be fused into a radiance map: the exposures
//! have to describe the same geometry, their exposure values have to sit in
//! a sane range, and scene content that moved between exposures ("ghosts")
//! has to be detected and rewritten, or it smears across the merged result.
//!
//! This crate is that conditioning core, and only that:
//! - [`ExposureStack`] holds the loaded exposures under strict dimension
//!   and representation-kind invariants and owns crop/shift bookkeeping;
//! - [`calibrate`] normalizes exposure values into `[-10, 10]` EV and
//!   handles manual overrides for files without usable metadata;
//! - [`ghost`] flags suspect patches automatically via hue-variance
//!   scoring, or blends user-masked regions from a chosen good exposure;
//! - [`fusion`] carries the configuration and collaborator seams for the
//!   external alignment and fusion stages.
//!
//! This crate has **no codec or I/O dependency**: file decoding, metadata
//! extraction, the alignment process and the fusion arithmetic are all
//! external collaborators that exchange plain buffers with this core.
//!
//! # Example
//!
//! ```ignore
//! use hdrstack_core::{
//!     auto_remove_ghosts, normalize_ev, ExposureItem, ExposureStack,
//!     LdrImage, PixelData,
//! };
//!
//! let mut stack = ExposureStack::new();
//! for (index, (image, seconds)) in decoded_images.into_iter().enumerate() {
//!     stack.append(ExposureItem::new(index, seconds, PixelData::Ldr(image)))?;
//! }
//! normalize_ev(&mut stack)?;
//! let report = auto_remove_ghosts(&mut stack, 0.2)?;
//! println!("{} patches corrected", report.grid.flagged_count());
//! // hand the conditioned stack to the fusion collaborator
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calibrate;
pub mod color;
pub mod fusion;
pub mod ghost;
pub mod pixels;
pub mod stack;
mod types;

// Re-export the main types
pub use types::{
    CropRect, Error, PixelOffset, Result, StackKind, EXPOSURE_TIME_UNKNOWN,
};

pub use calibrate::{normalize_ev, set_manual_ev, ExposureChange, EV_MAX, EV_MIN};
pub use fusion::{
    AlignmentEngine, FusionConfig, FusionEngine, HdrModel, ResponseCurve, WeightingFunction,
};
pub use ghost::{
    auto_remove_ghosts, blend_from_reference, detect_ghosts, remove_ghosts, DetectionReport,
    PatchGrid, GRID_SIZE,
};
pub use pixels::{
    AntiGhostMask, LdrImage, PixelBuffer, PixelData, RadianceChannels, MAX_RADIANCE,
};
pub use stack::{ExposureItem, ExposureStack};

/// Safety limits for buffer allocation.
pub mod limits {
    /// Maximum image dimension (width or height).
    pub const MAX_IMAGE_DIMENSION: u32 = 65535;

    /// Maximum total pixels (width * height).
    pub const MAX_TOTAL_PIXELS: u64 = 500_000_000; // 500 megapixels
}
