//! Color conversions used by the conditioning algorithms.

pub mod hsl;

pub use hsl::*;
