//! Ghost detection and correction.
//!
//! Scene content that moved between exposures ("ghosts") produces smeared
//! detail after fusion. This module flags suspect regions, either
//! automatically through hue-variance patch scoring ([`detect`]) or from
//! user-painted masks ([`blend`]), and rewrites them from a reference
//! exposure with the lightness rescaled to the target exposure.

pub mod blend;
pub mod detect;
pub mod stats;

pub use blend::*;
pub use detect::*;
pub use stats::*;

/// Disjoint mutable/shared borrow of two distinct slice elements.
pub(crate) fn pair_mut<T>(slice: &mut [T], target: usize, other: usize) -> (&mut T, &T) {
    debug_assert_ne!(target, other);
    if target < other {
        let (lo, hi) = slice.split_at_mut(other);
        (&mut lo[target], &hi[0])
    } else {
        let (lo, hi) = slice.split_at_mut(target);
        (&mut hi[0], &lo[other])
    }
}
