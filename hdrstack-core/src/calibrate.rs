//! Exposure-value calibration.
//!
//! EV = log2 of exposure time in seconds. Fusion weighting degrades when
//! the stack's EVs drift outside `[-10, 10]`, so the whole set is shifted
//! uniformly back into range; relative EV differences between items are
//! preserved exactly.

use log::debug;

use crate::stack::ExposureStack;
use crate::types::{Error, Result};

/// Upper EV bound after normalization.
pub const EV_MAX: f32 = 10.0;

/// Lower EV bound after normalization.
pub const EV_MIN: f32 = -10.0;

/// Notification that an item's exposure time was rewritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposureChange {
    /// Load index of the changed item.
    pub index: usize,
    /// The new exposure time in seconds.
    pub exposure_time: f32,
}

/// Shift every item's EV uniformly so the set fits `[EV_MIN, EV_MAX]`.
///
/// If the maximum EV exceeds [`EV_MAX`], the whole set is shifted down so
/// the maximum lands exactly on it; otherwise, if the minimum EV is below
/// [`EV_MIN`], the set is shifted up so the minimum lands exactly on it.
/// Returns one [`ExposureChange`] per item when a shift was applied, an
/// empty list when all EVs were already in range.
///
/// Every item must be calibrated first; an item still carrying the
/// unknown-exposure sentinel yields [`Error::MissingExposureTime`].
pub fn normalize_ev(stack: &mut ExposureStack) -> Result<Vec<ExposureChange>> {
    if let Some(index) = stack.first_uncalibrated() {
        return Err(Error::MissingExposureTime { index });
    }
    if stack.is_empty() {
        return Ok(Vec::new());
    }

    let mut max = f32::NEG_INFINITY;
    let mut min = f32::INFINITY;
    for item in stack.items() {
        let ev = item.exposure_time.log2();
        max = max.max(ev);
        min = min.min(ev);
    }

    let offset = if max > EV_MAX {
        max - EV_MAX
    } else if min < EV_MIN {
        min - EV_MIN
    } else {
        return Ok(Vec::new());
    };

    debug!(
        "EV range [{}, {}] out of bounds, shifting all exposures by {} EV",
        min, max, -offset
    );
    let mut changes = Vec::with_capacity(stack.len());
    for position in 0..stack.len() {
        let item = stack.item_mut(position)?;
        let new_ev = item.exposure_time.log2() - offset;
        item.exposure_time = new_ev.exp2();
        changes.push(ExposureChange {
            index: item.index,
            exposure_time: item.exposure_time,
        });
    }
    Ok(changes)
}

/// Override one item's exposure value manually.
///
/// Sets `exposure_time = 2^ev`. When the item previously carried the
/// unknown-exposure sentinel, one outstanding pending-calibration record is
/// cleared, front of the list first.
pub fn set_manual_ev(stack: &mut ExposureStack, position: usize, ev: f32) -> Result<ExposureChange> {
    if !ev.is_finite() {
        let index = stack.item(position)?.index;
        return Err(Error::InvalidExposureTime { index, value: ev });
    }
    let item = stack.item_mut(position)?;
    let was_pending = item.needs_calibration();
    item.exposure_time = ev.exp2();
    let change = ExposureChange {
        index: item.index,
        exposure_time: item.exposure_time,
    };
    if was_pending {
        stack.clear_first_pending();
    }
    debug!(
        "manual EV {} for item {}: exposure time {}s",
        ev, change.index, change.exposure_time
    );
    Ok(change)
}
