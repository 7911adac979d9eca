//! The exposure stack: an ordered collection of differently-exposed items
//! sharing one geometry and one pixel representation.
//!
//! The stack owns all structural mutation (append, crop, shift, remove) and
//! enforces the invariants every downstream algorithm relies on: identical
//! dimensions across items, a single representation kind fixed by the first
//! accepted item, and one anti-ghost mask per item kept in lockstep with it.

use log::debug;

use crate::pixels::{crop_buffer, shift_buffer, AntiGhostMask, PixelData};
use crate::types::{
    CropRect, Error, PixelOffset, Result, StackKind, EXPOSURE_TIME_UNKNOWN,
};

/// One exposure of the scene, as delivered by the loading collaborator.
#[derive(Debug, Clone)]
pub struct ExposureItem {
    /// Load index; items are kept ordered by it, so unordered delivery is
    /// tolerated.
    pub index: usize,
    /// Exposure time in seconds, or [`EXPOSURE_TIME_UNKNOWN`].
    pub exposure_time: f32,
    /// The pixel payload.
    pub data: PixelData,
    /// False when the loader failed to decode the source file.
    pub valid: bool,
}

impl ExposureItem {
    /// Create a successfully loaded item.
    pub fn new(index: usize, exposure_time: f32, data: PixelData) -> Self {
        Self {
            index,
            exposure_time,
            data,
            valid: true,
        }
    }

    /// True while the exposure time is the unknown sentinel.
    pub fn needs_calibration(&self) -> bool {
        self.exposure_time == EXPOSURE_TIME_UNKNOWN
    }
}

/// Ordered collection of exposure items plus their anti-ghost masks.
#[derive(Debug, Default)]
pub struct ExposureStack {
    items: Vec<ExposureItem>,
    masks: Vec<AntiGhostMask>,
    kind: StackKind,
    width: u32,
    height: u32,
    /// Load indices of accepted items that arrived without exposure
    /// metadata, in arrival order.
    pending_calibration: Vec<usize>,
}

impl ExposureStack {
    /// Create an empty stack; kind and dimensions are established by the
    /// first accepted item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if no item has been accepted yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The established representation kind.
    pub fn kind(&self) -> StackKind {
        self.kind
    }

    /// Shared width, 0 before the first item.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Shared height, 0 before the first item.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All items, ordered by load index.
    pub fn items(&self) -> &[ExposureItem] {
        &self.items
    }

    /// The item at a stack position.
    pub fn item(&self, position: usize) -> Result<&ExposureItem> {
        self.items
            .get(position)
            .ok_or(Error::IndexOutOfBounds {
                index: position,
                len: self.items.len(),
            })
    }

    /// The anti-ghost mask of the item at a stack position.
    pub fn mask(&self, position: usize) -> Result<&AntiGhostMask> {
        self.masks.get(position).ok_or(Error::IndexOutOfBounds {
            index: position,
            len: self.masks.len(),
        })
    }

    /// Mutable access to a mask, for the external control surface to paint
    /// ghost regions.
    pub fn mask_mut(&mut self, position: usize) -> Result<&mut AntiGhostMask> {
        let len = self.masks.len();
        self.masks.get_mut(position).ok_or(Error::IndexOutOfBounds {
            index: position,
            len,
        })
    }

    /// Exposure times in stack order.
    pub fn exposure_times(&self) -> Vec<f32> {
        self.items.iter().map(|it| it.exposure_time).collect()
    }

    /// Load indices of items still awaiting manual calibration, in arrival
    /// order.
    pub fn pending_calibration(&self) -> &[usize] {
        &self.pending_calibration
    }

    /// Load index of the first item that still carries the unknown-exposure
    /// sentinel, if any.
    pub fn first_uncalibrated(&self) -> Option<usize> {
        self.items
            .iter()
            .find(|it| it.needs_calibration())
            .map(|it| it.index)
    }

    /// Accept an item into the stack.
    ///
    /// Rejects items the loader marked invalid, items whose representation
    /// kind conflicts with the stack's established kind, items whose
    /// dimensions differ from the established geometry, duplicate load
    /// indices, and exposure times that are neither the unknown sentinel
    /// nor positive finite. On rejection the stack is unchanged.
    pub fn append(&mut self, item: ExposureItem) -> Result<()> {
        if !item.valid {
            return Err(Error::InvalidItem { index: item.index });
        }
        let kind = item.data.kind();
        if self.kind != StackKind::Unknown && kind != self.kind {
            return Err(Error::KindConflict {
                stack: self.kind,
                item: kind,
            });
        }
        let (w, h) = (item.data.width(), item.data.height());
        if !self.items.is_empty() && (w != self.width || h != self.height) {
            return Err(Error::DimensionMismatch {
                stack_w: self.width,
                stack_h: self.height,
                item_w: w,
                item_h: h,
            });
        }
        if !item.needs_calibration()
            && !(item.exposure_time.is_finite() && item.exposure_time > 0.0)
        {
            return Err(Error::InvalidExposureTime {
                index: item.index,
                value: item.exposure_time,
            });
        }
        if self.items.iter().any(|it| it.index == item.index) {
            return Err(Error::DuplicateIndex { index: item.index });
        }

        let mask = AntiGhostMask::transparent(w, h)?;
        if self.items.is_empty() {
            self.kind = kind;
            self.width = w;
            self.height = h;
        }
        if item.needs_calibration() {
            self.pending_calibration.push(item.index);
        }
        debug!(
            "accepted item {} ({}x{}, {:?}, exposure {}s)",
            item.index, w, h, kind, item.exposure_time
        );
        let pos = self.items.partition_point(|it| it.index < item.index);
        self.items.insert(pos, item);
        self.masks.insert(pos, mask);
        Ok(())
    }

    /// Replace every item's pixel buffer and mask with the sub-rectangle.
    ///
    /// Applied atomically: all replacement buffers are staged first and
    /// swapped in only once every one of them succeeded, so a failure can
    /// never leave the stack in mixed dimensions. Cropping to the full
    /// current rectangle is a no-op on all buffers.
    pub fn crop(&mut self, rect: &CropRect) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::EmptyStack);
        }
        if !rect.fits(self.width, self.height) {
            return Err(Error::InvalidCropRect {
                rect: *rect,
                width: self.width,
                height: self.height,
            });
        }
        if rect.x == 0 && rect.y == 0 && rect.width == self.width && rect.height == self.height {
            return Ok(());
        }

        let mut new_data = Vec::with_capacity(self.items.len());
        for item in &self.items {
            new_data.push(match &item.data {
                PixelData::Ldr(img) => PixelData::Ldr(crop_buffer(img, rect)?),
                PixelData::Radiance(ch) => PixelData::Radiance(crop_buffer(ch, rect)?),
            });
        }
        let mut new_masks = Vec::with_capacity(self.masks.len());
        for mask in &self.masks {
            new_masks.push(mask.crop(rect)?);
        }

        for (item, data) in self.items.iter_mut().zip(new_data) {
            item.data = data;
        }
        self.masks = new_masks;
        self.width = rect.width;
        self.height = rect.height;
        debug!("cropped stack to {}x{}", self.width, self.height);
        Ok(())
    }

    /// Translate one item's pixel buffer by an integer offset.
    ///
    /// Pixels shifted in from outside the source are zero-filled; the
    /// item's mask is untouched (masks are painted after alignment).
    pub fn shift(&mut self, position: usize, dx: i32, dy: i32) -> Result<()> {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(position)
            .ok_or(Error::IndexOutOfBounds {
                index: position,
                len,
            })?;
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        item.data = match &item.data {
            PixelData::Ldr(img) => PixelData::Ldr(shift_buffer(img, dx, dy)?),
            PixelData::Radiance(ch) => PixelData::Radiance(shift_buffer(ch, dx, dy)?),
        };
        debug!("shifted item at position {} by ({}, {})", position, dx, dy);
        Ok(())
    }

    /// Apply one alignment offset per item, skipping identity offsets.
    ///
    /// The offset list must have exactly one entry per item, in stack order.
    pub fn apply_alignment(&mut self, offsets: &[PixelOffset]) -> Result<()> {
        if offsets.len() != self.items.len() {
            return Err(Error::OffsetCountMismatch {
                expected: self.items.len(),
                got: offsets.len(),
            });
        }
        for (position, offset) in offsets.iter().enumerate() {
            if offset.is_zero() {
                continue;
            }
            self.shift(position, offset.dx, offset.dy)?;
        }
        Ok(())
    }

    /// Drop the item and its mask at a stack position, returning the item.
    ///
    /// Remaining items already share the stack geometry, so dimensions are
    /// unaffected.
    pub fn remove(&mut self, position: usize) -> Result<ExposureItem> {
        if position >= self.items.len() {
            return Err(Error::IndexOutOfBounds {
                index: position,
                len: self.items.len(),
            });
        }
        self.masks.remove(position);
        let item = self.items.remove(position);
        self.pending_calibration.retain(|&idx| idx != item.index);
        debug!("removed item {} from stack", item.index);
        Ok(item)
    }

    pub(crate) fn item_mut(&mut self, position: usize) -> Result<&mut ExposureItem> {
        let len = self.items.len();
        self.items.get_mut(position).ok_or(Error::IndexOutOfBounds {
            index: position,
            len,
        })
    }

    pub(crate) fn clear_first_pending(&mut self) {
        if !self.pending_calibration.is_empty() {
            self.pending_calibration.remove(0);
        }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [ExposureItem], &[AntiGhostMask]) {
        (&mut self.items, &self.masks)
    }
}
