//! Core types for exposure-stack conditioning.

use thiserror::Error;

/// Exposure-time sentinel meaning "unknown, needs calibration".
///
/// Loaders deliver this value when the source file carries no usable
/// exposure metadata; the item is tracked in the stack's
/// pending-calibration record until [`set_manual_ev`] assigns a real value.
///
/// [`set_manual_ev`]: crate::calibrate::set_manual_ev
pub const EXPOSURE_TIME_UNKNOWN: f32 = -1.0;

/// Errors that can occur while conditioning an exposure stack.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Image dimensions are invalid (zero or too large).
    #[error("invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// An item's dimensions differ from the stack's established size.
    #[error("dimension mismatch: stack is {stack_w}x{stack_h}, item is {item_w}x{item_h}")]
    DimensionMismatch {
        /// Established stack width.
        stack_w: u32,
        /// Established stack height.
        stack_h: u32,
        /// Rejected item width.
        item_w: u32,
        /// Rejected item height.
        item_h: u32,
    },

    /// An item's representation kind differs from the stack's established kind.
    #[error("kind conflict: stack holds {stack:?} items, got {item:?}")]
    KindConflict {
        /// Established stack kind.
        stack: StackKind,
        /// Rejected item kind.
        item: StackKind,
    },

    /// The loader marked this item as failed; it cannot enter the stack.
    #[error("item {index} failed to load")]
    InvalidItem {
        /// Load index of the rejected item.
        index: usize,
    },

    /// An item with this load index is already present.
    #[error("duplicate item index {index}")]
    DuplicateIndex {
        /// Load index of the rejected item.
        index: usize,
    },

    /// A stack position is out of range.
    #[error("index {index} out of bounds for stack of {len} items")]
    IndexOutOfBounds {
        /// Requested stack position.
        index: usize,
        /// Current number of items.
        len: usize,
    },

    /// The operation requires a non-empty stack.
    #[error("exposure stack is empty")]
    EmptyStack,

    /// A crop rectangle is empty or extends past the stack bounds.
    #[error("invalid crop rectangle {rect:?} for {width}x{height} stack")]
    InvalidCropRect {
        /// The rejected rectangle.
        rect: CropRect,
        /// Current stack width.
        width: u32,
        /// Current stack height.
        height: u32,
    },

    /// The image is too small for the fixed detection grid.
    #[error("{width}x{height} image is too small for a {grid}x{grid} patch grid")]
    ImageTooSmall {
        /// Stack width.
        width: u32,
        /// Stack height.
        height: u32,
        /// Grid dimension.
        grid: usize,
    },

    /// The ghost-detection threshold must lie in (0, 1].
    #[error("detection threshold {0} outside (0, 1]")]
    InvalidThreshold(f32),

    /// An exposure time is neither the unknown sentinel nor positive finite.
    #[error("invalid exposure value {value} for item {index}")]
    InvalidExposureTime {
        /// Load index of the offending item.
        index: usize,
        /// The rejected value.
        value: f32,
    },

    /// An item still carries the unknown-exposure sentinel.
    #[error("item {index} lacks exposure metadata and has not been calibrated")]
    MissingExposureTime {
        /// Load index of the uncalibrated item.
        index: usize,
    },

    /// The alignment offset list does not match the stack.
    #[error("got {got} alignment offsets for {expected} items")]
    OffsetCountMismatch {
        /// Number of items in the stack.
        expected: usize,
        /// Number of offsets supplied.
        got: usize,
    },

    /// A detection report no longer matches the stack it is applied to.
    #[error("stale detection report: {0}")]
    ReportMismatch(String),

    /// Input exceeds safety limits.
    #[error("input exceeds safety limit: {0}")]
    LimitExceeded(String),

    /// Pixel data is invalid or inconsistent with the declared dimensions.
    #[error("invalid pixel data: {0}")]
    InvalidPixelData(String),
}

/// Result type for stack-conditioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Representation kind shared by every item of a stack.
///
/// The first accepted item decides the kind; it never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackKind {
    /// No item accepted yet.
    #[default]
    Unknown,
    /// 8-bit-per-channel images.
    Ldr,
    /// Floating-point radiance channels.
    Mdr,
}

/// Axis-aligned pixel rectangle, used for cropping and patch addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge, inclusive.
    pub x: u32,
    /// Top edge, inclusive.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CropRect {
    /// Create a rectangle from its top-left corner and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// One past the right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// True if the rectangle is non-empty and lies inside `width` x `height`.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.width > 0 && self.height > 0 && self.right() <= width && self.bottom() <= height
    }
}

/// Integer pixel displacement produced by the external alignment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelOffset {
    /// Horizontal shift; positive moves content toward larger x.
    pub dx: i32,
    /// Vertical shift; positive moves content toward larger y.
    pub dy: i32,
}

impl PixelOffset {
    /// Create an offset.
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// True for the identity offset.
    pub fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_rect_bounds() {
        let rect = CropRect::new(10, 20, 30, 40);
        assert_eq!(rect.right(), 40);
        assert_eq!(rect.bottom(), 60);
        assert!(rect.fits(40, 60));
        assert!(!rect.fits(39, 60));
        assert!(!rect.fits(40, 59));
        assert!(!CropRect::new(0, 0, 0, 10).fits(100, 100));
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::DimensionMismatch {
            stack_w: 100,
            stack_h: 80,
            item_w: 99,
            item_h: 80,
        };
        let msg = err.to_string();
        assert!(msg.contains("100x80"), "message was: {}", msg);
        assert!(msg.contains("99x80"), "message was: {}", msg);

        let err = Error::KindConflict {
            stack: StackKind::Ldr,
            item: StackKind::Mdr,
        };
        assert!(err.to_string().contains("Ldr"));
    }
}
