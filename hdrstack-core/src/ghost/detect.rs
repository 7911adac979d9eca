//! Automatic ghost detection over a fixed patch grid.
//!
//! The image is partitioned into a [`GRID_SIZE`] x [`GRID_SIZE`] grid.
//! Each exposure gets a ghost score (its hue deviation from the stack's
//! mean-hue map); the highest-scoring exposure becomes the reference, and
//! every patch where another exposure's log-ratio against the reference
//! strays beyond what the exposure difference explains is flagged. Flagged
//! patches are then rewritten from the reference with the lightness
//! rescaled to each target exposure.

use log::debug;
use rayon::prelude::*;

use crate::color::{hsl_to_rgb, rgb_to_hsl};
use crate::ghost::pair_mut;
use crate::ghost::stats::{
    average_lightness, hue_deviation, mean_hue_map, patch_average_lightness,
};
use crate::pixels::{LdrImage, PixelBuffer, RadianceChannels};
use crate::stack::ExposureStack;
use crate::types::{CropRect, Error, Result, StackKind};

/// Grid dimension: detection and correction operate on a 40x40 partition.
pub const GRID_SIZE: usize = 40;

/// Fraction of the exposure difference a log-ratio may stray before the
/// pixel counts against its patch.
const DELTA_EV_TOLERANCE: f32 = 0.7;

/// Fixed partition of the stack geometry with one flag per patch.
///
/// Patch size is `(width / GRID_SIZE, height / GRID_SIZE)`; remainder rows
/// and columns fall outside the grid and are never scored or corrected.
#[derive(Debug, Clone)]
pub struct PatchGrid {
    image_width: u32,
    image_height: u32,
    patch_width: u32,
    patch_height: u32,
    flags: Vec<bool>,
}

impl PatchGrid {
    /// Partition a `width` x `height` image; all patches start unflagged.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let patch_width = width / GRID_SIZE as u32;
        let patch_height = height / GRID_SIZE as u32;
        if patch_width == 0 || patch_height == 0 {
            return Err(Error::ImageTooSmall {
                width,
                height,
                grid: GRID_SIZE,
            });
        }
        Ok(Self {
            image_width: width,
            image_height: height,
            patch_width,
            patch_height,
            flags: vec![false; GRID_SIZE * GRID_SIZE],
        })
    }

    /// Width of one patch in pixels.
    pub fn patch_width(&self) -> u32 {
        self.patch_width
    }

    /// Height of one patch in pixels.
    pub fn patch_height(&self) -> u32 {
        self.patch_height
    }

    /// Pixel rectangle of patch `(i, j)`.
    pub fn patch_rect(&self, i: usize, j: usize) -> CropRect {
        CropRect::new(
            i as u32 * self.patch_width,
            j as u32 * self.patch_height,
            self.patch_width,
            self.patch_height,
        )
    }

    /// True if patch `(i, j)` is flagged.
    pub fn is_flagged(&self, i: usize, j: usize) -> bool {
        self.flags[j * GRID_SIZE + i]
    }

    /// Flag patch `(i, j)`.
    pub fn flag(&mut self, i: usize, j: usize) {
        self.flags[j * GRID_SIZE + i] = true;
    }

    /// Number of flagged patches.
    pub fn flagged_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    fn matches_geometry(&self, width: u32, height: u32) -> bool {
        self.image_width == width && self.image_height == height
    }
}

/// Outcome of one automatic detection run.
///
/// Scores and factors are indexed by stack position. Not persisted; rerun
/// detection after any structural change to the stack.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Per-item ghost score (mean squared hue deviation).
    pub scores: Vec<f32>,
    /// Per-item whole-image average lightness.
    pub avg_lightness: Vec<f32>,
    /// Stack position of the reference exposure (highest ghost score).
    pub reference: usize,
    /// Per-item lightness ratio against the reference.
    pub scale_factors: Vec<f32>,
    /// The threshold the run used.
    pub threshold: f32,
    /// Flag state of every patch.
    pub grid: PatchGrid,
}

/// Run automatic ghost detection without touching any pixel data.
///
/// `threshold` is the patch-flagging fraction, in `(0, 1]`: a patch is
/// flagged once more than that fraction of its pixels deviates from the
/// reference beyond the exposure difference. Requires a calibrated,
/// non-empty stack at least [`GRID_SIZE`] pixels wide and tall.
pub fn detect_ghosts(stack: &ExposureStack, threshold: f32) -> Result<DetectionReport> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(Error::InvalidThreshold(threshold));
    }
    if stack.is_empty() {
        return Err(Error::EmptyStack);
    }
    if let Some(index) = stack.first_uncalibrated() {
        return Err(Error::MissingExposureTime { index });
    }
    let mut grid = PatchGrid::new(stack.width(), stack.height())?;
    let times = stack.exposure_times();

    let (avg_lightness, scores, reference, scale_factors) = match stack.kind() {
        StackKind::Ldr => {
            let views: Vec<&LdrImage> = stack
                .items()
                .iter()
                .filter_map(|it| it.data.as_ldr())
                .collect();
            debug_assert_eq!(views.len(), stack.len());
            detect_impl(&views, &times, threshold, &mut grid)
        }
        StackKind::Mdr => {
            let views: Vec<&RadianceChannels> = stack
                .items()
                .iter()
                .filter_map(|it| it.data.as_radiance())
                .collect();
            debug_assert_eq!(views.len(), stack.len());
            detect_impl(&views, &times, threshold, &mut grid)
        }
        StackKind::Unknown => return Err(Error::EmptyStack),
    };

    debug!(
        "ghost detection: reference {} of {}, {:.1}% of patches flagged",
        reference,
        stack.len(),
        grid.flagged_count() as f32 / (GRID_SIZE * GRID_SIZE) as f32 * 100.0
    );
    Ok(DetectionReport {
        scores,
        avg_lightness,
        reference,
        scale_factors,
        threshold,
        grid,
    })
}

/// Rewrite every flagged patch of every non-reference item from the
/// reference exposure, lightness rescaled by the item's scale factor.
///
/// Patches whose reference average lightness is degenerate (at or beyond
/// either end of the representation range) are skipped silently.
pub fn remove_ghosts(stack: &mut ExposureStack, report: &DetectionReport) -> Result<()> {
    if report.scale_factors.len() != stack.len() || report.reference >= stack.len() {
        return Err(Error::ReportMismatch(format!(
            "report covers {} items, stack has {}",
            report.scale_factors.len(),
            stack.len()
        )));
    }
    if !report.grid.matches_geometry(stack.width(), stack.height()) {
        return Err(Error::ReportMismatch(format!(
            "report grid is for {}x{}, stack is {}x{}",
            report.grid.image_width,
            report.grid.image_height,
            stack.width(),
            stack.height()
        )));
    }

    match stack.kind() {
        StackKind::Ldr => {
            let (items, _) = stack.parts_mut();
            let mut views: Vec<&mut LdrImage> = items
                .iter_mut()
                .filter_map(|it| it.data.as_ldr_mut())
                .collect();
            correct_impl(&mut views, report);
        }
        StackKind::Mdr => {
            let (items, _) = stack.parts_mut();
            let mut views: Vec<&mut RadianceChannels> = items
                .iter_mut()
                .filter_map(|it| it.data.as_radiance_mut())
                .collect();
            correct_impl(&mut views, report);
        }
        StackKind::Unknown => return Err(Error::EmptyStack),
    }
    Ok(())
}

/// Detect and correct in one pass, returning the detection report.
pub fn auto_remove_ghosts(stack: &mut ExposureStack, threshold: f32) -> Result<DetectionReport> {
    let report = detect_ghosts(stack, threshold)?;
    remove_ghosts(stack, &report)?;
    Ok(report)
}

fn detect_impl<P: PixelBuffer + Sync>(
    views: &[&P],
    times: &[f32],
    threshold: f32,
    grid: &mut PatchGrid,
) -> (Vec<f32>, Vec<f32>, usize, Vec<f32>) {
    let avg: Vec<f32> = views.par_iter().map(|v| average_lightness(*v)).collect();
    let mean = mean_hue_map(views);
    let scores: Vec<f32> = views
        .par_iter()
        .map(|v| hue_deviation(*v, &mean))
        .collect();
    for (h, score) in scores.iter().enumerate() {
        debug!("item {}: avg lightness {}, ghost score {}", h, avg[h], score);
    }

    let reference = index_of_max(&scores);
    let scale: Vec<f32> = avg.iter().map(|&a| a / avg[reference]).collect();

    let (pw, ph) = (grid.patch_width(), grid.patch_height());
    for (h, view) in views.iter().enumerate() {
        if h == reference {
            continue;
        }
        let delta_ev = times[reference].ln() - times[h].ln();
        let flagged: Vec<usize> = (0..GRID_SIZE * GRID_SIZE)
            .into_par_iter()
            .filter(|&p| {
                let (i, j) = (p % GRID_SIZE, p / GRID_SIZE);
                let rect = CropRect::new(i as u32 * pw, j as u32 * ph, pw, ph);
                compare_patch(views[reference], *view, &rect, threshold, delta_ev)
            })
            .collect();
        for p in flagged {
            grid.flag(p % GRID_SIZE, p / GRID_SIZE);
        }
    }
    (avg, scores, reference, scale)
}

/// First index holding the maximum score.
fn index_of_max(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate() {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

/// True when more than `threshold` of the patch's pixels deviate from the
/// reference beyond what the exposure difference explains.
///
/// Per pixel and channel, the log-ratio between reference and other is
/// offset by `delta_ev` (sign chosen so a faithful pixel lands near zero);
/// any channel beyond `DELTA_EV_TOLERANCE * |delta_ev|` counts the pixel.
fn compare_patch<P: PixelBuffer>(
    reference: &P,
    other: &P,
    rect: &CropRect,
    threshold: f32,
    delta_ev: f32,
) -> bool {
    let limit = DELTA_EV_TOLERANCE * delta_ev.abs();
    let mut count = 0u32;
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let [r1, g1, b1] = reference.get(x, y);
            let [r2, g2, b2] = other.get(x, y);
            let (dr, dg, db) = if delta_ev < 0.0 {
                (
                    r1.ln() - r2.ln() - delta_ev,
                    g1.ln() - g2.ln() - delta_ev,
                    b1.ln() - b2.ln() - delta_ev,
                )
            } else {
                (
                    r2.ln() - r1.ln() + delta_ev,
                    g2.ln() - g1.ln() + delta_ev,
                    b2.ln() - b1.ln() + delta_ev,
                )
            };
            if dr.abs() > limit || dg.abs() > limit || db.abs() > limit {
                count += 1;
            }
        }
    }
    count as f32 / (rect.width * rect.height) as f32 > threshold
}

fn correct_impl<P: PixelBuffer>(views: &mut [&mut P], report: &DetectionReport) {
    for h in 0..views.len() {
        if h == report.reference {
            continue;
        }
        let sf = report.scale_factors[h];
        let (target, reference) = pair_mut(views, h, report.reference);
        for j in 0..GRID_SIZE {
            for i in 0..GRID_SIZE {
                if report.grid.is_flagged(i, j) {
                    copy_patch(&**reference, &mut **target, &report.grid.patch_rect(i, j), sf);
                }
            }
        }
    }
}

/// Overwrite one patch of `target` with the reference patch, lightness
/// multiplied by `sf`. No-op when the reference patch's average lightness
/// is at or beyond either end of the representation range.
fn copy_patch<P: PixelBuffer>(reference: &P, target: &mut P, rect: &CropRect, sf: f32) {
    let max = reference.max_value();
    let avg = patch_average_lightness(reference, rect);
    if avg <= 0.0 || avg >= max {
        return;
    }
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            let [r, g, b] = reference.get(x, y);
            let (hue, sat, mut l) = rgb_to_hsl(r, g, b);
            l *= sf;
            if l > max {
                l = max;
            }
            let (r, g, b) = hsl_to_rgb(hue, sat, l);
            target.set(x, y, [r.clamp(0.0, max), g.clamp(0.0, max), b.clamp(0.0, max)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::PixelData;
    use crate::stack::ExposureItem;

    fn uniform_ldr(w: u32, h: u32, rgb: [f32; 3]) -> LdrImage {
        let mut img = LdrImage::new(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, rgb);
            }
        }
        img
    }

    fn stack_of(images: Vec<LdrImage>, times: &[f32]) -> ExposureStack {
        let mut stack = ExposureStack::new();
        for (i, (img, &t)) in images.into_iter().zip(times).enumerate() {
            stack
                .append(ExposureItem::new(i, t, PixelData::Ldr(img)))
                .unwrap();
        }
        stack
    }

    #[test]
    fn test_grid_rejects_tiny_images() {
        assert!(matches!(
            PatchGrid::new(39, 400),
            Err(Error::ImageTooSmall { .. })
        ));
        let grid = PatchGrid::new(400, 80).unwrap();
        assert_eq!(grid.patch_width(), 10);
        assert_eq!(grid.patch_height(), 2);
        assert_eq!(grid.patch_rect(2, 3), CropRect::new(20, 6, 10, 2));
    }

    #[test]
    fn test_threshold_validation() {
        let stack = stack_of(vec![uniform_ldr(40, 40, [0.5; 3])], &[1.0]);
        assert!(matches!(
            detect_ghosts(&stack, 0.0),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(matches!(
            detect_ghosts(&stack, 1.5),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(matches!(
            detect_ghosts(&stack, f32::NAN),
            Err(Error::InvalidThreshold(_))
        ));
        assert!(detect_ghosts(&stack, 1.0).is_ok());
    }

    #[test]
    fn test_identical_stack_flags_nothing() {
        let img = uniform_ldr(80, 80, [0.7, 0.4, 0.2]);
        let stack = stack_of(
            vec![img.clone(), img.clone(), img],
            &[1.0 / 30.0, 1.0 / 30.0, 1.0 / 30.0],
        );
        for &tau in &[0.01f32, 0.5, 1.0] {
            let report = detect_ghosts(&stack, tau).unwrap();
            for &score in &report.scores {
                assert!(score.abs() < 1e-6, "score was {}", score);
            }
            assert_eq!(report.grid.flagged_count(), 0);
        }
    }

    #[test]
    fn test_moving_object_flags_its_patches() {
        // three matching exposures, one with an off-hue block
        let base = uniform_ldr(80, 80, [0.2, 0.5, 0.3]);
        let mut ghosted = base.clone();
        for y in 0..10 {
            for x in 0..10 {
                ghosted.set(x, y, [0.9, 0.1, 0.1]);
            }
        }
        let stack = stack_of(vec![base.clone(), base, ghosted], &[0.1, 0.1, 0.1]);

        let report = detect_ghosts(&stack, 0.5).unwrap();
        // the off-hue item deviates most and becomes the reference
        assert_eq!(report.reference, 2);
        assert!(report.grid.flagged_count() > 0);
        assert!(report.grid.is_flagged(0, 0));
        assert!(!report.grid.is_flagged(20, 20));
    }

    #[test]
    fn test_correction_rescales_reference_lightness() {
        let bright = uniform_ldr(80, 80, [0.6, 0.3, 0.2]);
        let mut dark = uniform_ldr(80, 80, [0.3, 0.15, 0.1]);
        // give the dark exposure a ghost so a patch gets flagged
        for y in 0..2 {
            for x in 0..2 {
                dark.set(x, y, [0.1, 0.6, 0.1]);
            }
        }
        let mut stack = stack_of(vec![bright, dark], &[0.2, 0.1]);
        let report = auto_remove_ghosts(&mut stack, 0.5).unwrap();

        let h0 = report.reference;
        let other = 1 - h0;
        assert!(report.grid.flagged_count() > 0);

        let reference = stack.items()[h0].data.as_ldr().unwrap();
        let corrected = stack.items()[other].data.as_ldr().unwrap();
        let sf = report.scale_factors[other];
        for j in 0..GRID_SIZE {
            for i in 0..GRID_SIZE {
                if !report.grid.is_flagged(i, j) {
                    continue;
                }
                let rect = report.grid.patch_rect(i, j);
                for y in rect.y..rect.bottom() {
                    for x in rect.x..rect.right() {
                        let [r, g, b] = reference.get(x, y);
                        let (hue, sat, l) = rgb_to_hsl(r, g, b);
                        let [rc, gc, bc] = corrected.get(x, y);
                        let (hue_c, sat_c, l_c) = rgb_to_hsl(rc, gc, bc);
                        assert!((hue - hue_c).abs() < 0.02, "hue {} vs {}", hue, hue_c);
                        assert!((sat - sat_c).abs() < 0.05, "sat {} vs {}", sat, sat_c);
                        assert!(
                            (l * sf - l_c).abs() < 0.02,
                            "lightness {} vs expected {}",
                            l_c,
                            l * sf
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_degenerate_reference_patch_is_skipped() {
        // reference patches fully white: average lightness at the maximum
        let white = uniform_ldr(80, 80, [1.0, 1.0, 1.0]);
        let gray = uniform_ldr(80, 80, [0.5, 0.4, 0.3]);
        let mut stack = stack_of(vec![white, gray.clone()], &[0.1, 0.1]);

        let mut report = detect_ghosts(&stack, 1.0).unwrap();
        // force the white item as reference and flag one patch by hand
        report.reference = 0;
        report.scale_factors = vec![1.0, 0.5];
        report.grid.flag(0, 0);
        remove_ghosts(&mut stack, &report).unwrap();

        // the gray item is untouched because the reference patch is blown out
        let corrected = stack.items()[1].data.as_ldr().unwrap();
        assert_eq!(corrected.get(0, 0), gray.get(0, 0));
    }

    #[test]
    fn test_stale_report_is_rejected() {
        let img = uniform_ldr(80, 80, [0.5; 3]);
        let mut stack = stack_of(vec![img.clone(), img], &[0.1, 0.2]);
        let report = detect_ghosts(&stack, 0.5).unwrap();

        stack.remove(1).unwrap();
        assert!(matches!(
            remove_ghosts(&mut stack, &report),
            Err(Error::ReportMismatch(_))
        ));
    }

    #[test]
    fn test_detection_requires_calibration() {
        let mut stack = ExposureStack::new();
        stack
            .append(ExposureItem::new(
                0,
                crate::types::EXPOSURE_TIME_UNKNOWN,
                PixelData::Ldr(uniform_ldr(40, 40, [0.5; 3])),
            ))
            .unwrap();
        assert!(matches!(
            detect_ghosts(&stack, 0.5),
            Err(Error::MissingExposureTime { index: 0 })
        ));
    }
}
