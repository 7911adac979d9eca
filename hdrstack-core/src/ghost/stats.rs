//! HSL statistics over pixel buffers.
//!
//! These are the building blocks of both detection and blending: whole-image
//! and per-patch lightness averages, the stack-wide mean-hue map, and the
//! per-item hue-deviation score. All reductions accumulate in f64 and are
//! row-parallel; pixels carry no cross dependency.

use rayon::prelude::*;

use crate::color::rgb_to_hsl;
use crate::pixels::PixelBuffer;
use crate::types::CropRect;

#[inline]
fn lightness_at<P: PixelBuffer>(buf: &P, x: u32, y: u32) -> f32 {
    let [r, g, b] = buf.get(x, y);
    rgb_to_hsl(r, g, b).2
}

#[inline]
fn hue_at<P: PixelBuffer>(buf: &P, x: u32, y: u32) -> f32 {
    let [r, g, b] = buf.get(x, y);
    rgb_to_hsl(r, g, b).0
}

/// Mean HSL lightness over the whole image.
pub fn average_lightness<P: PixelBuffer + Sync>(buf: &P) -> f32 {
    let (w, h) = (buf.width(), buf.height());
    let sum: f64 = (0..h)
        .into_par_iter()
        .map(|y| {
            let mut row = 0.0f64;
            for x in 0..w {
                row += lightness_at(buf, x, y) as f64;
            }
            row
        })
        .sum();
    (sum / (w as f64 * h as f64)) as f32
}

/// Largest HSL lightness found in the image.
pub fn max_lightness<P: PixelBuffer + Sync>(buf: &P) -> f32 {
    let (w, h) = (buf.width(), buf.height());
    (0..h)
        .into_par_iter()
        .map(|y| {
            let mut row_max = 0.0f32;
            for x in 0..w {
                row_max = row_max.max(lightness_at(buf, x, y));
            }
            row_max
        })
        .reduce(|| 0.0, f32::max)
}

/// Mean HSL lightness over one patch.
pub fn patch_average_lightness<P: PixelBuffer>(buf: &P, rect: &CropRect) -> f32 {
    let mut sum = 0.0f64;
    for y in rect.y..rect.bottom() {
        for x in rect.x..rect.right() {
            sum += lightness_at(buf, x, y) as f64;
        }
    }
    (sum / (rect.width as f64 * rect.height as f64)) as f32
}

/// Per-pixel mean hue across all items of a stack, row-major.
///
/// One map serves every item's deviation score; the mean includes the item
/// itself, matching the score definition.
pub fn mean_hue_map<P: PixelBuffer + Sync>(views: &[&P]) -> Vec<f32> {
    let (w, h) = (views[0].width(), views[0].height());
    let n = views.len() as f32;
    let mut map = vec![0.0f32; (w as usize) * (h as usize)];
    map.par_chunks_mut(w as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                for view in views {
                    sum += hue_at(*view, x as u32, y as u32);
                }
                *out = sum / n;
            }
        });
    map
}

/// Average squared deviation of the item's per-pixel hue from the stack's
/// mean-hue map: the item's ghost score.
pub fn hue_deviation<P: PixelBuffer + Sync>(buf: &P, mean_hue: &[f32]) -> f32 {
    let (w, h) = (buf.width(), buf.height());
    let sum: f64 = mean_hue
        .par_chunks(w as usize)
        .enumerate()
        .map(|(y, row)| {
            let mut acc = 0.0f64;
            for (x, &mean) in row.iter().enumerate() {
                let d = (mean - hue_at(buf, x as u32, y as u32)) as f64;
                acc += d * d;
            }
            acc
        })
        .sum();
    (sum / (w as f64 * h as f64)) as f32
}
