//! RGB <-> HSL conversion.
//!
//! Hue is expressed in sixth-turns, `[0, 1)`. The pair is range-agnostic:
//! components on any single consistent scale (8-bit normalized to `[0, 1]`
//! or raw radiance values) round-trip, because saturation and the lightness
//! branches are derived from the same `l` on both sides.
//!
//! Degenerate cases:
//! - lightness <= 0 (pure black): hue and saturation are reported as 0;
//! - zero chroma (gray): saturation is 0 and the reported hue carries no
//!   color information, callers must not rely on it.

/// Convert an RGB triplet to `(hue, saturation, lightness)`.
///
/// Hue is in `[0, 1)`; saturation and lightness are on the scale of the
/// input components.
#[inline]
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let v = r.max(g).max(b);
    let m = r.min(g).min(b);
    let l = (m + v) / 2.0;
    if l <= 0.0 {
        return (0.0, 0.0, l);
    }
    let vm = v - m;
    let mut s = vm;
    if s > 0.0 {
        s /= if l <= 0.5 { v + m } else { 2.0 - v - m };
    } else {
        return (0.0, 0.0, l);
    }
    let r2 = (v - r) / vm;
    let g2 = (v - g) / vm;
    let b2 = (v - b) / vm;
    let mut h = if r == v {
        if g == m {
            5.0 + b2
        } else {
            1.0 - g2
        }
    } else if g == v {
        if b == m {
            1.0 + r2
        } else {
            3.0 - b2
        }
    } else if r == m {
        3.0 + g2
    } else {
        5.0 - r2
    };
    // saturated reds land on exactly 6 sixths; wrap so hue stays in [0, 1)
    if h >= 6.0 {
        h -= 6.0;
    }
    (h / 6.0, s, l)
}

/// Convert `(hue, saturation, lightness)` back to an RGB triplet.
///
/// Inverse of [`rgb_to_hsl`] for non-degenerate colors (lightness > 0,
/// chroma > 0), within floating-point epsilon.
#[inline]
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    let v = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    if v <= 0.0 {
        return (l, l, l);
    }
    let m = l + l - v;
    let sv = (v - m) / v;
    let mut h6 = h * 6.0;
    if h6 >= 6.0 {
        h6 -= 6.0;
    }
    let sextant = h6 as i32;
    let fract = h6 - sextant as f32;
    let vsf = v * sv * fract;
    let mid1 = m + vsf;
    let mid2 = v - vsf;
    match sextant {
        0 => (v, mid1, m),
        1 => (mid2, v, m),
        2 => (m, v, mid1),
        3 => (m, mid2, v),
        4 => (mid1, m, v),
        5 => (v, m, mid2),
        _ => (l, l, l),
    }
}
