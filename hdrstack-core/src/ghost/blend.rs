//! Manual anti-ghosting: mask-driven blending against a chosen exposure.
//!
//! The user picks one "good" exposure and paints opacity masks over ghost
//! regions. Every other item then receives the good exposure's pixels in
//! the masked regions, lightness rescaled to its own brightness and
//! alpha-composited over its original content.

use log::debug;

use crate::color::{hsl_to_rgb, rgb_to_hsl};
use crate::ghost::pair_mut;
use crate::ghost::stats::{average_lightness, max_lightness};
use crate::pixels::{AntiGhostMask, LdrImage, PixelBuffer, RadianceChannels};
use crate::stack::ExposureStack;
use crate::types::{Error, Result, StackKind};

/// Blend every other item against the chosen good exposure.
///
/// Per pixel: when both the item's and the good item's masks are fully
/// transparent, the pixel is untouched. Otherwise the blend opacity is the
/// good item's mask value when nonzero, the item's own mask value
/// otherwise. The replacement pixel is read from the good exposure, its
/// HSL lightness multiplied by the pair's brightness ratio and clamped,
/// converted back to RGB and composited per channel over the original.
///
/// The lightness clamp is the representation maximum for 8-bit stacks; for
/// radiance stacks it is the larger of the two images' peak lightness, so
/// wide-range data is not compressed to an arbitrary constant.
pub fn blend_from_reference(stack: &mut ExposureStack, good_position: usize) -> Result<()> {
    if stack.is_empty() {
        return Err(Error::EmptyStack);
    }
    if good_position >= stack.len() {
        return Err(Error::IndexOutOfBounds {
            index: good_position,
            len: stack.len(),
        });
    }

    match stack.kind() {
        StackKind::Ldr => {
            let views: Vec<&LdrImage> = stack
                .items()
                .iter()
                .filter_map(|it| it.data.as_ldr())
                .collect();
            debug_assert_eq!(views.len(), stack.len());
            let avg: Vec<f32> = views.iter().map(|v| average_lightness(*v)).collect();
            let caps = vec![1.0f32; views.len()];

            let (items, masks) = stack.parts_mut();
            let mut targets: Vec<&mut LdrImage> = items
                .iter_mut()
                .filter_map(|it| it.data.as_ldr_mut())
                .collect();
            blend_impl(&mut targets, masks, good_position, &avg, &caps);
        }
        StackKind::Mdr => {
            let views: Vec<&RadianceChannels> = stack
                .items()
                .iter()
                .filter_map(|it| it.data.as_radiance())
                .collect();
            debug_assert_eq!(views.len(), stack.len());
            let avg: Vec<f32> = views.iter().map(|v| average_lightness(*v)).collect();
            let peaks: Vec<f32> = views.iter().map(|v| max_lightness(*v)).collect();
            let caps: Vec<f32> = peaks
                .iter()
                .map(|&p| p.max(peaks[good_position]))
                .collect();

            let (items, masks) = stack.parts_mut();
            let mut targets: Vec<&mut RadianceChannels> = items
                .iter_mut()
                .filter_map(|it| it.data.as_radiance_mut())
                .collect();
            blend_impl(&mut targets, masks, good_position, &avg, &caps);
        }
        StackKind::Unknown => return Err(Error::EmptyStack),
    }
    Ok(())
}

fn blend_impl<P: PixelBuffer>(
    views: &mut [&mut P],
    masks: &[AntiGhostMask],
    good: usize,
    avg: &[f32],
    caps: &[f32],
) {
    for idx in 0..views.len() {
        if idx == good {
            continue;
        }
        let sf = avg[idx] / avg[good];
        debug!("blending item {} against {} (sf {})", idx, good, sf);
        let (target, source) = pair_mut(views, idx, good);
        blend_pair(
            &mut **target,
            &**source,
            &masks[idx],
            &masks[good],
            sf,
            caps[idx],
        );
    }
}

fn blend_pair<P: PixelBuffer>(
    target: &mut P,
    good: &P,
    mask: &AntiGhostMask,
    good_mask: &AntiGhostMask,
    sf: f32,
    lightness_cap: f32,
) {
    let max = target.max_value();
    for y in 0..target.height() {
        for x in 0..target.width() {
            let a_good = good_mask.opacity(x, y);
            let a_own = mask.opacity(x, y);
            if a_good == 0 && a_own == 0 {
                continue;
            }
            let alpha = if a_good == 0 {
                a_own as f32 / 255.0
            } else {
                a_good as f32 / 255.0
            };

            let [r, g, b] = good.get(x, y);
            let (hue, sat, mut l) = rgb_to_hsl(r, g, b);
            l *= sf;
            if l > lightness_cap {
                l = lightness_cap;
            }
            let (r, g, b) = hsl_to_rgb(hue, sat, l);
            let (r, g, b) = (r.clamp(0.0, max), g.clamp(0.0, max), b.clamp(0.0, max));

            let [r0, g0, b0] = target.get(x, y);
            target.set(
                x,
                y,
                [
                    (1.0 - alpha) * r0 + alpha * r,
                    (1.0 - alpha) * g0 + alpha * g,
                    (1.0 - alpha) * b0 + alpha * b,
                ],
            );
        }
    }
}
