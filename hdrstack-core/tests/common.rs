//! Common test utilities for synthetic exposure stacks.
//!
//! These helpers build exposure stacks programmatically, avoiding binary
//! fixtures in the repository.

#![allow(dead_code)]

use hdrstack_core::{
    ExposureItem, ExposureStack, LdrImage, PixelBuffer, PixelData, RadianceChannels,
};

/// Create a solid-color 8-bit image.
pub fn ldr_solid(width: u32, height: u32, rgb: [f32; 3]) -> LdrImage {
    let mut img = LdrImage::new(width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            img.set(x, y, rgb);
        }
    }
    img
}

/// Create an 8-bit image with a horizontal hue-stable gradient.
pub fn ldr_gradient(width: u32, height: u32, brightness: f32) -> LdrImage {
    let mut img = LdrImage::new(width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            let t = 0.1 + 0.8 * (x as f32 / (width - 1).max(1) as f32);
            img.set(
                x,
                y,
                [t * brightness, t * brightness * 0.6, t * brightness * 0.3],
            );
        }
    }
    img
}

/// Create solid radiance planes.
pub fn radiance_solid(width: u32, height: u32, rgb: [f32; 3]) -> RadianceChannels {
    let mut ch = RadianceChannels::new(width, height).unwrap();
    for y in 0..height {
        for x in 0..width {
            ch.set(x, y, rgb);
        }
    }
    ch
}

/// Build an LDR stack from images and exposure times, in order.
pub fn ldr_stack(images: Vec<LdrImage>, times: &[f32]) -> ExposureStack {
    let mut stack = ExposureStack::new();
    for (i, (img, &t)) in images.into_iter().zip(times).enumerate() {
        stack
            .append(ExposureItem::new(i, t, PixelData::Ldr(img)))
            .unwrap();
    }
    stack
}

/// Build a radiance stack from channel sets and exposure times, in order.
pub fn radiance_stack(channels: Vec<RadianceChannels>, times: &[f32]) -> ExposureStack {
    let mut stack = ExposureStack::new();
    for (i, (ch, &t)) in channels.into_iter().zip(times).enumerate() {
        stack
            .append(ExposureItem::new(i, t, PixelData::Radiance(ch)))
            .unwrap();
    }
    stack
}
