// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic color transform applied to the original raster
//!
//! Converts each pixel to HSV, scales saturation by a fixed factor, and
//! converts back. Not driven by the policy action (see DESIGN.md).

use image::{DynamicImage, Rgba};

/// Fixed saturation factor for the enhancement transform.
/// Values below 1.0 desaturate toward grayscale.
pub const SATURATION_FACTOR: f32 = 0.2;

/// Apply the fixed-factor enhancement transform.
///
/// Pure function of the input raster and `SATURATION_FACTOR`: the same
/// input always yields the same output. The alpha channel is untouched
/// and the output keeps the input's channel layout (RGB in, RGB out).
pub fn enhance(image: &DynamicImage) -> DynamicImage {
    apply_saturation(image, SATURATION_FACTOR)
}

/// Scale every pixel's saturation by `factor`, clamped at full saturation.
pub fn apply_saturation(image: &DynamicImage, factor: f32) -> DynamicImage {
    let mut canvas = image.to_rgba8();

    for pixel in canvas.pixels_mut() {
        let Rgba([r, g, b, a]) = *pixel;

        let (h, s, v) = rgb_to_hsv(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
        );
        let (nr, ng, nb) = hsv_to_rgb(h, (s * factor).clamp(0.0, 1.0), v);

        *pixel = Rgba([
            (nr * 255.0).round().clamp(0.0, 255.0) as u8,
            (ng * 255.0).round().clamp(0.0, 255.0) as u8,
            (nb * 255.0).round().clamp(0.0, 255.0) as u8,
            a,
        ]);
    }

    if image.color().has_alpha() {
        DynamicImage::ImageRgba8(canvas)
    } else {
        DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
    }
}

/// RGB (0..1) to HSV (hue in degrees, s/v in 0..1)
fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta < f32::EPSILON {
        0.0
    } else if (max - r).abs() < f32::EPSILON {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if (max - g).abs() < f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (h, s, v)
}

/// HSV (hue in degrees, s/v in 0..1) back to RGB (0..1)
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let hp = (h / 60.0).clamp(0.0, 6.0);
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());

    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let m = v - c;
    (r1 + m, g1 + m, b1 + m)
}
