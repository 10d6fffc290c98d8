// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the object detector

use image::DynamicImage;
use ndarray::Array4;

/// Fixed input size for the detector network
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Stack a batch of rasters into one NCHW detector input tensor
/// [N, 3, DETECTION_INPUT_SIZE, DETECTION_INPUT_SIZE].
///
/// Each image is stretch-resized to the detector's square input and
/// scaled to [0, 1]; box coordinates are rescaled back to the source
/// dimensions during postprocessing.
pub fn preprocess_for_detection(images: &[DynamicImage]) -> Array4<f32> {
    let size = DETECTION_INPUT_SIZE as usize;
    let mut batch = Array4::zeros((images.len(), 3, size, size));

    for (n, image) in images.iter().enumerate() {
        let resized = image.resize_exact(
            DETECTION_INPUT_SIZE,
            DETECTION_INPUT_SIZE,
            image::imageops::FilterType::Lanczos3,
        );
        let rgb = resized.to_rgb8();

        for y in 0..size {
            for x in 0..size {
                let pixel = rgb.get_pixel(x as u32, y as u32);
                for c in 0..3 {
                    batch[[n, c, y, x]] = pixel[c] as f32 / 255.0;
                }
            }
        }
    }

    batch
}
