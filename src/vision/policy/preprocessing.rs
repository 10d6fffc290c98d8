// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the enhancement policy

use image::{DynamicImage, GenericImageView};
use ndarray::Array4;
use thiserror::Error;

/// Fixed input size for the policy network
pub const POLICY_INPUT_SIZE: u32 = 224;

/// Preprocessing failures
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("cannot preprocess a zero-area image ({width}x{height})")]
    ZeroArea { width: u32, height: u32 },
}

/// Preprocess an image for the policy network
///
/// Steps:
/// 1. Resize to POLICY_INPUT_SIZE x POLICY_INPUT_SIZE (stretch)
/// 2. Convert to RGB, dropping any alpha channel
/// 3. Scale pixel values to [0, 1]
/// 4. Fill an NCHW tensor [1, 3, H, W]
///
/// The output shape is identical for every valid input regardless of the
/// source dimensions or color mode.
pub fn preprocess_for_policy(image: &DynamicImage) -> Result<Array4<f32>, PreprocessError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(PreprocessError::ZeroArea { width, height });
    }

    let resized = image.resize_exact(
        POLICY_INPUT_SIZE,
        POLICY_INPUT_SIZE,
        image::imageops::FilterType::Lanczos3,
    );
    let rgb = resized.to_rgb8();

    let size = POLICY_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
            }
        }
    }

    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    #[test]
    fn test_shape_is_fixed_for_square_input() {
        let img = DynamicImage::new_rgb8(100, 100);
        let tensor = preprocess_for_policy(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_shape_is_fixed_for_rectangular_input() {
        let img = DynamicImage::new_rgb8(1920, 1080);
        let tensor = preprocess_for_policy(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_shape_is_fixed_for_alpha_input() {
        let img = DynamicImage::new_rgba8(33, 77);
        let tensor = preprocess_for_policy(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_shape_is_fixed_for_grayscale_input() {
        let img = DynamicImage::new_luma8(50, 30);
        let tensor = preprocess_for_policy(&img).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_zero_area_image_rejected() {
        let img = DynamicImage::new_rgb8(0, 0);
        let result = preprocess_for_policy(&img);
        assert!(matches!(
            result.unwrap_err(),
            PreprocessError::ZeroArea { width: 0, height: 0 }
        ));
    }

    #[test]
    fn test_values_scaled_to_unit_range() {
        let img: RgbImage = ImageBuffer::from_pixel(10, 10, Rgb([255, 255, 255]));
        let tensor = preprocess_for_policy(&DynamicImage::ImageRgb8(img)).unwrap();

        for val in tensor.iter() {
            assert!((0.0..=1.0).contains(val), "value {} outside [0, 1]", val);
        }
        // White input stays white after scaling
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
    }
}
