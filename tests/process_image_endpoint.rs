// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Endpoint tests for POST /process-image
//!
//! These tests drive the handler directly with stub models standing in
//! for the pretrained policy and detector, so they run without any model
//! files on disk:
//! - A valid image yields two decodable outputs in the input's format
//! - Malformed and missing payloads fail with the flat 500 envelope
//! - Concurrent requests never cross-contaminate

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, Json};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;
use std::io::Cursor;
use std::sync::Arc;

use enhance_node::{
    api::{process_image_handler, AppState, ProcessImageRequest},
    pipeline::EnhancePipeline,
    vision::{
        detector::{Detection, DetectorError, ObjectDetector},
        policy::{EnhancementPolicy, PolicyAction, PolicyError},
    },
};

/// Policy stub: always picks the same action
struct FixedPolicy;

#[async_trait]
impl EnhancementPolicy for FixedPolicy {
    async fn predict(&self, _tensor: &Array4<f32>) -> Result<PolicyAction, PolicyError> {
        Ok(PolicyAction {
            index: 1,
            score: 0.75,
        })
    }
}

/// Detector stub: finds nothing, so outputs stay pixel-comparable
struct QuietDetector;

#[async_trait]
impl ObjectDetector for QuietDetector {
    async fn detect_batch(
        &self,
        images: &[DynamicImage],
    ) -> Result<Vec<Vec<Detection>>, DetectorError> {
        Ok(images.iter().map(|_| Vec::new()).collect())
    }
}

fn test_state() -> AppState {
    AppState {
        pipeline: Arc::new(EnhancePipeline::new(
            Arc::new(FixedPolicy),
            Arc::new(QuietDetector),
        )),
    }
}

/// Encode a solid-color image as base64 in the given container format
fn image_base64(width: u32, height: u32, color: Rgb<u8>, format: ImageFormat) -> String {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, color);
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    STANDARD.encode(buffer.into_inner())
}

#[tokio::test]
async fn test_valid_jpeg_yields_two_decodable_jpegs() {
    let request = ProcessImageRequest {
        image_data: Some(image_base64(640, 480, Rgb([90, 140, 200]), ImageFormat::Jpeg)),
    };

    let response = process_image_handler(State(test_state()), Json(request))
        .await
        .expect("valid request must succeed");

    for encoded in [
        &response.0.original_image_enc,
        &response.0.enhanced_image_enc,
    ] {
        let bytes = STANDARD.decode(encoded).unwrap();
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
            .expect("output must decode as JPEG");
        assert!(decoded.width() > 0 && decoded.height() > 0);
    }
}

#[tokio::test]
async fn test_output_container_format_follows_input() {
    let request = ProcessImageRequest {
        image_data: Some(image_base64(32, 32, Rgb([10, 20, 30]), ImageFormat::Png)),
    };

    let response = process_image_handler(State(test_state()), Json(request))
        .await
        .unwrap();

    let bytes = STANDARD.decode(&response.0.original_image_enc).unwrap();
    // PNG magic bytes
    assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[tokio::test]
async fn test_invalid_base64_yields_flat_500() {
    let request = ProcessImageRequest {
        image_data: Some("not-base64!!".to_string()),
    };

    let (status, body) = process_image_handler(State(test_state()), Json(request))
        .await
        .expect_err("junk payload must fail");

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body.0.error.contains("decode"),
        "error should mention decode failure, got: {}",
        body.0.error
    );
}

#[tokio::test]
async fn test_missing_image_data_yields_flat_500() {
    let request: ProcessImageRequest = serde_json::from_str("{}").unwrap();

    let (status, body) = process_image_handler(State(test_state()), Json(request))
        .await
        .expect_err("missing payload must fail");

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.0.error.contains("imageData"));
}

#[tokio::test]
async fn test_valid_base64_non_image_yields_flat_500() {
    let request = ProcessImageRequest {
        image_data: Some(STANDARD.encode(b"plain text, not a picture")),
    };

    let (status, _body) = process_image_handler(State(test_state()), Json(request))
        .await
        .expect_err("non-image payload must fail");

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_concurrent_requests_do_not_cross_contaminate() {
    let state = test_state();

    let red = image_base64(10, 10, Rgb([255, 0, 0]), ImageFormat::Png);
    let blue = image_base64(12, 12, Rgb([0, 0, 255]), ImageFormat::Png);

    let (red_response, blue_response) = tokio::join!(
        process_image_handler(
            State(state.clone()),
            Json(ProcessImageRequest {
                image_data: Some(red),
            }),
        ),
        process_image_handler(
            State(state.clone()),
            Json(ProcessImageRequest {
                image_data: Some(blue),
            }),
        ),
    );

    let red_out = red_response.unwrap().0;
    let blue_out = blue_response.unwrap().0;

    let red_pixels = image::load_from_memory(&STANDARD.decode(&red_out.original_image_enc).unwrap())
        .unwrap()
        .to_rgb8();
    let blue_pixels =
        image::load_from_memory(&STANDARD.decode(&blue_out.original_image_enc).unwrap())
            .unwrap()
            .to_rgb8();

    // Each request gets back exactly its own image
    assert_eq!(red_pixels.dimensions(), (10, 10));
    assert_eq!(*red_pixels.get_pixel(5, 5), Rgb([255, 0, 0]));
    assert_eq!(blue_pixels.dimensions(), (12, 12));
    assert_eq!(*blue_pixels.get_pixel(5, 5), Rgb([0, 0, 255]));
}

#[tokio::test]
async fn test_enhanced_output_is_desaturated() {
    let request = ProcessImageRequest {
        image_data: Some(image_base64(8, 8, Rgb([255, 0, 0]), ImageFormat::Png)),
    };

    let response = process_image_handler(State(test_state()), Json(request))
        .await
        .unwrap()
        .0;

    let enhanced =
        image::load_from_memory(&STANDARD.decode(&response.enhanced_image_enc).unwrap())
            .unwrap()
            .to_rgb8();

    // The fixed-factor transform pulls pure red toward gray
    let pixel = *enhanced.get_pixel(4, 4);
    assert_eq!(pixel[0], 255);
    assert!(pixel[1] > 0 && pixel[2] > 0);
}
