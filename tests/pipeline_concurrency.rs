// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Concurrency tests for the enhancement pipeline
//!
//! Two requests running at the same time against one pipeline must each
//! receive their own outputs. The pipeline keeps every intermediate in
//! memory, so there is no shared artifact location to collide on.

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb};
use ndarray::Array4;
use std::sync::Arc;

use enhance_node::{
    pipeline::EnhancePipeline,
    vision::{
        detector::{class_label, Detection, DetectorError, ObjectDetector},
        policy::{EnhancementPolicy, PolicyAction, PolicyError},
    },
};

struct FixedPolicy;

#[async_trait]
impl EnhancementPolicy for FixedPolicy {
    async fn predict(&self, _tensor: &Array4<f32>) -> Result<PolicyAction, PolicyError> {
        Ok(PolicyAction {
            index: 0,
            score: 1.0,
        })
    }
}

/// Detector stub that emits one box sized from the input image, so each
/// result is traceable to the request that produced it.
struct DimsEchoDetector;

#[async_trait]
impl ObjectDetector for DimsEchoDetector {
    async fn detect_batch(
        &self,
        images: &[DynamicImage],
    ) -> Result<Vec<Vec<Detection>>, DetectorError> {
        Ok(images
            .iter()
            .map(|img| {
                let (w, h) = img.dimensions();
                vec![Detection {
                    x: 0.0,
                    y: 0.0,
                    width: (w / 2) as f32,
                    height: (h / 2) as f32,
                    confidence: 0.9,
                    class_id: 0,
                    label: class_label(0),
                }]
            })
            .collect())
    }
}

fn solid(width: u32, height: u32, color: Rgb<u8>) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, color))
}

#[tokio::test]
async fn test_concurrent_runs_keep_their_own_images() {
    let pipeline = Arc::new(EnhancePipeline::new(
        Arc::new(FixedPolicy),
        Arc::new(DimsEchoDetector),
    ));

    let green = solid(40, 30, Rgb([0, 200, 0]));
    let purple = solid(64, 64, Rgb([160, 0, 160]));

    let (a, b) = tokio::join!(pipeline.run(&green), pipeline.run(&purple));
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.original.dimensions(), (40, 30));
    assert_eq!(a.enhanced.dimensions(), (40, 30));
    assert_eq!(b.original.dimensions(), (64, 64));
    assert_eq!(b.enhanced.dimensions(), (64, 64));

    // Pixels outside the overlay region still belong to the right image
    assert_eq!(*a.original.to_rgb8().get_pixel(35, 25), Rgb([0, 200, 0]));
    assert_eq!(*b.original.to_rgb8().get_pixel(60, 60), Rgb([160, 0, 160]));
}

#[tokio::test]
async fn test_many_concurrent_runs_complete() {
    let pipeline = Arc::new(EnhancePipeline::new(
        Arc::new(FixedPolicy),
        Arc::new(DimsEchoDetector),
    ));

    let mut handles = Vec::new();
    for i in 1..=8u32 {
        let pipeline = Arc::clone(&pipeline);
        handles.push(tokio::spawn(async move {
            let image = solid(8 * i, 8 * i, Rgb([i as u8 * 20, 50, 50]));
            let result = pipeline.run(&image).await.unwrap();
            assert_eq!(result.original.dimensions(), (8 * i, 8 * i));
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}
