// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector head decoding and non-maximum suppression
//!
//! The detector outputs one [4 + num_classes, num_anchors] prediction grid
//! per image: rows 0..4 hold the box center/size in input-tensor space,
//! the remaining rows hold per-class scores.

use ndarray::ArrayView2;

use super::labels::class_label;
use super::preprocessing::DETECTION_INPUT_SIZE;

/// Minimum class score for a candidate box
pub const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// IoU above which overlapping same-class boxes are suppressed
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// One detected object, in source-image pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// X coordinate of top-left corner
    pub x: f32,
    /// Y coordinate of top-left corner
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
    /// Best class score (0.0-1.0)
    pub confidence: f32,
    /// Index of the best class
    pub class_id: usize,
    /// Human-readable class name
    pub label: &'static str,
}

impl Detection {
    /// Area of the bounding box
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Decode one image's prediction grid into candidate detections.
///
/// Boxes are emitted in source-image coordinates: the cx/cy/w/h values
/// live in the detector's input-tensor space and are rescaled by the
/// source dimensions, then clamped to the image bounds.
pub fn decode_predictions(
    predictions: ArrayView2<'_, f32>,
    source_width: u32,
    source_height: u32,
    confidence_threshold: f32,
) -> Vec<Detection> {
    let num_classes = predictions.shape()[0].saturating_sub(4);
    let num_anchors = predictions.shape()[1];

    let scale_x = source_width as f32 / DETECTION_INPUT_SIZE as f32;
    let scale_y = source_height as f32 / DETECTION_INPUT_SIZE as f32;

    let mut detections = Vec::new();

    for a in 0..num_anchors {
        let mut class_id = 0usize;
        let mut confidence = 0.0f32;
        for c in 0..num_classes {
            let score = predictions[[4 + c, a]];
            if score > confidence {
                confidence = score;
                class_id = c;
            }
        }

        if confidence < confidence_threshold {
            continue;
        }

        let cx = predictions[[0, a]];
        let cy = predictions[[1, a]];
        let w = predictions[[2, a]];
        let h = predictions[[3, a]];

        let x = ((cx - w / 2.0) * scale_x).max(0.0);
        let y = ((cy - h / 2.0) * scale_y).max(0.0);
        let width = (w * scale_x).min(source_width as f32 - x);
        let height = (h * scale_y).min(source_height as f32 - y);

        if width <= 0.0 || height <= 0.0 {
            continue;
        }

        detections.push(Detection {
            x,
            y,
            width,
            height,
            confidence,
            class_id,
            label: class_label(class_id),
        });
    }

    detections
}

/// Greedy per-class non-maximum suppression.
///
/// Candidates are visited in descending confidence order; a box is kept
/// unless an already-kept box of the same class overlaps it beyond
/// `iou_threshold`.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && iou(k, &candidate) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}

/// Intersection-over-union of two axis-aligned boxes
fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
