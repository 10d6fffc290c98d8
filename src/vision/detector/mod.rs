// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection: preprocessing, the pretrained model, head decoding
//! and in-memory overlay rendering

pub mod annotate;
pub mod labels;
pub mod model;
pub mod postprocess;
pub mod preprocessing;

pub use annotate::draw_detections;
pub use labels::{class_label, COCO_CLASSES};
pub use model::{DetectorError, ObjectDetector, OnnxDetectorModel};
pub use postprocess::{
    decode_predictions, non_max_suppression, Detection, CONFIDENCE_THRESHOLD, NMS_IOU_THRESHOLD,
};
pub use preprocessing::{preprocess_for_detection, DETECTION_INPUT_SIZE};
