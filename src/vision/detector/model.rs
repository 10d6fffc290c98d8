// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pretrained object detector model
//!
//! Submits a batch of rasters to the detector in one session run and
//! returns one ordered result set per input. All results are produced in
//! memory; nothing is written to shared storage between requests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use ndarray::{Axis, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::postprocess::{
    decode_predictions, non_max_suppression, Detection, CONFIDENCE_THRESHOLD, NMS_IOU_THRESHOLD,
};
use super::preprocessing::preprocess_for_detection;

/// Detection failures
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detection inference failed: {0}")]
    Inference(String),

    #[error("detection timed out after {0:?}")]
    Timeout(Duration),

    #[error("detector returned a batch of {actual} for {expected} inputs")]
    BatchMismatch { expected: usize, actual: usize },
}

/// Capability interface for the object detector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Detect objects in every raster of the batch. Returns exactly one
    /// result set per input, in input order; a count mismatch from the
    /// backend is surfaced as an error, never truncated or padded.
    async fn detect_batch(
        &self,
        images: &[DynamicImage],
    ) -> Result<Vec<Vec<Detection>>, DetectorError>;
}

/// ONNX-backed object detector (YOLO-family single-output head)
///
/// The session is loaded once at startup and shared read-only across
/// requests, serialized through a mutex. The run happens on the blocking
/// pool, bounded by the configured timeout.
#[derive(Clone)]
pub struct OnnxDetectorModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Minimum class score for a candidate box
    confidence_threshold: f32,
    /// IoU above which overlapping same-class boxes are suppressed
    iou_threshold: f32,
    /// Upper bound on a single detect call
    timeout: Duration,
}

impl std::fmt::Debug for OnnxDetectorModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetectorModel")
            .field("input_name", &self.input_name)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OnnxDetectorModel {
    /// Load the detector checkpoint from a file
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    ///
    /// Loading happens at startup; a corrupt artifact refuses to start
    /// instead of failing every request.
    pub async fn new<P: AsRef<Path>>(model_path: P, timeout: Duration) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("detector model not found: {}", model_path.display());
        }

        info!("Loading object detector from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detector model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detector model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            iou_threshold: NMS_IOU_THRESHOLD,
            timeout,
        })
    }

    /// Set the confidence threshold for detections
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

#[async_trait]
impl ObjectDetector for OnnxDetectorModel {
    async fn detect_batch(
        &self,
        images: &[DynamicImage],
    ) -> Result<Vec<Vec<Detection>>, DetectorError> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let batch = preprocess_for_detection(images);
        let dims: Vec<(u32, u32)> = images.iter().map(|img| img.dimensions()).collect();
        let expected = images.len();

        let session = Arc::clone(&self.session);
        let input_name = self.input_name.clone();
        let confidence_threshold = self.confidence_threshold;
        let iou_threshold = self.iou_threshold;

        let task =
            tokio::task::spawn_blocking(move || -> Result<Vec<Vec<Detection>>, DetectorError> {
                let mut session = session
                    .lock()
                    .map_err(|_| DetectorError::Inference("session lock poisoned".to_string()))?;

                let value = Value::from_array(batch)
                    .map_err(|e| DetectorError::Inference(e.to_string()))?;

                let outputs = session
                    .run(ort::inputs![&input_name => value])
                    .map_err(|e| DetectorError::Inference(e.to_string()))?;

                let predictions = outputs[0]
                    .try_extract_array::<f32>()
                    .map_err(|e| DetectorError::Inference(e.to_string()))?;

                let shape = predictions.shape().to_vec();
                let predictions = predictions.into_dimensionality::<Ix3>().map_err(|_| {
                    DetectorError::Inference(format!(
                        "unexpected detector output shape {:?}, expected [N, C, A]",
                        shape
                    ))
                })?;

                if predictions.shape()[0] != expected {
                    return Err(DetectorError::BatchMismatch {
                        expected,
                        actual: predictions.shape()[0],
                    });
                }
                if predictions.shape()[1] < 5 {
                    return Err(DetectorError::Inference(format!(
                        "detector head too small: {:?}",
                        shape
                    )));
                }

                let mut results = Vec::with_capacity(expected);
                for (n, &(width, height)) in dims.iter().enumerate() {
                    let grid = predictions.index_axis(Axis(0), n);
                    let candidates =
                        decode_predictions(grid, width, height, confidence_threshold);
                    results.push(non_max_suppression(candidates, iou_threshold));
                }

                Ok(results)
            });

        let joined = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| DetectorError::Timeout(self.timeout))?;
        let results = joined
            .map_err(|e| DetectorError::Inference(format!("detection task failed: {}", e)))??;

        debug!(
            "Detected {:?} objects across {} images",
            results.iter().map(Vec::len).collect::<Vec<_>>(),
            expected
        );

        Ok(results)
    }
}
