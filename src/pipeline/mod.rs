// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The request-level enhancement pipeline
//!
//! Composes preprocessing, policy inference, the color transform and
//! batched detection into one operation per request:
//! preprocess → policy ∥ transform → detect both → labeled outputs.

use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

use crate::vision::detector::{draw_detections, DetectorError, ObjectDetector};
use crate::vision::enhance::enhance;
use crate::vision::policy::{
    preprocess_for_policy, EnhancementPolicy, PolicyError, PreprocessError,
};

/// The pair of labeled outputs produced for one request
#[derive(Debug)]
pub struct PipelineResult {
    /// Original raster with detection overlays
    pub original: DynamicImage,
    /// Color-transformed raster with detection overlays
    pub enhanced: DynamicImage,
}

/// Pipeline failures, one variant per component boundary
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("detector returned {actual} result sets for {expected} images")]
    OutputCountMismatch { expected: usize, actual: usize },

    #[error("enhancement task failed: {0}")]
    EnhanceTask(String),
}

/// Request-level orchestrator.
///
/// Stateless across requests: the injected model handles are the only
/// shared state, and inference never mutates them. Each run owns its
/// intermediate rasters exclusively for the duration of one request.
pub struct EnhancePipeline {
    policy: Arc<dyn EnhancementPolicy>,
    detector: Arc<dyn ObjectDetector>,
}

impl EnhancePipeline {
    /// Build a pipeline around the injected model handles.
    pub fn new(policy: Arc<dyn EnhancementPolicy>, detector: Arc<dyn ObjectDetector>) -> Self {
        Self { policy, detector }
    }

    /// Run the full pipeline for one decoded request image.
    ///
    /// Either both labeled images are produced or the request fails as a
    /// whole; there is no partial success. Policy inference and the color
    /// transform carry no data dependency, so they run concurrently;
    /// detection starts only after both complete, and a policy failure
    /// aborts the request before detection.
    pub async fn run(&self, original: &DynamicImage) -> Result<PipelineResult, PipelineError> {
        let tensor = preprocess_for_policy(original)?;

        let policy = Arc::clone(&self.policy);
        let transform_input = original.clone();
        let (action, enhanced) = tokio::join!(
            async move { policy.predict(&tensor).await },
            tokio::task::spawn_blocking(move || enhance(&transform_input)),
        );

        let action = action?;
        let enhanced = enhanced.map_err(|e| PipelineError::EnhanceTask(e.to_string()))?;

        debug!(
            "Policy chose action {} (score {:.4})",
            action.index, action.score
        );
        // TODO: map the chosen action onto the transform parameters once
        // the action-to-adjustment mapping is finalized; until then the
        // fixed saturation factor applies.

        let inputs = [original.clone(), enhanced];
        let detections = self.detector.detect_batch(&inputs).await?;
        if detections.len() != inputs.len() {
            return Err(PipelineError::OutputCountMismatch {
                expected: inputs.len(),
                actual: detections.len(),
            });
        }

        let [original_image, enhanced_image] = inputs;
        Ok(PipelineResult {
            original: draw_detections(&original_image, &detections[0]),
            enhanced: draw_detections(&enhanced_image, &detections[1]),
        })
    }
}
