// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Loads the two pretrained models at process startup

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::NodeConfig;
use crate::vision::detector::OnnxDetectorModel;
use crate::vision::policy::OnnxPolicyModel;

/// Owner of the pretrained model instances.
///
/// Both models are loaded exactly once at startup and handed to the
/// pipeline as shared read-only references. A missing or corrupt artifact
/// fails here, so the process refuses to start instead of failing every
/// request at inference time.
#[derive(Debug)]
pub struct VisionModelManager {
    policy: Arc<OnnxPolicyModel>,
    detector: Arc<OnnxDetectorModel>,
}

impl VisionModelManager {
    /// Load both models from the configured paths.
    pub async fn new(config: &NodeConfig) -> Result<Self> {
        let policy = OnnxPolicyModel::new(&config.policy_model_path, config.inference_timeout)
            .await
            .context("enhancement policy model unavailable")?;
        tracing::info!(
            "Enhancement policy ready ({})",
            config.policy_model_path.display()
        );

        let detector =
            OnnxDetectorModel::new(&config.detector_model_path, config.inference_timeout)
                .await
                .context("object detector model unavailable")?;
        tracing::info!(
            "Object detector ready ({})",
            config.detector_model_path.display()
        );

        Ok(Self {
            policy: Arc::new(policy),
            detector: Arc::new(detector),
        })
    }

    /// Shared handle to the enhancement policy
    pub fn policy(&self) -> Arc<OnnxPolicyModel> {
        self.policy.clone()
    }

    /// Shared handle to the object detector
    pub fn detector(&self) -> Arc<OnnxDetectorModel> {
        self.detector.clone()
    }
}
