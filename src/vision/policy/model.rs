// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pretrained enhancement policy model
//!
//! Wraps the reinforcement-learning policy checkpoint behind a narrow
//! capability interface so the backend can be swapped or mocked without
//! touching the pipeline.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use super::preprocessing::POLICY_INPUT_SIZE;

/// The action chosen by the policy for one preprocessed input.
///
/// Downstream only consumes the fact that an action was produced; the
/// index is logged but does not yet parametrize the color transform.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAction {
    /// Index of the highest-scoring entry in the action head
    pub index: usize,
    /// Raw score of that entry
    pub score: f32,
}

/// Policy inference failures
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy input shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("policy inference failed: {0}")]
    Inference(String),

    #[error("policy inference timed out after {0:?}")]
    Timeout(Duration),
}

/// Capability interface for the enhancement policy
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnhancementPolicy: Send + Sync {
    /// Run the policy once, synchronously with respect to the caller, in
    /// inference-only mode. A failure is reported, never retried: the
    /// input shape is guaranteed by the preprocessor, so an error here
    /// means a corrupt or incompatible model artifact.
    async fn predict(&self, tensor: &Array4<f32>) -> Result<PolicyAction, PolicyError>;
}

/// ONNX-backed enhancement policy
///
/// The session is loaded once at startup and shared read-only across all
/// requests. Access is serialized through a mutex; the run itself happens
/// on the blocking pool, bounded by the configured timeout.
#[derive(Clone)]
pub struct OnnxPolicyModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Upper bound on a single predict call
    timeout: Duration,
}

impl std::fmt::Debug for OnnxPolicyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxPolicyModel")
            .field("input_name", &self.input_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OnnxPolicyModel {
    /// Load the policy checkpoint from a file
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
            anyhow::bail!("policy model not found: {}", model_path.display());
        }

        info!("Loading enhancement policy from {}", model_path.display());

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
                "Failed to load policy model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        debug!("Policy model loaded - input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            timeout,
        })
    }
}

#[async_trait]
impl EnhancementPolicy for OnnxPolicyModel {
    async fn predict(&self, tensor: &Array4<f32>) -> Result<PolicyAction, PolicyError> {
        let size = POLICY_INPUT_SIZE as usize;
        let expected = vec![1, 3, size, size];
        if tensor.shape() != expected.as_slice() {
            return Err(PolicyError::ShapeMismatch {
                expected,
                actual: tensor.shape().to_vec(),
            });
        }

        let session = Arc::clone(&self.session);
        let input_name = self.input_name.clone();
        let input = tensor.to_owned();

        // Inference is CPU-bound; run it on the blocking pool so async
        // workers stay free, and bound it so a wedged backend cannot hold
        // the request forever.
        let task = tokio::task::spawn_blocking(move || -> Result<Vec<f32>, PolicyError> {
            let mut session = session
                .lock()
                .map_err(|_| PolicyError::Inference("session lock poisoned".to_string()))?;

            let value = Value::from_array(input)
                .map_err(|e| PolicyError::Inference(e.to_string()))?;

            let outputs = session
                .run(ort::inputs![&input_name => value])
                .map_err(|e| PolicyError::Inference(e.to_string()))?;

            let logits = outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| PolicyError::Inference(e.to_string()))?;

            Ok(logits.iter().copied().collect())
        });

        let joined = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| PolicyError::Timeout(self.timeout))?;
        let logits = joined
            .map_err(|e| PolicyError::Inference(format!("inference task failed: {}", e)))??;

        if logits.is_empty() {
            return Err(PolicyError::Inference(
                "policy returned an empty action head".to_string(),
            ));
        }

        let (index, score) = logits
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |(bi, bs), (i, s)| {
                if s > bs {
                    (i, s)
                } else {
                    (bi, bs)
                }
            });

        debug!("Policy selected action {} (score {:.4})", index, score);

        Ok(PolicyAction { index, score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_MODEL_PATH: &str = "/workspace/models/enhancement-policy.onnx";

    #[tokio::test]
    async fn test_model_not_found_error() {
        let result =
            OnnxPolicyModel::new("/nonexistent/policy.onnx", Duration::from_secs(5)).await;
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_policy_action_fields() {
        let action = PolicyAction {
            index: 4,
            score: 0.91,
        };
        assert_eq!(action.index, 4);
        assert!((action.score - 0.91).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_mock_policy_predict() {
        let mut policy = MockEnhancementPolicy::new();
        policy
            .expect_predict()
            .returning(|_| Ok(PolicyAction { index: 2, score: 0.5 }));

        let tensor = Array4::zeros((1, 3, 224, 224));
        let action = policy.predict(&tensor).await.unwrap();
        assert_eq!(action.index, 2);
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_model_loading() {
        let model = OnnxPolicyModel::new(POLICY_MODEL_PATH, Duration::from_secs(30)).await;

        if let Ok(model) = model {
            assert!(!model.input_name.is_empty());
        }
        // If model files don't exist, test is skipped
    }

    #[tokio::test]
    #[ignore] // Only run if model files are downloaded
    async fn test_predict_rejects_wrong_shape() {
        let model = match OnnxPolicyModel::new(POLICY_MODEL_PATH, Duration::from_secs(30)).await {
            Ok(m) => m,
            Err(_) => return, // Skip if model not available
        };

        let wrong = Array4::zeros((1, 3, 64, 64));
        let result = model.predict(&wrong).await;
        assert!(matches!(
            result.unwrap_err(),
            PolicyError::ShapeMismatch { .. }
        ));
    }
}
