// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration from environment variables

use std::{env, path::PathBuf, time::Duration};

/// Default API port (matches the original service bind)
const DEFAULT_API_PORT: u16 = 5000;

/// Default bound on a single model inference call
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;

/// Node configuration, resolved once at startup.
///
/// Everything is environment-variable driven:
/// - `API_PORT`: HTTP listen port
/// - `POLICY_MODEL_PATH`: enhancement policy ONNX checkpoint
/// - `DETECTOR_MODEL_PATH`: object detector ONNX checkpoint
/// - `INFERENCE_TIMEOUT_SECS`: per-call inference bound
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP listen port
    pub api_port: u16,
    /// Path to the enhancement policy checkpoint
    pub policy_model_path: PathBuf,
    /// Path to the object detector checkpoint
    pub detector_model_path: PathBuf,
    /// Upper bound on a single model inference call
    pub inference_timeout: Duration,
}

impl NodeConfig {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_API_PORT);

        let policy_model_path = PathBuf::from(
            env::var("POLICY_MODEL_PATH")
                .unwrap_or_else(|_| "./models/enhancement-policy.onnx".to_string()),
        );

        let detector_model_path = PathBuf::from(
            env::var("DETECTOR_MODEL_PATH").unwrap_or_else(|_| "./models/detector.onnx".to_string()),
        );

        let inference_timeout = Duration::from_secs(
            env::var("INFERENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_INFERENCE_TIMEOUT_SECS),
        );

        Self {
            api_port,
            policy_model_path,
            detector_model_path,
            inference_timeout,
        }
    }
}
