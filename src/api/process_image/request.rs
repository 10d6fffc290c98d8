// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-image request types and validation

use serde::{Deserialize, Serialize};

/// Request for the enhancement-and-detection pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageRequest {
    /// Base64-encoded image data
    #[serde(default)]
    pub image_data: Option<String>,
}

impl ProcessImageRequest {
    /// Validate the request and hand back the payload.
    ///
    /// The wire contract reports a missing payload through the same flat
    /// failure envelope as every other error, so this returns a message
    /// rather than a distinct error kind.
    pub fn validate(&self) -> Result<&str, &'static str> {
        match self.image_data.as_deref() {
            Some(data) if !data.is_empty() => Ok(data),
            _ => Err("imageData is required"),
        }
    }
}
