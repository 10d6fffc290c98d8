// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-image response types

use serde::{Deserialize, Serialize};

/// Successful pipeline response: both images base64-encoded in the same
/// container format the request arrived in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageResponse {
    /// Original image with detection overlays
    pub original_image_enc: String,
    /// Enhanced image with detection overlays
    pub enhanced_image_enc: String,
}
