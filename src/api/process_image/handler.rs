// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-image endpoint handler

use axum::{extract::State, http::StatusCode, Json};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::ProcessImageRequest;
use super::response::ProcessImageResponse;
use crate::api::errors::{request_failure, ErrorBody};
use crate::api::http_server::AppState;
use crate::vision::{decode_base64_image, encode_base64_image};

/// POST /process-image - Enhance an image and annotate detections
///
/// Accepts a base64-encoded image, runs the enhancement pipeline and
/// returns both the original and the enhanced image with detection
/// overlays, base64-encoded in the same container format as the input.
///
/// # Request
/// - `imageData`: Base64-encoded image (required)
///
/// # Response
/// - `originalImageEnc`: original image with overlays
/// - `enhancedImageEnc`: enhanced image with overlays
///
/// # Errors
/// Any failure anywhere in the pipeline yields HTTP 500 with
/// `{ "error": "<message>" }`.
pub async fn process_image_handler(
    State(state): State<AppState>,
    Json(request): Json<ProcessImageRequest>,
) -> Result<Json<ProcessImageResponse>, (StatusCode, Json<ErrorBody>)> {
    let started = Instant::now();

    // 1. Validate request
    let image_data = request.validate().map_err(|e| {
        warn!("process-image request rejected: {}", e);
        request_failure(e)
    })?;

    // 2. Decode base64 image, remembering its container format
    let (image, info) = decode_base64_image(image_data).map_err(|e| {
        warn!("Failed to decode request image: {}", e);
        request_failure(format!("failed to decode image: {}", e))
    })?;

    debug!(
        "Decoded image: {}x{}, {} bytes ({:?})",
        info.width, info.height, info.size_bytes, info.format
    );

    // 3. Run the enhancement-and-detection pipeline
    let result = state.pipeline.run(&image).await.map_err(|e| {
        warn!("Pipeline failed: {}", e);
        request_failure(e.to_string())
    })?;

    // 4. Re-encode both outputs with the original container format
    let original_image_enc = encode_base64_image(&result.original, info.format).map_err(|e| {
        warn!("Failed to encode original image: {}", e);
        request_failure(format!("failed to encode image: {}", e))
    })?;
    let enhanced_image_enc = encode_base64_image(&result.enhanced, info.format).map_err(|e| {
        warn!("Failed to encode enhanced image: {}", e);
        request_failure(format!("failed to encode image: {}", e))
    })?;

    info!(
        "Processed {}x{} image in {}ms",
        info.width,
        info.height,
        started.elapsed().as_millis()
    );

    Ok(Json(ProcessImageResponse {
        original_image_enc,
        enhanced_image_enc,
    }))
}
