// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flat request-failure envelope
//!
//! Every failure anywhere in the pipeline surfaces to the client the same
//! way: HTTP 500 with `{ "error": "<message>" }`. The internal error
//! taxonomy stays differentiated per component so handling can diverge
//! later without touching the components.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

/// Wire shape of a failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Convert any failure message into the flat 500 response
pub fn request_failure(message: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}
