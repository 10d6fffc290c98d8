// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod process_image;

pub use errors::ErrorBody;
pub use http_server::{build_router, start_server, AppState};
pub use process_image::{process_image_handler, ProcessImageRequest, ProcessImageResponse};
