// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use enhance_node::{
    api::start_server, config::NodeConfig, pipeline::EnhancePipeline, version,
    vision::VisionModelManager,
};
use std::{env, sync::Arc};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting {}", version::get_version_string());

    let config = NodeConfig::from_env();
    info!(
        "Config: port {}, policy {}, detector {}, inference timeout {:?}",
        config.api_port,
        config.policy_model_path.display(),
        config.detector_model_path.display(),
        config.inference_timeout
    );

    // Load both pretrained models up front; a corrupt or missing artifact
    // aborts startup here instead of failing every request later.
    let models = VisionModelManager::new(&config).await?;

    let pipeline = Arc::new(EnhancePipeline::new(models.policy(), models.detector()));

    start_server(config.api_port, pipeline).await
}
