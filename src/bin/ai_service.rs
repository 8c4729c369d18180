//! Floodsense AI service: Pipeline inference over HTTP.
//!
//! Loads the model bundle from `MODEL_PATH`, downloading it from `MODEL_URL`
//! first if absent. The process does not start without a bundle.

use std::sync::Arc;

use anyhow::{Context, Result};

use floodsense::config::InferenceConfig;
use floodsense::telemetry::{self, LogSink};
use floodsense::{bootstrap, http};

fn main() -> Result<()> {
    let _guard = telemetry::init(&LogSink::from_env()).context("Failed to initialize logging")?;
    tracing::info!("Starting {}...", http::ai::SERVICE_NAME);

    let config = InferenceConfig::from_env().context("Invalid inference configuration")?;
    let service = Arc::new(
        bootstrap::inference_service(&config).context("Failed to load model bundle")?,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime
        .block_on(http::serve(config.listen_addr, http::ai::router(service)))
        .context("Server error")?;

    tracing::info!("{} shutdown complete.", http::ai::SERVICE_NAME);
    Ok(())
}
