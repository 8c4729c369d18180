//! Floodsense backend: Feature extraction and forwarding.
//!
//! # Usage
//!
//! ```bash
//! PROJECT_ID=my-project AI_SERVICE_URL=http://localhost:8000/predict \
//! EE_ACCESS_TOKEN_FILE=/path/to/token cargo run --bin floodsense-backend
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use floodsense::config::BackendConfig;
use floodsense::telemetry::{self, LogSink};
use floodsense::{bootstrap, http};

fn main() -> Result<()> {
    let _guard = telemetry::init(&LogSink::from_env()).context("Failed to initialize logging")?;
    tracing::info!("Starting {}...", http::backend::SERVICE_NAME);

    let config = BackendConfig::from_env().context("Invalid backend configuration")?;
    tracing::info!(
        "Earth Engine project {}, forwarding to {}",
        config.earth_engine.project,
        config.ai_service_url
    );

    // Blocking HTTP clients are created and dropped outside the runtime.
    let bridge = Arc::new(
        bootstrap::prediction_bridge(&config).context("Failed to build prediction bridge")?,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime
        .block_on(http::serve(
            config.listen_addr,
            http::backend::router(Arc::clone(&bridge)),
        ))
        .context("Server error")?;
    drop(runtime);
    drop(bridge);

    tracing::info!("{} shutdown complete.", http::backend::SERVICE_NAME);
    Ok(())
}
