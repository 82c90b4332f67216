//! Classifier Serving - Main Entry Point
//!
//! Loads the model artifact once, then serves liveness and prediction
//! requests over HTTP until shutdown.

use anyhow::Result;
use classifier_serving::{
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{resolve_artifact_path, ModelLoader},
    pipeline::PredictionPipeline,
    server::{self, AppState},
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting classifier service");
    info!(
        host = %config.server.host,
        port = config.server.port,
        log_level = %config.logging.level,
        "Configuration loaded successfully"
    );

    let addr = config.server.bind_addr()?;
    let metrics = Arc::new(ServiceMetrics::new());

    // Load the model once; it is shared read-only by every request
    let model_path = resolve_artifact_path(config.model.path.as_deref());
    let loader = ModelLoader::with_threads(config.model.onnx_threads);
    let state = match loader.load_from_path(&model_path) {
        Ok(handle) => {
            let pipeline = PredictionPipeline::new(Arc::new(handle), config.label_map());
            AppState::ready(pipeline, metrics.clone())
        }
        Err(e) if !config.model.require_on_startup => {
            warn!(
                error = %e,
                "Model unavailable; serving liveness only until restart"
            );
            AppState::unavailable(e, model_path.display().to_string(), metrics.clone())
        }
        Err(e) => {
            error!(error = %e, "Model could not be loaded");
            return Err(e.into());
        }
    };

    // Start metrics reporter
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    server::serve(addr, state).await?;

    // Print final summary
    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
    Ok(())
}
