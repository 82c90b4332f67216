//! HTTP transport: liveness and prediction routes

use crate::error::{ErrorKind, PipelineError};
use crate::metrics::ServiceMetrics;
use crate::pipeline::{log_rejection, PredictionPipeline};
use crate::types::response::{ErrorBody, HealthStatus, PredictionResult};
use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// The pipeline, or the load failure every prediction reports instead
    pipeline: Result<Arc<PredictionPipeline>, Arc<PipelineError>>,
    model_path: String,
    metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// State for a service whose model loaded successfully
    pub fn ready(pipeline: PredictionPipeline, metrics: Arc<ServiceMetrics>) -> Self {
        let model_path = pipeline.handle().path().display().to_string();
        Self {
            pipeline: Ok(Arc::new(pipeline)),
            model_path,
            metrics,
        }
    }

    /// State for a service started without a usable model
    pub fn unavailable(
        load_error: PipelineError,
        model_path: String,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            pipeline: Err(Arc::new(load_error)),
            model_path,
            metrics,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.pipeline.is_ok()
    }
}

/// Build the axum Router for the service
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C or SIGTERM
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, model_loaded = state.model_loaded(), "Listening for requests");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus::new(state.model_loaded(), state.model_path.clone()))
}

async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("predict", %request_id);
    let start = Instant::now();

    let outcome = run_prediction(&state, body).instrument(span.clone()).await;

    span.in_scope(|| match outcome {
        Ok(result) => {
            state.metrics.record_success(start.elapsed(), result.len());
            info!(
                rows = result.len(),
                latency_us = start.elapsed().as_micros() as u64,
                "Prediction served"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            let kind = err.kind();
            state.metrics.record_failure(start.elapsed(), kind);
            if kind.is_artifact_error() {
                warn!(kind = %kind, "Prediction requested but no model is loaded");
            }
            (status_for(kind), Json(ErrorBody::from(&*err))).into_response()
        }
    })
}

async fn run_prediction(
    state: &AppState,
    body: Bytes,
) -> Result<PredictionResult, Arc<PipelineError>> {
    let pipeline = state.pipeline.clone()?;

    let payload = parse_body(&body).map_err(Arc::new)?;

    // inference is CPU-bound; keep it off the async worker threads
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        pipeline.run(&payload)
    })
    .await
    .unwrap_or_else(|e| {
        error!(error = %e, "Prediction task failed");
        Err(PipelineError::Internal(anyhow::anyhow!(
            "prediction task failed: {}",
            e
        )))
    })
    .map_err(Arc::new)
}

fn parse_body(body: &[u8]) -> Result<Value, PipelineError> {
    serde_json::from_slice(body).map_err(|e| {
        let err = PipelineError::malformed(format!("request body is not valid JSON: {}", e));
        log_rejection(&err);
        err
    })
}

/// HTTP status for each error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MissingOrAmbiguousKey | ErrorKind::MalformedInput | ErrorKind::ShapeMismatch => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::ArtifactNotFound | ErrorKind::ArtifactInvalid => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::NOT_FOUND, Json(ErrorBody::message("route not found")))
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::message("method not allowed")),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
