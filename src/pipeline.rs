//! Inference request pipeline
//!
//! `select key -> normalize -> validate width -> predict -> map labels -> attach probabilities`

use crate::error::PipelineError;
use crate::models::ModelHandle;
use crate::normalizer::{normalize, FeatureMatrix};
use crate::types::label::LabelMap;
use crate::types::response::PredictionResult;
use crate::validator::validate_width;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Request key holding one instance
pub const SINGLE_KEY: &str = "features";

/// Request key holding a batch of instances
pub const BATCH_KEY: &str = "instances";

/// Stateless prediction pipeline over a shared model handle
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    handle: Arc<ModelHandle>,
    labels: LabelMap,
}

impl PredictionPipeline {
    pub fn new(handle: Arc<ModelHandle>, labels: LabelMap) -> Self {
        Self { handle, labels }
    }

    pub fn handle(&self) -> &ModelHandle {
        &self.handle
    }

    /// Run the full pipeline on a request payload
    pub fn run(&self, payload: &Value) -> Result<PredictionResult, PipelineError> {
        let result = select_input(payload)
            .and_then(normalize)
            .and_then(|x| self.predict_matrix(&x));

        if let Err(err) = &result {
            log_rejection(err);
        }
        result
    }

    /// Validate an already normalized matrix and predict on it
    pub fn predict_matrix(&self, x: &FeatureMatrix) -> Result<PredictionResult, PipelineError> {
        validate_width(x, self.handle.expected_width())?;

        let rows = x.nrows();
        let (predictions, probabilities) = self.handle.classify(x).map_err(internal)?;
        if predictions.len() != rows {
            return Err(internal(anyhow::anyhow!(
                "model returned {} labels for {} rows",
                predictions.len(),
                rows
            )));
        }
        if let Some(p) = &probabilities {
            if p.len() != rows {
                return Err(internal(anyhow::anyhow!(
                    "model returned {} probability rows for {} rows",
                    p.len(),
                    rows
                )));
            }
        }

        let classes = self.labels.names_of(&predictions);
        debug!(
            rows,
            probabilities = probabilities.is_some(),
            "Prediction complete"
        );

        Ok(PredictionResult {
            predictions,
            classes,
            probabilities,
        })
    }
}

/// Pick the input under exactly one of the accepted keys
pub fn select_input(payload: &Value) -> Result<&Value, PipelineError> {
    let object = payload.as_object().ok_or_else(|| {
        PipelineError::MissingOrAmbiguousKey(format!(
            "request body must be a JSON object with '{}' or '{}'",
            SINGLE_KEY, BATCH_KEY
        ))
    })?;

    match (object.get(SINGLE_KEY), object.get(BATCH_KEY)) {
        (Some(single), None) => Ok(single),
        (None, Some(batch)) => Ok(batch),
        (Some(_), Some(_)) => Err(PipelineError::MissingOrAmbiguousKey(format!(
            "provide either '{}' or '{}', not both",
            SINGLE_KEY, BATCH_KEY
        ))),
        (None, None) => Err(PipelineError::MissingOrAmbiguousKey(format!(
            "provide '{}' or '{}'",
            SINGLE_KEY, BATCH_KEY
        ))),
    }
}

/// Log a caller-caused failure; other kinds are logged where they occur
pub fn log_rejection(err: &PipelineError) {
    if err.kind().is_client_error() {
        warn!(kind = %err.kind(), error = %err, "Rejected prediction request");
    }
}

fn internal(err: anyhow::Error) -> PipelineError {
    error!(error = ?err, "Model inference failed");
    PipelineError::Internal(err)
}
