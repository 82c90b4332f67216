//! Response payloads returned by the service

use crate::error::PipelineError;
use crate::types::label::ClassLabel;
use serde::{Deserialize, Serialize};

/// Outcome of one prediction request, aligned 1:1 with the input rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Raw labels predicted by the model
    pub predictions: Vec<ClassLabel>,

    /// Semantic class names for each label
    pub classes: Vec<String>,

    /// Per-row class probabilities, only when the model supports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<Vec<Vec<f64>>>,
}

impl PredictionResult {
    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// Liveness report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    pub model_path: String,
    pub version: String,
}

impl HealthStatus {
    pub fn new(model_loaded: bool, model_path: String) -> Self {
        Self {
            status: if model_loaded { "ok" } else { "degraded" }.to_string(),
            model_loaded,
            model_path,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of every failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorBody {
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: None,
        }
    }
}

impl From<&PipelineError> for ErrorBody {
    fn from(err: &PipelineError) -> Self {
        Self {
            error: err.to_string(),
            kind: Some(err.kind().as_str().to_string()),
        }
    }
}
