//! Native JSON model artifacts

use crate::models::forest::RandomForest;
use crate::models::linear::LinearModel;
use crate::models::Classifier;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A model serialized as JSON, tagged by `"kind"`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NativeArtifact {
    Forest(RandomForest),
    Linear(LinearModel),
}

impl NativeArtifact {
    /// Parse and structurally validate an artifact
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let artifact: NativeArtifact =
            serde_json::from_slice(bytes).context("Failed to parse model artifact")?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            NativeArtifact::Forest(forest) => forest.validate(),
            NativeArtifact::Linear(linear) => linear.validate(),
        }
    }

    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            NativeArtifact::Forest(forest) => Box::new(forest),
            NativeArtifact::Linear(linear) => Box::new(linear),
        }
    }
}
