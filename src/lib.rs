//! Classifier Serving Library
//!
//! Serves predictions from a pre-trained classification model over HTTP:
//! raw feature vectors are normalized, checked against the model's input
//! width, classified, and mapped to semantic class names.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod server;
pub mod types;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_env;

pub use config::AppConfig;
pub use error::{ErrorKind, PipelineError};
pub use models::{ModelHandle, ModelLoader};
pub use normalizer::FeatureMatrix;
pub use pipeline::PredictionPipeline;
pub use types::{label::ClassLabel, label::LabelMap, response::PredictionResult};
