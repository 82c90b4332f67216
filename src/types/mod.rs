//! Type definitions for the prediction service

pub mod label;
pub mod response;

pub use label::{ClassLabel, LabelMap};
pub use response::{ErrorBody, HealthStatus, PredictionResult};
