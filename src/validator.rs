//! Dimensional compatibility check between an input matrix and the model

use crate::error::PipelineError;
use crate::normalizer::FeatureMatrix;

/// Check the matrix width against the model's expected feature count.
///
/// An unknown expected width accepts whatever the input provides.
pub fn validate_width(x: &FeatureMatrix, expected: Option<usize>) -> Result<(), PipelineError> {
    let actual = x.ncols();
    match expected {
        Some(expected) if expected != actual => {
            Err(PipelineError::ShapeMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}
