//! Error taxonomy for the prediction pipeline

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds surfaced by the pipeline and the model loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ArtifactNotFound,
    ArtifactInvalid,
    MissingOrAmbiguousKey,
    MalformedInput,
    ShapeMismatch,
    InternalFailure,
}

impl ErrorKind {
    /// Every kind, in table order
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::ArtifactNotFound,
        ErrorKind::ArtifactInvalid,
        ErrorKind::MissingOrAmbiguousKey,
        ErrorKind::MalformedInput,
        ErrorKind::ShapeMismatch,
        ErrorKind::InternalFailure,
    ];

    /// Snake-case name used in response bodies and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ArtifactNotFound => "artifact_not_found",
            ErrorKind::ArtifactInvalid => "artifact_invalid",
            ErrorKind::MissingOrAmbiguousKey => "missing_or_ambiguous_key",
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::ShapeMismatch => "shape_mismatch",
            ErrorKind::InternalFailure => "internal_failure",
        }
    }

    /// Whether the caller caused the failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::MissingOrAmbiguousKey | ErrorKind::MalformedInput | ErrorKind::ShapeMismatch
        )
    }

    /// Whether the failure comes from the model artifact being unavailable
    pub fn is_artifact_error(&self) -> bool {
        matches!(self, ErrorKind::ArtifactNotFound | ErrorKind::ArtifactInvalid)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every pipeline stage.
///
/// `Internal` keeps the underlying cause for logging, but its `Display`
/// output is deliberately generic so it can be handed to callers as-is.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("model artifact not found at {}", .path.display())]
    ArtifactNotFound { path: PathBuf },

    #[error("model artifact at {} is invalid: {reason}", .path.display())]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("{0}")]
    MissingOrAmbiguousKey(String),

    #[error("{0}")]
    MalformedInput(String),

    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("internal server error")]
    Internal(#[source] anyhow::Error),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::ArtifactNotFound { .. } => ErrorKind::ArtifactNotFound,
            PipelineError::ArtifactInvalid { .. } => ErrorKind::ArtifactInvalid,
            PipelineError::MissingOrAmbiguousKey(_) => ErrorKind::MissingOrAmbiguousKey,
            PipelineError::MalformedInput(_) => ErrorKind::MalformedInput,
            PipelineError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            PipelineError::Internal(_) => ErrorKind::InternalFailure,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        PipelineError::MalformedInput(message.into())
    }

    pub fn invalid_artifact(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        PipelineError::ArtifactInvalid {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_states_both_counts() {
        let err = PipelineError::ShapeMismatch {
            expected: 30,
            actual: 2,
        };
        let message = err.to_string();
        assert!(message.contains("30"));
        assert!(message.contains('2'));
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_internal_failure_hides_detail() {
        let err = PipelineError::Internal(anyhow::anyhow!("tensor buffer at 0xdeadbeef"));
        assert_eq!(err.to_string(), "internal server error");
        assert!(!err.kind().is_client_error());
    }

    #[test]
    fn test_client_error_classification() {
        let client: Vec<_> = ErrorKind::ALL
            .iter()
            .filter(|k| k.is_client_error())
            .collect();
        assert_eq!(client.len(), 3);
        assert!(ErrorKind::ArtifactNotFound.is_artifact_error());
        assert!(!ErrorKind::ShapeMismatch.is_artifact_error());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::MissingOrAmbiguousKey).unwrap();
        assert_eq!(json, "\"missing_or_ambiguous_key\"");
        assert_eq!(ErrorKind::MissingOrAmbiguousKey.as_str(), "missing_or_ambiguous_key");
    }
}
