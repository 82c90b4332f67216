//! Model artifact resolution and loading

use crate::error::PipelineError;
use crate::models::artifact::NativeArtifact;
use crate::models::handle::ModelHandle;
use crate::models::onnx::OnnxClassifier;
use crate::models::Classifier;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Environment variable consulted when no explicit path is given
pub const MODEL_PATH_ENV: &str = "MODEL_PATH";

/// Artifact path used when neither an argument nor the environment names one
pub const DEFAULT_MODEL_PATH: &str = "model.onnx";

/// Resolve the artifact path: explicit argument, then `MODEL_PATH`, then the default.
pub fn resolve_artifact_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var(MODEL_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_MODEL_PATH),
    }
}

/// Loader for model artifacts
#[derive(Debug, Clone)]
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Resolve `explicit` and load the artifact it names
    pub fn load(&self, explicit: Option<&Path>) -> Result<ModelHandle, PipelineError> {
        let path = resolve_artifact_path(explicit);
        self.load_from_path(&path)
    }

    /// Load the artifact at `path`, picking the backend by file extension
    pub fn load_from_path(&self, path: &Path) -> Result<ModelHandle, PipelineError> {
        if !path.is_file() {
            error!(path = %path.display(), "Model artifact not found");
            return Err(PipelineError::ArtifactNotFound {
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let classifier: Box<dyn Classifier> = match extension.as_deref() {
            Some("onnx") => OnnxClassifier::load(path, self.onnx_threads)
                .map(|m| Box::new(m) as Box<dyn Classifier>)
                .map_err(|e| invalid(path, format!("{:#}", e)))?,
            Some("json") => {
                let bytes = std::fs::read(path).map_err(|e| invalid(path, e))?;
                NativeArtifact::from_slice(&bytes)
                    .map_err(|e| invalid(path, format!("{:#}", e)))?
                    .into_classifier()
            }
            _ => {
                return Err(invalid(
                    path,
                    "unsupported artifact format (expected .onnx or .json)",
                ))
            }
        };

        let handle = ModelHandle::new(path, classifier);
        info!(
            path = %path.display(),
            backend = handle.backend(),
            expected_width = ?handle.expected_width(),
            probability = handle.supports_probability(),
            "Model loaded"
        );
        Ok(handle)
    }
}

fn invalid(path: &Path, reason: impl std::fmt::Display) -> PipelineError {
    let err = PipelineError::invalid_artifact(path, reason);
    error!(error = %err, "Model artifact is invalid");
    err
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_env::{lock_env, EnvVarGuard};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn artifact_file(suffix: &str, contents: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_explicit_path_wins() {
        let _env = lock_env();
        let _model = EnvVarGuard::set(MODEL_PATH_ENV, "/from/env/model.onnx");
        let path = resolve_artifact_path(Some(Path::new("custom/model.json")));
        assert_eq!(path, PathBuf::from("custom/model.json"));
    }

    #[test]
    fn test_environment_path_used_without_argument() {
        let _env = lock_env();
        let _model = EnvVarGuard::set(MODEL_PATH_ENV, "/from/env/model.json");
        assert_eq!(
            resolve_artifact_path(None),
            PathBuf::from("/from/env/model.json")
        );
    }

    #[test]
    fn test_default_path_when_nothing_configured() {
        let _env = lock_env();
        let _model = EnvVarGuard::unset(MODEL_PATH_ENV);
        assert_eq!(resolve_artifact_path(None), PathBuf::from(DEFAULT_MODEL_PATH));

        let _blank = EnvVarGuard::set(MODEL_PATH_ENV, " ");
        assert_eq!(resolve_artifact_path(None), PathBuf::from("model.onnx"));
    }

    #[test]
    fn test_load_follows_environment_path() {
        let _env = lock_env();
        let file = artifact_file(
            ".json",
            br#"{"kind": "linear", "classes": [0, 1], "coef": [[1.0, 1.0]], "intercept": [0.0]}"#,
        );
        let _model = EnvVarGuard::set(MODEL_PATH_ENV, file.path().to_str().unwrap());

        let handle = ModelLoader::new().load(None).unwrap();
        assert_eq!(handle.path(), file.path());
        assert_eq!(handle.expected_width(), Some(2));
    }

    #[test]
    fn test_missing_artifact_is_not_found() {
        let err = ModelLoader::new()
            .load(Some(Path::new("/nonexistent/model.onnx")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactNotFound);
        assert!(err.to_string().contains("/nonexistent/model.onnx"));
    }

    #[test]
    fn test_corrupt_json_artifact_is_invalid() {
        let file = artifact_file(".json", b"{ not a model");
        let err = ModelLoader::new().load_from_path(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactInvalid);
    }

    #[test]
    fn test_corrupt_onnx_artifact_is_invalid() {
        let file = artifact_file(".onnx", b"test model data");
        let err = ModelLoader::new().load_from_path(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactInvalid);
    }

    #[test]
    fn test_unknown_extension_is_invalid() {
        let file = artifact_file(".joblib", b"\x80\x04");
        let err = ModelLoader::new().load_from_path(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArtifactInvalid);
    }

    #[test]
    fn test_loads_json_artifact() {
        let file = artifact_file(
            ".json",
            br#"{"kind": "linear", "classes": [0, 1], "coef": [[1.0, 1.0, 1.0]], "intercept": [-1.0]}"#,
        );
        let handle = ModelLoader::new().load_from_path(file.path()).unwrap();
        assert_eq!(handle.expected_width(), Some(3));
        assert_eq!(handle.backend(), "linear");
        assert_eq!(handle.path(), file.path());
    }
}
