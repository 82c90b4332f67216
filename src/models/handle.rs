//! Immutable handle to a loaded model

use crate::error::PipelineError;
use crate::models::loader::ModelLoader;
use crate::models::{Classification, Classifier};
use crate::normalizer::FeatureMatrix;
use crate::types::label::ClassLabel;
use anyhow::Result;
use std::fmt;
use std::path::{Path, PathBuf};

/// A loaded model plus its declared input width and capability flags.
///
/// Built once at startup and shared read-only (`Arc<ModelHandle>`) by every
/// request; nothing mutates it after construction.
pub struct ModelHandle {
    path: PathBuf,
    model: Box<dyn Classifier>,
    expected_width: Option<usize>,
    probability: bool,
}

impl ModelHandle {
    /// Wrap a classifier, fixing its capabilities for the handle's lifetime
    pub fn new(path: impl Into<PathBuf>, model: Box<dyn Classifier>) -> Self {
        let expected_width = model.n_features();
        let probability = model.supports_probability();
        Self {
            path: path.into(),
            model,
            expected_width,
            probability,
        }
    }

    /// Load with default loader settings; see [`ModelLoader::load`]
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        ModelLoader::default().load(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> &'static str {
        self.model.backend()
    }

    /// Declared input dimensionality, `None` when the artifact does not expose it
    pub fn expected_width(&self) -> Option<usize> {
        self.expected_width
    }

    pub fn supports_probability(&self) -> bool {
        self.probability
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<ClassLabel>> {
        self.model.predict(x)
    }

    /// Per-row class probabilities, `None` when the model has no such capability
    pub fn predict_probability(&self, x: &FeatureMatrix) -> Result<Option<Vec<Vec<f64>>>> {
        if !self.probability {
            return Ok(None);
        }
        self.model.predict_probability(x).map(Some)
    }

    /// Labels plus probabilities (when supported) from a single model pass
    pub fn classify(&self, x: &FeatureMatrix) -> Result<Classification> {
        self.model.classify(x, self.probability)
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("path", &self.path)
            .field("backend", &self.model.backend())
            .field("expected_width", &self.expected_width)
            .field("probability", &self.probability)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forest::tests::stump_forest;
    use crate::models::linear::LinearModel;
    use ndarray::array;

    #[test]
    fn test_capabilities_fixed_at_construction() {
        let handle = ModelHandle::new("forest.json", Box::new(stump_forest()));
        assert_eq!(handle.expected_width(), Some(3));
        assert!(handle.supports_probability());

        let x = array![[0.0, 0.0, 0.0]];
        let p = handle.predict_probability(&x).unwrap();
        assert_eq!(p.map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_probability_absent_without_capability() {
        let linear = LinearModel {
            classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
        };
        let handle = ModelHandle::new("linear.json", Box::new(linear));
        assert!(!handle.supports_probability());
        assert_eq!(handle.predict_probability(&array![[1.0]]).unwrap(), None);
    }

    #[test]
    fn test_classify_respects_capability_flag() {
        let forest = ModelHandle::new("forest.json", Box::new(stump_forest()));
        let (labels, probabilities) = forest.classify(&array![[0.0, 0.0, 0.0]]).unwrap();
        assert_eq!(labels, vec![ClassLabel::Int(0)]);
        assert_eq!(probabilities.map(|p| p.len()), Some(1));

        let linear = LinearModel {
            classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
        };
        let linear = ModelHandle::new("linear.json", Box::new(linear));
        let (labels, probabilities) = linear.classify(&array![[2.0]]).unwrap();
        assert_eq!(labels, vec![ClassLabel::Int(1)]);
        assert!(probabilities.is_none());
    }

    #[test]
    fn test_load_with_default_loader_settings() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{"kind": "linear", "classes": [0, 1], "coef": [[1.0, -1.0]], "intercept": [0.0]}"#,
        )
        .unwrap();

        let handle = ModelHandle::load(Some(file.path())).unwrap();
        assert_eq!(handle.path(), file.path());
        assert_eq!(handle.expected_width(), Some(2));

        let err = ModelHandle::load(Some(Path::new("/nonexistent/model.json"))).unwrap_err();
        assert!(matches!(err, PipelineError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_handle_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelHandle>();
    }
}
