//! Model handle, artifact loading and classifier backends

pub mod artifact;
pub mod forest;
pub mod handle;
pub mod linear;
pub mod loader;
pub mod onnx;

use crate::normalizer::FeatureMatrix;
use crate::types::label::ClassLabel;
use anyhow::Result;

pub use handle::ModelHandle;

/// Labels for every row, plus per-row probabilities when requested
pub type Classification = (Vec<ClassLabel>, Option<Vec<Vec<f64>>>);
pub use loader::{resolve_artifact_path, ModelLoader, DEFAULT_MODEL_PATH, MODEL_PATH_ENV};

/// Capability set of a loaded classification model.
///
/// Implementations are shared by every request thread and must be usable
/// through `&self` without external locking.
pub trait Classifier: Send + Sync {
    /// Short backend name for logs and diagnostics
    fn backend(&self) -> &'static str;

    /// Declared input width, if the artifact exposes one
    fn n_features(&self) -> Option<usize>;

    /// Whether `predict_probability` is available
    fn supports_probability(&self) -> bool;

    /// One label per input row
    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<ClassLabel>>;

    /// One probability vector per input row
    fn predict_probability(&self, _x: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        anyhow::bail!("{} model does not support probability output", self.backend())
    }

    /// Labels and, if `with_probability`, probabilities from one pass.
    ///
    /// Backends that produce both together should override this; the default
    /// runs `predict` and `predict_probability` separately.
    fn classify(&self, x: &FeatureMatrix, with_probability: bool) -> Result<Classification> {
        let labels = self.predict(x)?;
        let probabilities = if with_probability {
            Some(self.predict_probability(x)?)
        } else {
            None
        };
        Ok((labels, probabilities))
    }
}
