//! ONNX Runtime classifier backend
//!
//! Expects the layout produced by common classifier exporters: the first
//! output holds int64 labels, an optional second output holds class
//! probabilities either as a `[rows, classes]` float tensor or as a
//! `seq(map(int64, float))` (ZipMap).

use crate::models::{Classification, Classifier};
use crate::normalizer::FeatureMatrix;
use crate::types::label::ClassLabel;
use anyhow::{anyhow, bail, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor, ValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    /// Running a session needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    probability_output: Option<String>,
    n_features: Option<usize>,
}

impl OnnxClassifier {
    /// Load an ONNX model from file
    pub fn load(path: &Path, onnx_threads: usize) -> Result<Self> {
        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        let input = session
            .inputs
            .first()
            .context("model declares no inputs")?;
        let input_name = input.name.clone();
        let n_features = match &input.input_type {
            ValueType::Tensor { shape, .. } => declared_width(shape),
            _ => None,
        };

        let label_output = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .context("model declares no outputs")?;
        let probability_output = session.outputs.get(1).map(|o| o.name.clone());

        info!(
            input = %input_name,
            labels = %label_output,
            probabilities = ?probability_output,
            n_features = ?n_features,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
            n_features,
        })
    }

    /// Run the session on `x` and hand the outputs to `extract`
    fn run<T>(
        &self,
        x: &FeatureMatrix,
        extract: impl FnOnce(&SessionOutputs) -> Result<T>,
    ) -> Result<T> {
        let shape = vec![x.nrows() as i64, x.ncols() as i64];
        let data: Vec<f32> = x.iter().map(|&v| v as f32).collect();
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;
        extract(&outputs)
    }
}

impl OnnxClassifier {
    fn labels_from(&self, outputs: &SessionOutputs) -> Result<Vec<ClassLabel>> {
        let output = outputs
            .get(self.label_output.as_str())
            .with_context(|| format!("missing output {}", self.label_output))?;
        let (_, data) = output
            .try_extract_tensor::<i64>()
            .context("label output is not an int64 tensor")?;
        Ok(data.iter().map(|&label| ClassLabel::Int(label)).collect())
    }

    fn probabilities_from(&self, outputs: &SessionOutputs, rows: usize) -> Result<Vec<Vec<f64>>> {
        let name = self
            .probability_output
            .as_deref()
            .context("model has no probability output")?;
        let output = outputs
            .get(name)
            .with_context(|| format!("missing output {}", name))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            debug!(dims = ?dims, "Extracting probabilities from tensor");
            return probabilities_from_tensor(&dims, data, rows);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            let allocator = Allocator::default();
            let sequence = output
                .downcast_ref::<DynSequenceValueType>()
                .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;
            let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
            debug!(rows = maps.len(), "Extracting probabilities from seq(map)");

            let mut probabilities = Vec::with_capacity(maps.len());
            for map in maps.iter() {
                let pairs = map.try_extract_key_values::<i64, f32>()?;
                probabilities.push(row_from_class_map(pairs));
            }
            return Ok(probabilities);
        }

        bail!("unsupported probability output type for {}", name)
    }
}

impl Classifier for OnnxClassifier {
    fn backend(&self) -> &'static str {
        "onnx"
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn supports_probability(&self) -> bool {
        self.probability_output.is_some()
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<ClassLabel>> {
        self.run(x, |outputs| self.labels_from(outputs))
    }

    fn predict_probability(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        self.run(x, |outputs| self.probabilities_from(outputs, x.nrows()))
    }

    // one session run serves both outputs
    fn classify(&self, x: &FeatureMatrix, with_probability: bool) -> Result<Classification> {
        self.run(x, |outputs| {
            let labels = self.labels_from(outputs)?;
            let probabilities = if with_probability {
                Some(self.probabilities_from(outputs, x.nrows())?)
            } else {
                None
            };
            Ok((labels, probabilities))
        })
    }
}

/// Positive static last dimension of an input shape; -1 marks a dynamic axis
fn declared_width(shape: &[i64]) -> Option<usize> {
    if shape.len() < 2 {
        return None;
    }
    shape
        .last()
        .copied()
        .filter(|&d| d > 0)
        .map(|d| d as usize)
}

/// Split a flat probability tensor into one vector per input row
fn probabilities_from_tensor(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<Vec<f64>>> {
    let n_classes = match dims {
        [r, c] if *r as usize == rows && *c > 0 => *c as usize,
        [c] if rows == 1 && *c > 0 => *c as usize,
        _ => bail!("unexpected probability shape {:?} for {} rows", dims, rows),
    };
    if data.len() != rows * n_classes {
        bail!(
            "probability tensor holds {} values, expected {}",
            data.len(),
            rows * n_classes
        );
    }
    Ok(data
        .chunks(n_classes)
        .map(|chunk| chunk.iter().map(|&p| p as f64).collect())
        .collect())
}

/// Order a `{class id: probability}` map by class id
fn row_from_class_map(mut pairs: Vec<(i64, f32)>) -> Vec<f64> {
    pairs.sort_by_key(|(class_id, _)| *class_id);
    pairs.into_iter().map(|(_, p)| p as f64).collect()
}
