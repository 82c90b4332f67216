//! Linear decision-function classifier (no probability output)

use crate::models::forest::argmax;
use crate::models::Classifier;
use crate::normalizer::FeatureMatrix;
use crate::types::label::ClassLabel;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// One-vs-rest linear classifier.
///
/// Binary models carry a single coefficient row; a positive decision value
/// selects `classes[1]`. Multiclass models carry one row per class and pick
/// the largest decision value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub classes: Vec<ClassLabel>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LinearModel {
    pub fn validate(&self) -> Result<()> {
        let n_classes = self.classes.len();
        if n_classes < 2 {
            bail!("linear model needs at least two classes");
        }
        let expected_rows = if n_classes == 2 { 1 } else { n_classes };
        if self.coef.len() != expected_rows {
            bail!(
                "expected {} coefficient rows for {} classes, got {}",
                expected_rows,
                n_classes,
                self.coef.len()
            );
        }
        if self.intercept.len() != self.coef.len() {
            bail!(
                "expected {} intercepts, got {}",
                self.coef.len(),
                self.intercept.len()
            );
        }
        let width = self.coef[0].len();
        if width == 0 {
            bail!("coefficient rows are empty");
        }
        if self.coef.iter().any(|row| row.len() != width) {
            bail!("coefficient rows have different lengths");
        }
        let finite = self
            .coef
            .iter()
            .flatten()
            .chain(&self.intercept)
            .all(|v| v.is_finite());
        if !finite {
            bail!("coefficients must be finite");
        }
        Ok(())
    }

    fn decision(&self, x: &FeatureMatrix) -> Vec<Vec<f64>> {
        x.rows()
            .into_iter()
            .map(|row| {
                self.coef
                    .iter()
                    .zip(&self.intercept)
                    .map(|(w, b)| row.iter().zip(w).map(|(xi, wi)| xi * wi).sum::<f64>() + b)
                    .collect()
            })
            .collect()
    }
}

impl Classifier for LinearModel {
    fn backend(&self) -> &'static str {
        "linear"
    }

    fn n_features(&self) -> Option<usize> {
        self.coef.first().map(Vec::len)
    }

    fn supports_probability(&self) -> bool {
        false
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<ClassLabel>> {
        if let Some(width) = self.n_features() {
            if x.ncols() != width {
                bail!("linear model expects {} features, got {}", width, x.ncols());
            }
        }
        self.decision(x)
            .iter()
            .map(|scores| {
                let idx = if self.classes.len() == 2 {
                    usize::from(scores[0] > 0.0)
                } else {
                    match argmax(scores) {
                        Some(i) => i,
                        None => bail!("empty decision row"),
                    }
                };
                Ok(self.classes[idx].clone())
            })
            .collect()
    }
}
