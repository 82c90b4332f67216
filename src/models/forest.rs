//! Random forest classifier stored as a native JSON artifact

use crate::models::{Classification, Classifier};
use crate::normalizer::FeatureMatrix;
use crate::types::label::ClassLabel;
use anyhow::{bail, Context, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// A tree node: either a binary split or a leaf with per-class weights.
///
/// Splits send `x[feature] <= threshold` to `left`, everything else to `right`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// A decision tree as a flat node array rooted at index 0
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn leaf_for(&self, row: ArrayView1<f64>) -> Result<&[f64]> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return Ok(value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).with_context(|| {
                        format!(
                            "split on feature {} but the input has {} features",
                            feature,
                            row.len()
                        )
                    })?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                None => bail!("node index {} out of range", idx),
            }
        }
    }

    fn validate(&self, n_classes: usize, n_features: Option<usize>) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("tree has no nodes");
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // children must point forward so every walk terminates
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            bail!("node {} has invalid child index {}", i, child);
                        }
                    }
                    if !threshold.is_finite() {
                        bail!("node {} has a non-finite threshold", i);
                    }
                    if let Some(n) = n_features {
                        if *feature >= n {
                            bail!("node {} splits on feature {} of {}", i, feature, n);
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != n_classes {
                        bail!(
                            "leaf {} has {} class weights, expected {}",
                            i,
                            value.len(),
                            n_classes
                        );
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        bail!("leaf {} has negative or non-finite weights", i);
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        bail!("leaf {} has zero total weight", i);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Ensemble of decision trees voting with averaged leaf distributions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<ClassLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    /// Check the structure once at load time
    pub fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            bail!("forest needs at least two classes");
        }
        if self.trees.is_empty() {
            bail!("forest has no trees");
        }
        if self.n_features == Some(0) {
            bail!("n_features must be at least 1");
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(self.classes.len(), self.n_features)
                .with_context(|| format!("tree {}", t))?;
        }
        Ok(())
    }

    fn row_probability(&self, row: ArrayView1<f64>) -> Result<Vec<f64>> {
        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf_for(row)?;
            let total: f64 = leaf.iter().sum();
            for (a, w) in acc.iter_mut().zip(leaf) {
                *a += w / total;
            }
        }
        let n_trees = self.trees.len() as f64;
        Ok(acc.into_iter().map(|p| p / n_trees).collect())
    }

    fn labels_for(&self, probabilities: &[Vec<f64>]) -> Result<Vec<ClassLabel>> {
        probabilities
            .iter()
            .map(|p| {
                let best = argmax(p).context("empty probability row")?;
                Ok(self.classes[best].clone())
            })
            .collect()
    }
}

impl Classifier for RandomForest {
    fn backend(&self) -> &'static str {
        "forest"
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn supports_probability(&self) -> bool {
        true
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<ClassLabel>> {
        let probabilities = self.predict_probability(x)?;
        self.labels_for(&probabilities)
    }

    fn predict_probability(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>> {
        x.rows()
            .into_iter()
            .map(|row| self.row_probability(row))
            .collect()
    }

    fn classify(&self, x: &FeatureMatrix, with_probability: bool) -> Result<Classification> {
        let probabilities = self.predict_probability(x)?;
        let labels = self.labels_for(&probabilities)?;
        Ok((labels, with_probability.then_some(probabilities)))
    }
}

/// Index of the largest value; the first one wins ties
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
