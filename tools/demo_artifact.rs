//! Demo Artifact Writer
//!
//! Writes a small, seeded random-forest artifact shaped like the breast
//! cancer dataset (30 features, 0 = malignant, 1 = benign) so the service
//! can be started without the offline training step. The trees are fixed
//! stumps, not a fitted model.

use anyhow::Context;
use classifier_serving::models::artifact::NativeArtifact;
use classifier_serving::models::forest::{Node, RandomForest, Tree};
use classifier_serving::types::label::ClassLabel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Approximate per-feature means of the breast cancer dataset
const FEATURE_MEANS: [f64; 30] = [
    14.13, 19.29, 91.97, 654.9, 0.0964, 0.1043, 0.0888, 0.0489, 0.1812, 0.0628,
    0.4052, 1.2169, 2.8661, 40.34, 0.0070, 0.0255, 0.0319, 0.0118, 0.0205, 0.0038,
    16.27, 25.68, 107.26, 880.58, 0.1324, 0.2543, 0.2722, 0.1146, 0.2901, 0.0839,
];

/// Build one stump: values above the threshold lean malignant
fn stump(rng: &mut StdRng) -> Tree {
    let feature = rng.gen_range(0..FEATURE_MEANS.len());
    let threshold = FEATURE_MEANS[feature] * rng.gen_range(0.8..1.2);
    let confidence = rng.gen_range(0.6..0.95);

    Tree {
        nodes: vec![
            Node::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            Node::Leaf {
                value: vec![1.0 - confidence, confidence],
            },
            Node::Leaf {
                value: vec![confidence, 1.0 - confidence],
            },
        ],
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("demo_artifact=info".parse()?),
        )
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let output = args.get(1).map(|s| s.as_str()).unwrap_or("model.json");
    let n_trees: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(25);
    let seed: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(42);

    info!(output = %output, n_trees, seed, "Writing demo forest artifact");

    let mut rng = StdRng::seed_from_u64(seed);
    let forest = RandomForest {
        classes: vec![ClassLabel::Int(0), ClassLabel::Int(1)],
        n_features: Some(FEATURE_MEANS.len()),
        trees: (0..n_trees.max(1)).map(|_| stump(&mut rng)).collect(),
    };

    let artifact = NativeArtifact::Forest(forest);
    artifact.validate().context("Generated artifact is invalid")?;

    let json = serde_json::to_string_pretty(&artifact)?;
    std::fs::write(output, json).with_context(|| format!("Failed to write {}", output))?;

    info!("Completed! Start the service with MODEL_PATH={}", output);
    Ok(())
}
