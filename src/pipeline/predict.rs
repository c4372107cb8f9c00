//! Score-to-label conversion shared by evaluation and prediction, plus the
//! single-text prediction command.

use super::config::Config;
use crate::api::Predictor;
use crate::backend::TextClassifier;
use crate::error::Result;
use crate::pipeline::taxonomy::{Dimension, Label};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// A label with the model's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: Label,
    pub score: f32,
}

/// Which of the model's top labels count as predicted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionPolicy {
    /// Labels scoring below this are dropped
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for PredictionPolicy {
    fn default() -> Self {
        PredictionPolicy {
            threshold: 0.1,
            top_k: 3,
        }
    }
}

/// Predicted labels of `dimension` for space-joined feature `text`.
///
/// Takes the model's top-k labels, keeps those scoring at least the threshold
/// and drops anything that does not parse as a label of `dimension`.
pub fn predict_labels<M: TextClassifier + ?Sized>(
    model: &M,
    dimension: Dimension,
    text: &str,
    policy: PredictionPolicy,
) -> Vec<ScoredLabel> {
    model
        .predict(text, policy.top_k)
        .into_iter()
        .filter(|(_, score)| *score >= policy.threshold)
        .filter_map(|(raw, score)| {
            let label = raw.parse::<Label>().ok()?;
            (label.dimension() == dimension).then_some(ScoredLabel { label, score })
        })
        .collect()
}

/// Classify a single text with the models in `model_dir` and print the result.
///
/// # Arguments
///
/// * `text` - Title, URL or both
/// * `model_dir` - Directory holding `<dimension>_model.bin` files
/// * `config` - Feature and evaluation settings used at training time
pub fn predict_single(text: &str, model_dir: &Path, config: &Config) -> Result<()> {
    println!("\n===================================================================");
    println!("  Bookmark Classifier: Prediction");
    println!("===================================================================\n");

    let predictor = Predictor::load(model_dir, config)?;

    println!("Input text:");
    let display: String = if text.chars().count() > 100 {
        format!("{}...", text.chars().take(100).collect::<String>())
    } else {
        text.to_string()
    };
    println!("  {}\n", display);

    let start = Instant::now();
    let prediction = predictor.predict(text);

    println!("{}", prediction);
    println!("  Time: {:.3}s", start.elapsed().as_secs_f64());
    println!("===================================================================\n");

    Ok(())
}
