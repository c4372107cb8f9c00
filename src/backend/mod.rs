//! Supervised text-classification backends.
//!
//! The training pipeline only talks to the two traits below, so any
//! classifier that can learn from space-separated token text and return
//! scored labels can be plugged in. [`linear::LinearBackend`] is the built-in
//! implementation.

pub mod linear;

use crate::error::Result;
use crate::pipeline::data::LabeledExample;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use linear::{LinearBackend, LinearClassifier};

/// Output layer loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loss {
    /// Softmax over all labels; one true label is sampled per example
    #[default]
    Softmax,
    /// Independent sigmoid per label
    Ova,
}

/// Training hyperparameters shared by all backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub learning_rate: f32,
    pub epochs: usize,
    /// Longest word n-gram hashed into the input layer (1 = unigrams only)
    pub word_ngrams: usize,
    /// Embedding dimension
    pub dim: usize,
    /// Tokens seen fewer times are dropped from the vocabulary
    pub min_count: usize,
    pub loss: Loss,
    /// Hash buckets for word n-grams
    pub buckets: usize,
    pub seed: u64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            learning_rate: 0.5,
            epochs: 50,
            word_ngrams: 2,
            dim: 100,
            min_count: 1,
            loss: Loss::Softmax,
            buckets: 20_000,
            seed: 42,
        }
    }
}

/// A trained model for one dimension.
pub trait TextClassifier: Send + Sync {
    /// Up to `k` `(label, score)` pairs, best first.
    fn predict(&self, text: &str, k: usize) -> Vec<(String, f32)>;

    /// Labels the model can emit.
    fn labels(&self) -> &[String];

    fn save(&self, path: &Path) -> Result<()>;
}

/// Trains and loads [`TextClassifier`]s.
pub trait ClassifierBackend: Sync {
    type Model: TextClassifier + 'static;

    /// Train on examples whose labels all belong to one dimension.
    fn train(&self, examples: &[LabeledExample], params: &Hyperparameters) -> Result<Self::Model>;

    fn load(&self, path: &Path) -> Result<Self::Model>;
}
