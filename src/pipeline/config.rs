//! Configuration structures for the bookmark classifier.
//!
//! Everything is loaded from a single TOML file. Each section falls back to
//! its defaults when omitted, so an empty file is a valid configuration.

use crate::backend::{Hyperparameters, Loss};
use crate::error::Result;
use crate::pipeline::balance::BalanceConfig;
use crate::pipeline::features::FeatureConfig;
use crate::pipeline::predict::PredictionPolicy;
use crate::pipeline::taxonomy::{Dimension, Taxonomy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Main configuration structure loaded from `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input data and split
    pub data: DataConfig,
    /// Feature extraction
    pub features: FeatureConfig,
    /// Prefix vocabulary and category tables
    pub taxonomy: Taxonomy,
    /// Class balancing
    pub balance: BalanceConfig,
    /// Training hyperparameters
    pub model: ModelConfig,
    /// Prediction threshold and top-k used by evaluation and prediction
    pub evaluation: EvaluationConfig,
    /// Output paths
    pub output: OutputConfig,
}

/// Data loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Bookmark file (`.csv` or `.json`)
    pub input: Option<PathBuf>,
    /// Share of examples held out for evaluation
    pub test_fraction: f64,
    /// Seed for splitting and balancing
    pub seed: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            input: None,
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// A value per dimension, each optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerDimension<T> {
    #[serde(rename = "type")]
    pub type_: Option<T>,
    pub domain: Option<T>,
    pub content: Option<T>,
}

impl<T> Default for PerDimension<T> {
    fn default() -> Self {
        PerDimension {
            type_: None,
            domain: None,
            content: None,
        }
    }
}

impl<T> PerDimension<T> {
    pub fn get(&self, dimension: Dimension) -> Option<&T> {
        match dimension {
            Dimension::Type => self.type_.as_ref(),
            Dimension::Domain => self.domain.as_ref(),
            Dimension::Content => self.content.as_ref(),
        }
    }
}

/// Partial hyperparameters; `None` keeps the `[model]` default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperparameterOverrides {
    pub learning_rate: Option<f32>,
    pub epochs: Option<usize>,
    pub word_ngrams: Option<usize>,
    pub dim: Option<usize>,
    pub min_count: Option<usize>,
    pub loss: Option<Loss>,
    pub buckets: Option<usize>,
    pub seed: Option<u64>,
}

impl HyperparameterOverrides {
    pub fn apply(&self, base: &Hyperparameters) -> Hyperparameters {
        Hyperparameters {
            learning_rate: self.learning_rate.unwrap_or(base.learning_rate),
            epochs: self.epochs.unwrap_or(base.epochs),
            word_ngrams: self.word_ngrams.unwrap_or(base.word_ngrams),
            dim: self.dim.unwrap_or(base.dim),
            min_count: self.min_count.unwrap_or(base.min_count),
            loss: self.loss.unwrap_or(base.loss),
            buckets: self.buckets.unwrap_or(base.buckets),
            seed: self.seed.unwrap_or(base.seed),
        }
    }
}

/// Model training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Defaults for every dimension
    #[serde(flatten)]
    pub defaults: Hyperparameters,
    /// `[model.overrides.type]`, `[model.overrides.domain]`, ...
    pub overrides: PerDimension<HyperparameterOverrides>,
    /// Datasets smaller than this get the small-sample adjustments
    pub small_dataset_threshold: usize,
    pub small_max_word_ngrams: usize,
    pub small_max_epochs: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            defaults: Hyperparameters::default(),
            overrides: PerDimension::default(),
            small_dataset_threshold: 100,
            small_max_word_ngrams: 2,
            small_max_epochs: 25,
        }
    }
}

impl ModelConfig {
    /// Defaults with the dimension's overrides applied.
    pub fn for_dimension(&self, dimension: Dimension) -> Hyperparameters {
        match self.overrides.get(dimension) {
            Some(o) => o.apply(&self.defaults),
            None => self.defaults.clone(),
        }
    }

    /// Loosen hyperparameters for datasets below `small_dataset_threshold`.
    pub fn adapt_to_size(&self, params: &Hyperparameters, examples: usize) -> Hyperparameters {
        if examples >= self.small_dataset_threshold {
            return params.clone();
        }
        Hyperparameters {
            min_count: 0,
            word_ngrams: params.word_ngrams.min(self.small_max_word_ngrams),
            epochs: params.epochs.min(self.small_max_epochs),
            ..params.clone()
        }
    }
}

/// Partial prediction policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub threshold: Option<f32>,
    pub top_k: Option<usize>,
}

/// Evaluation and prediction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Minimum score for a predicted label to count
    pub threshold: f32,
    /// Labels requested from the model per dimension
    pub top_k: usize,
    /// Misclassified examples kept in `metrics.json`
    pub max_error_cases: usize,
    pub overrides: PerDimension<PolicyOverrides>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            threshold: 0.1,
            top_k: 3,
            max_error_cases: 50,
            overrides: PerDimension::default(),
        }
    }
}

impl EvaluationConfig {
    pub fn policy_for(&self, dimension: Dimension) -> PredictionPolicy {
        let o = self.overrides.get(dimension);
        PredictionPolicy {
            threshold: o.and_then(|o| o.threshold).unwrap_or(self.threshold),
            top_k: o.and_then(|o| o.top_k).unwrap_or(self.top_k),
        }
    }
}

/// Output paths configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for models, metrics and training files
    pub model_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            model_dir: PathBuf::from("models"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// Returns `Ok(Config)` if successful, or an error if the file cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path`, or fall back to [`Config::default`] with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), "using default configuration: {}", e);
                Config::default()
            }
        }
    }
}
