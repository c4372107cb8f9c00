//! High-level API for bookmark classification
//!
//! This module provides a simple interface for loading the per-dimension
//! models produced by `bookmark-classifier train` and classifying new text.
//!
//! # Quick Start
//!
//! ```no_run
//! use bookmark_classifier::api::Predictor;
//!
//! let predictor = Predictor::new()?;
//! let prediction = predictor.predict_bookmark("doc: Tokio tutorial", "https://tokio.rs/tokio/tutorial");
//! for scored in &prediction.domain {
//!     println!("{} ({:.2})", scored.label, scored.score);
//! }
//! # Ok::<(), bookmark_classifier::Error>(())
//! ```
//!
//! # Examples
//!
//! ## Batch Predictions
//!
//! ```no_run
//! # use bookmark_classifier::api::Predictor;
//! # fn main() -> bookmark_classifier::Result<()> {
//! let predictor = Predictor::new()?;
//! let texts = vec!["rust book https://doc.rust-lang.org/book/", "原神 攻略"];
//! let results = predictor.predict_batch(&texts);
//!
//! for (text, result) in texts.iter().zip(results.iter()) {
//!     println!("{}: unclassified={}", text, result.is_unclassified());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Model Directory
//!
//! ```no_run
//! use bookmark_classifier::api::{Predictor, PredictorConfig};
//!
//! let config = PredictorConfig::new().with_model_dir("/custom/path");
//! let predictor = Predictor::with_config(config)?;
//! # Ok::<(), bookmark_classifier::Error>(())
//! ```

use crate::backend::{ClassifierBackend, LinearBackend, TextClassifier};
use crate::error::Result;
use crate::model_loader::ensure_model_files;
use crate::pipeline::config::{Config, EvaluationConfig};
use crate::pipeline::data::Bookmark;
use crate::pipeline::features::FeatureExtractor;
use crate::pipeline::predict::{predict_labels, ScoredLabel};
use crate::pipeline::taxonomy::Dimension;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::info;

pub use crate::model_loader::ModelLoaderConfig as PredictorConfig;

/// Per-dimension labels for one input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "type")]
    pub type_: Vec<ScoredLabel>,
    pub domain: Vec<ScoredLabel>,
    pub content: Vec<ScoredLabel>,
}

impl Prediction {
    pub fn labels(&self, dimension: Dimension) -> &[ScoredLabel] {
        match dimension {
            Dimension::Type => &self.type_,
            Dimension::Domain => &self.domain,
            Dimension::Content => &self.content,
        }
    }

    fn labels_mut(&mut self, dimension: Dimension) -> &mut Vec<ScoredLabel> {
        match dimension {
            Dimension::Type => &mut self.type_,
            Dimension::Domain => &mut self.domain,
            Dimension::Content => &mut self.content,
        }
    }

    /// True when no dimension produced a label.
    pub fn is_unclassified(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.labels(*d).is_empty())
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unclassified() {
            return writeln!(f, "  (unclassified)");
        }
        for dimension in Dimension::ALL {
            let labels = self.labels(dimension);
            if labels.is_empty() {
                writeln!(f, "  {:<8} -", dimension.as_str())?;
                continue;
            }
            let rendered: Vec<String> = labels
                .iter()
                .map(|s| format!("{} ({:.2}%)", s.label.value(), s.score * 100.0))
                .collect();
            writeln!(f, "  {:<8} {}", dimension.as_str(), rendered.join(", "))?;
        }
        Ok(())
    }
}

/// Main predictor interface: one model per available dimension.
pub struct Predictor {
    models: BTreeMap<Dimension, Box<dyn TextClassifier>>,
    extractor: FeatureExtractor,
    evaluation: EvaluationConfig,
}

impl Predictor {
    /// Load models from the default `models/` directory with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no model file is found or a model file is corrupted.
    pub fn new() -> Result<Self> {
        Self::with_config(PredictorConfig::default())
    }

    /// Load models from `model_dir` using the feature and threshold settings
    /// of `config`.
    pub fn load(model_dir: &Path, config: &Config) -> Result<Self> {
        Self::with_config(
            PredictorConfig::new()
                .with_model_dir(model_dir)
                .with_config(config.clone()),
        )
    }

    /// Load with the built-in linear backend.
    pub fn with_config(config: PredictorConfig) -> Result<Self> {
        Self::with_backend(&LinearBackend, config)
    }

    /// Load models through `backend`. Dimensions without a model file are
    /// skipped with a warning.
    pub fn with_backend<B: ClassifierBackend>(backend: &B, config: PredictorConfig) -> Result<Self> {
        let files = config.get_model_files();
        let available = ensure_model_files(&files, &config.dimensions)?;

        let mut models: BTreeMap<Dimension, Box<dyn TextClassifier>> = BTreeMap::new();
        for dimension in available {
            let model = backend.load(&files.model(dimension))?;
            info!(%dimension, labels = model.labels().len(), "loaded model");
            models.insert(dimension, Box::new(model));
        }

        let extractor = FeatureExtractor::new(&config.config.features, &config.config.taxonomy);
        Ok(Self::from_models(models, extractor, config.config.evaluation))
    }

    /// Build a predictor from already-loaded models.
    pub fn from_models(
        models: BTreeMap<Dimension, Box<dyn TextClassifier>>,
        extractor: FeatureExtractor,
        evaluation: EvaluationConfig,
    ) -> Self {
        Self {
            models,
            extractor,
            evaluation,
        }
    }

    /// Dimensions with a loaded model.
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.models.keys().copied().collect()
    }

    /// Classify free text. Words starting with `http://` or `https://`
    /// contribute URL features, the rest is treated as a title.
    pub fn predict(&self, text: &str) -> Prediction {
        self.predict_tokens(&self.extractor.extract_text(text))
    }

    /// Classify a bookmark from its title and URL.
    pub fn predict_bookmark(&self, title: &str, url: &str) -> Prediction {
        self.predict_tokens(&self.extractor.extract(title, url))
    }

    /// Predict multiple texts.
    pub fn predict_batch(&self, texts: &[&str]) -> Vec<Prediction> {
        texts.iter().map(|t| self.predict(t)).collect()
    }

    pub fn predict_bookmarks(&self, bookmarks: &[Bookmark]) -> Vec<Prediction> {
        bookmarks
            .iter()
            .map(|b| self.predict_bookmark(&b.title, &b.url))
            .collect()
    }

    fn predict_tokens(&self, tokens: &[String]) -> Prediction {
        let mut prediction = Prediction::default();
        if tokens.is_empty() {
            return prediction;
        }

        let text = tokens.join(" ");
        for (&dimension, model) in &self.models {
            let policy = self.evaluation.policy_for(dimension);
            *prediction.labels_mut(dimension) =
                predict_labels(model.as_ref(), dimension, &text, policy);
        }
        prediction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::FeatureConfig;
    use crate::pipeline::taxonomy::Taxonomy;

    /// Returns the same scores for any non-empty text.
    struct Constant(Vec<(String, f32)>);

    impl TextClassifier for Constant {
        fn predict(&self, text: &str, k: usize) -> Vec<(String, f32)> {
            if text.is_empty() {
                return Vec::new();
            }
            self.0.iter().take(k).cloned().collect()
        }

        fn labels(&self) -> &[String] {
            &[]
        }

        fn save(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn predictor(models: Vec<(Dimension, Vec<(&str, f32)>)>) -> Predictor {
        let models = models
            .into_iter()
            .map(|(d, scores)| {
                let scores = scores.into_iter().map(|(l, s)| (l.to_string(), s)).collect();
                (d, Box::new(Constant(scores)) as Box<dyn TextClassifier>)
            })
            .collect();
        let extractor = FeatureExtractor::new(&FeatureConfig::default(), &Taxonomy::default());
        Predictor::from_models(models, extractor, EvaluationConfig::default())
    }

    #[test]
    fn test_predict_merges_dimensions() {
        let p = predictor(vec![
            (Dimension::Type, vec![("type_doc", 0.8)]),
            (Dimension::Domain, vec![("domain_技术", 0.6), ("domain_other", 0.05)]),
        ]);
        let prediction = p.predict("rust book https://doc.rust-lang.org/book/");

        assert_eq!(prediction.type_.len(), 1);
        assert_eq!(prediction.domain.len(), 1);
        assert!(prediction.content.is_empty());
        assert!(!prediction.is_unclassified());
        assert_eq!(p.dimensions(), vec![Dimension::Type, Dimension::Domain]);
    }

    #[test]
    fn test_empty_input_is_unclassified() {
        let p = predictor(vec![(Dimension::Type, vec![("type_doc", 0.8)])]);
        let prediction = p.predict("   ");
        assert!(prediction.is_unclassified());
        assert_eq!(prediction.to_string(), "  (unclassified)\n");
    }

    #[test]
    fn test_prediction_json_uses_dimension_keys() {
        let p = predictor(vec![(Dimension::Content, vec![("content_视频内容", 0.9)])]);
        let json = serde_json::to_value(p.predict_bookmark("video", "https://b23.tv/x")).unwrap();
        assert_eq!(json["content"][0]["label"], "content_视频内容");
        assert!(json["type"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_model_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Predictor::with_config(PredictorConfig::new().with_model_dir(dir.path()));
        assert!(matches!(result, Err(crate::Error::ModelNotFound(_))));
    }
}
