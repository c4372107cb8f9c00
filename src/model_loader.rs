//! Model directory layout and loading configuration.
//!
//! A trained model directory holds one model per dimension plus the metrics
//! and training-line files from the run that produced them:
//!
//! ```text
//! models/
//!   type_model.bin
//!   domain_model.bin
//!   content_model.bin
//!   metrics.json
//!   train.txt
//!   test.txt
//! ```
//!
//! # Examples
//!
//! ## Check which models exist
//!
//! ```no_run
//! use bookmark_classifier::model_loader::ModelFiles;
//!
//! let files = ModelFiles::new("models");
//! println!("trained dimensions: {:?}", files.available());
//! ```
//!
//! ## Custom model directory
//!
//! ```no_run
//! use bookmark_classifier::model_loader::ModelLoaderConfig;
//! use bookmark_classifier::Dimension;
//!
//! let config = ModelLoaderConfig::new()
//!     .with_model_dir("/custom/models")
//!     .with_dimensions(&[Dimension::Domain]);
//!
//! let files = config.get_model_files();
//! ```

use crate::error::{Error, Result};
use crate::pipeline::config::Config;
use crate::pipeline::taxonomy::Dimension;
use std::path::{Path, PathBuf};
use tracing::warn;

const DEFAULT_MODEL_DIR: &str = "models";

/// Paths of everything a training run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub dir: PathBuf,
}

impl ModelFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<dir>/<dimension>_model.bin`
    pub fn model(&self, dimension: Dimension) -> PathBuf {
        self.dir.join(format!("{}_model.bin", dimension))
    }

    pub fn metrics(&self) -> PathBuf {
        self.dir.join("metrics.json")
    }

    pub fn train_data(&self) -> PathBuf {
        self.dir.join("train.txt")
    }

    pub fn test_data(&self) -> PathBuf {
        self.dir.join("test.txt")
    }

    /// Dimensions whose model file is present.
    pub fn available(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.model(*d).exists())
            .collect()
    }
}

impl Default for ModelFiles {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_DIR)
    }
}

/// Check that at least one of `wanted` has a model file.
///
/// Missing dimensions are warned about and left out of the result.
///
/// # Arguments
/// * `files` - Model directory layout
/// * `wanted` - Dimensions the caller would like to load
pub fn ensure_model_files(files: &ModelFiles, wanted: &[Dimension]) -> Result<Vec<Dimension>> {
    let mut found = Vec::new();
    for &dimension in wanted {
        let path = files.model(dimension);
        if path.exists() {
            found.push(dimension);
        } else {
            warn!(%dimension, path = %path.display(), "model file not found; dimension skipped");
        }
    }

    if found.is_empty() {
        return Err(Error::ModelNotFound(files.dir.clone()));
    }
    Ok(found)
}

/// Configuration for model loading
#[derive(Debug, Clone)]
pub struct ModelLoaderConfig {
    pub model_dir: Option<PathBuf>,
    pub dimensions: Vec<Dimension>,
    /// Feature and threshold settings; must match the ones used for training
    pub config: Config,
}

impl Default for ModelLoaderConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            dimensions: Dimension::ALL.to_vec(),
            config: Config::default(),
        }
    }
}

impl ModelLoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    pub fn with_dimensions(mut self, dimensions: &[Dimension]) -> Self {
        self.dimensions = dimensions.to_vec();
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn get_model_files(&self) -> ModelFiles {
        match &self.model_dir {
            Some(dir) => ModelFiles::new(dir),
            None => ModelFiles::new(Path::new(DEFAULT_MODEL_DIR)),
        }
    }
}
