//! # bookmark-classifier
//!
//! Multi-dimensional bookmark classification in pure Rust: every link is
//! labeled by resource **type**, subject **domain** and **content** form,
//! with one linear text classifier per dimension.
//!
//! ## Features
//!
//! - **Noisy input handling**: HTML entities, percent-encoding, concatenated
//!   title prefixes such as `doc:pkg:`
//! - **Labels from the bookmarks themselves**: title prefixes plus configurable
//!   keyword and host tables, with an `other` fallback for domain and content
//! - **Balanced training**: rare labels are oversampled with token noise
//! - **Multi-label metrics**: micro-averaged precision/recall/F1, per-label
//!   confusion counts and label correlation
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! # Library only
//! bookmark-classifier = { version = "0.1", default-features = false }
//!
//! # With the OpenAI-compatible fallback categorizer
//! bookmark-classifier = { version = "0.1", default-features = false, features = ["llm"] }
//! ```
//!
//! Train models first:
//!
//! ```bash
//! bookmark-classifier train --input data/bookmarks.csv
//! ```
//!
//! ### Basic Usage
//!
//! ```no_run
//! use bookmark_classifier::Predictor;
//!
//! fn main() -> bookmark_classifier::Result<()> {
//!     let predictor = Predictor::new()?;
//!
//!     let prediction = predictor.predict_bookmark(
//!         "doc: The Rust Programming Language",
//!         "https://doc.rust-lang.org/book/",
//!     );
//!     print!("{}", prediction);
//!
//!     for scored in &prediction.type_ {
//!         println!("{} {:.1}%", scored.label, scored.score * 100.0);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Custom Configuration
//!
//! ```no_run
//! # use bookmark_classifier::api::{Predictor, PredictorConfig};
//! # use bookmark_classifier::{Config, Dimension};
//! # use std::path::Path;
//! # fn main() -> bookmark_classifier::Result<()> {
//! let config = PredictorConfig::new()
//!     .with_model_dir("custom_models")
//!     .with_dimensions(&[Dimension::Domain, Dimension::Content])
//!     .with_config(Config::load(Path::new("config.toml"))?);
//!
//! let predictor = Predictor::with_config(config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Available Cargo Features
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `cli` | Include CLI binary | ✓ |
//! | `llm` | OpenAI-compatible categorizer client | ✗ |
//!
//! ## Model Files
//!
//! `train` writes into `models/` (configurable):
//!
//! - `type_model.bin`, `domain_model.bin`, `content_model.bin`
//! - `metrics.json`: per-dimension summary, per-label metrics, confusion
//!   matrix and misclassified examples
//! - `train.txt`, `test.txt`: `__label__<dimension>_<value> ... tokens`
//!
//! A dimension whose model file is missing is skipped at load time.
//!
//! ## Examples
//!
//! ```bash
//! cargo run --example simple
//! cargo run --example batch
//! ```
//!
//! ## License
//!
//! GNU General Public License v3.0 (GPLv3)

// Public API modules
pub mod api;
pub mod error;
pub mod model_loader;

// Core modules
pub mod backend;
pub mod llm;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use api::{Prediction, Predictor, PredictorConfig};
pub use error::{Error, Result};
pub use pipeline::config::Config;
pub use pipeline::data::{load_bookmarks, Bookmark, LabeledExample};
pub use pipeline::predict::ScoredLabel;
pub use pipeline::taxonomy::{Dimension, Label, LabelResolver, Taxonomy};
