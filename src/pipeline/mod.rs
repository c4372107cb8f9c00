//! Multi-dimensional bookmark classification pipeline
//!
//! Bookmarks are classified along three independent dimensions:
//!
//! - **type**: what kind of resource the link is (`doc`, `pkg`, `api`, `tool`, ...)
//! - **domain**: subject area (技术, 游戏娱乐, 媒体资讯, ...)
//! - **content**: content form (教程, 社区, 视频, ...)
//!
//! Each dimension gets its own linear text classifier trained on tokens
//! extracted from the bookmark title and URL.
//!
//! ## Pipeline
//!
//! ```text
//! bookmarks.csv ─► features + taxonomy ─► dedupe ─► split ─► train.txt / test.txt
//!                                                              │
//!                      per dimension: filter ─► balance ─► train ─► evaluate
//!                                                              │
//!                    type_model.bin  domain_model.bin  content_model.bin  metrics.json
//! ```
//!
//! Labels come from the bookmark itself: colon-terminated title prefixes such
//! as `doc:` or `pkg:` give the type, keyword and host tables give domain and
//! content. Domain and content always resolve, falling back to `other`.
//!
//! ## Usage
//!
//! ### Training
//!
//! ```bash
//! ./target/release/bookmark-classifier train --input data/bookmarks.csv
//! ```
//!
//! ### Prediction
//!
//! ```bash
//! ./target/release/bookmark-classifier predict "doc: Tokio tutorial https://tokio.rs/tokio/tutorial"
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use bookmark_classifier::backend::LinearBackend;
//! use bookmark_classifier::pipeline::config::Config;
//! use bookmark_classifier::pipeline::train::train_model;
//! use std::path::Path;
//!
//! let config = Config::default();
//! let outcome = train_model(&config, Path::new("data/bookmarks.csv"), &LinearBackend)?;
//! println!("trained: {:?}", outcome.trained);
//! # Ok::<(), bookmark_classifier::Error>(())
//! ```
//!
//! ## Configuration
//!
//! Every section of `config.toml` is optional:
//!
//! ```toml
//! [data]
//! input = "data/bookmarks.csv"
//! test_fraction = 0.2
//! seed = 42
//!
//! [features]
//! max_path_segments = 5
//! enhance = true  # character and keyword hint tokens
//!
//! [taxonomy]
//! match_policy = "first"  # or "all"
//!
//! [balance]
//! min_samples = 10
//! max_oversample_ratio = 1.5
//! noise_probability = 0.3
//!
//! [model]
//! learning_rate = 0.5
//! epochs = 50
//! word_ngrams = 2
//! dim = 100
//! loss = "softmax"  # or "ova"
//!
//! [model.overrides.type]
//! epochs = 80
//!
//! [evaluation]
//! threshold = 0.1
//! top_k = 3
//!
//! [output]
//! model_dir = "models"
//! ```
//!
//! ## Module Structure
//!
//! - [`features`] - Token extraction from titles and URLs
//! - [`taxonomy`] - Dimensions, labels and label resolution
//! - [`data`] - Bookmark records and training-line files
//! - [`curate`] - Deduplication, dataset building and splitting
//! - [`balance`] - Oversampling with token noise
//! - [`config`] - Configuration structures and loading
//! - [`train`] - Per-dimension training pipeline
//! - [`evaluate`] - Multi-label metrics
//! - [`save`] - Model persistence
//! - [`predict`] - Score thresholds and single text prediction
//! - [`analyze`] - Collection statistics
//! - [`organize`] - Folder tree from predictions
//! - `cli` - Command-line interface (feature `cli`)

pub mod analyze;
pub mod balance;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod curate;
pub mod data;
pub mod evaluate;
pub mod features;
pub mod organize;
pub mod predict;
pub mod save;
pub mod taxonomy;
pub mod train;

#[cfg(feature = "cli")]
pub use cli::{run, Cli};
