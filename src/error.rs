//! Error type shared by the whole crate.

use crate::pipeline::taxonomy::Dimension;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("model encoding: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("no bookmarks left to train on")]
    EmptyDataset,

    #[error("test fraction must be in [0, 1), got {0}")]
    InvalidSplit(f64),

    #[error("training partition is empty ({total} examples, test fraction {test_fraction})")]
    EmptyPartition { total: usize, test_fraction: f64 },

    #[error("no training examples carry a `{0}` label")]
    EmptyDimension(Dimension),

    #[error("no dimension could be trained: {}", describe_failures(.0))]
    NoDimensionTrained(BTreeMap<Dimension, String>),

    #[error("no feature tokens in `{title}` <{url}>")]
    NoFeatures { title: String, url: String },

    #[error("no feature tokens survive the vocabulary filter (min_count {min_count})")]
    EmptyVocabulary { min_count: usize },

    #[error("taxonomy: {0}")]
    Taxonomy(String),

    #[error("malformed URL `{url}`: {reason}")]
    MalformedUrl { url: String, reason: &'static str },

    #[error("model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("LLM: {0}")]
    Llm(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_failures(failures: &BTreeMap<Dimension, String>) -> String {
    failures
        .iter()
        .map(|(dimension, reason)| format!("{dimension}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

