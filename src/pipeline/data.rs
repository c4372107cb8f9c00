//! Bookmark records, labeled examples and the training-line file format.

use crate::error::{Error, Result};
use crate::pipeline::taxonomy::{Dimension, Label, LabelSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Marker in front of every label in a training line.
pub const LABEL_PREFIX: &str = "__label__";

/// A single bookmark: user-authored title and the link it points to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Title, possibly starting with prefix tags such as `doc:` or `res:pkg:`
    pub title: String,
    pub url: String,
}

impl Bookmark {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Bookmark {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// Labels plus the feature tokens they were derived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledExample {
    pub labels: LabelSet,
    pub tokens: Vec<String>,
}

impl LabeledExample {
    pub fn new(labels: LabelSet, tokens: Vec<String>) -> Self {
        LabeledExample { labels, tokens }
    }

    /// Space-joined feature tokens.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }

    pub fn has_dimension(&self, dimension: Dimension) -> bool {
        self.labels.iter().any(|l| l.dimension() == dimension)
    }

    /// Render as `__label__<dim>_<value> [...] <tokens>`.
    pub fn to_training_line(&self) -> String {
        let mut parts: Vec<String> = self
            .labels
            .iter()
            .map(|l| format!("{LABEL_PREFIX}{l}"))
            .collect();
        parts.extend(self.tokens.iter().cloned());
        parts.join(" ")
    }

    /// Parse a training line. Leading `__label__` words are labels, the rest
    /// are tokens.
    pub fn parse_training_line(line: &str) -> Result<Self> {
        let mut labels = LabelSet::new();
        let mut tokens = Vec::new();

        for word in line.split_whitespace() {
            match word.strip_prefix(LABEL_PREFIX) {
                Some(label) if tokens.is_empty() => {
                    labels.insert(label.parse::<Label>()?);
                }
                _ => tokens.push(word.to_string()),
            }
        }

        if labels.is_empty() {
            return Err(Error::Taxonomy(format!(
                "training line has no labels: `{line}`"
            )));
        }
        Ok(LabeledExample { labels, tokens })
    }
}

/// Load bookmarks from a CSV (`title,url` header) or JSON (array of
/// `{title, url}` objects) file, chosen by extension.
///
/// # Arguments
///
/// * `path` - Path to the bookmark file
pub fn load_bookmarks(path: &Path) -> Result<Vec<Bookmark>> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("json"));

    let bookmarks = if is_json {
        let file = File::open(path)?;
        serde_json::from_reader::<_, Vec<Bookmark>>(BufReader::new(file))?
    } else {
        let mut reader = csv::Reader::from_path(path)?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<Bookmark>, _>>()?
    };

    info!(path = %path.display(), count = bookmarks.len(), "loaded bookmarks");
    Ok(bookmarks)
}

/// Write one training line per example.
pub fn write_training_file(path: &Path, examples: &[LabeledExample]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for example in examples {
        writeln!(writer, "{}", example.to_training_line())?;
    }
    writer.flush()?;
    debug!(path = %path.display(), lines = examples.len(), "wrote training file");
    Ok(())
}

/// Read a training-line file; blank lines are skipped.
pub fn read_training_file(path: &Path) -> Result<Vec<LabeledExample>> {
    let reader = BufReader::new(File::open(path)?);
    let mut examples = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        examples.push(LabeledExample::parse_training_line(&line)?);
    }
    Ok(examples)
}
