//! Folder tree built from per-dimension predictions.
//!
//! The tree has one root folder per dimension and one subfolder per predicted
//! label value. A bookmark lands in every folder it has a label for, so it may
//! appear several times. Bookmarks without any label are copied into the
//! `unclassified` folder of every root.

use super::data::Bookmark;
use super::taxonomy::Dimension;
use crate::api::Prediction;
use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

pub const UNCLASSIFIED: &str = "unclassified";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Folder {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bookmarks: Vec<Bookmark>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<Folder>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Folder {
            name: name.into(),
            ..Folder::default()
        }
    }

    /// Child folder called `name`, created at the end if missing.
    pub fn child_mut(&mut self, name: &str) -> &mut Folder {
        let idx = match self.folders.iter().position(|f| f.name == name) {
            Some(idx) => idx,
            None => {
                self.folders.push(Folder::new(name));
                self.folders.len() - 1
            }
        };
        &mut self.folders[idx]
    }

    pub fn child(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    /// Write the tree as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

pub fn root_name(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Type => "By type",
        Dimension::Domain => "By domain",
        Dimension::Content => "By content",
    }
}

/// Counts reported after organizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeSummary {
    pub total: usize,
    pub classified: usize,
    pub unclassified: usize,
}

/// Build the folder tree from bookmarks and their predictions (same order).
pub fn organize(bookmarks: &[Bookmark], predictions: &[Prediction]) -> (Folder, OrganizeSummary) {
    let mut root = Folder::new("Bookmarks");
    for dimension in Dimension::ALL {
        root.child_mut(root_name(dimension)).child_mut(UNCLASSIFIED);
    }

    let mut summary = OrganizeSummary {
        total: bookmarks.len(),
        ..OrganizeSummary::default()
    };

    for (bookmark, prediction) in bookmarks.iter().zip(predictions) {
        if prediction.is_unclassified() {
            warn!(url = %bookmark.url, "no label in any dimension; filed as unclassified");
            for dimension in Dimension::ALL {
                root.child_mut(root_name(dimension))
                    .child_mut(UNCLASSIFIED)
                    .bookmarks
                    .push(bookmark.clone());
            }
            summary.unclassified += 1;
            continue;
        }

        for dimension in Dimension::ALL {
            for scored in prediction.labels(dimension) {
                root.child_mut(root_name(dimension))
                    .child_mut(scored.label.value())
                    .bookmarks
                    .push(bookmark.clone());
            }
        }
        summary.classified += 1;
    }

    info!(
        total = summary.total,
        classified = summary.classified,
        unclassified = summary.unclassified,
        "organized bookmarks"
    );
    (root, summary)
}
