//! Dataset curation: deduplication, labeled-dataset construction and the
//! seeded train/test split.

use crate::error::{Error, Result};
use crate::pipeline::data::{Bookmark, LabeledExample};
use crate::pipeline::features::{FeatureExtractor, UrlParts};
use crate::pipeline::taxonomy::{resolvable_count, LabelResolver};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// Counts reported after turning bookmarks into a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub total: usize,
    pub kept: usize,
    pub skipped: usize,
}

/// Remove bookmarks with duplicate URLs.
///
/// The URL is compared exactly as given. The first occurrence keeps its
/// position; a later duplicate replaces it only when it resolves strictly
/// more non-fallback labels.
pub fn dedupe(bookmarks: Vec<Bookmark>, resolver: &LabelResolver) -> Result<Vec<Bookmark>> {
    let total = bookmarks.len();
    let mut kept: Vec<(Bookmark, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for bookmark in bookmarks {
        let score = resolvable_count(&resolver.resolve(&bookmark.title, &bookmark.url));
        match index.get(&bookmark.url) {
            Some(&slot) => {
                if score > kept[slot].1 {
                    kept[slot] = (bookmark, score);
                }
            }
            None => {
                index.insert(bookmark.url.clone(), kept.len());
                kept.push((bookmark, score));
            }
        }
    }

    if kept.is_empty() {
        return Err(Error::EmptyDataset);
    }
    info!(total, unique = kept.len(), "deduplicated bookmarks");
    Ok(kept.into_iter().map(|(b, _)| b).collect())
}

/// Resolve labels and extract features for one bookmark.
pub fn label_bookmark(
    bookmark: &Bookmark,
    extractor: &FeatureExtractor,
    resolver: &LabelResolver,
) -> Result<LabeledExample> {
    UrlParts::parse(&bookmark.url)?;
    let tokens = extractor.extract(&bookmark.title, &bookmark.url);
    if tokens.is_empty() {
        return Err(Error::NoFeatures {
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
        });
    }
    let labels = resolver.resolve(&bookmark.title, &bookmark.url);
    Ok(LabeledExample::new(labels, tokens))
}

/// Build the labeled dataset, skipping bookmarks that cannot be labeled.
pub fn build_dataset(
    bookmarks: &[Bookmark],
    extractor: &FeatureExtractor,
    resolver: &LabelResolver,
) -> (Vec<LabeledExample>, ProcessingSummary) {
    let mut examples = Vec::with_capacity(bookmarks.len());
    let mut summary = ProcessingSummary {
        total: bookmarks.len(),
        ..ProcessingSummary::default()
    };

    for bookmark in bookmarks {
        match label_bookmark(bookmark, extractor, resolver) {
            Ok(example) => {
                examples.push(example);
                summary.kept += 1;
            }
            Err(e) => {
                warn!(title = %bookmark.title, url = %bookmark.url, "skipping bookmark: {}", e);
                summary.skipped += 1;
            }
        }
    }

    info!(
        total = summary.total,
        kept = summary.kept,
        skipped = summary.skipped,
        "built dataset"
    );
    (examples, summary)
}

/// Shuffle with a seeded RNG and cut into `(train, test)`.
///
/// The test partition holds `round(n * test_fraction)` items.
///
/// # Errors
///
/// * [`Error::InvalidSplit`] when `test_fraction` is outside `[0, 1)`
/// * [`Error::EmptyPartition`] when the training side would be empty
pub fn split<T>(mut items: Vec<T>, test_fraction: f64, seed: u64) -> Result<(Vec<T>, Vec<T>)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(Error::InvalidSplit(test_fraction));
    }

    let total = items.len();
    let test_len = (total as f64 * test_fraction).round() as usize;
    if test_len >= total {
        return Err(Error::EmptyPartition {
            total,
            test_fraction,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    let test = items.split_off(total - test_len);
    Ok((items, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::FeatureConfig;
    use crate::pipeline::taxonomy::Taxonomy;

    fn resolver() -> LabelResolver {
        LabelResolver::new(&Taxonomy::default()).unwrap()
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(&FeatureConfig::default(), &Taxonomy::default())
    }

    #[test]
    fn test_dedupe_prefers_more_resolvable_labels() {
        let bookmarks = vec![
            Bookmark::new("first", "https://a.example/"),
            Bookmark::new("x", "https://b.example/"),
            Bookmark::new("doc: python 教程", "https://a.example/"),
        ];
        let unique = dedupe(bookmarks, &resolver()).unwrap();
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "doc: python 教程");
        assert_eq!(unique[1].title, "x");
    }

    #[test]
    fn test_dedupe_keeps_first_on_tie() {
        let bookmarks = vec![
            Bookmark::new("one", "https://a.example/"),
            Bookmark::new("two", "https://a.example/"),
        ];
        let unique = dedupe(bookmarks, &resolver()).unwrap();
        assert_eq!(unique, vec![Bookmark::new("one", "https://a.example/")]);
    }

    #[test]
    fn test_dedupe_url_is_case_sensitive() {
        let bookmarks = vec![
            Bookmark::new("one", "https://a.example/Path"),
            Bookmark::new("two", "https://a.example/path"),
        ];
        assert_eq!(dedupe(bookmarks, &resolver()).unwrap().len(), 2);
    }

    #[test]
    fn test_dedupe_empty_is_error() {
        assert!(matches!(dedupe(vec![], &resolver()), Err(Error::EmptyDataset)));
    }

    #[test]
    fn test_build_dataset_skips_malformed() {
        let bookmarks = vec![
            Bookmark::new("Rust book", "https://doc.rust-lang.org/book/"),
            Bookmark::new("broken", "https://exa mple.com"),
            Bookmark::new("", "https:///"),
        ];
        let (examples, summary) = build_dataset(&bookmarks, &extractor(), &resolver());
        assert_eq!(examples.len(), 1);
        assert_eq!(
            summary,
            ProcessingSummary {
                total: 3,
                kept: 1,
                skipped: 2
            }
        );
    }

    #[test]
    fn test_split_sizes() {
        let (train, test) = split((0..10).collect::<Vec<_>>(), 0.2, 42).unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);

        let mut all: Vec<_> = train.into_iter().chain(test).collect();
        all.sort();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible() {
        let a = split((0..50).collect::<Vec<_>>(), 0.3, 7).unwrap();
        let b = split((0..50).collect::<Vec<_>>(), 0.3, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_split_zero_fraction_keeps_everything() {
        let (train, test) = split(vec![1, 2, 3], 0.0, 1).unwrap();
        assert_eq!(train.len(), 3);
        assert!(test.is_empty());
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(matches!(split(vec![1, 2], 1.0, 0), Err(Error::InvalidSplit(_))));
        assert!(matches!(split(vec![1, 2], -0.1, 0), Err(Error::InvalidSplit(_))));
    }

    #[test]
    fn test_split_single_item_high_fraction() {
        assert!(matches!(
            split(vec![1], 0.9, 0),
            Err(Error::EmptyPartition { total: 1, .. })
        ));
        assert!(matches!(split(Vec::<u8>::new(), 0.2, 0), Err(Error::EmptyPartition { .. })));
    }

    #[test]
    fn test_featureless_bookmark_is_reported() {
        let result = label_bookmark(&Bookmark::new("doc:", "file:///"), &extractor(), &resolver());
        assert!(matches!(
            result,
            Err(Error::NoFeatures { ref title, .. }) if title == "doc:"
        ));
    }

    #[test]
    fn test_label_marker_title_survives_training_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.txt");
        let bookmarks = vec![
            Bookmark::new("__label__type_api grandma pie", "https://example.org/pie"),
            Bookmark::new("__label__x note", "https://example.org/note"),
        ];

        let (examples, _) = build_dataset(&bookmarks, &extractor(), &resolver());
        assert_eq!(examples.len(), 2);
        crate::pipeline::data::write_training_file(&path, &examples).unwrap();
        let read = crate::pipeline::data::read_training_file(&path).unwrap();

        assert_eq!(read, examples);
        let labels: Vec<String> = read[0].labels.iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["domain_other", "content_other"]);
    }
}
