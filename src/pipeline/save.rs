//! Model saving functionality for trained models.

use super::evaluate::EvaluationReport;
use crate::backend::TextClassifier;
use crate::error::Result;
use crate::model_loader::ModelFiles;
use crate::pipeline::taxonomy::Dimension;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// Save every trained model and the metrics report into `files.dir`.
///
/// Models go to `<dimension>_model.bin`, metrics to `metrics.json`.
/// Returns the written paths.
///
/// # Arguments
///
/// * `models` - Trained models keyed by dimension
/// * `report` - Evaluation metrics of the same run
/// * `files` - Output directory layout
pub fn save_models<M: TextClassifier>(
    models: &BTreeMap<Dimension, M>,
    report: &EvaluationReport,
    files: &ModelFiles,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&files.dir)?;
    let mut written = Vec::new();

    for (dimension, model) in models {
        let path = files.model(*dimension);
        model.save(&path)?;
        info!(%dimension, path = %path.display(), "saved model");
        written.push(path);
    }

    let metrics = files.metrics();
    report.save(&metrics)?;
    written.push(metrics);

    println!("\n✓ Models saved:");
    for path in &written {
        println!("  - {}", path.display());
    }
    println!("\nTo predict: bookmark-classifier predict \"<title> <url>\"\n");

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Hyperparameters, LinearBackend, ClassifierBackend};
    use crate::pipeline::data::LabeledExample;
    use crate::pipeline::evaluate::DimensionMetrics;
    use tempfile::tempdir;

    #[test]
    fn test_save_models_writes_expected_files() {
        let labels = ["type_doc".parse().unwrap()].into_iter().collect();
        let examples = vec![LabeledExample::new(labels, vec!["rust".into(), "docs".into()])];
        let model = LinearBackend
            .train(&examples, &Hyperparameters { epochs: 1, dim: 4, ..Hyperparameters::default() })
            .unwrap();

        let mut models = BTreeMap::new();
        models.insert(Dimension::Type, model);
        let mut report = EvaluationReport::default();
        report.insert(Dimension::Type, DimensionMetrics::default());

        let dir = tempdir().unwrap();
        let files = ModelFiles::new(dir.path().join("out"));
        let written = save_models(&models, &report, &files).unwrap();

        assert_eq!(written, vec![files.model(Dimension::Type), files.metrics()]);
        assert!(files.model(Dimension::Type).exists());
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(files.metrics()).unwrap()).unwrap();
        assert!(json["type"]["per_label_metrics"].is_object());
    }
}
