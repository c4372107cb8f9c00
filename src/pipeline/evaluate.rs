//! Multi-label evaluation and results reporting.

use super::data::{read_training_file, LabeledExample};
use super::predict::{predict_labels, PredictionPolicy, ScoredLabel};
use super::taxonomy::{labels_in, Dimension};
use crate::backend::TextClassifier;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Key used in the confusion matrix when nothing was predicted.
pub const NO_PREDICTION: &str = "<none>";

/// Counts and scores for one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl LabelMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let (precision, recall, f1) = precision_recall_f1(tp, fp, fn_);
        LabelMetrics {
            precision,
            recall,
            f1,
            support: tp + fn_,
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
        }
    }
}

/// Micro-averaged scores over labels with non-zero support.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Test examples that carried a label of the dimension
    pub samples: usize,
}

/// A misclassified test example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCase {
    pub text: String,
    pub true_labels: Vec<String>,
    pub predicted: Vec<ScoredLabel>,
}

/// Everything measured for one dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionMetrics {
    pub summary: Summary,
    pub per_label_metrics: BTreeMap<String, LabelMetrics>,
    /// true label -> predicted label (or `<none>`) -> count
    pub confusion_matrix: BTreeMap<String, BTreeMap<String, usize>>,
    /// true label -> any other label on the same example -> count
    pub label_correlation: BTreeMap<String, BTreeMap<String, usize>>,
    pub error_cases: Vec<ErrorCase>,
}

/// Metrics for all evaluated dimensions, keyed by dimension name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    #[serde(flatten)]
    pub dimensions: BTreeMap<String, DimensionMetrics>,
}

impl EvaluationReport {
    pub fn insert(&mut self, dimension: Dimension, metrics: DimensionMetrics) {
        self.dimensions.insert(dimension.to_string(), metrics);
    }

    pub fn get(&self, dimension: Dimension) -> Option<&DimensionMetrics> {
        self.dimensions.get(dimension.as_str())
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// `(precision, recall, f1)`, each 0 when its denominator is 0.
pub fn precision_recall_f1(tp: usize, fp: usize, fn_: usize) -> (f64, f64, f64) {
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    (precision, recall, f1)
}

/// Evaluation settings for one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationPolicy {
    pub prediction: PredictionPolicy,
    pub max_error_cases: usize,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        EvaluationPolicy {
            prediction: PredictionPolicy::default(),
            max_error_cases: 50,
        }
    }
}

/// Evaluate one dimension's model on test examples.
///
/// Examples with no label in `dimension` are ignored. Labels seen only in
/// predictions are reported with zero support and left out of the summary.
pub fn evaluate<M: TextClassifier + ?Sized>(
    dimension: Dimension,
    model: &M,
    test: &[LabeledExample],
    policy: EvaluationPolicy,
) -> DimensionMetrics {
    let mut counts: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
    let mut metrics = DimensionMetrics::default();

    for example in test {
        let truth: BTreeSet<String> = labels_in(&example.labels, dimension)
            .map(|l| l.to_string())
            .collect();
        if truth.is_empty() {
            continue;
        }
        metrics.summary.samples += 1;

        let text = example.text();
        let predicted = predict_labels(model, dimension, &text, policy.prediction);
        let predicted_set: BTreeSet<String> =
            predicted.iter().map(|s| s.label.to_string()).collect();

        for label in truth.union(&predicted_set) {
            let entry = counts.entry(label.clone()).or_default();
            match (truth.contains(label), predicted_set.contains(label)) {
                (true, true) => entry.0 += 1,
                (false, true) => entry.1 += 1,
                (true, false) => entry.2 += 1,
                (false, false) => {}
            }
        }

        for label in &truth {
            let row = metrics.confusion_matrix.entry(label.clone()).or_default();
            if predicted_set.is_empty() {
                *row.entry(NO_PREDICTION.to_string()).or_default() += 1;
            }
            for p in &predicted_set {
                *row.entry(p.clone()).or_default() += 1;
            }

            let row = metrics.label_correlation.entry(label.clone()).or_default();
            for other in example.labels.iter().map(|l| l.to_string()) {
                if &other != label {
                    *row.entry(other).or_default() += 1;
                }
            }
        }

        if truth != predicted_set && metrics.error_cases.len() < policy.max_error_cases {
            metrics.error_cases.push(ErrorCase {
                text,
                true_labels: truth.into_iter().collect(),
                predicted,
            });
        }
    }

    let (mut tp, mut fp, mut fn_) = (0, 0, 0);
    for (label, (t, f, n)) in counts {
        let label_metrics = LabelMetrics::from_counts(t, f, n);
        if label_metrics.support > 0 {
            tp += t;
            fp += f;
            fn_ += n;
        }
        metrics.per_label_metrics.insert(label, label_metrics);
    }
    let (precision, recall, f1) = precision_recall_f1(tp, fp, fn_);
    metrics.summary.precision = precision;
    metrics.summary.recall = recall;
    metrics.summary.f1 = f1;

    info!(
        %dimension,
        samples = metrics.summary.samples,
        precision,
        recall,
        f1,
        "evaluated"
    );
    metrics
}

/// Evaluate against a training-line file. A missing file yields empty
/// metrics.
pub fn evaluate_file<M: TextClassifier + ?Sized>(
    dimension: Dimension,
    model: &M,
    path: &Path,
    policy: EvaluationPolicy,
) -> Result<DimensionMetrics> {
    if !path.exists() {
        warn!(path = %path.display(), "test file not found; reporting empty metrics");
        return Ok(DimensionMetrics::default());
    }
    let test = read_training_file(path)?;
    Ok(evaluate(dimension, model, &test, policy))
}

/// Print the per-dimension summary table and per-label breakdown.
pub fn print_results(report: &EvaluationReport) {
    println!("===================================================================\n");
    println!("Final Results\n");
    println!("+------------+---------+-----------+--------+--------+");
    println!("| Dimension  | Samples | Precision | Recall |   F1   |");
    println!("+------------+---------+-----------+--------+--------+");
    for (dimension, metrics) in &report.dimensions {
        let s = &metrics.summary;
        println!(
            "| {:<10} | {:>7} | {:>8.2}% | {:>5.2}% | {:>5.2}% |",
            dimension,
            s.samples,
            s.precision * 100.0,
            s.recall * 100.0,
            s.f1 * 100.0
        );
    }
    println!("+------------+---------+-----------+--------+--------+\n");

    for (dimension, metrics) in &report.dimensions {
        println!("{}:", dimension);
        for (label, m) in &metrics.per_label_metrics {
            println!(
                "  {:<32} P={:.2} R={:.2} F1={:.2} support={}",
                label, m.precision, m.recall, m.f1, m.support
            );
        }
        if !metrics.error_cases.is_empty() {
            println!("  ({} error cases recorded)", metrics.error_cases.len());
        }
        println!();
    }

    println!("===================================================================\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::taxonomy::LabelSet;

    /// Predicts from a lookup table keyed by the example text.
    struct Lookup(Vec<(&'static str, Vec<(&'static str, f32)>)>);

    impl TextClassifier for Lookup {
        fn predict(&self, text: &str, k: usize) -> Vec<(String, f32)> {
            self.0
                .iter()
                .find(|(t, _)| *t == text)
                .map(|(_, p)| p.iter().take(k).map(|(l, s)| (l.to_string(), *s)).collect())
                .unwrap_or_default()
        }

        fn labels(&self) -> &[String] {
            &[]
        }

        fn save(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn example(labels: &[&str], text: &str) -> LabeledExample {
        let labels: LabelSet = labels.iter().map(|l| l.parse().unwrap()).collect();
        LabeledExample::new(labels, text.split_whitespace().map(String::from).collect())
    }

    #[test]
    fn test_single_false_positive_extra_label() {
        let model = Lookup(vec![("a", vec![("content_x", 0.6), ("content_y", 0.3)])]);
        let test = vec![example(&["content_x"], "a")];
        let m = evaluate(Dimension::Content, &model, &test, EvaluationPolicy::default());

        let x = &m.per_label_metrics["content_x"];
        assert_eq!((x.true_positives, x.false_positives, x.false_negatives), (1, 0, 0));
        let y = &m.per_label_metrics["content_y"];
        assert_eq!((y.true_positives, y.false_positives, y.false_negatives), (0, 1, 0));
        assert_eq!(y.support, 0);

        // content_y has no support, so it stays out of the summary
        assert_eq!(m.summary.samples, 1);
        assert_eq!(m.summary.precision, 1.0);
        assert_eq!(m.summary.recall, 1.0);
        assert_eq!(m.error_cases.len(), 1);
    }

    #[test]
    fn test_summary_is_micro_averaged() {
        let model = Lookup(vec![
            ("a", vec![("content_x", 0.6), ("content_y", 0.3)]),
            ("b", vec![("content_x", 0.8)]),
        ]);
        let test = vec![example(&["content_x"], "a"), example(&["content_y"], "b")];
        let m = evaluate(Dimension::Content, &model, &test, EvaluationPolicy::default());

        // x: tp 1, fp 1; y: fp 1, fn 1
        assert!((m.summary.precision - 1.0 / 3.0).abs() < 1e-9);
        assert!((m.summary.recall - 0.5).abs() < 1e-9);
        assert!((m.summary.f1 - 0.4).abs() < 1e-9);
        assert_eq!(m.confusion_matrix["content_y"]["content_x"], 1);
    }

    #[test]
    fn test_perfect_model_scores_one() {
        let model = Lookup(vec![
            ("a", vec![("type_doc", 0.9)]),
            ("b", vec![("type_api", 0.7), ("type_ref", 0.2)]),
        ]);
        let test = vec![
            example(&["type_doc"], "a"),
            example(&["type_api", "type_ref"], "b"),
        ];
        let m = evaluate(Dimension::Type, &model, &test, EvaluationPolicy::default());

        assert_eq!((m.summary.precision, m.summary.recall, m.summary.f1), (1.0, 1.0, 1.0));
        for metrics in m.per_label_metrics.values() {
            assert_eq!((metrics.precision, metrics.recall, metrics.f1), (1.0, 1.0, 1.0));
        }
        assert!(m.error_cases.is_empty());
    }

    #[test]
    fn test_empty_prediction_goes_to_none_column() {
        let model = Lookup(vec![]);
        let test = vec![example(&["domain_技术", "type_doc"], "b")];
        let m = evaluate(Dimension::Domain, &model, &test, EvaluationPolicy::default());

        assert_eq!(m.confusion_matrix["domain_技术"][NO_PREDICTION], 1);
        assert_eq!(m.per_label_metrics["domain_技术"].false_negatives, 1);
        assert_eq!(m.label_correlation["domain_技术"]["type_doc"], 1);
        assert_eq!(m.summary.f1, 0.0);
    }

    #[test]
    fn test_examples_without_dimension_are_ignored() {
        let model = Lookup(vec![("c", vec![("type_doc", 0.9)])]);
        let test = vec![example(&["domain_other"], "c")];
        let m = evaluate(Dimension::Type, &model, &test, EvaluationPolicy::default());
        assert_eq!(m.summary.samples, 0);
        assert!(m.per_label_metrics.is_empty());
    }

    #[test]
    fn test_error_cases_are_capped() {
        let model = Lookup(vec![]);
        let test: Vec<_> = (0..5).map(|_| example(&["type_doc"], "z")).collect();
        let policy = EvaluationPolicy {
            max_error_cases: 2,
            ..EvaluationPolicy::default()
        };
        let m = evaluate(Dimension::Type, &model, &test, policy);
        assert_eq!(m.error_cases.len(), 2);
        assert_eq!(m.summary.samples, 5);
    }

    #[test]
    fn test_missing_test_file_gives_empty_metrics() {
        let model = Lookup(vec![]);
        let m = evaluate_file(
            Dimension::Type,
            &model,
            Path::new("/no/such/test.txt"),
            EvaluationPolicy::default(),
        )
        .unwrap();
        assert_eq!(m, DimensionMetrics::default());
    }

    #[test]
    fn test_precision_recall_f1_edge_cases() {
        assert_eq!(precision_recall_f1(0, 0, 0), (0.0, 0.0, 0.0));
        assert_eq!(precision_recall_f1(2, 0, 0), (1.0, 1.0, 1.0));
        let (p, r, f) = precision_recall_f1(1, 1, 3);
        assert_eq!((p, r), (0.5, 0.25));
        assert!((f - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_report_json_is_keyed_by_dimension() {
        let mut report = EvaluationReport::default();
        report.insert(Dimension::Type, DimensionMetrics::default());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["type"]["summary"].is_object());
        assert!(json["type"]["confusion_matrix"].is_object());
        assert!(report.get(Dimension::Type).is_some());
    }
}
