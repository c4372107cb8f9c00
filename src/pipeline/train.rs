//! Model training pipeline for the bookmark classifier.

use super::balance::{BalanceConfig, Balancer};
use super::config::{Config, ModelConfig};
use super::curate::{build_dataset, dedupe, split, ProcessingSummary};
use super::data::{load_bookmarks, write_training_file, Bookmark, LabeledExample};
use super::evaluate::{evaluate, print_results, EvaluationPolicy, EvaluationReport};
use super::features::FeatureExtractor;
use super::save::save_models;
use super::taxonomy::{Dimension, LabelResolver, LabelSet};
use crate::backend::{ClassifierBackend, Hyperparameters};
use crate::error::{Error, Result};
use crate::model_loader::ModelFiles;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Keep examples with at least one label in `dimension`, retaining only those
/// labels.
pub fn filter_dimension(examples: &[LabeledExample], dimension: Dimension) -> Vec<LabeledExample> {
    examples
        .iter()
        .filter_map(|e| {
            let labels: LabelSet = e
                .labels
                .iter()
                .filter(|l| l.dimension() == dimension)
                .cloned()
                .collect();
            (!labels.is_empty()).then(|| LabeledExample::new(labels, e.tokens.clone()))
        })
        .collect()
}

/// Models that trained successfully and the errors of those that did not.
pub struct TrainingReport<M> {
    pub models: BTreeMap<Dimension, M>,
    pub failures: BTreeMap<Dimension, Error>,
}

/// Trains one model per dimension through a [`ClassifierBackend`].
pub struct DimensionTrainer<'a, B> {
    backend: &'a B,
    model: &'a ModelConfig,
}

impl<'a, B: ClassifierBackend> DimensionTrainer<'a, B> {
    pub fn new(backend: &'a B, model: &'a ModelConfig) -> Self {
        DimensionTrainer { backend, model }
    }

    /// Train the model for `dimension`.
    ///
    /// Examples are filtered to the dimension first. Small datasets get the
    /// small-sample hyperparameter adjustments.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyDimension`] when no example carries a label of
    /// `dimension`; otherwise whatever the backend reports.
    pub fn train(
        &self,
        dimension: Dimension,
        examples: &[LabeledExample],
        params: &Hyperparameters,
    ) -> Result<B::Model> {
        let filtered = filter_dimension(examples, dimension);
        if filtered.is_empty() {
            return Err(Error::EmptyDimension(dimension));
        }

        let adapted = self.adapt(dimension, params, filtered.len());
        self.fit(dimension, &filtered, &adapted)
    }

    /// Filter, balance and train one dimension.
    ///
    /// The small-dataset adjustment looks at the filtered count, before
    /// oversampling inflates it. The backend seed is offset by `index`.
    fn train_balanced(
        &self,
        dimension: Dimension,
        examples: &[LabeledExample],
        balance: &BalanceConfig,
        seed: u64,
        index: u64,
    ) -> Result<B::Model> {
        let filtered = filter_dimension(examples, dimension);
        if filtered.is_empty() {
            return Err(Error::EmptyDimension(dimension));
        }

        let mut params = self.model.for_dimension(dimension);
        params.seed = params.seed.wrapping_add(index);
        let adapted = self.adapt(dimension, &params, filtered.len());

        let prepared = if balance.enabled {
            let mut balancer = Balancer::new(balance.clone(), seed.wrapping_add(index));
            let balanced = balancer.balance(&filtered);
            info!(%dimension, before = filtered.len(), after = balanced.len(), "balanced");
            balanced
        } else {
            filtered
        };
        self.fit(dimension, &prepared, &adapted)
    }

    fn adapt(
        &self,
        dimension: Dimension,
        params: &Hyperparameters,
        examples: usize,
    ) -> Hyperparameters {
        let adapted = self.model.adapt_to_size(params, examples);
        if &adapted != params {
            info!(
                %dimension,
                examples,
                min_count = adapted.min_count,
                word_ngrams = adapted.word_ngrams,
                epochs = adapted.epochs,
                "small dataset; adjusted hyperparameters"
            );
        }
        adapted
    }

    fn fit(
        &self,
        dimension: Dimension,
        examples: &[LabeledExample],
        params: &Hyperparameters,
    ) -> Result<B::Model> {
        info!(%dimension, examples = examples.len(), seed = params.seed, "training");
        let start = Instant::now();
        let model = self.backend.train(examples, params)?;
        info!(%dimension, secs = start.elapsed().as_secs_f64(), "trained");
        Ok(model)
    }

    /// Train all three dimensions concurrently.
    ///
    /// Dimension `i` (type 0, domain 1, content 2) balances with `seed + i`
    /// and trains with its configured backend seed `+ i`. A failing
    /// dimension does not stop the others; its error is kept in
    /// [`TrainingReport::failures`].
    pub fn train_all(
        &self,
        examples: &[LabeledExample],
        balance: &BalanceConfig,
        seed: u64,
    ) -> TrainingReport<B::Model> {
        let mut report = TrainingReport {
            models: BTreeMap::new(),
            failures: BTreeMap::new(),
        };

        std::thread::scope(|s| {
            let handles: Vec<_> = Dimension::ALL
                .into_iter()
                .enumerate()
                .map(|(i, dimension)| {
                    let handle = s.spawn(move || {
                        self.train_balanced(dimension, examples, balance, seed, i as u64)
                    });
                    (dimension, handle)
                })
                .collect();

            for (dimension, handle) in handles {
                match handle.join() {
                    Ok(Ok(model)) => {
                        report.models.insert(dimension, model);
                    }
                    Ok(Err(e)) => {
                        warn!(%dimension, "training failed: {}", e);
                        report.failures.insert(dimension, e);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        report
    }
}

/// Deduplicated, labeled and split bookmarks.
pub struct PreparedDataset {
    pub train: Vec<LabeledExample>,
    pub test: Vec<LabeledExample>,
    pub summary: ProcessingSummary,
}

/// Turn raw bookmarks into train/test partitions and write them as
/// `train.txt` / `test.txt` into `files.dir`.
pub fn prepare_dataset(
    config: &Config,
    bookmarks: Vec<Bookmark>,
    files: &ModelFiles,
) -> Result<PreparedDataset> {
    let resolver = LabelResolver::new(&config.taxonomy)?;
    let extractor = FeatureExtractor::new(&config.features, &config.taxonomy);

    let unique = dedupe(bookmarks, &resolver)?;
    let (examples, summary) = build_dataset(&unique, &extractor, &resolver);
    if examples.is_empty() {
        return Err(Error::EmptyDataset);
    }

    let (train, test) = split(examples, config.data.test_fraction, config.data.seed)?;
    info!(train = train.len(), test = test.len(), "split dataset");

    write_training_file(&files.train_data(), &train)?;
    write_training_file(&files.test_data(), &test)?;

    Ok(PreparedDataset {
        train,
        test,
        summary,
    })
}

/// Result of a full training run.
#[derive(Debug)]
pub struct TrainingOutcome {
    pub summary: ProcessingSummary,
    pub trained: Vec<Dimension>,
    pub failures: BTreeMap<Dimension, String>,
    pub report: EvaluationReport,
}

/// Train the bookmark classifier.
///
/// This function orchestrates the entire training pipeline:
/// 1. Load, deduplicate, label and split bookmarks
/// 2. Balance and train one model per dimension
/// 3. Evaluate each model on the test partition
/// 4. Save models and `metrics.json`
///
/// Model files of dimensions that failed are removed from the output
/// directory. When no dimension trains, nothing is saved and
/// [`Error::NoDimensionTrained`] carries every failure.
///
/// # Arguments
///
/// * `config` - Full configuration
/// * `input` - Bookmark file (`.csv` or `.json`)
/// * `backend` - Classifier backend to train with
pub fn train_model<B: ClassifierBackend>(
    config: &Config,
    input: &Path,
    backend: &B,
) -> Result<TrainingOutcome> {
    let start = Instant::now();
    let files = ModelFiles::new(&config.output.model_dir);

    let bookmarks = load_bookmarks(input)?;
    let dataset = prepare_dataset(config, bookmarks, &files)?;

    let trainer = DimensionTrainer::new(backend, &config.model);
    let training = trainer.train_all(&dataset.train, &config.balance, config.data.seed);

    remove_stale_models(&files, training.failures.keys().copied())?;
    if training.models.is_empty() {
        let metrics = files.metrics();
        if metrics.exists() {
            std::fs::remove_file(&metrics)?;
        }
        return Err(Error::NoDimensionTrained(describe(&training.failures)));
    }

    let mut report = EvaluationReport::default();
    for (&dimension, model) in &training.models {
        let policy = EvaluationPolicy {
            prediction: config.evaluation.policy_for(dimension),
            max_error_cases: config.evaluation.max_error_cases,
        };
        report.insert(dimension, evaluate(dimension, model, &dataset.test, policy));
    }

    save_models(&training.models, &report, &files)?;
    print_results(&report);

    let failures = describe(&training.failures);
    for (dimension, reason) in &failures {
        println!("✗ {} not trained: {}", dimension, reason);
    }
    println!(
        "\nTotal training time: {:.2}s\n",
        start.elapsed().as_secs_f64()
    );

    Ok(TrainingOutcome {
        summary: dataset.summary,
        trained: training.models.keys().copied().collect(),
        failures,
        report,
    })
}

fn describe(failures: &BTreeMap<Dimension, Error>) -> BTreeMap<Dimension, String> {
    failures.iter().map(|(d, e)| (*d, e.to_string())).collect()
}

/// Delete model files left by an earlier run for dimensions that did not
/// train this time, so loading never mixes runs.
fn remove_stale_models(files: &ModelFiles, failed: impl Iterator<Item = Dimension>) -> Result<()> {
    for dimension in failed {
        let path = files.model(dimension);
        if path.exists() {
            warn!(%dimension, path = %path.display(), "removing model from an earlier run");
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}
