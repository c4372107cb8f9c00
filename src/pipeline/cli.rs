//! Command-line interface for the bookmark classifier.

use super::analyze::{analyze, print_report};
use super::config::Config;
use super::data::load_bookmarks;
use super::evaluate::{evaluate_file, print_results, EvaluationPolicy, EvaluationReport};
use super::organize::organize;
use super::predict::predict_single;
use super::taxonomy::LabelResolver;
use super::train::{prepare_dataset, train_model};
use crate::api::Predictor;
use crate::backend::{ClassifierBackend, LinearBackend};
use crate::error::{Error, Result};
use crate::model_loader::{ensure_model_files, ModelFiles};
use crate::pipeline::taxonomy::Dimension;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bookmark-classifier")]
#[command(about = "Classify bookmarks by type, domain and content", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train one model per dimension and write models/metrics
    Train {
        /// Bookmark file (.csv or .json); defaults to `data.input`
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output directory (overrides `output.model_dir`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        test_fraction: Option<f64>,

        #[arg(long)]
        epochs: Option<usize>,

        /// Learning rate
        #[arg(long)]
        lr: Option<f32>,

        /// Embedding dimension
        #[arg(long)]
        dim: Option<usize>,

        #[arg(long)]
        word_ngrams: Option<usize>,

        #[arg(long)]
        min_count: Option<usize>,

        /// Minimum score for a predicted label
        #[arg(long)]
        threshold: Option<f32>,

        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Write train.txt / test.txt without training
    Convert {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate saved models on a training-line file
    Evaluate {
        #[arg(short, long)]
        test: PathBuf,

        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Classify a single text
    Predict {
        /// Title, URL or both
        text: String,

        #[arg(short, long)]
        models: Option<PathBuf>,
    },

    /// Sort bookmarks into a folder tree by predicted labels
    Organize {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        models: Option<PathBuf>,

        #[arg(short, long, default_value = "organized.json")]
        output: PathBuf,
    },

    /// Print label, host and language statistics
    Analyze {
        #[arg(short, long)]
        input: PathBuf,

        /// Also write the statistics as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Group bookmarks with an OpenAI-compatible chat model
    #[cfg(feature = "llm")]
    Categorize {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value = "categorized.json")]
        output: PathBuf,
    },
}

/// Run a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_or_default(&cli.config);

    match cli.command {
        Commands::Train {
            input,
            output,
            seed,
            test_fraction,
            epochs,
            lr,
            dim,
            word_ngrams,
            min_count,
            threshold,
            top_k,
        } => {
            let input = input.or_else(|| config.data.input.clone()).ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "no bookmark file: pass --input or set data.input",
                ))
            })?;

            if let Some(dir) = output {
                config.output.model_dir = dir;
            }
            if let Some(seed) = seed {
                config.data.seed = seed;
                config.model.defaults.seed = seed;
            }
            if let Some(f) = test_fraction {
                config.data.test_fraction = f;
            }
            let params = &mut config.model.defaults;
            if let Some(v) = epochs {
                params.epochs = v;
            }
            if let Some(v) = lr {
                params.learning_rate = v;
            }
            if let Some(v) = dim {
                params.dim = v;
            }
            if let Some(v) = word_ngrams {
                params.word_ngrams = v;
            }
            if let Some(v) = min_count {
                params.min_count = v;
            }
            if let Some(v) = threshold {
                config.evaluation.threshold = v;
            }
            if let Some(v) = top_k {
                config.evaluation.top_k = v;
            }

            print_banner("Training");
            let outcome = train_model(&config, &input, &LinearBackend)?;
            println!(
                "Bookmarks: {} total, {} kept, {} skipped",
                outcome.summary.total, outcome.summary.kept, outcome.summary.skipped
            );
            Ok(())
        }

        Commands::Convert { input, output } => {
            let files = ModelFiles::new(output.unwrap_or_else(|| config.output.model_dir.clone()));
            std::fs::create_dir_all(&files.dir)?;
            let bookmarks = load_bookmarks(&input)?;
            let dataset = prepare_dataset(&config, bookmarks, &files)?;

            println!("\n✓ Training files written:");
            println!("  - {} ({} examples)", files.train_data().display(), dataset.train.len());
            println!("  - {} ({} examples)", files.test_data().display(), dataset.test.len());
            println!(
                "\nBookmarks: {} total, {} kept, {} skipped\n",
                dataset.summary.total, dataset.summary.kept, dataset.summary.skipped
            );
            Ok(())
        }

        Commands::Evaluate { test, models } => {
            let files = ModelFiles::new(models.unwrap_or_else(|| config.output.model_dir.clone()));
            let available = ensure_model_files(&files, &Dimension::ALL)?;

            let mut report = EvaluationReport::default();
            for dimension in available {
                let model = LinearBackend.load(&files.model(dimension))?;
                let policy = EvaluationPolicy {
                    prediction: config.evaluation.policy_for(dimension),
                    max_error_cases: config.evaluation.max_error_cases,
                };
                report.insert(dimension, evaluate_file(dimension, &model, &test, policy)?);
            }
            print_results(&report);
            Ok(())
        }

        Commands::Predict { text, models } => {
            let dir = models.unwrap_or_else(|| config.output.model_dir.clone());
            predict_single(&text, &dir, &config)
        }

        Commands::Organize {
            input,
            models,
            output,
        } => {
            let dir = models.unwrap_or_else(|| config.output.model_dir.clone());
            let predictor = Predictor::load(&dir, &config)?;
            let bookmarks = load_bookmarks(&input)?;
            let predictions = predictor.predict_bookmarks(&bookmarks);

            let (tree, summary) = organize(&bookmarks, &predictions);
            tree.save(&output)?;

            println!("\n✓ Folder tree written to {}", output.display());
            println!(
                "  {} bookmarks: {} classified, {} unclassified\n",
                summary.total, summary.classified, summary.unclassified
            );
            Ok(())
        }

        Commands::Analyze { input, output } => {
            let resolver = LabelResolver::new(&config.taxonomy)?;
            let bookmarks = load_bookmarks(&input)?;
            let stats = analyze(&bookmarks, &resolver);
            print_report(&stats);

            if let Some(path) = output {
                write_json(&path, &stats)?;
                info!(path = %path.display(), "wrote statistics");
            }
            Ok(())
        }

        #[cfg(feature = "llm")]
        Commands::Categorize { input, output } => {
            use super::organize::Folder;
            use crate::llm::{LlmCategorizer, OpenAiClient, Outcome};

            let bookmarks = load_bookmarks(&input)?;
            let categorizer = LlmCategorizer::new(OpenAiClient::with_default()?);

            match categorizer.categorize_or_original(bookmarks) {
                Outcome::Categorized(tree) => {
                    tree.save(&output)?;
                    println!("\n✓ Categorized bookmarks written to {}\n", output.display());
                }
                Outcome::Original { bookmarks, reason } => {
                    let mut root = Folder::new("Bookmarks");
                    root.bookmarks = bookmarks;
                    root.save(&output)?;
                    println!("\n✗ Categorization failed: {}", reason);
                    println!("  Original bookmarks written to {}\n", output.display());
                }
            }
            Ok(())
        }
    }
}

fn print_banner(title: &str) {
    println!("\n===================================================================");
    println!("  Bookmark Classifier: {}", title);
    println!("===================================================================\n");
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
