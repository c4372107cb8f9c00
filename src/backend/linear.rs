//! Linear bag-of-tokens classifier in pure Rust.
//!
//! Each token and each hashed word n-gram owns an embedding row. A document is
//! the average of its rows, and a single output matrix maps that hidden vector
//! to label scores (softmax or one-vs-all sigmoid). Training is plain SGD with
//! a linearly decaying learning rate.

use super::{ClassifierBackend, Hyperparameters, Loss, TextClassifier};
use crate::error::{Error, Result};
use crate::pipeline::data::LabeledExample;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Trained linear classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    words: HashMap<String, usize>,
    labels: Vec<String>,
    /// `(words + buckets) x dim`
    input: Array2<f32>,
    /// `labels x dim`
    output: Array2<f32>,
    word_ngrams: usize,
    buckets: usize,
    loss: Loss,
}

/// Backend producing [`LinearClassifier`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearBackend;

impl ClassifierBackend for LinearBackend {
    type Model = LinearClassifier;

    fn train(&self, examples: &[LabeledExample], params: &Hyperparameters) -> Result<LinearClassifier> {
        LinearClassifier::train(examples, params)
    }

    fn load(&self, path: &Path) -> Result<LinearClassifier> {
        LinearClassifier::load(path)
    }
}

impl LinearClassifier {
    pub fn train(examples: &[LabeledExample], params: &Hyperparameters) -> Result<Self> {
        if examples.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for example in examples {
            for token in &example.tokens {
                *counts.entry(token.as_str()).or_insert(0) += 1;
            }
        }
        let words: HashMap<String, usize> = counts
            .into_iter()
            .filter(|(_, c)| *c >= params.min_count.max(1))
            .enumerate()
            .map(|(id, (w, _))| (w.to_string(), id))
            .collect();

        let buckets = if params.word_ngrams > 1 { params.buckets } else { 0 };
        if words.is_empty() && buckets == 0 {
            return Err(Error::EmptyVocabulary {
                min_count: params.min_count,
            });
        }

        let labels: Vec<String> = examples
            .iter()
            .flat_map(|e| e.labels.iter().map(|l| l.to_string()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let label_ids: HashMap<&str, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();

        let dim = params.dim.max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let bound = 1.0 / dim as f32;
        let input = Array2::from_shape_fn((words.len() + buckets, dim), |_| {
            rng.gen_range(-bound..bound)
        });

        let mut model = LinearClassifier {
            words,
            input,
            output: Array2::zeros((labels.len(), dim)),
            labels: Vec::new(),
            word_ngrams: params.word_ngrams.max(1),
            buckets,
            loss: params.loss,
        };

        let encoded: Vec<(Vec<usize>, Vec<usize>)> = examples
            .iter()
            .filter_map(|e| {
                let ids = model.token_ids(e.tokens.iter().map(String::as_str));
                let targets: Vec<usize> = e
                    .labels
                    .iter()
                    .filter_map(|l| label_ids.get(l.to_string().as_str()).copied())
                    .collect();
                (!ids.is_empty() && !targets.is_empty()).then_some((ids, targets))
            })
            .collect();
        model.labels = labels;

        if encoded.is_empty() {
            return Err(Error::EmptyVocabulary {
                min_count: params.min_count,
            });
        }

        let total_steps = (params.epochs * encoded.len()).max(1) as f32;
        let mut order: Vec<usize> = (0..encoded.len()).collect();
        let mut step = 0usize;

        for epoch in 0..params.epochs {
            order.shuffle(&mut rng);
            let mut total_loss = 0.0;

            for &i in &order {
                let lr = params.learning_rate * (1.0 - step as f32 / total_steps).max(1e-4);
                let (ids, targets) = &encoded[i];
                total_loss += model.update(ids, targets, lr, &mut rng);
                step += 1;
            }

            if (epoch + 1) % 5 == 0 || epoch + 1 == params.epochs {
                debug!(
                    epoch = epoch + 1,
                    epochs = params.epochs,
                    loss = total_loss / encoded.len() as f32,
                    "training"
                );
            }
        }

        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(bincode::deserialize_from(reader)?)
    }

    /// One SGD step; returns the example loss.
    fn update(&mut self, ids: &[usize], targets: &[usize], lr: f32, rng: &mut StdRng) -> f32 {
        let hidden = self.hidden(ids);
        let mut grad = Array1::<f32>::zeros(hidden.len());
        let mut loss = 0.0;

        match self.loss {
            Loss::Softmax => {
                let target = targets[rng.gen_range(0..targets.len())];
                let probs = softmax(&self.output.dot(&hidden));
                for (j, &p) in probs.iter().enumerate() {
                    let truth = if j == target { 1.0 } else { 0.0 };
                    let alpha = lr * (truth - p);
                    grad.scaled_add(alpha, &self.output.row(j));
                    self.output.row_mut(j).scaled_add(alpha, &hidden);
                }
                loss = -probs[target].max(1e-7).ln();
            }
            Loss::Ova => {
                for j in 0..self.output.nrows() {
                    let truth = targets.contains(&j);
                    let score = sigmoid(self.output.row(j).dot(&hidden));
                    let alpha = lr * (f32::from(u8::from(truth)) - score);
                    grad.scaled_add(alpha, &self.output.row(j));
                    self.output.row_mut(j).scaled_add(alpha, &hidden);
                    let p = if truth { score } else { 1.0 - score };
                    loss -= p.max(1e-7).ln();
                }
            }
        }

        let scale = 1.0 / ids.len() as f32;
        for &id in ids {
            self.input.row_mut(id).scaled_add(scale, &grad);
        }
        loss
    }

    fn hidden(&self, ids: &[usize]) -> Array1<f32> {
        let mut hidden = Array1::<f32>::zeros(self.input.ncols());
        for &id in ids {
            hidden += &self.input.row(id);
        }
        if !ids.is_empty() {
            hidden /= ids.len() as f32;
        }
        hidden
    }

    /// Input rows for known tokens plus hashed n-grams of the raw sequence.
    fn token_ids<'a>(&self, tokens: impl Iterator<Item = &'a str>) -> Vec<usize> {
        let tokens: Vec<&str> = tokens.collect();
        let mut ids: Vec<usize> = tokens.iter().filter_map(|t| self.words.get(*t).copied()).collect();

        if self.buckets > 0 {
            for n in 2..=self.word_ngrams {
                for window in tokens.windows(n) {
                    let hash = fnv1a(window);
                    ids.push(self.words.len() + (hash % self.buckets as u64) as usize);
                }
            }
        }
        ids
    }
}

impl TextClassifier for LinearClassifier {
    fn predict(&self, text: &str, k: usize) -> Vec<(String, f32)> {
        let ids = self.token_ids(text.split_whitespace());
        if ids.is_empty() || k == 0 {
            return Vec::new();
        }

        let raw = self.output.dot(&self.hidden(&ids));
        let scores = match self.loss {
            Loss::Softmax => softmax(&raw),
            Loss::Ova => raw.mapv(sigmoid),
        };

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(k)
            .map(|(i, score)| (self.labels[i].clone(), score))
            .collect()
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

fn softmax(x: &Array1<f32>) -> Array1<f32> {
    let max = x.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp = x.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    exp / sum
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Stable 64-bit FNV-1a over space-joined tokens.
fn fnv1a(tokens: &[&str]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for (i, token) in tokens.iter().enumerate() {
        let sep: &[u8] = if i == 0 { b"" } else { b" " };
        for &byte in sep.iter().chain(token.as_bytes()) {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}
