//! Class balancing with noise augmentation.
//!
//! Rare labels are topped up with perturbed copies of their own examples and
//! dominant labels are downsampled to a multiple of the mean label count.

use crate::pipeline::data::LabeledExample;
use crate::pipeline::taxonomy::Label;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Balancing settings (`[balance]` in `config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub enabled: bool,
    /// Labels with fewer examples are oversampled up to this count
    pub min_samples: usize,
    /// Labels above `ratio * mean` are downsampled to `floor(ratio * mean)`
    pub max_oversample_ratio: f64,
    /// Probability of each noise operation on an augmented copy
    pub noise_probability: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        BalanceConfig {
            enabled: true,
            min_samples: 10,
            max_oversample_ratio: 1.5,
            noise_probability: 0.3,
        }
    }
}

/// Number of examples carrying each label.
pub fn label_counts(examples: &[LabeledExample]) -> BTreeMap<Label, usize> {
    let mut counts = BTreeMap::new();
    for example in examples {
        for label in &example.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Seeded balancer. The same seed and input give the same output.
pub struct Balancer {
    config: BalanceConfig,
    rng: StdRng,
}

impl Balancer {
    pub fn new(config: BalanceConfig, seed: u64) -> Self {
        Balancer {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Rebalance `examples` label by label.
    ///
    /// Examples are grouped under every label they carry, so a multi-label
    /// example can appear once per label group. Groups are emitted in label
    /// order. Labels are never modified; augmented copies only perturb tokens.
    pub fn balance(&mut self, examples: &[LabeledExample]) -> Vec<LabeledExample> {
        let mut groups: BTreeMap<&Label, Vec<&LabeledExample>> = BTreeMap::new();
        for example in examples {
            for label in &example.labels {
                groups.entry(label).or_default().push(example);
            }
        }
        if groups.is_empty() {
            return Vec::new();
        }

        let mean = groups.values().map(Vec::len).sum::<usize>() as f64 / groups.len() as f64;
        let cap = (self.config.max_oversample_ratio * mean).floor() as usize;
        let mut balanced = Vec::new();

        for (label, group) in groups {
            let count = group.len();
            if count < self.config.min_samples {
                balanced.extend(group.iter().map(|e| (*e).clone()));
                for source in group.iter().cycle().take(self.config.min_samples - count) {
                    let tokens = self.add_noise(&source.tokens);
                    balanced.push(LabeledExample::new(source.labels.clone(), tokens));
                }
                debug!(%label, from = count, to = self.config.min_samples, "oversampled");
            } else if count > cap {
                let mut picked = index::sample(&mut self.rng, count, cap).into_vec();
                picked.sort_unstable();
                balanced.extend(picked.into_iter().map(|i| group[i].clone()));
                debug!(%label, from = count, to = cap, "downsampled");
            } else {
                balanced.extend(group.iter().map(|e| (*e).clone()));
            }
        }

        balanced
    }

    /// Perturb a token sequence.
    ///
    /// Each step fires independently with the configured probability:
    /// delete a random token (needs at least 4), duplicate a random token at a
    /// random position, swap a random adjacent pair (needs at least 3).
    pub fn add_noise(&mut self, tokens: &[String]) -> Vec<String> {
        let p = self.config.noise_probability.clamp(0.0, 1.0);
        let mut out = tokens.to_vec();

        if out.len() >= 4 && self.rng.gen_bool(p) {
            let i = self.rng.gen_range(0..out.len());
            out.remove(i);
        }
        if !out.is_empty() && self.rng.gen_bool(p) {
            let token = out[self.rng.gen_range(0..out.len())].clone();
            let at = self.rng.gen_range(0..=out.len());
            out.insert(at, token);
        }
        if out.len() >= 3 && self.rng.gen_bool(p) {
            let i = self.rng.gen_range(0..out.len() - 1);
            out.swap(i, i + 1);
        }

        out
    }
}
