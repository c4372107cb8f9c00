//! End-to-end pipeline tests: dataset preparation, training, persistence and
//! prediction, plus properties of the individual stages.

use bookmark_classifier::backend::{Hyperparameters, LinearBackend, TextClassifier};
use bookmark_classifier::pipeline::balance::{label_counts, BalanceConfig, Balancer};
use bookmark_classifier::pipeline::config::Config;
use bookmark_classifier::pipeline::curate::{build_dataset, dedupe, split};
use bookmark_classifier::pipeline::evaluate::{evaluate, precision_recall_f1, EvaluationPolicy};
use bookmark_classifier::pipeline::features::{FeatureConfig, FeatureExtractor};
use bookmark_classifier::pipeline::taxonomy::labels_in;
use bookmark_classifier::pipeline::train::train_model;
use bookmark_classifier::{
    Bookmark, Dimension, Error, Label, LabelResolver, LabeledExample, Predictor, Taxonomy,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn labels(raw: &[&str]) -> BTreeSet<Label> {
    raw.iter().map(|l| l.parse().unwrap()).collect()
}

fn write_collection(path: &Path) {
    let rows = [
        ("doc: Python 文档", "https://docs.python.org/3/library/"),
        ("doc: Rust 标准库", "https://doc.rust-lang.org/std/"),
        ("doc: Java 开发指南", "https://docs.oracle.com/javase/"),
        ("pkg: requests", "https://pypi.org/project/requests/"),
        ("pkg: serde", "https://crates.io/crates/serde"),
        ("pkg: lodash javascript", "https://www.npmjs.com/package/lodash"),
        ("api: GitHub REST", "https://docs.github.com/en/rest"),
        ("tool: 在线代码格式化工具", "https://github.com/prettier/prettier"),
        ("原神 攻略", "https://www.miyoushe.com/ys/article/1"),
        ("Steam 游戏 促销", "https://store.steam.com/sale/"),
        ("动漫 新番", "https://www.bilibili.com/anime/"),
        ("塞尔达 switch 攻略", "https://www.nintendo.com/zelda/"),
        ("科技新闻 报道", "https://news.example.com/tech/1"),
        ("知乎 专栏 观点", "https://zhuanlan.zhihu.com/p/1"),
        ("掘金 博客 文章", "https://juejin.cn/post/1"),
        ("Python 教程 入门", "https://www.runoob.com/python/python-tutorial.html"),
        ("机器学习 课程", "https://www.coursera.org/learn/machine-learning"),
        ("美食 外卖", "https://waimai.meituan.com/"),
        ("旅游 酒店 订票", "https://hotels.ctrip.com/"),
        ("UI 设计 灵感", "https://dribbble.com/shots/1"),
        ("插画 素材", "https://www.zcool.com.cn/work/1"),
        ("Grandma's recipes", "https://recipes.example.org/pie"),
    ];
    let mut csv = String::from("title,url\n");
    for (title, url) in rows {
        csv.push_str(&format!("\"{}\",{}\n", title, url));
    }
    fs::write(path, csv).unwrap();
}

fn quick_config(model_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.model_dir = model_dir.to_path_buf();
    config.data.test_fraction = 0.2;
    config.model.defaults = Hyperparameters {
        epochs: 10,
        dim: 16,
        buckets: 1000,
        ..Hyperparameters::default()
    };
    config.balance.min_samples = 3;
    config
}

#[test]
fn test_train_save_load_predict() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bookmarks.csv");
    write_collection(&input);
    let models = dir.path().join("models");
    let config = quick_config(&models);

    let outcome = train_model(&config, &input, &LinearBackend).unwrap();
    assert_eq!(outcome.summary.total, 22);
    assert_eq!(outcome.summary.kept, 22);
    assert_eq!(outcome.trained, vec![Dimension::Type, Dimension::Domain, Dimension::Content]);
    assert!(outcome.failures.is_empty());

    for file in [
        "type_model.bin",
        "domain_model.bin",
        "content_model.bin",
        "metrics.json",
        "train.txt",
        "test.txt",
    ] {
        assert!(models.join(file).exists(), "missing {}", file);
    }

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(models.join("metrics.json")).unwrap()).unwrap();
    for dimension in ["type", "domain", "content"] {
        let f1 = metrics[dimension]["summary"]["f1"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&f1));
    }

    let predictor = Predictor::load(&models, &config).unwrap();
    assert_eq!(predictor.dimensions().len(), 3);

    let prediction = predictor.predict_bookmark("Python 开发", "https://docs.python.org/3/tutorial/");
    assert!(!prediction.domain.is_empty());
    assert!(!prediction.content.is_empty());
    for dimension in Dimension::ALL {
        for scored in prediction.labels(dimension) {
            assert_eq!(scored.label.dimension(), dimension);
            assert!(scored.score >= config.evaluation.threshold);
        }
    }

    let batch = predictor.predict_batch(&["rust https://doc.rust-lang.org/", "原神 攻略"]);
    assert_eq!(batch.len(), 2);
}

#[test]
fn test_predictor_skips_missing_dimension() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bookmarks.csv");
    write_collection(&input);
    let models = dir.path().join("models");
    let config = quick_config(&models);
    train_model(&config, &input, &LinearBackend).unwrap();

    fs::remove_file(models.join("type_model.bin")).unwrap();
    let predictor = Predictor::load(&models, &config).unwrap();
    assert_eq!(predictor.dimensions(), vec![Dimension::Domain, Dimension::Content]);
    assert!(predictor.predict("doc: rust").type_.is_empty());
}

#[test]
fn test_missing_models_is_error() {
    let dir = tempdir().unwrap();
    let result = Predictor::load(&dir.path().join("nothing"), &Config::default());
    assert!(matches!(result, Err(Error::ModelNotFound(_))));
}

#[test]
fn test_scenario_prefix_keyword_and_fallback() {
    let taxonomy = Taxonomy {
        content_types: Vec::new(),
        ..Taxonomy::default()
    };
    let resolver = LabelResolver::new(&taxonomy).unwrap();
    let extractor = FeatureExtractor::new(&FeatureConfig::default(), &taxonomy);
    let bookmarks = vec![Bookmark::new("doc: Python Guide", "https://docs.python.org/3/")];

    let (examples, summary) = build_dataset(&bookmarks, &extractor, &resolver);
    assert_eq!(summary.kept, 1);
    let example = &examples[0];
    assert_eq!(example.labels, labels(&["type_doc", "domain_技术", "content_other"]));
    assert!(example.tokens.contains(&"domain_docs_python_org".to_string()));
    assert!(example.tokens.contains(&"path_3".to_string()));
}

#[test]
fn test_scenario_dedupe_prefers_resolvable_prefix() {
    let resolver = LabelResolver::new(&Taxonomy::default()).unwrap();
    let bookmarks = vec![
        Bookmark::new("Some page", "https://example.org/x"),
        Bookmark::new("doc: Some page", "https://example.org/x"),
    ];
    let unique = dedupe(bookmarks, &resolver).unwrap();
    assert_eq!(unique, vec![Bookmark::new("doc: Some page", "https://example.org/x")]);
}

#[test]
fn test_scenario_rare_label_oversampled() {
    let rare: Vec<LabeledExample> = (0..3)
        .map(|i| {
            LabeledExample::new(
                labels(&["type_api"]),
                format!("graphql schema query t{i}")
                    .split_whitespace()
                    .map(String::from)
                    .collect(),
            )
        })
        .collect();

    let mut balancer = Balancer::new(BalanceConfig::default(), 7);
    let balanced = balancer.balance(&rare);
    let api = labels(&["type_api"]);
    let with_label: Vec<_> = balanced.iter().filter(|e| e.labels == api).collect();
    assert!(with_label.len() >= 10);
    assert!(with_label.len() - rare.len() >= 7);
}

#[test]
fn test_scenario_split_is_reproducible() {
    let items: Vec<u32> = (0..100).collect();
    let (train_a, test_a) = split(items.clone(), 0.2, 42).unwrap();
    let (train_b, test_b) = split(items, 0.2, 42).unwrap();
    assert_eq!((train_a.len(), test_a.len()), (80, 20));
    assert_eq!(train_a, train_b);
    assert_eq!(test_a, test_b);
}

/// Predicts exactly the `label:` tokens present in the text.
struct Oracle;

impl TextClassifier for Oracle {
    fn predict(&self, text: &str, k: usize) -> Vec<(String, f32)> {
        text.split_whitespace()
            .filter_map(|t| t.strip_prefix("label:"))
            .take(k)
            .map(|l| (l.to_string(), 1.0))
            .collect()
    }

    fn labels(&self) -> &[String] {
        &[]
    }

    fn save(&self, _path: &Path) -> bookmark_classifier::Result<()> {
        Ok(())
    }
}

#[test]
fn test_scenario_perfect_model_scores_one() {
    let test: Vec<LabeledExample> = [["domain_技术", "type_doc"], ["domain_游戏娱乐", "type_pkg"]]
        .iter()
        .map(|raw| {
            let set = labels(raw);
            let tokens = set.iter().map(|l| format!("label:{}", l)).collect();
            LabeledExample::new(set, tokens)
        })
        .collect();

    for dimension in [Dimension::Type, Dimension::Domain] {
        let metrics = evaluate(dimension, &Oracle, &test, EvaluationPolicy::default());
        assert_eq!(metrics.summary.samples, 2);
        assert_eq!(metrics.summary.precision, 1.0);
        assert_eq!(metrics.summary.recall, 1.0);
        assert_eq!(metrics.summary.f1, 1.0);
        for m in metrics.per_label_metrics.values() {
            assert_eq!((m.precision, m.recall, m.f1), (1.0, 1.0, 1.0));
        }
        assert!(metrics.error_cases.is_empty());
    }
}

#[test]
fn test_scenario_empty_dimension_does_not_block_others() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("bookmarks.csv");
    // no title prefixes, so nothing carries a type label
    fs::write(
        &input,
        "title,url\n\
         Python 开发,https://docs.python.org/3/\n\
         Rust 代码,https://github.com/rust-lang/rust\n\
         原神 攻略,https://www.miyoushe.com/ys/\n\
         Steam 游戏,https://store.steam.com/\n\
         美食 外卖,https://waimai.meituan.com/\n",
    )
    .unwrap();
    let mut config = quick_config(&dir.path().join("models"));
    config.data.test_fraction = 0.2;

    let outcome = train_model(&config, &input, &LinearBackend).unwrap();
    assert_eq!(outcome.trained, vec![Dimension::Domain, Dimension::Content]);
    assert!(outcome.failures.contains_key(&Dimension::Type));
    assert!(outcome.report.get(Dimension::Type).is_none());
    assert!(!dir.path().join("models/type_model.bin").exists());
    assert!(dir.path().join("models/domain_model.bin").exists());
}

#[test]
fn test_retrain_without_type_labels_drops_old_type_model() {
    let dir = tempdir().unwrap();
    let models = dir.path().join("models");
    let config = quick_config(&models);

    let first = dir.path().join("first.csv");
    write_collection(&first);
    train_model(&config, &first, &LinearBackend).unwrap();
    assert!(models.join("type_model.bin").exists());

    let second = dir.path().join("second.csv");
    fs::write(
        &second,
        "title,url\n\
         Python 开发,https://docs.python.org/3/\n\
         Rust 代码,https://github.com/rust-lang/rust\n\
         原神 攻略,https://www.miyoushe.com/ys/\n\
         Steam 游戏,https://store.steam.com/\n\
         美食 外卖,https://waimai.meituan.com/\n",
    )
    .unwrap();
    let outcome = train_model(&config, &second, &LinearBackend).unwrap();
    assert!(outcome.failures.contains_key(&Dimension::Type));

    assert!(!models.join("type_model.bin").exists());
    let predictor = Predictor::load(&models, &config).unwrap();
    assert_eq!(predictor.dimensions(), vec![Dimension::Domain, Dimension::Content]);
}

fn arb_bookmark() -> impl Strategy<Value = (String, String)> {
    (
        "(doc:|pkg:|api:)?[a-zA-Z\u{4e00}-\u{4e0f} &;:]{0,30}",
        "(https?://)?[a-z]{1,8}(\\.[a-z]{2,4}){0,2}(/[a-zA-Z0-9_.%-]{0,10}){0,4}",
    )
}

proptest! {
    #[test]
    fn prop_extraction_is_deterministic((title, url) in arb_bookmark()) {
        let extractor = FeatureExtractor::new(&FeatureConfig::default(), &Taxonomy::default());
        prop_assert_eq!(extractor.extract(&title, &url), extractor.extract(&title, &url));
    }

    #[test]
    fn prop_domain_and_content_always_resolve((title, url) in arb_bookmark()) {
        let resolver = LabelResolver::new(&Taxonomy::default()).unwrap();
        let set = resolver.resolve(&title, &url);
        prop_assert!(labels_in(&set, Dimension::Domain).count() >= 1);
        prop_assert!(labels_in(&set, Dimension::Content).count() >= 1);
    }

    #[test]
    fn prop_split_conserves_items(n in 1usize..200, fraction in 0.0f64..0.95, seed in any::<u64>()) {
        let items: Vec<usize> = (0..n).collect();
        if let Ok((train, test)) = split(items, fraction, seed) {
            prop_assert_eq!(train.len() + test.len(), n);
            let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn prop_metrics_are_bounded(tp in 0usize..1000, fp in 0usize..1000, fn_ in 0usize..1000) {
        let (p, r, f1) = precision_recall_f1(tp, fp, fn_);
        for v in [p, r, f1] {
            prop_assert!((0.0..=1.0).contains(&v));
        }
        if p > 0.0 && r > 0.0 {
            prop_assert!((f1 - 2.0 * p * r / (p + r)).abs() < 1e-12);
        } else {
            prop_assert_eq!(f1, 0.0);
        }
    }

    #[test]
    fn prop_balancing_keeps_labels(counts in proptest::collection::vec(1usize..30, 1..6), seed in any::<u64>()) {
        let values = ["doc", "pkg", "api", "tool", "ref", "blog"];
        let mut examples = Vec::new();
        for (i, &count) in counts.iter().enumerate() {
            for j in 0..count {
                let tokens = vec![values[i].to_string(), format!("t{j}"), "x".into(), "y".into()];
                examples.push(LabeledExample::new(labels(&[&format!("type_{}", values[i])]), tokens));
            }
        }

        let config = BalanceConfig::default();
        let before = label_counts(&examples);
        let balanced = Balancer::new(config.clone(), seed).balance(&examples);
        let after = label_counts(&balanced);

        prop_assert_eq!(before.keys().collect::<Vec<_>>(), after.keys().collect::<Vec<_>>());
        for (label, &original) in &before {
            let now = after[label];
            if original < config.min_samples {
                prop_assert_eq!(now, config.min_samples);
            } else {
                prop_assert!(now <= original);
            }
        }
        for example in &balanced {
            prop_assert_eq!(example.labels.len(), 1);
            prop_assert!(before.contains_key(example.labels.iter().next().unwrap()));
        }
    }
}
