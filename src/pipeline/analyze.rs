//! Collection statistics: label distribution, usage, top hosts and title
//! language.
//!
//! Unlike training labels, the analyzer counts every matching domain and
//! content category, and guesses a type for titles without a prefix tag.

use super::data::Bookmark;
use super::features::UrlParts;
use super::taxonomy::{Dimension, LabelResolver, OTHER};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

const TOP_HOSTS: usize = 10;

/// Summary of a bookmark collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectionStats {
    pub total: usize,
    /// dimension -> label value -> count
    pub labels: BTreeMap<String, BTreeMap<String, usize>>,
    /// usage category -> count
    pub usage: BTreeMap<String, usize>,
    /// Most frequent hosts, most frequent first
    pub top_hosts: Vec<(String, usize)>,
    /// `zh` for titles containing CJK characters, `en` otherwise
    pub languages: BTreeMap<String, usize>,
}

/// Count labels, usage categories, hosts and title languages over
/// `bookmarks`.
pub fn analyze(bookmarks: &[Bookmark], resolver: &LabelResolver) -> CollectionStats {
    let mut stats = CollectionStats {
        total: bookmarks.len(),
        ..CollectionStats::default()
    };
    for dimension in Dimension::ALL {
        stats.labels.insert(dimension.to_string(), BTreeMap::new());
    }
    let mut hosts: HashMap<String, usize> = HashMap::new();

    for bookmark in bookmarks {
        let (title, url) = (bookmark.title.as_str(), bookmark.url.as_str());
        for dimension in Dimension::ALL {
            let mut values: Vec<String> = resolver
                .matching(dimension, title, url)
                .iter()
                .map(|l| l.value().to_string())
                .collect();
            if values.is_empty() {
                values.push(match dimension {
                    Dimension::Type => guess_type(title, url).to_string(),
                    _ => OTHER.to_string(),
                });
            }
            let by_value = stats.labels.entry(dimension.to_string()).or_default();
            for value in values {
                *by_value.entry(value).or_default() += 1;
            }
        }

        for usage in resolver.usages(title, url) {
            *stats.usage.entry(usage.to_string()).or_default() += 1;
        }

        if let Some(host) = UrlParts::split(&bookmark.url).host() {
            *hosts.entry(host).or_default() += 1;
        }

        let language = if bookmark.title.chars().any(is_cjk) { "zh" } else { "en" };
        *stats.languages.entry(language.to_string()).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = hosts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_HOSTS);
    stats.top_hosts = ranked;

    stats
}

/// Resource type for a title without a prefix tag, judged from the URL
/// first and then from title words.
pub fn guess_type(title: &str, url: &str) -> &'static str {
    let title = title.to_lowercase();
    let url = url.to_lowercase();
    let title_has = |words: &[&str]| words.iter().any(|w| title.contains(w));

    if url.contains("github.com") {
        "pkg"
    } else if url.contains("docs.") || url.contains("/docs/") || title.contains("文档") {
        "doc"
    } else if url.contains("api.") || url.contains("/api/") {
        "api"
    } else if title_has(&["blog", "博客"]) {
        "blog"
    } else if title_has(&["tool", "工具"]) {
        "tool"
    } else if title_has(&["参考", "示例"]) {
        "ref"
    } else {
        "res"
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{3040}'..='\u{30FF}'
        | '\u{AC00}'..='\u{D7AF}')
}

/// Print a human-readable report.
pub fn print_report(stats: &CollectionStats) {
    println!("\n===================================================================");
    println!("  Bookmark Collection Analysis");
    println!("===================================================================\n");
    println!("Total bookmarks: {}\n", stats.total);

    for (dimension, counts) in &stats.labels {
        println!("{} distribution:", dimension);
        let mut sorted: Vec<_> = counts.iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (value, count) in sorted {
            let pct = if stats.total == 0 {
                0.0
            } else {
                *count as f64 / stats.total as f64 * 100.0
            };
            println!("  {:<24} {:>6} ({:>5.1}%)", value, count, pct);
        }
        println!();
    }

    println!("usage distribution:");
    let mut usage: Vec<_> = stats.usage.iter().collect();
    usage.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in usage {
        println!("  {:<24} {:>6}", name, count);
    }
    println!();

    println!("Top hosts:");
    for (host, count) in &stats.top_hosts {
        println!("  {:<40} {:>6}", host, count);
    }

    println!("\nLanguages:");
    for (language, count) in &stats.languages {
        println!("  {:<4} {:>6}", language, count);
    }
    println!("\n===================================================================\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::taxonomy::Taxonomy;

    #[test]
    fn test_analyze_counts() {
        let resolver = LabelResolver::new(&Taxonomy::default()).unwrap();
        let bookmarks = vec![
            Bookmark::new("doc: Python 文档", "https://docs.python.org/3/"),
            Bookmark::new("pkg: requests", "https://pypi.org/project/requests/"),
            Bookmark::new("Recipes", "https://pypi.org/simple/"),
        ];
        let stats = analyze(&bookmarks, &resolver);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.labels["type"]["doc"], 1);
        assert_eq!(stats.labels["type"]["pkg"], 1);
        assert_eq!(stats.labels["type"]["res"], 1);
        assert_eq!(stats.top_hosts[0], ("pypi.org".to_string(), 2));
        assert_eq!(stats.languages["zh"], 1);
        assert_eq!(stats.languages["en"], 2);

        // the first bookmark matches both 技术 and 学习教育
        assert_eq!(stats.labels["domain"]["技术"], 1);
        assert_eq!(stats.labels["domain"]["学习教育"], 1);
        assert_eq!(stats.labels["domain"]["other"], 2);
    }

    #[test]
    fn test_type_is_guessed_without_prefix() {
        assert_eq!(guess_type("bevy", "https://github.com/bevyengine/bevy"), "pkg");
        assert_eq!(guess_type("Rust", "https://docs.rs/serde"), "doc");
        assert_eq!(guess_type("接口 文档", "https://example.org/"), "doc");
        assert_eq!(guess_type("Weather", "https://api.weather.gov/points"), "api");
        assert_eq!(guess_type("My Blog", "https://example.org/"), "blog");
        assert_eq!(guess_type("效率工具", "https://example.org/"), "tool");
        assert_eq!(guess_type("代码示例", "https://example.org/"), "ref");
        assert_eq!(guess_type("Recipes", "https://example.org/"), "res");
    }

    #[test]
    fn test_usage_distribution() {
        let resolver = LabelResolver::new(&Taxonomy::default()).unwrap();
        let bookmarks = vec![
            Bookmark::new("效率工具 合集", "https://example.org/a"),
            Bookmark::new("设计 灵感", "https://dribbble.com/"),
            Bookmark::new("Recipes", "https://example.org/b"),
        ];
        let stats = analyze(&bookmarks, &resolver);

        assert_eq!(stats.usage["常用工具"], 1);
        assert_eq!(stats.usage["资源收藏"], 1);
        assert_eq!(stats.usage["灵感创意"], 1);
        assert!(!stats.usage.contains_key("学习提升"));
        assert_eq!(stats.labels["type"]["tool"], 1);
        assert_eq!(stats.labels["type"]["res"], 2);
    }

    #[test]
    fn test_empty_collection() {
        let resolver = LabelResolver::new(&Taxonomy::default()).unwrap();
        let stats = analyze(&[], &resolver);
        assert_eq!(stats.total, 0);
        assert!(stats.top_hosts.is_empty());
        assert!(stats.labels["content"].is_empty());
        assert!(stats.usage.is_empty());
    }
}
