//! Feature extraction from bookmark titles and URLs.
//!
//! A bookmark becomes a flat list of string tokens: cleaned title words, URL
//! structure tokens (`domain_*`, `subdomain_*`, `path_*`) and title word
//! n-grams. With `enhance` on, character-level tokens (`prefix_*`, `suffix_*`,
//! `char_bigram_*`) and keyword hints (`hint_domain_*`, `hint_content_*`) are
//! appended. The same extractor is used for training data and for prediction
//! so both sides see identical tokens.

use crate::error::{Error, Result};
use crate::pipeline::taxonomy::{split_prefixes, Category, Taxonomy};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("entity regex")
});

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("non-word regex"));

static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(?:([A-Za-z][A-Za-z0-9+.\-]*):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$",
    )
    .expect("url regex")
});

/// Feature extraction settings (`[features]` in `config.toml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Tokens dropped from titles after normalization
    pub stop_words: Vec<String>,
    /// Maximum number of `path_*` tokens per URL
    pub max_path_segments: usize,
    /// Minimum segment length (after extension stripping) to emit a `path_*` token
    pub min_path_segment_len: usize,
    /// Append character-level and keyword hint tokens
    pub enhance: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let stop_words = [
            "the", "and", "for", "are", "but", "not", "you", "all", "can", "was", "one", "our",
            "out", "this", "that", "with", "have", "from", "they", "will", "what", "your", "its",
            "into", "about", "of", "to", "in", "on", "at", "by", "is", "an", "or", "as", "it",
            "be", "www", "http", "https", "com", "html", "index", "的", "了", "和", "与", "在",
        ];
        FeatureConfig {
            stop_words: stop_words.iter().map(|s| s.to_string()).collect(),
            max_path_segments: 5,
            min_path_segment_len: 1,
            enhance: true,
        }
    }
}

/// Structural pieces of a URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlParts<'a> {
    pub scheme: Option<&'a str>,
    pub netloc: Option<&'a str>,
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub fragment: Option<&'a str>,
}

impl<'a> UrlParts<'a> {
    /// Split a URL without validating it. Never fails; unparseable input ends
    /// up in `path`.
    pub fn split(url: &'a str) -> Self {
        match URL.captures(url) {
            Some(caps) => UrlParts {
                scheme: caps.get(1).map(|m| m.as_str()),
                netloc: caps.get(2).map(|m| m.as_str()),
                path: caps.get(3).map_or("", |m| m.as_str()),
                query: caps.get(4).map(|m| m.as_str()),
                fragment: caps.get(5).map(|m| m.as_str()),
            },
            None => UrlParts {
                path: url,
                ..UrlParts::default()
            },
        }
    }

    /// Split and validate a URL.
    ///
    /// A URL is malformed when it contains whitespace or control characters,
    /// or names a network scheme (`scheme://`) without a host. Scheme-less
    /// strings and `file:///` paths are accepted.
    pub fn parse(url: &'a str) -> Result<Self> {
        let malformed = |reason| Error::MalformedUrl {
            url: url.to_string(),
            reason,
        };

        if url.trim().is_empty() {
            return Err(malformed("empty URL"));
        }
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(malformed("contains whitespace or control characters"));
        }

        let parts = UrlParts::split(url);
        let is_file = parts
            .scheme
            .map_or(false, |s| s.eq_ignore_ascii_case("file"));
        if parts.netloc == Some("") && !is_file {
            return Err(malformed("missing host"));
        }
        Ok(parts)
    }

    /// Lowercased host with userinfo and port removed.
    pub fn host(&self) -> Option<String> {
        let netloc = self.netloc?;
        let without_user = netloc.rsplit_once('@').map_or(netloc, |(_, h)| h);
        let host = if without_user.starts_with('[') {
            // bracketed IPv6 literal
            without_user
                .split_once(']')
                .map_or(without_user, |(h, _)| h.trim_start_matches('['))
        } else {
            without_user
                .split_once(':')
                .map_or(without_user, |(h, _)| h)
        };
        let host = host.trim_end_matches('.').to_lowercase();
        (!host.is_empty()).then_some(host)
    }
}

/// Turns bookmark titles and URLs into feature tokens.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    prefixes: HashSet<String>,
    stop_words: HashSet<String>,
    max_path_segments: usize,
    min_path_segment_len: usize,
    enhance: bool,
    /// `(hint token, lowercased keywords)` per domain and content category
    hints: Vec<(String, Vec<String>)>,
}

impl FeatureExtractor {
    /// Create an extractor; prefix tags are taken from `taxonomy` so the title
    /// is stripped the same way the resolver strips it.
    pub fn new(config: &FeatureConfig, taxonomy: &Taxonomy) -> Self {
        let hint = |kind: &str, categories: &[Category]| -> Vec<(String, Vec<String>)> {
            categories
                .iter()
                .map(|c| {
                    let name = c.name.split_whitespace().collect::<Vec<_>>().join("_");
                    let keywords = c
                        .keywords
                        .iter()
                        .map(|k| k.trim().to_lowercase())
                        .filter(|k| !k.is_empty())
                        .collect();
                    (format!("hint_{}_{}", kind, name), keywords)
                })
                .collect()
        };
        let mut hints = hint("domain", &taxonomy.domains);
        hints.extend(hint("content", &taxonomy.content_types));

        FeatureExtractor {
            prefixes: taxonomy.prefix_set(),
            stop_words: config.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            max_path_segments: config.max_path_segments,
            min_path_segment_len: config.min_path_segment_len,
            enhance: config.enhance,
            hints,
        }
    }

    /// Feature tokens for one bookmark.
    ///
    /// Order: title tokens, URL tokens, title bigrams, title trigrams.
    pub fn extract(&self, title: &str, url: &str) -> Vec<String> {
        self.assemble(title, &[url])
    }

    /// Feature tokens for free text: `http(s)://` words are treated as URLs,
    /// everything else as the title.
    pub fn extract_text(&self, raw: &str) -> Vec<String> {
        let (urls, words): (Vec<&str>, Vec<&str>) = raw.split_whitespace().partition(|w| {
            let lower = w.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        });
        self.assemble(&words.join(" "), &urls)
    }

    fn assemble(&self, title: &str, urls: &[&str]) -> Vec<String> {
        let (_, rest) = split_prefixes(title, &self.prefixes);
        let tokens = self.normalize(rest);

        let mut features = tokens.clone();
        for url in urls {
            features.extend(self.url_features(url));
        }
        features.extend(generate_bigrams(&tokens));
        features.extend(generate_trigrams(&tokens));

        if self.enhance {
            features.extend(char_features(&tokens));
            let mut text = decode_html_entities(rest).to_lowercase();
            for url in urls {
                text.push(' ');
                text.push_str(&url.to_lowercase());
            }
            features.extend(self.hint_features(&text));
        }
        features
    }

    /// `hint_*` tokens of every category with a keyword occurring in `text`.
    fn hint_features(&self, text: &str) -> Vec<String> {
        self.hints
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|(token, _)| token.clone())
            .collect()
    }

    /// Decode entities, lowercase, strip punctuation and drop stop words and
    /// single-character tokens.
    ///
    /// Leading underscores are trimmed so no token can read as a
    /// `__label__` marker in a training line.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let decoded = decode_html_entities(text).to_lowercase();
        let cleaned = NON_WORD.replace_all(&decoded, " ");
        cleaned
            .split_whitespace()
            .map(|t| t.trim_start_matches('_'))
            .filter(|t| t.chars().count() > 1 && !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// `domain_*`, `subdomain_*` and `path_*` tokens of a URL.
    pub fn url_features(&self, url: &str) -> Vec<String> {
        let parts = UrlParts::split(url.trim());
        let mut features = Vec::new();

        if let Some(host) = parts.host() {
            features.push(format!("domain_{}", host.replace(['.', ':'], "_")));
            let labels: Vec<&str> = host.split('.').collect();
            if labels.len() > 2 {
                features.push(format!("subdomain_{}", labels[0]));
            }
        }

        // without a host, a scheme-less string is a path only if it starts with '/'
        let path = if parts.netloc.is_some() || parts.path.starts_with('/') {
            parts.path
        } else {
            ""
        };

        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter_map(|segment| {
                let decoded = percent_decode(segment);
                let stem = strip_extension(&decoded).to_string();
                if stem.chars().count() < self.min_path_segment_len.max(1) {
                    return None;
                }
                let parts = split_identifier(&stem);
                (!parts.is_empty()).then(|| format!("path_{}", parts.join("_")))
            })
            .take(self.max_path_segments);
        features.extend(segments);

        features
    }
}

/// Replace named (`&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;`) and
/// numeric (`&#NN;`, `&#xHH;`) character references. Unknown references are
/// left untouched.
pub fn decode_html_entities(text: &str) -> Cow<'_, str> {
    ENTITY.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
        } else if let Some(dec) = body.strip_prefix('#') {
            dec.parse::<u32>().ok().and_then(char::from_u32)
        } else {
            match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => None,
            }
        };
        decoded.map_or_else(|| caps[0].to_string(), String::from)
    })
}

fn percent_decode(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }

    let hex = |b: Option<&u8>| b.and_then(|b| (*b as char).to_digit(16));
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (hex(bytes.get(i + 1)), hex(bytes.get(i + 2))) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

fn strip_extension(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext = &segment[idx + 1..];
            if (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                &segment[..idx]
            } else {
                segment
            }
        }
        _ => segment,
    }
}

/// Split a path segment on separators, camel-case humps and digit/letter
/// boundaries. `getUserID2fa` becomes `["get", "user", "id", "2", "fa"]`.
fn split_identifier(segment: &str) -> Vec<String> {
    let chars: Vec<char> = segment.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush(&mut current, &mut parts);
            continue;
        }
        if let Some(&prev) = i.checked_sub(1).and_then(|j| chars.get(j)) {
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            let boundary = prev.is_alphanumeric()
                && ((prev.is_lowercase() && c.is_uppercase())
                    || (prev.is_numeric() != c.is_numeric())
                    || (prev.is_uppercase() && c.is_uppercase() && next_is_lower));
            if boundary {
                flush(&mut current, &mut parts);
            }
        }
        current.extend(c.to_lowercase());
    }
    flush(&mut current, &mut parts);
    parts
}

fn flush(current: &mut String, parts: &mut Vec<String>) {
    if !current.is_empty() {
        parts.push(std::mem::take(current));
    }
}

/// `prefix_`/`suffix_` (first and last three characters) and `char_bigram_`
/// tokens of every word longer than two characters.
pub fn char_features(tokens: &[String]) -> Vec<String> {
    let mut features = Vec::new();
    for token in tokens {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() <= 2 {
            continue;
        }
        features.push(format!("prefix_{}", chars[..3].iter().collect::<String>()));
        features.push(format!("suffix_{}", chars[chars.len() - 3..].iter().collect::<String>()));
        features.extend(
            chars
                .windows(2)
                .map(|pair| format!("char_bigram_{}{}", pair[0], pair[1])),
        );
    }
    features
}

/// Adjacent-pair features `a_b`.
pub fn generate_bigrams(tokens: &[String]) -> Vec<String> {
    tokens.windows(2).map(|w| w.join("_")).collect()
}

/// Adjacent-triple features `a_b_c`.
pub fn generate_trigrams(tokens: &[String]) -> Vec<String> {
    tokens.windows(3).map(|w| w.join("_")).collect()
}
