//! Label taxonomy: dimensions, namespaced labels and the resolver that derives
//! them from a bookmark's title and URL.
//!
//! Every label belongs to exactly one [`Dimension`] and renders as
//! `<dimension>_<value>` (e.g. `type_doc`, `domain_技术`). The keyword and
//! domain tables live in a [`Taxonomy`] value that is passed explicitly to the
//! resolver and the feature extractor.

use super::features::decode_html_entities;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Value of the fallback sentinel label (`domain_other`, `content_other`).
pub const OTHER: &str = "other";

/// One of the three independent labeling axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Resource type, taken from title prefix tags (`doc:`, `pkg:`, ...)
    Type,
    /// Subject area
    Domain,
    /// Content form
    Content,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Type, Dimension::Domain, Dimension::Content];

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Type => "type",
            Dimension::Domain => "domain",
            Dimension::Content => "content",
        }
    }

    /// Sentinel assigned when no taxonomy rule matches. `type` has none.
    pub fn fallback(self) -> Option<Label> {
        match self {
            Dimension::Type => None,
            dim => Some(Label {
                dimension: dim,
                value: OTHER.to_string(),
            }),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "type" => Ok(Dimension::Type),
            "domain" => Ok(Dimension::Domain),
            "content" => Ok(Dimension::Content),
            other => Err(Error::Taxonomy(format!("unknown dimension `{other}`"))),
        }
    }
}

/// A dimension-qualified label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    dimension: Dimension,
    value: String,
}

impl Label {
    /// Build a label, replacing inner whitespace with `_` so the label stays a
    /// single token in the training-line format.
    pub fn new(dimension: Dimension, value: impl AsRef<str>) -> Result<Self> {
        let value = value
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        if value.is_empty() {
            return Err(Error::Taxonomy(format!(
                "empty label value in dimension `{dimension}`"
            )));
        }
        Ok(Label { dimension, value })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_fallback(&self) -> bool {
        self.dimension != Dimension::Type && self.value == OTHER
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.dimension, self.value)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (dimension, value) = s
            .split_once('_')
            .ok_or_else(|| Error::Taxonomy(format!("label `{s}` has no dimension namespace")))?;
        Label::new(dimension.parse()?, value)
    }
}

impl TryFrom<String> for Label {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

/// Ordered set of labels attached to one bookmark.
pub type LabelSet = BTreeSet<Label>;

/// Labels of `labels` that belong to `dimension`.
pub fn labels_in(labels: &LabelSet, dimension: Dimension) -> impl Iterator<Item = &Label> {
    labels.iter().filter(move |l| l.dimension() == dimension)
}

/// Number of labels that came from an actual rule match rather than a
/// fallback sentinel.
pub fn resolvable_count(labels: &LabelSet) -> usize {
    labels.iter().filter(|l| !l.is_fallback()).count()
}

/// A named category with the keywords and URL fragments that select it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
}

impl Category {
    fn new(name: &str, keywords: &[&str], domains: &[&str]) -> Self {
        Category {
            name: name.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            domains: domains.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// How many categories of one dimension a bookmark may receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// First matching category in table order wins.
    #[default]
    First,
    /// Every matching category contributes a label.
    All,
}

/// Keyword, domain and prefix tables for all three dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    /// Recognized title prefix tags, without the trailing colon
    pub prefixes: Vec<String>,
    /// Subject-area categories, in priority order
    pub domains: Vec<Category>,
    /// Content-form categories, in priority order
    pub content_types: Vec<Category>,
    /// Usage categories; reported by the analyzer, never trained
    pub usages: Vec<Category>,
    pub match_policy: MatchPolicy,
}

impl Default for Taxonomy {
    fn default() -> Self {
        let prefixes = [
            "doc", "pkg", "tip", "res", "entry", "api", "ref", "tool", "blog", "site", "home",
            "lib", "sdk", "app", "demo", "guide", "forum", "course", "book", "video", "news",
        ];

        Taxonomy {
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
            domains: vec![
                Category::new(
                    "技术",
                    &[
                        "编程", "开发", "python", "java", "javascript", "github", "代码", "框架",
                        "数据库", "运维", "部署",
                    ],
                    &[
                        "github.com", "stackoverflow.com", "leetcode.com", "developer.", "docs.",
                        ".dev",
                    ],
                ),
                Category::new(
                    "游戏娱乐",
                    &[
                        "游戏", "攻略", "娱乐", "动漫", "直播", "steam", "ps5", "xbox", "switch",
                        "moba", "rpg",
                    ],
                    &[
                        "miyoushe.com", "steam.com", "xbox.com", "nintendo.com",
                        "playstation.com", "bilibili.com",
                    ],
                ),
                Category::new(
                    "媒体资讯",
                    &["新闻", "资讯", "博客", "专栏", "评论", "观点", "报道", "杂志", "媒体"],
                    &[
                        "zhihu.com", "jianshu.com", "csdn.net", "medium.com", "juejin.cn",
                        "weixin.qq.com",
                    ],
                ),
                Category::new(
                    "学习教育",
                    &[
                        "教程", "课程", "学习", "培训", "考试", "证书", "文档", "指南", "教育",
                        "知识",
                    ],
                    &[
                        "coursera.org", "udemy.com", "edx.org", "w3schools.com", "runoob.com",
                        "tutorial",
                    ],
                ),
                Category::new(
                    "生活服务",
                    &[
                        "购物", "美食", "旅游", "健康", "生活", "服务", "商城", "外卖", "订票",
                        "酒店",
                    ],
                    &["taobao.com", "jd.com", "meituan.com", "ctrip.com", "12306.cn"],
                ),
                Category::new(
                    "设计创意",
                    &[
                        "设计", "创意", "ui", "ux", "素材", "图片", "插画", "艺术", "灵感", "配色",
                    ],
                    &[
                        "dribbble.com", "behance.net", "ui8.net", "zcool.com.cn", "huaban.com",
                    ],
                ),
            ],
            content_types: vec![
                Category::new(
                    "官方文档",
                    &["docs", "document", "文档", "手册", "指南", "reference"],
                    &[],
                ),
                Category::new(
                    "教程指南",
                    &["tutorial", "guide", "教程", "指南", "入门", "课程"],
                    &[],
                ),
                Category::new("工具应用", &["tool", "app", "工具", "应用", "软件", "插件"], &[]),
                Category::new(
                    "社区讨论",
                    &["forum", "community", "社区", "讨论", "问答", "交流"],
                    &[],
                ),
                Category::new(
                    "博客文章",
                    &["blog", "article", "博客", "文章", "专栏", "post"],
                    &[],
                ),
                Category::new("视频内容", &["video", "视频", "直播", "live", "课程", "教学"], &[]),
                Category::new(
                    "资源素材",
                    &["resource", "material", "资源", "素材", "模板", "源码"],
                    &[],
                ),
            ],
            usages: vec![
                Category::new("常用工具", &["tool", "工具", "常用", "必备", "实用", "效率"], &[]),
                Category::new("参考资料", &["reference", "参考", "示例", "demo", "样例", "案例"], &[]),
                Category::new("学习提升", &["learn", "study", "学习", "提升", "进阶", "深入"], &[]),
                Category::new("灵感创意", &["inspiration", "idea", "灵感", "创意", "设计", "参考"], &[]),
                Category::new("资源收藏", &["collection", "收藏", "资源", "汇总", "合集", "精选"], &[]),
            ],
            match_policy: MatchPolicy::First,
        }
    }
}

impl Taxonomy {
    /// Lowercased prefix vocabulary.
    pub fn prefix_set(&self) -> HashSet<String> {
        self.prefixes.iter().map(|p| p.trim().to_lowercase()).collect()
    }
}

/// Split the leading run of known prefix tags off a title.
///
/// Each tag is a vocabulary word followed by `:` (or the full-width `：`),
/// optionally surrounded by whitespace. The run ends at the first word that is
/// not in the vocabulary, so `"res:pkg:serde"` yields `["res", "pkg"]` and
/// `"serde"`, while `"Note: hi"` yields no prefixes.
pub fn split_prefixes<'t>(title: &'t str, vocabulary: &HashSet<String>) -> (Vec<String>, &'t str) {
    let mut prefixes = Vec::new();
    let mut rest = title.trim_start();

    while let Some((idx, colon)) = rest.char_indices().find(|(_, c)| *c == ':' || *c == '：') {
        let word = rest[..idx].trim().to_lowercase();
        if word.is_empty() || !vocabulary.contains(&word) {
            break;
        }
        prefixes.push(word);
        rest = rest[idx + colon.len_utf8()..].trim_start();
    }

    (prefixes, rest)
}

struct CompiledCategory {
    label: Label,
    keywords: Vec<String>,
    domains: Vec<String>,
}

impl CompiledCategory {
    fn compile(dimension: Dimension, category: &Category) -> Result<Self> {
        Ok(CompiledCategory {
            label: Label::new(dimension, &category.name)?,
            keywords: lowercase_non_empty(&category.keywords),
            domains: lowercase_non_empty(&category.domains),
        })
    }

    fn matches(&self, text: &str, url: &str) -> bool {
        self.keywords.iter().any(|kw| text.contains(kw.as_str()))
            || self.domains.iter().any(|d| url.contains(d.as_str()))
    }
}

fn type_labels(prefixes: Vec<String>) -> impl Iterator<Item = Label> {
    prefixes
        .into_iter()
        .filter_map(|p| Label::new(Dimension::Type, p).ok())
}

fn lowercase_non_empty(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Derives namespaced labels for a bookmark from a [`Taxonomy`].
pub struct LabelResolver {
    prefixes: HashSet<String>,
    domains: Vec<CompiledCategory>,
    content_types: Vec<CompiledCategory>,
    usages: Vec<(String, Vec<String>)>,
    policy: MatchPolicy,
}

impl LabelResolver {
    /// Compile the taxonomy tables; fails when a category name is empty.
    pub fn new(taxonomy: &Taxonomy) -> Result<Self> {
        let compile = |dimension, categories: &[Category]| {
            categories
                .iter()
                .map(|c| CompiledCategory::compile(dimension, c))
                .collect::<Result<Vec<_>>>()
        };

        Ok(LabelResolver {
            prefixes: taxonomy.prefix_set(),
            domains: compile(Dimension::Domain, &taxonomy.domains)?,
            content_types: compile(Dimension::Content, &taxonomy.content_types)?,
            usages: taxonomy
                .usages
                .iter()
                .map(|c| (c.name.trim().to_string(), lowercase_non_empty(&c.keywords)))
                .filter(|(name, _)| !name.is_empty())
                .collect(),
            policy: taxonomy.match_policy,
        })
    }

    /// Resolve all labels of a bookmark.
    ///
    /// `domain` and `content` always receive at least one label (the `_other`
    /// sentinel when nothing matches); `type` may stay empty.
    pub fn resolve(&self, title: &str, url: &str) -> LabelSet {
        let (prefixes, text, url_lower) = self.prepare(title, url);
        let mut labels: LabelSet = type_labels(prefixes).collect();

        for (dimension, table) in [
            (Dimension::Domain, &self.domains),
            (Dimension::Content, &self.content_types),
        ] {
            let matched = self.match_table(table, &text, &url_lower);
            if matched.is_empty() {
                labels.extend(dimension.fallback());
            } else {
                labels.extend(matched);
            }
        }

        labels
    }

    /// Every label of `dimension` the bookmark matches, ignoring the match
    /// policy and without the fallback sentinel.
    pub fn matching(&self, dimension: Dimension, title: &str, url: &str) -> Vec<Label> {
        let (prefixes, text, url_lower) = self.prepare(title, url);
        let table = match dimension {
            Dimension::Type => return type_labels(prefixes).collect(),
            Dimension::Domain => &self.domains,
            Dimension::Content => &self.content_types,
        };
        table
            .iter()
            .filter(|c| c.matches(&text, &url_lower))
            .map(|c| c.label.clone())
            .collect()
    }

    /// Names of the usage categories whose keywords occur in the title or URL.
    pub fn usages(&self, title: &str, url: &str) -> Vec<&str> {
        let (_, text, _) = self.prepare(title, url);
        self.usages
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| text.contains(kw.as_str())))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Prefix tags, the lowercased match text (decoded title rest plus URL)
    /// and the lowercased URL.
    fn prepare(&self, title: &str, url: &str) -> (Vec<String>, String, String) {
        let (prefixes, rest) = split_prefixes(title, &self.prefixes);
        let url_lower = url.to_lowercase();
        let text = format!("{} {}", decode_html_entities(rest).to_lowercase(), url_lower);
        (prefixes, text, url_lower)
    }

    /// Title with its recognized prefix tags removed.
    pub fn strip_prefixes<'t>(&self, title: &'t str) -> &'t str {
        split_prefixes(title, &self.prefixes).1
    }

    fn match_table(&self, table: &[CompiledCategory], text: &str, url: &str) -> Vec<Label> {
        let mut hits = table.iter().filter(|c| c.matches(text, url));
        match self.policy {
            MatchPolicy::First => hits.next().map(|c| c.label.clone()).into_iter().collect(),
            MatchPolicy::All => hits.map(|c| c.label.clone()).collect(),
        }
    }
}
