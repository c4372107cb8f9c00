//! Chat-completion categorizer used when no trained model is available.
//!
//! The model is asked to group bookmarks under `category/subcategory` paths
//! and answer with a JSON object. Any failure (transport, HTTP status,
//! unparseable answer) is returned to the caller; [`LlmCategorizer::categorize_or_original`]
//! turns it into an explicit [`Outcome::Original`] that keeps the input.

use crate::error::{Error, Result};
use crate::pipeline::data::Bookmark;
use crate::pipeline::organize::Folder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*|\s*```").expect("fence regex"));
static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").expect("comma regex"));

const SYSTEM_PROMPT: &str = "你是一个专业的书签整理助手，擅长对网页书签进行分类和组织。";

/// Anything that can answer a chat prompt.
pub trait ChatClient {
    fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Result of an LLM categorization attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Bookmarks grouped into a folder tree
    Categorized(Folder),
    /// The input, unchanged, with the reason categorization failed
    Original {
        bookmarks: Vec<Bookmark>,
        reason: String,
    },
}

/// Groups bookmarks through a [`ChatClient`].
pub struct LlmCategorizer<C> {
    client: C,
}

impl<C: ChatClient> LlmCategorizer<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Ask the model to categorize `bookmarks`.
    pub fn categorize(&self, bookmarks: &[Bookmark]) -> Result<Folder> {
        let prompt = build_prompt(bookmarks);
        debug!(bookmarks = bookmarks.len(), "sending categorization prompt");
        let answer = self.client.complete(SYSTEM_PROMPT, &prompt)?;
        let tree = parse_response(&answer)?;
        info!(categories = tree.folders.len(), "categorized bookmarks");
        Ok(tree)
    }

    /// Like [`categorize`](Self::categorize), but hands the bookmarks back
    /// when anything goes wrong.
    pub fn categorize_or_original(&self, bookmarks: Vec<Bookmark>) -> Outcome {
        match self.categorize(&bookmarks) {
            Ok(tree) => Outcome::Categorized(tree),
            Err(e) => {
                warn!("categorization failed, keeping original bookmarks: {}", e);
                Outcome::Original {
                    bookmarks,
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Prompt listing each bookmark as `标题:` / `网址:` lines.
pub fn build_prompt(bookmarks: &[Bookmark]) -> String {
    let listing: Vec<String> = bookmarks
        .iter()
        .map(|b| format!("标题: {}\n网址: {}", b.title, b.url))
        .collect();

    format!(
        r#"请将以下书签按类别整理，直接返回JSON格式，不要包含任何其他内容。

书签列表：
{}

返回格式：
{{
    "技术/文档": [
        {{"title": "原始标题", "url": "原始URL"}}
    ],
    "技术/工具": [
        {{"title": "原始标题", "url": "原始URL"}}
    ]
}}

注意：
1. 保持原始标题和URL不变
2. 使用"/"分隔的路径表示层级，如"技术/文档"
3. 确保URL完整，不要截断
4. 不要包含任何其他内容"#,
        listing.join("\n")
    )
}

/// Parse a model answer into a folder tree.
///
/// Code fences, surrounding prose, trailing commas and a top-level `result`
/// wrapper (object or JSON string) are tolerated.
pub fn parse_response(answer: &str) -> Result<Folder> {
    let cleaned = CODE_FENCE.replace_all(answer, "");
    let start = cleaned.find('{');
    let end = cleaned.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &cleaned[s..=e],
        _ => return Err(Error::Llm("no JSON object in response".to_string())),
    };
    let json = TRAILING_COMMA.replace_all(json, "$1");

    let mut value: Value = serde_json::from_str(&json)?;
    if let Some(inner) = value.get("result").cloned() {
        value = match inner {
            Value::String(s) => serde_json::from_str(&s)?,
            other => other,
        };
    }

    let categories = value
        .as_object()
        .ok_or_else(|| Error::Llm("response is not a JSON object".to_string()))?;

    let mut root = Folder::new("Bookmarks");
    for (path, entries) in categories {
        let bookmarks: Vec<Bookmark> = serde_json::from_value(entries.clone())?;
        let mut folder = &mut root;
        for part in path.split('/').map(str::trim).filter(|p| !p.is_empty()) {
            folder = folder.child_mut(part);
        }
        folder.bookmarks.extend(bookmarks);
    }

    if root.folders.is_empty() {
        return Err(Error::Llm("response contains no categories".to_string()));
    }
    Ok(root)
}

#[cfg(feature = "llm")]
pub use openai::{OpenAiClient, OpenAiConfig};

#[cfg(feature = "llm")]
mod openai {
    use super::ChatClient;
    use crate::error::{Error, Result};
    use serde::{Deserialize, Serialize};
    use std::env;
    use std::time::Duration;

    /// Configuration for an OpenAI-compatible endpoint.
    #[derive(Debug, Clone)]
    pub struct OpenAiConfig {
        /// API key (default: `OPENAI_API_KEY`)
        pub api_key: String,
        /// Base URL without the `/chat/completions` suffix (default: `OPENAI_BASE_URL`)
        pub base_url: String,
        pub model: String,
        pub max_tokens: usize,
        pub temperature: f32,
        pub timeout: Duration,
    }

    impl Default for OpenAiConfig {
        fn default() -> Self {
            Self {
                api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: "gpt-3.5-turbo".to_string(),
                max_tokens: 2000,
                temperature: 0.1,
                timeout: Duration::from_secs(60),
            }
        }
    }

    #[derive(Debug, Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: Vec<Message<'a>>,
        temperature: f32,
        max_tokens: usize,
    }

    #[derive(Debug, Serialize)]
    struct Message<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        choices: Vec<Choice>,
    }

    #[derive(Debug, Deserialize)]
    struct Choice {
        message: ReplyMessage,
    }

    #[derive(Debug, Deserialize)]
    struct ReplyMessage {
        content: String,
    }

    /// Blocking client for `/chat/completions`.
    pub struct OpenAiClient {
        config: OpenAiConfig,
        http: reqwest::blocking::Client,
    }

    impl OpenAiClient {
        pub fn new(config: OpenAiConfig) -> Result<Self> {
            if config.api_key.is_empty() {
                return Err(Error::Llm("OPENAI_API_KEY not set".to_string()));
            }
            let http = reqwest::blocking::Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| Error::Llm(e.to_string()))?;
            Ok(Self { config, http })
        }

        pub fn with_default() -> Result<Self> {
            Self::new(OpenAiConfig::default())
        }
    }

    impl ChatClient for OpenAiClient {
        fn complete(&self, system: &str, prompt: &str) -> Result<String> {
            let request = ChatRequest {
                model: &self.config.model,
                messages: vec![
                    Message {
                        role: "system",
                        content: system,
                    },
                    Message {
                        role: "user",
                        content: prompt,
                    },
                ],
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            };

            let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
            let response: ChatResponse = self
                .http
                .post(url)
                .bearer_auth(&self.config.api_key)
                .json(&request)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json())
                .map_err(|e| Error::Llm(e.to_string()))?;

            response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| Error::Llm("response has no choices".to_string()))
        }
    }
}
