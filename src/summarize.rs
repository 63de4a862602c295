//! Summarizer: provider abstraction + an OpenAI-compatible chat-completions client.
//!
//! The monitor only hands over formatted text; prompt wording and the model live in
//! configuration.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;
use crate::ingest::types::Item;

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Turn `text` (already formatted, `item_count` posts) into a summary.
    async fn summarize(&self, text: &str, item_count: usize) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Number each post with handle, name, text, link and time; at most `max_items`.
pub fn format_items_for_prompt(items: &[Item], max_items: usize) -> String {
    let mut out = String::new();
    for (i, it) in items.iter().take(max_items).enumerate() {
        let handle = if it.author.handle.is_empty() {
            "unknown"
        } else {
            it.author.handle.as_str()
        };
        let name = if it.author.display_name.is_empty() {
            "Unknown"
        } else {
            it.author.display_name.as_str()
        };
        let _ = writeln!(out, "[{}] @{} ({})", i + 1, handle, name);
        let _ = writeln!(out, "    Text: {}", it.text);
        let _ = writeln!(out, "    Link: {}", it.url);
        let _ = writeln!(out, "    Time: {}", it.created_at);
        out.push('\n');
    }
    out.trim_end_matches('\n').to_string()
}

static THINK_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)<thinker_block>.*?</thinker_block>",
        r"(?is)<think>.*?</think>",
        r"(?is)<thinking>.*?</thinking>",
        r"(?is)\[THINKING\].*?\[/THINKING\]",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static EXTRA_BLANK_LINES: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\n{3,}").ok());

/// Strip reasoning blocks some models emit, collapse runs of blank lines, trim.
pub fn clean_summary(raw: &str) -> String {
    let mut out = raw.to_string();
    for re in THINK_BLOCKS.iter() {
        out = re.replace_all(&out, "").into_owned();
    }
    if let Some(re) = EXTRA_BLANK_LINES.as_ref() {
        out = re.replace_all(&out, "\n\n").into_owned();
    }
    out.trim().to_string()
}

/// Save as `summary_{source}_{YYYYMMDD_HHMMSS}.md` under `dir`.
pub fn save_summary(dir: &Path, source: &str, summary: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let now = Local::now();
    let path = dir.join(format!("summary_{source}_{}.md", now.format("%Y%m%d_%H%M%S")));
    let doc = format!(
        "# {SUMMARY_TITLE}\n\nGenerated: {}\nSource: {source}\n\n---\n\n{summary}",
        now.format("%Y-%m-%d %H:%M:%S")
    );
    fs::write(&path, doc).with_context(|| format!("writing summary {}", path.display()))?;
    Ok(path)
}

pub const SUMMARY_TITLE: &str = "AI News Summary";

/// OpenAI-compatible `/chat/completions` client.
pub struct ChatCompletionsSummarizer {
    http: reqwest::Client,
    cfg: SummarizerConfig,
}

impl ChatCompletionsSummarizer {
    pub fn new(cfg: SummarizerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ai-news-monitor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .context("building summarizer http client")?;
        Ok(Self { http, cfg })
    }

    fn user_prompt(&self, text: &str, item_count: usize) -> String {
        self.cfg
            .user_prompt_template
            .replace("{count}", &item_count.to_string())
            .replace("{tweets}", text)
    }
}

#[async_trait]
impl Summarizer for ChatCompletionsSummarizer {
    async fn summarize(&self, text: &str, item_count: usize) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            #[serde(default)]
            content: Option<String>,
            #[serde(default)]
            reasoning_content: Option<String>,
        }

        let user = self.user_prompt(text, item_count);
        let req = Req {
            model: &self.cfg.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &self.cfg.system_prompt,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.7,
            max_tokens: 4096,
        };

        tracing::info!(model = %self.cfg.model, items = item_count, "requesting summary");
        let url = format!("{}/chat/completions", self.cfg.api_base_url.trim_end_matches('/'));
        let body: Resp = self
            .http
            .post(url)
            .bearer_auth(&self.cfg.api_key)
            .json(&req)
            .send()
            .await
            .context("summarizer post")?
            .error_for_status()
            .context("summarizer non-2xx")?
            .json()
            .await
            .context("decoding summarizer response")?;

        let Some(choice) = body.choices.into_iter().next() else {
            bail!("summarizer returned no choices");
        };
        let content = choice.message.content.unwrap_or_default();
        let raw = if content.trim().is_empty() {
            // Some reasoning models only fill the chain-of-thought field.
            tracing::warn!("summary came back in reasoning_content only");
            choice.message.reasoning_content.unwrap_or_default()
        } else {
            content
        };

        let cleaned = clean_summary(&raw);
        if cleaned.is_empty() {
            bail!("summarizer returned an empty summary");
        }
        Ok(cleaned)
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn think_blocks_and_blank_runs_are_removed() {
        let raw = "<think>\nplan\n</think>\n\nHeadline\n\n\n\n- point\n[THINKING]x[/THINKING]  ";
        assert_eq!(clean_summary(raw), "Headline\n\n- point");
    }

    #[test]
    fn prompt_lines_are_numbered_and_capped() {
        let items = vec![
            Item::new("1", "a", "one", "t1"),
            Item::new("2", "b", "two", "t2"),
            Item::new("3", "c", "three", "t3"),
        ];
        let text = format_items_for_prompt(&items, 2);
        assert!(text.starts_with("[1] @a (a)\n    Text: one"));
        assert!(text.contains("[2] @b (b)"));
        assert!(!text.contains("three"));
    }

    #[test]
    fn saved_summary_has_heading_and_source() {
        let dir = tempfile::tempdir().unwrap();
        let p = save_summary(dir.path(), "daily", "body").unwrap();
        let name = p.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("summary_daily_") && name.ends_with(".md"));
        let doc = fs::read_to_string(p).unwrap();
        assert!(doc.starts_with("# AI News Summary\n"));
        assert!(doc.contains("Source: daily"));
        assert!(doc.ends_with("body"));
    }
}
