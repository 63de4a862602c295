// src/digest.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::MonitorConfig;
use crate::ingest::types::Item;
use crate::notify::Notifier;
use crate::store::{DailyStore, IncrementalStore, LatestStore};
use crate::summarize::{format_items_for_prompt, save_summary, Summarizer, SUMMARY_TITLE};

const DEFAULT_MAX_ITEMS: usize = 100;

/// Which persisted view a digest is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DigestSource {
    /// Last cycle's batch.
    Latest,
    /// Today's day file.
    Daily,
    /// The whole incremental corpus.
    All,
}

impl DigestSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DigestSource::Latest => "latest",
            DigestSource::Daily => "daily",
            DigestSource::All => "all",
        }
    }
}

/// Read the chosen view from disk. Missing views are empty.
pub fn load_source_items(cfg: &MonitorConfig, source: DigestSource) -> Vec<Item> {
    let s = &cfg.storage;
    match source {
        DigestSource::Latest => LatestStore::new(s.data_dir.join(&s.latest_file)).load(),
        DigestSource::Daily => {
            DailyStore::new(&s.data_dir, &s.daily_prefix).load_day(Local::now().date_naive())
        }
        DigestSource::All => IncrementalStore::open(
            s.data_dir.join(&s.incremental_file),
            s.data_dir.join(&s.incremental_ids_file),
        )
        .items()
        .to_vec(),
    }
}

/// Summarize one view, save the summary file, and push it through `notifier`.
///
/// Returns `Ok(None)` when the view is empty. A failed notification is logged but
/// does not fail the digest; the summary file is already on disk.
pub async fn run_digest(
    cfg: &MonitorConfig,
    source: DigestSource,
    summarizer: &dyn Summarizer,
    notifier: &dyn Notifier,
) -> Result<Option<PathBuf>> {
    let items = load_source_items(cfg, source);
    if items.is_empty() {
        tracing::warn!(source = source.as_str(), "nothing to summarize");
        return Ok(None);
    }

    let max_items = cfg
        .summarizer
        .as_ref()
        .map(|s| s.max_items)
        .unwrap_or(DEFAULT_MAX_ITEMS);
    let text = format_items_for_prompt(&items, max_items);
    let summary = summarizer
        .summarize(&text, items.len())
        .await
        .with_context(|| format!("summarizing {} posts", items.len()))?;

    let path = save_summary(&cfg.storage.summaries_dir, source.as_str(), &summary)?;
    tracing::info!(path = %path.display(), summarizer = summarizer.name(), "summary saved");

    if !notifier.notify(SUMMARY_TITLE, &summary).await {
        tracing::warn!(notifier = notifier.name(), "summary not delivered");
    }
    Ok(Some(path))
}
