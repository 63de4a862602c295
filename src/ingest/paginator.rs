// src/ingest/paginator.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;

use crate::ingest::types::{sort_newest_first, Item, SearchApi};
use crate::ingest::{dedup_by_id, ensure_metrics_described};

/// Minimum pause between two consecutive page requests (rate limit).
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);
/// Hard stop for servers that keep handing out cursors.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// `from:a OR from:b ... since:YYYY-MM-DD_HH:MM:SS_UTC`.
/// Returns `None` when no account survives trimming.
pub fn build_query(accounts: &[String], since: DateTime<Utc>) -> Option<String> {
    let users: Vec<String> = accounts
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(|a| format!("from:{a}"))
        .collect();
    if users.is_empty() {
        return None;
    }
    Some(format!(
        "{} since:{}",
        users.join(" OR "),
        since.format("%Y-%m-%d_%H:%M:%S_UTC")
    ))
}

/// Drives the search API across cursor pages for one fetch cycle.
pub struct Paginator {
    api: Arc<dyn SearchApi>,
    page_delay: Duration,
    max_pages: usize,
}

impl Paginator {
    pub fn new(api: Arc<dyn SearchApi>) -> Self {
        Self {
            api,
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch everything posted by `accounts` within the last `lookback`.
    pub async fn fetch(&self, accounts: &[String], lookback: Duration) -> Vec<Item> {
        let now = Utc::now();
        let since = chrono::Duration::from_std(lookback)
            .ok()
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.fetch_since(accounts, since).await
    }

    /// Same as [`Paginator::fetch`] with an explicit lower bound.
    ///
    /// A failed page ends pagination; whatever was gathered before it is still
    /// deduplicated, sorted and returned.
    pub async fn fetch_since(&self, accounts: &[String], since: DateTime<Utc>) -> Vec<Item> {
        ensure_metrics_described();

        let Some(query) = build_query(accounts, since) else {
            tracing::debug!(target: "ingest", "no accounts to search");
            return Vec::new();
        };
        tracing::debug!(target: "ingest", %query, "search query");

        let mut raw: Vec<Item> = Vec::new();
        let mut cursor = String::new();
        let mut pages = 0usize;

        loop {
            if pages > 0 {
                tokio::time::sleep(self.page_delay).await;
            }
            pages += 1;

            let page = match self.api.fetch_page(&query, &cursor).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        error = ?e,
                        provider = self.api.name(),
                        page = pages,
                        kept = raw.len(),
                        "page request failed, keeping partial batch"
                    );
                    counter!("monitor_page_errors_total").increment(1);
                    break;
                }
            };
            counter!("monitor_pages_total").increment(1);

            let got = page.items.len();
            raw.extend(page.items);
            tracing::debug!(target: "ingest", page = pages, items = got, "page fetched");

            if !page.has_next_page || page.next_cursor.is_empty() {
                break;
            }
            if pages >= self.max_pages {
                tracing::warn!(target: "ingest", pages, "page cap reached, stopping early");
                break;
            }
            cursor = page.next_cursor;
        }

        let (mut batch, dropped) = dedup_by_id(raw);
        sort_newest_first(&mut batch);
        counter!("monitor_items_fetched_total").increment(batch.len() as u64);

        tracing::info!(
            target: "ingest",
            pages,
            items = batch.len(),
            duplicates = dropped,
            "fetch finished"
        );
        batch
    }
}
