// src/ingest/mod.rs
pub mod paginator;
pub mod providers;
pub mod scheduler;
pub mod types;

use crate::ingest::types::Item;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration so the series carry descriptions.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("monitor_pages_total", "Search API pages fetched.");
        describe_counter!(
            "monitor_page_errors_total",
            "Search API page requests that failed."
        );
        describe_histogram!("monitor_page_fetch_ms", "Search API page latency in milliseconds.");
        describe_counter!(
            "monitor_items_fetched_total",
            "Unique items returned by a fetch cycle."
        );
        describe_counter!(
            "monitor_store_accepted_total",
            "Items newly accepted, per retention store."
        );
        describe_counter!(
            "monitor_store_write_errors_total",
            "Failed view rewrites, per retention store."
        );
        describe_counter!("monitor_cycles_total", "Completed fetch/persist cycles.");
        describe_gauge!("monitor_last_cycle_ts", "Unix ts of the last finished cycle.");
    });
}

/// Drop items without an id and every repeat of an id already seen.
/// First occurrence wins; relative order of the survivors is kept.
/// Returns (kept, dropped).
pub fn dedup_by_id(items: Vec<Item>) -> (Vec<Item>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for it in items {
        if !it.has_id() || !seen.insert(it.id.clone()) {
            dropped += 1;
            continue;
        }
        keep.push(it);
    }

    (keep, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins_and_blank_ids_go() {
        let mut dup = Item::new("1", "b", "second copy", "2024-01-01T00:00:00Z");
        dup.text = "edited".into();
        let items = vec![
            Item::new("1", "a", "first copy", "2024-01-01T00:00:00Z"),
            Item::new("", "a", "no id", "2024-01-01T00:00:00Z"),
            dup,
            Item::new("2", "a", "other", "2024-01-01T00:00:00Z"),
        ];
        let (kept, dropped) = dedup_by_id(items);
        assert_eq!(dropped, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].text, "first copy");
        assert_eq!(kept[1].id, "2");
    }
}
