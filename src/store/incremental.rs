// src/store/incremental.rs
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use metrics::counter;
use serde::{Deserialize, Serialize};

use super::{local_stamp, read_json, report_write_error, write_json_atomic, RetentionStore};
use crate::ingest::types::Item;

const NAME: &str = "incremental";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CorpusFile<'a> {
    items: &'a [Item],
    last_update: String,
    total_count: usize,
}

/// Corpus layouts we can read back: the current one, the older `tweets` key, and a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CorpusOnDisk {
    Current { items: Vec<Item> },
    Legacy { tweets: Vec<Item> },
    Bare(Vec<Item>),
}

impl CorpusOnDisk {
    fn into_items(self) -> Vec<Item> {
        match self {
            CorpusOnDisk::Current { items } => items,
            CorpusOnDisk::Legacy { tweets } => tweets,
            CorpusOnDisk::Bare(v) => v,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IdLedger {
    #[serde(default)]
    ids: Vec<String>,
}

/// Ever-growing corpus plus the ledger of every id it has accepted.
#[derive(Debug)]
pub struct IncrementalStore {
    corpus_path: PathBuf,
    ids_path: PathBuf,
    items: Vec<Item>,
    seen: BTreeSet<String>,
    /// Memory is ahead of disk after a failed write; the next `accept` rewrites.
    dirty: bool,
}

impl IncrementalStore {
    /// Load both files. Anything missing or unreadable starts empty.
    pub fn open(corpus_path: impl Into<PathBuf>, ids_path: impl Into<PathBuf>) -> Self {
        let corpus_path = corpus_path.into();
        let ids_path = ids_path.into();

        let items = read_json::<CorpusOnDisk>(&corpus_path)
            .map(CorpusOnDisk::into_items)
            .unwrap_or_default();
        let mut seen: BTreeSet<String> = read_json::<IdLedger>(&ids_path)
            .unwrap_or_default()
            .ids
            .into_iter()
            .collect();
        // A lost ledger must not let corpus items back in a second time.
        seen.extend(items.iter().filter(|i| i.has_id()).map(|i| i.id.clone()));

        tracing::debug!(
            store = NAME,
            items = items.len(),
            ids = seen.len(),
            "corpus loaded"
        );
        Self {
            corpus_path,
            ids_path,
            items,
            seen,
            dirty: false,
        }
    }

    /// Corpus in its stored order (newest batch first).
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Size of the corpus file in KiB, if it exists.
    pub fn file_size_kb(&self) -> Option<f64> {
        fs::metadata(&self.corpus_path)
            .ok()
            .map(|m| m.len() as f64 / 1024.0)
    }

    /// Forget this store's state: clears memory and removes the corpus and ledger.
    /// Day files and the latest view are untouched; see [`super::clear_all`].
    pub fn reset(&mut self) -> anyhow::Result<()> {
        self.items.clear();
        self.seen.clear();
        self.dirty = false;
        for p in [&self.corpus_path, &self.ids_path] {
            super::remove_if_exists(p)?;
        }
        Ok(())
    }

    /// Rewrite corpus, then ledger. The ledger is only written once the corpus is on
    /// disk, so it never names an id whose item could be missing after a restart.
    fn persist(&mut self) {
        let corpus = CorpusFile {
            items: &self.items,
            last_update: local_stamp(),
            total_count: self.items.len(),
        };
        if let Err(e) = write_json_atomic(&self.corpus_path, &corpus) {
            report_write_error(NAME, &self.corpus_path, &e);
            self.dirty = true;
            return;
        }

        let ledger = IdLedger {
            ids: self.seen.iter().cloned().collect(),
        };
        match write_json_atomic(&self.ids_path, &ledger) {
            Ok(()) => self.dirty = false,
            Err(e) => {
                report_write_error(NAME, &self.ids_path, &e);
                self.dirty = true;
            }
        }
    }
}

impl RetentionStore for IncrementalStore {
    fn name(&self) -> &'static str {
        NAME
    }

    fn accept(&mut self, batch: &[Item]) -> usize {
        let mut fresh: Vec<Item> = Vec::new();
        for it in batch {
            if it.has_id() && self.seen.insert(it.id.clone()) {
                fresh.push(it.clone());
            }
        }
        if fresh.is_empty() {
            if self.dirty {
                tracing::info!(store = NAME, "retrying corpus write");
                self.persist();
            }
            return 0;
        }

        let n = fresh.len();
        fresh.append(&mut self.items);
        self.items = fresh;
        self.persist();

        counter!("monitor_store_accepted_total", "store" => NAME).increment(n as u64);
        tracing::info!(store = NAME, new = n, total = self.items.len(), "corpus updated");
        n
    }
}
