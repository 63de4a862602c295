// src/store/latest.rs
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{local_stamp, read_json, report_write_error, write_json_atomic, RetentionStore};
use crate::ingest::types::Item;

const NAME: &str = "latest";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestFile {
    #[serde(default)]
    fetch_time: String,
    #[serde(default, alias = "tweets")]
    items: Vec<Item>,
    #[serde(default)]
    count: usize,
}

/// The last cycle's batch, as is. No history and no dedup against earlier cycles.
#[derive(Debug, Clone)]
pub struct LatestStore {
    path: PathBuf,
}

impl LatestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the view file; a missing file is fine.
    pub fn remove(&self) -> Result<()> {
        super::remove_if_exists(&self.path)
    }

    pub fn load(&self) -> Vec<Item> {
        read_json::<LatestFile>(&self.path)
            .map(|f| f.items)
            .unwrap_or_default()
    }
}

impl RetentionStore for LatestStore {
    fn name(&self) -> &'static str {
        NAME
    }

    fn accept(&mut self, batch: &[Item]) -> usize {
        let file = LatestFile {
            fetch_time: local_stamp(),
            items: batch.to_vec(),
            count: batch.len(),
        };
        if let Err(e) = write_json_atomic(&self.path, &file) {
            report_write_error(NAME, &self.path, &e);
        }
        tracing::info!(store = NAME, count = batch.len(), "latest view rewritten");
        batch.len()
    }
}
