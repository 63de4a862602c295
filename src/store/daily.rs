// src/store/daily.rs
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use metrics::counter;
use serde::{Deserialize, Serialize};

use super::{read_json, report_write_error, write_json_atomic, RetentionStore};
use crate::ingest::types::{sort_newest_first, Item};

const NAME: &str = "daily";

#[derive(Debug, Default, Serialize, Deserialize)]
struct DayFile {
    #[serde(default)]
    date: String,
    #[serde(default, alias = "tweets")]
    items: Vec<Item>,
    #[serde(default)]
    count: usize,
}

/// One file per local calendar day, each deduplicated on its own.
#[derive(Debug, Clone)]
pub struct DailyStore {
    dir: PathBuf,
    prefix: String,
}

impl DailyStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    /// `{dir}/{prefix}_{YYYYMMDD}.json`
    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.prefix, day.format("%Y%m%d")))
    }

    /// Items stored for `day`, newest first. Missing or malformed file is empty.
    pub fn load_day(&self, day: NaiveDate) -> Vec<Item> {
        read_json::<DayFile>(&self.path_for(day))
            .map(|f| f.items)
            .unwrap_or_default()
    }

    /// Merge `batch` into the view for `day` and rewrite that file only.
    /// Returns the number of items appended.
    pub fn accept_for_day(&self, day: NaiveDate, batch: &[Item]) -> usize {
        let path = self.path_for(day);
        let mut items = self.load_day(day);
        let mut present: HashSet<String> = items.iter().map(|i| i.id.clone()).collect();

        let mut added = 0usize;
        for it in batch {
            if it.has_id() && present.insert(it.id.clone()) {
                items.push(it.clone());
                added += 1;
            }
        }
        if added == 0 {
            return 0;
        }

        sort_newest_first(&mut items);
        let file = DayFile {
            date: day.format("%Y-%m-%d").to_string(),
            count: items.len(),
            items,
        };
        if let Err(e) = write_json_atomic(&path, &file) {
            report_write_error(NAME, &path, &e);
        }

        counter!("monitor_store_accepted_total", "store" => NAME).increment(added as u64);
        tracing::info!(
            store = NAME,
            day = %file.date,
            new = added,
            total = file.count,
            "day view updated"
        );
        added
    }

    /// Day file names, newest first.
    pub fn list_files(&self) -> Vec<String> {
        list_day_files(&self.dir, &self.prefix)
    }

    /// Delete every day file under this prefix. Returns how many were removed.
    pub fn remove_all(&self) -> Result<usize> {
        let files = self.list_files();
        for name in &files {
            let path = self.dir.join(name);
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(files.len())
    }
}

fn list_day_files(dir: &Path, prefix: &str) -> Vec<String> {
    let head = format!("{prefix}_");
    let mut files: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.starts_with(&head) && n.ends_with(".json"))
            .collect(),
        Err(_) => Vec::new(),
    };
    files.sort_unstable_by(|a, b| b.cmp(a));
    files
}

impl RetentionStore for DailyStore {
    fn name(&self) -> &'static str {
        NAME
    }

    fn accept(&mut self, batch: &[Item]) -> usize {
        self.accept_for_day(Local::now().date_naive(), batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn file_name_and_date_field() {
        let dir = tempfile::tempdir().unwrap();
        let s = DailyStore::new(dir.path(), "tweets_daily");
        s.accept_for_day(day(5), &[Item::new("1", "a", "x", "2024-03-05T08:00:00Z")]);

        let p = dir.path().join("tweets_daily_20240305.json");
        assert_eq!(s.path_for(day(5)), p);
        let v: serde_json::Value = serde_json::from_slice(&fs::read(&p).unwrap()).unwrap();
        assert_eq!(v["date"], "2024-03-05");
        assert_eq!(v["count"], 1);
    }

    #[test]
    fn nothing_new_means_no_write() {
        let dir = tempfile::tempdir().unwrap();
        let s = DailyStore::new(dir.path(), "d");
        assert_eq!(s.accept_for_day(day(1), &[]), 0);
        assert!(!s.path_for(day(1)).exists());
    }

    #[test]
    fn list_ignores_other_files_and_sorts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let s = DailyStore::new(dir.path(), "d");
        s.accept_for_day(day(1), &[Item::new("1", "a", "x", "2024-03-01T00:00:00Z")]);
        s.accept_for_day(day(9), &[Item::new("2", "a", "y", "2024-03-09T00:00:00Z")]);
        fs::write(dir.path().join("d_latest.json.tmp"), b"{}").unwrap();
        fs::write(dir.path().join("other.json"), b"{}").unwrap();

        assert_eq!(
            s.list_files(),
            vec!["d_20240309.json".to_string(), "d_20240301.json".to_string()]
        );
    }
}
