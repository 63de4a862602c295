//! Retention stores: three persisted views fed from the same fetch batch.
//!
//! Every store owns exactly one on-disk view and its own dedup policy. Views are
//! whole-file pretty JSON, rewritten through a temp file plus rename so a crash
//! leaves either the previous or the new document, never a truncated one.

pub mod daily;
pub mod incremental;
pub mod latest;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::MonitorConfig;
use crate::ingest::types::Item;

pub use daily::DailyStore;
pub use incremental::IncrementalStore;
pub use latest::LatestStore;

/// A persistence policy that takes a fetch batch and reports how many items it newly kept.
///
/// Write failures are logged inside `accept` and never surface to the caller; the
/// in-memory state (if any) is kept for the next cycle.
pub trait RetentionStore: Send {
    fn name(&self) -> &'static str;
    fn accept(&mut self, batch: &[Item]) -> usize;
}

/// Build every store enabled in `cfg`, in the fixed order incremental, daily, latest.
pub fn stores_from_config(cfg: &MonitorConfig) -> Vec<Box<dyn RetentionStore>> {
    let s = &cfg.storage;
    let mut out: Vec<Box<dyn RetentionStore>> = Vec::new();
    if cfg.enable_incremental {
        out.push(Box::new(IncrementalStore::open(
            s.data_dir.join(&s.incremental_file),
            s.data_dir.join(&s.incremental_ids_file),
        )));
    }
    if cfg.enable_daily {
        out.push(Box::new(DailyStore::new(&s.data_dir, &s.daily_prefix)));
    }
    if cfg.enable_latest {
        out.push(Box::new(LatestStore::new(s.data_dir.join(&s.latest_file))));
    }
    out
}

/// Wipe every view `cfg` points at, enabled or not: corpus and ledger, all day files,
/// the latest view.
pub fn clear_all(cfg: &MonitorConfig) -> Result<()> {
    let s = &cfg.storage;
    IncrementalStore::open(
        s.data_dir.join(&s.incremental_file),
        s.data_dir.join(&s.incremental_ids_file),
    )
    .reset()?;
    let days = DailyStore::new(&s.data_dir, &s.daily_prefix).remove_all()?;
    LatestStore::new(s.data_dir.join(&s.latest_file)).remove()?;
    tracing::info!(data_dir = %s.data_dir.display(), day_files = days, "all views cleared");
    Ok(())
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}

/// Serialize `value` and replace `path` atomically.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data dir {}", parent.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(value).context("serializing view")?;
    let tmp = tmp_path(path);
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}

/// Read a persisted view. Missing file is `None` silently; unreadable or malformed
/// content is `None` with a warning.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable view, starting empty");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed view, starting empty");
            None
        }
    }
}

/// Log and count a failed rewrite.
pub(crate) fn report_write_error(store: &'static str, path: &Path, err: &anyhow::Error) {
    tracing::warn!(store, path = %path.display(), error = ?err, "view write failed");
    counter!("monitor_store_write_errors_total", "store" => store).increment(1);
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Local wall-clock time used for the metadata stamps in view files.
pub(crate) fn local_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Doc {
        n: u32,
    }

    #[test]
    fn atomic_write_replaces_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("nested").join("doc.json");
        write_json_atomic(&p, &Doc { n: 1 }).unwrap();
        write_json_atomic(&p, &Doc { n: 2 }).unwrap();
        assert_eq!(read_json::<Doc>(&p), Some(Doc { n: 2 }));
        assert!(!dir.path().join("nested").join("doc.json.tmp").exists());
    }

    #[test]
    fn missing_and_malformed_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("doc.json");
        assert_eq!(read_json::<Doc>(&p), None);
        fs::write(&p, b"{not json").unwrap();
        assert_eq!(read_json::<Doc>(&p), None);
    }
}
