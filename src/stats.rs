// src/stats.rs
use serde::Serialize;

use crate::config::MonitorConfig;
use crate::store::{DailyStore, IncrementalStore};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IncrementalStats {
    pub enabled: bool,
    pub total_items: usize,
    pub unique_ids: usize,
    pub file_size_kb: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyStats {
    pub enabled: bool,
    /// Newest first.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonitorStats {
    pub incremental: IncrementalStats,
    pub daily: DailyStats,
    pub latest_enabled: bool,
}

/// Snapshot of what is on disk for the enabled views.
pub fn collect(cfg: &MonitorConfig) -> MonitorStats {
    let s = &cfg.storage;

    let incremental = if cfg.enable_incremental {
        let store = IncrementalStore::open(
            s.data_dir.join(&s.incremental_file),
            s.data_dir.join(&s.incremental_ids_file),
        );
        IncrementalStats {
            enabled: true,
            total_items: store.len(),
            unique_ids: store.seen_count(),
            file_size_kb: store.file_size_kb(),
        }
    } else {
        IncrementalStats {
            enabled: false,
            total_items: 0,
            unique_ids: 0,
            file_size_kb: None,
        }
    };

    let daily = DailyStats {
        enabled: cfg.enable_daily,
        files: if cfg.enable_daily {
            DailyStore::new(&s.data_dir, &s.daily_prefix).list_files()
        } else {
            Vec::new()
        },
    };

    MonitorStats {
        incremental,
        daily,
        latest_enabled: cfg.enable_latest,
    }
}

impl MonitorStats {
    /// Human-readable multi-line report for the `--stats` command.
    pub fn render(&self) -> String {
        let on_off = |b: bool| if b { "enabled" } else { "disabled" };
        let mut lines = vec![format!("incremental: {}", on_off(self.incremental.enabled))];
        if self.incremental.enabled {
            lines.push(format!("  total posts: {}", self.incremental.total_items));
            lines.push(format!("  unique ids:  {}", self.incremental.unique_ids));
            lines.push(format!(
                "  file size:   {:.1} KB",
                self.incremental.file_size_kb.unwrap_or(0.0)
            ));
        }
        lines.push(format!("daily: {}", on_off(self.daily.enabled)));
        if self.daily.enabled {
            lines.push(format!("  day files:   {}", self.daily.files.len()));
            if let Some(newest) = self.daily.files.first() {
                lines.push(format!("  newest file: {newest}"));
            }
        }
        lines.push(format!("latest: {}", on_off(self.latest_enabled)));
        lines.join("\n")
    }
}
