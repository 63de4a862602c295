// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod digest;
pub mod export;
pub mod ingest;
pub mod notify;
pub mod stats;
pub mod store;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::config::MonitorConfig;
pub use crate::ingest::paginator::Paginator;
pub use crate::ingest::scheduler::{CycleReport, Scheduler, SchedulerCfg, SchedulerState};
pub use crate::ingest::types::{Author, Item, SearchApi, SearchPage};
pub use crate::store::{DailyStore, IncrementalStore, LatestStore, RetentionStore};

use std::sync::Arc;

use anyhow::Result;

use crate::ingest::providers::twitterapi::TwitterApiIoClient;

/// Wire a scheduler from a validated config: HTTP search client, paginator, and
/// every enabled store.
pub fn build_scheduler(cfg: &MonitorConfig) -> Result<Scheduler> {
    let api = TwitterApiIoClient::new(&cfg.api_base_url, &cfg.api_key)?;
    let paginator = Paginator::new(Arc::new(api));
    Ok(Scheduler::new(
        SchedulerCfg::from(cfg),
        paginator,
        store::stores_from_config(cfg),
    ))
}
