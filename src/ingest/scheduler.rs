// src/ingest/scheduler.rs
use std::time::Duration;

use metrics::{counter, gauge};
use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::ingest::paginator::Paginator;
use crate::store::RetentionStore;

#[derive(Clone, Debug)]
pub struct SchedulerCfg {
    pub accounts: Vec<String>,
    /// Sleep between cycles, and the search lookback of every cycle.
    pub interval: Duration,
}

impl From<&MonitorConfig> for SchedulerCfg {
    fn from(cfg: &MonitorConfig) -> Self {
        Self {
            accounts: cfg.accounts.clone(),
            interval: cfg.interval(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching,
    Persisting,
    Sleeping,
    Stopped,
}

/// Outcome of one fetch/persist cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    /// `(store name, newly accepted)` in store order.
    pub accepted: Vec<(&'static str, usize)>,
}

impl CycleReport {
    pub fn accepted_by(&self, store: &str) -> Option<usize> {
        self.accepted
            .iter()
            .find(|(name, _)| *name == store)
            .map(|(_, n)| *n)
    }
}

/// Runs fetch -> persist cycles on a single task. Stop requests are honored only
/// between cycles: a running fetch and its persists always finish.
pub struct Scheduler {
    cfg: SchedulerCfg,
    paginator: Paginator,
    stores: Vec<Box<dyn RetentionStore>>,
    stop: CancellationToken,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        cfg: SchedulerCfg,
        paginator: Paginator,
        stores: Vec<Box<dyn RetentionStore>>,
    ) -> Self {
        Self {
            cfg,
            paginator,
            stores,
            stop: CancellationToken::new(),
            state: SchedulerState::Idle,
        }
    }

    /// Token that ends `run_continuous` at the next cycle boundary when cancelled.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    pub fn with_stop_token(mut self, token: CancellationToken) -> Self {
        self.stop = token;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn store_names(&self) -> Vec<&'static str> {
        self.stores.iter().map(|s| s.name()).collect()
    }

    pub async fn run_once(&mut self) -> CycleReport {
        crate::ingest::ensure_metrics_described();

        self.state = SchedulerState::Fetching;
        tracing::info!(
            target: "ingest",
            accounts = self.cfg.accounts.len(),
            stores = ?self.store_names(),
            lookback_secs = self.cfg.interval.as_secs(),
            "cycle started"
        );
        let batch = self
            .paginator
            .fetch(&self.cfg.accounts, self.cfg.interval)
            .await;

        self.state = SchedulerState::Persisting;
        let mut report = CycleReport {
            fetched: batch.len(),
            accepted: Vec::with_capacity(self.stores.len()),
        };
        for store in self.stores.iter_mut() {
            let n = store.accept(&batch);
            report.accepted.push((store.name(), n));
        }

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        counter!("monitor_cycles_total").increment(1);
        gauge!("monitor_last_cycle_ts").set(now as f64);

        tracing::info!(
            target: "ingest",
            fetched = report.fetched,
            accepted = ?report.accepted,
            "cycle finished"
        );
        self.state = SchedulerState::Idle;
        report
    }

    /// Loop until the stop token fires. Returns the number of completed cycles.
    pub async fn run_continuous(&mut self) -> usize {
        let stop = self.stop.clone();
        let mut cycles = 0usize;

        tracing::info!(
            target: "ingest",
            accounts = self.cfg.accounts.len(),
            interval_secs = self.cfg.interval.as_secs(),
            "monitor started"
        );

        loop {
            if stop.is_cancelled() {
                break;
            }
            self.run_once().await;
            cycles += 1;

            if stop.is_cancelled() {
                break;
            }
            self.state = SchedulerState::Sleeping;
            tracing::info!(
                target: "ingest",
                secs = self.cfg.interval.as_secs(),
                "sleeping until next cycle"
            );
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(self.cfg.interval) => {}
            }
        }

        self.state = SchedulerState::Stopped;
        tracing::info!(target: "ingest", cycles, "monitor stopped");
        cycles
    }
}
