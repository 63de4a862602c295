// tests/ingest_scheduler.rs
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ai_news_monitor::store::stores_from_config;
use ai_news_monitor::{
    DailyStore, IncrementalStore, Item, LatestStore, MonitorConfig, Paginator, RetentionStore,
    Scheduler, SchedulerCfg, SchedulerState, SearchApi, SearchPage,
};
use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Serves the same single page on every call; optionally cancels a token on the Nth call.
struct FixedApi {
    items: Vec<Item>,
    calls: AtomicUsize,
    cancel_on: Option<(usize, CancellationToken)>,
}

#[async_trait]
impl SearchApi for FixedApi {
    async fn fetch_page(&self, _query: &str, _cursor: &str) -> Result<SearchPage> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on {
            if n == *at {
                token.cancel();
            }
        }
        Ok(SearchPage {
            items: self.items.clone(),
            has_next_page: false,
            next_cursor: String::new(),
        })
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

fn sample_items() -> Vec<Item> {
    vec![
        Item::new("100", "OpenAI", "new model", "2024-03-01T12:00:00Z"),
        Item::new("101", "huggingface", "new dataset", "2024-03-01T11:00:00Z"),
        Item::new("100", "OpenAI", "new model", "2024-03-01T12:00:00Z"),
    ]
}

fn all_stores(dir: &Path) -> Vec<Box<dyn RetentionStore>> {
    vec![
        Box::new(IncrementalStore::open(dir.join("all.json"), dir.join("ids.json"))),
        Box::new(DailyStore::new(dir, "daily")),
        Box::new(LatestStore::new(dir.join("latest.json"))),
    ]
}

fn scheduler(api: Arc<FixedApi>, dir: &Path, interval: Duration) -> Scheduler {
    let cfg = SchedulerCfg {
        accounts: vec!["OpenAI".into(), "huggingface".into()],
        interval,
    };
    Scheduler::new(cfg, Paginator::new(api), all_stores(dir))
}

fn fixed(cancel_on: Option<(usize, CancellationToken)>) -> Arc<FixedApi> {
    Arc::new(FixedApi {
        items: sample_items(),
        calls: AtomicUsize::new(0),
        cancel_on,
    })
}

#[tokio::test]
async fn run_once_reports_per_store_counts() {
    let dir = tempfile::tempdir().unwrap();
    let mut sched = scheduler(fixed(None), dir.path(), Duration::from_secs(60));

    let first = sched.run_once().await;
    assert_eq!(first.fetched, 2, "duplicate id inside the batch is dropped");
    assert_eq!(first.accepted_by("incremental"), Some(2));
    assert_eq!(first.accepted_by("daily"), Some(2));
    assert_eq!(first.accepted_by("latest"), Some(2));
    assert_eq!(sched.state(), SchedulerState::Idle);

    let second = sched.run_once().await;
    assert_eq!(second.accepted_by("incremental"), Some(0));
    assert_eq!(second.accepted_by("daily"), Some(0));
    assert_eq!(second.accepted_by("latest"), Some(2));

    assert!(dir.path().join("all.json").exists());
    assert!(dir.path().join("latest.json").exists());
}

#[tokio::test]
async fn stop_requested_during_fetch_finishes_that_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    let api = fixed(Some((1, token.clone())));
    let mut sched = scheduler(api.clone(), dir.path(), Duration::from_secs(3600))
        .with_stop_token(token);

    let cycles = sched.run_continuous().await;

    assert_eq!(cycles, 1);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sched.state(), SchedulerState::Stopped);
    let corpus = IncrementalStore::open(dir.path().join("all.json"), dir.path().join("ids.json"));
    assert_eq!(corpus.len(), 2, "the interrupted cycle still persisted");
}

#[tokio::test(start_paused = true)]
async fn sleeps_between_cycles_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    let api = fixed(Some((2, token.clone())));
    let mut sched = scheduler(api.clone(), dir.path(), Duration::from_secs(4 * 3600))
        .with_stop_token(token);

    let start = tokio::time::Instant::now();
    let cycles = sched.run_continuous().await;

    assert_eq!(cycles, 2);
    assert!(start.elapsed() >= Duration::from_secs(4 * 3600));
    assert_eq!(sched.state(), SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_during_sleep_ends_loop_without_another_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let api = fixed(None);
    let mut sched = scheduler(api.clone(), dir.path(), Duration::from_secs(3600));
    let token = sched.stop_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        token.cancel();
    });

    let cycles = sched.run_continuous().await;
    assert_eq!(cycles, 1);
    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let api = fixed(None);
    let mut sched = scheduler(api.clone(), dir.path(), Duration::from_secs(60));
    sched.stop_token().cancel();

    assert_eq!(sched.run_continuous().await, 0);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sched.state(), SchedulerState::Stopped);
}

#[test]
fn config_toggles_select_stores_in_fixed_order() {
    let dir = tempfile::tempdir().unwrap();
    let toml = format!(
        r#"
        api_key = "k"
        accounts = ["a"]
        enable_daily = false
        [storage]
        data_dir = '{}'
        "#,
        dir.path().display()
    );
    let cfg = MonitorConfig::from_toml_str(&toml).unwrap();
    let names: Vec<&str> = stores_from_config(&cfg).iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["incremental", "latest"]);

    let sched = Scheduler::new(
        SchedulerCfg::from(&cfg),
        Paginator::new(fixed(None)),
        stores_from_config(&cfg),
    );
    assert_eq!(sched.store_names(), vec!["incremental", "latest"]);
    assert_eq!(sched.state(), SchedulerState::Idle);
}
