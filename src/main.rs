//! AI news monitor binary entrypoint.
//! Loads config, then runs one cycle, the continuous loop, or one of the
//! maintenance commands (export, stats, daily listing, digest, clear).

use std::path::PathBuf;
use std::sync::Arc;

use ai_news_monitor::config::MonitorConfig;
use ai_news_monitor::digest::{run_digest, DigestSource};
use ai_news_monitor::notify::{FeishuNotifier, LogNotifier, Notifier};
use ai_news_monitor::store::{self, DailyStore, IncrementalStore};
use ai_news_monitor::summarize::ChatCompletionsSummarizer;
use ai_news_monitor::{build_scheduler, export, stats};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DAILY_LIST_LIMIT: usize = 20;

#[derive(Debug, Parser)]
#[command(version, about = "Collects posts from watched accounts and keeps them on disk")]
struct Cli {
    /// Run a single fetch/persist cycle and exit.
    #[arg(short, long)]
    once: bool,
    /// Export the incremental corpus to markdown.
    #[arg(short, long)]
    export: bool,
    /// Show storage statistics.
    #[arg(short, long)]
    stats: bool,
    /// List the per-day files.
    #[arg(long)]
    daily: bool,
    /// Summarize a stored view and send it to the configured chat.
    #[arg(long, value_enum)]
    digest: Option<DigestSource>,
    /// Delete every stored view (corpus, ledger, day files, latest) and exit.
    #[arg(long)]
    clear: bool,
    /// Config file (defaults to $MONITOR_CONFIG_PATH or config/monitor.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ai_news_monitor=info,ingest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("stop requested, finishing current cycle");
        token.cancel();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(p) => MonitorConfig::load_from_file(p),
        None => MonitorConfig::load_default(),
    }
    .context("invalid configuration, nothing was run")?;

    if cli.export {
        if !cfg.enable_incremental {
            tracing::warn!("incremental store is disabled, nothing to export");
            return Ok(());
        }
        let s = &cfg.storage;
        let store = IncrementalStore::open(
            s.data_dir.join(&s.incremental_file),
            s.data_dir.join(&s.incremental_ids_file),
        );
        let path = export::export_markdown(store.items(), &s.export_dir)?;
        println!("exported {} posts to {}", store.len(), path.display());
        return Ok(());
    }

    if cli.clear {
        store::clear_all(&cfg)?;
        println!("cleared all data under {}", cfg.storage.data_dir.display());
        return Ok(());
    }

    if cli.stats {
        println!("{}", stats::collect(&cfg).render());
        return Ok(());
    }

    if cli.daily {
        let s = &cfg.storage;
        let files = DailyStore::new(&s.data_dir, &s.daily_prefix).list_files();
        println!("{} day files:", files.len());
        for (i, f) in files.iter().take(DAILY_LIST_LIMIT).enumerate() {
            println!("  {}. {f}", i + 1);
        }
        if files.len() > DAILY_LIST_LIMIT {
            println!("  ... and {} more", files.len() - DAILY_LIST_LIMIT);
        }
        return Ok(());
    }

    if let Some(source) = cli.digest {
        let sum_cfg = cfg
            .summarizer
            .clone()
            .context("--digest needs a [summarizer] section in the config")?;
        let summarizer = ChatCompletionsSummarizer::new(sum_cfg)?;
        let notifier: Arc<dyn Notifier> = match cfg.feishu.clone() {
            Some(f) => Arc::new(FeishuNotifier::new(f)),
            None => Arc::new(LogNotifier),
        };
        match run_digest(&cfg, source, &summarizer, notifier.as_ref()).await? {
            Some(path) => println!("summary written to {}", path.display()),
            None => println!("no posts in the {} view", source.as_str()),
        }
        return Ok(());
    }

    let mut scheduler = build_scheduler(&cfg)?;
    if cli.once {
        let report = scheduler.run_once().await;
        println!("fetched {} posts", report.fetched);
        for (store, n) in &report.accepted {
            println!("  {store}: {n}");
        }
        return Ok(());
    }

    spawn_signal_listener(scheduler.stop_token());
    scheduler.run_continuous().await;
    Ok(())
}
