// src/config/monitor.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "MONITOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/monitor.toml";

const PLACEHOLDER_KEY: &str = "YOUR_API_KEY_HERE";

fn default_api_base_url() -> String {
    crate::ingest::providers::twitterapi::DEFAULT_BASE_URL.to_string()
}
fn default_interval_secs() -> u64 {
    14_400
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "StorageConfig::default_incremental_file")]
    pub incremental_file: String,
    #[serde(default = "StorageConfig::default_incremental_ids_file")]
    pub incremental_ids_file: String,
    #[serde(default = "StorageConfig::default_daily_prefix")]
    pub daily_prefix: String,
    #[serde(default = "StorageConfig::default_latest_file")]
    pub latest_file: String,
    /// Where `--export` writes markdown.
    #[serde(default = "StorageConfig::default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "StorageConfig::default_summaries_dir")]
    pub summaries_dir: PathBuf,
}

impl StorageConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data")
    }
    fn default_incremental_file() -> String {
        "tweets_all.json".into()
    }
    fn default_incremental_ids_file() -> String {
        "tweets_ids.json".into()
    }
    fn default_daily_prefix() -> String {
        "tweets_daily".into()
    }
    fn default_latest_file() -> String {
        "tweets_latest.json".into()
    }
    fn default_export_dir() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_summaries_dir() -> PathBuf {
        PathBuf::from("summaries")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            incremental_file: Self::default_incremental_file(),
            incremental_ids_file: Self::default_incremental_ids_file(),
            daily_prefix: Self::default_daily_prefix(),
            latest_file: Self::default_latest_file(),
            export_dir: Self::default_export_dir(),
            summaries_dir: Self::default_summaries_dir(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_items() -> usize {
    100
}
fn default_system_prompt() -> String {
    "You are an analyst who condenses AI industry news from social posts into a short, \
     well-structured briefing. Group related posts, keep links, skip chatter."
        .into()
}
fn default_user_prompt() -> String {
    "Summarize the following {count} posts into a concise news briefing:\n\n{tweets}".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// OpenAI-compatible base, e.g. `https://api.openai.com/v1`.
    pub api_base_url: String,
    /// "ENV" means: read from SUMMARIZER_API_KEY
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// `{count}` and `{tweets}` are substituted.
    #[serde(default = "default_user_prompt")]
    pub user_prompt_template: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_receive_id_type() -> String {
    "chat_id".into()
}
fn default_token_url() -> String {
    "https://open.feishu.cn/open-apis/auth/v3/tenant_access_token/internal".into()
}
fn default_message_url() -> String {
    "https://open.feishu.cn/open-apis/im/v1/messages".into()
}
fn default_max_message_len() -> usize {
    15_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeishuConfig {
    pub app_id: String,
    /// "ENV" means: read from FEISHU_APP_SECRET
    pub app_secret: String,
    pub chat_id: String,
    #[serde(default = "default_receive_id_type")]
    pub receive_id_type: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_message_url")]
    pub message_url: String,
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// "ENV" means: read from TWITTER_API_KEY
    pub api_key: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub accounts: Vec<String>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_true")]
    pub enable_incremental: bool,
    #[serde(default = "default_true")]
    pub enable_daily: bool,
    #[serde(default = "default_true")]
    pub enable_latest: bool,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
    #[serde(default)]
    pub feishu: Option<FeishuConfig>,
}

impl MonitorConfig {
    /// `$MONITOR_CONFIG_PATH`, falling back to `config/monitor.toml`.
    pub fn load_default() -> Result<Self> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading monitor config from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("in {}", path.display()))
    }

    /// Parse, resolve "ENV" secrets, normalize and validate.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: MonitorConfig = toml::from_str(s).context("parsing monitor config")?;

        cfg.api_key = resolve_secret(&cfg.api_key, "TWITTER_API_KEY")?;
        if let Some(sum) = cfg.summarizer.as_mut() {
            sum.api_key = resolve_secret(&sum.api_key, "SUMMARIZER_API_KEY")?;
        }
        if let Some(fs_cfg) = cfg.feishu.as_mut() {
            fs_cfg.app_secret = resolve_secret(&fs_cfg.app_secret, "FEISHU_APP_SECRET")?;
        }

        cfg.accounts = cfg
            .accounts
            .iter()
            .map(|a| a.trim().trim_start_matches('@').to_string())
            .filter(|a| !a.is_empty())
            .collect();

        cfg.validate()?;
        Ok(cfg)
    }

    /// Everything that must hold before the first cycle may run.
    pub fn validate(&self) -> Result<()> {
        let key = self.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_KEY {
            bail!(
                "api_key is not set (put it in the config, or set TWITTER_API_KEY \
                 with api_key = \"ENV\")"
            );
        }
        if self.accounts.is_empty() {
            bail!("no accounts configured to watch");
        }
        if !(self.enable_incremental || self.enable_daily || self.enable_latest) {
            bail!("at least one of enable_incremental / enable_daily / enable_latest must be true");
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn resolve_secret(value: &str, var: &str) -> Result<String> {
    if value.trim().eq_ignore_ascii_case("env") {
        env::var(var).map_err(|_| anyhow!("Missing {var} env var"))
    } else {
        Ok(value.to_string())
    }
}
