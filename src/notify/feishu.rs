use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{split_message, Notifier};
use crate::config::FeishuConfig;

/// Tokens live two hours upstream; we keep them for 90 minutes and refresh 5 minutes early.
const TOKEN_TTL_SECS: i64 = 90 * 60;
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS)
    }
}

#[derive(Serialize)]
struct TokenReq<'a> {
    app_id: &'a str,
    app_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResp {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    tenant_access_token: Option<String>,
}

#[derive(Serialize)]
struct MessageReq<'a> {
    receive_id: &'a str,
    msg_type: &'a str,
    /// Feishu wants the content as a JSON *string*.
    content: String,
}

#[derive(Deserialize)]
struct ApiResp {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Feishu (Lark) bot sender: rich-text `post` messages to one chat.
pub struct FeishuNotifier {
    cfg: FeishuConfig,
    client: Client,
    timeout: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl FeishuNotifier {
    pub fn new(cfg: FeishuConfig) -> Self {
        Self {
            cfg,
            client: Client::new(),
            timeout: Duration::from_secs(30),
            token: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn tenant_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;
        let now = Utc::now();
        if let Some(t) = guard.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(t.value.clone());
        }

        let resp: TokenResp = self
            .client
            .post(&self.cfg.token_url)
            .timeout(self.timeout)
            .json(&TokenReq {
                app_id: &self.cfg.app_id,
                app_secret: &self.cfg.app_secret,
            })
            .send()
            .await
            .context("feishu token post")?
            .error_for_status()
            .context("feishu token non-2xx")?
            .json()
            .await
            .context("decoding feishu token response")?;

        if resp.code != 0 {
            bail!("feishu token rejected: code={} msg={}", resp.code, resp.msg);
        }
        let value = resp
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("feishu token response without tenant_access_token"))?;

        tracing::debug!("feishu access token refreshed");
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: now + ChronoDuration::seconds(TOKEN_TTL_SECS),
        });
        Ok(value)
    }

    async fn send_post(&self, title: &str, text: &str) -> Result<()> {
        let token = self.tenant_token().await?;
        let content = serde_json::json!({
            "zh_cn": {
                "title": title,
                "content": [[{ "tag": "text", "text": text }]]
            }
        });
        let req = MessageReq {
            receive_id: &self.cfg.chat_id,
            msg_type: "post",
            content: content.to_string(),
        };

        let resp: ApiResp = self
            .client
            .post(&self.cfg.message_url)
            .timeout(self.timeout)
            .bearer_auth(token)
            .query(&[("receive_id_type", self.cfg.receive_id_type.as_str())])
            .json(&req)
            .send()
            .await
            .context("feishu message post")?
            .error_for_status()
            .context("feishu message non-2xx")?
            .json()
            .await
            .context("decoding feishu message response")?;

        if resp.code != 0 {
            bail!("feishu message rejected: code={} msg={}", resp.code, resp.msg);
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    async fn notify(&self, title: &str, body: &str) -> bool {
        let chunks = split_message(body, self.cfg.max_message_len.max(1));
        let total = chunks.len();
        if total > 1 {
            tracing::info!(parts = total, "message too long, sending in parts");
        }

        let mut ok = true;
        for (i, chunk) in chunks.iter().enumerate() {
            let part_title = match (total, title.is_empty()) {
                (1, _) => title.to_string(),
                (_, false) => format!("{title} ({}/{total})", i + 1),
                (_, true) => format!("Part {}/{total}", i + 1),
            };
            if let Err(e) = self.send_post(&part_title, chunk).await {
                tracing::warn!(error = ?e, part = i + 1, "feishu send failed");
                ok = false;
            }
        }
        ok
    }

    fn name(&self) -> &'static str {
        "feishu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_refreshes_five_minutes_early() {
        let now = Utc::now();
        let t = CachedToken {
            value: "t".into(),
            expires_at: now + ChronoDuration::seconds(TOKEN_REFRESH_MARGIN_SECS + 1),
        };
        assert!(t.is_fresh(now));
        assert!(!t.is_fresh(now + ChronoDuration::seconds(2)));
    }
}
