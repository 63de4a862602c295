// src/ingest/providers/twitterapi.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use reqwest::header::ACCEPT;

use crate::ingest::types::{SearchApi, SearchPage};

pub const DEFAULT_BASE_URL: &str = "https://api.twitterapi.io";
const SEARCH_PATH: &str = "twitter/tweet/advanced_search";
const QUERY_TYPE: &str = "Latest";

/// Advanced-search client for twitterapi.io (`X-API-Key` auth).
pub struct TwitterApiIoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TwitterApiIoClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("ai-news-monitor/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building search http client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn search_url(&self) -> String {
        format!("{}/{}", self.base_url, SEARCH_PATH)
    }
}

#[async_trait]
impl SearchApi for TwitterApiIoClient {
    async fn fetch_page(&self, query: &str, cursor: &str) -> Result<SearchPage> {
        let t0 = std::time::Instant::now();

        let resp = self
            .http
            .get(self.search_url())
            .header("X-API-Key", &self.api_key)
            .header(ACCEPT, "application/json")
            .query(&[("query", query), ("queryType", QUERY_TYPE), ("cursor", cursor)])
            .send()
            .await
            .context("search api get()")?
            .error_for_status()
            .context("search api non-2xx")?;

        let page: SearchPage = resp.json().await.context("decoding search api page")?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("monitor_page_fetch_ms").record(ms);
        Ok(page)
    }

    fn name(&self) -> &'static str {
        "twitterapi.io"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let c = TwitterApiIoClient::new("http://127.0.0.1:9/", "k").unwrap();
        assert_eq!(
            c.search_url(),
            "http://127.0.0.1:9/twitter/tweet/advanced_search"
        );
    }
}
