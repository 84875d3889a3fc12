use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

/// Body returned by the feed-to-JSON proxy.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProxyResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub items: Vec<ProxyItem>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProxyItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "pubDate", default)]
    pub pub_date: String,
    #[serde(default)]
    pub link: String,
}

impl ProxyResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Anything that can turn a proxy URL into a proxy response.
#[async_trait]
pub trait FeedSource {
    async fn fetch(&self, url: &str) -> Result<ProxyResponse>;
}

pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent(concat!("uturn-tracker/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for HttpFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<ProxyResponse> {
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(anyhow!("proxy returned {}", resp.status()));
        }
        Ok(resp.json().await?)
    }
}
