// src/ingest/providers/serper.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Secret;
use crate::error::CallError;
use crate::ingest::types::{Item, Origin, SearchQuery, SourceProvider};

pub const DEFAULT_SERPER_BASE: &str = "https://google.serper.dev";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
    #[serde(skip_serializing_if = "is_blank")]
    tbs: &'a str,
}

fn is_blank(s: &&str) -> bool {
    s.trim().is_empty()
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<Hit>,
    #[serde(default)]
    organic: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

enum Feed {
    /// `/news`, results under `news`.
    News,
    /// `/search` scoped to social sites, results under `organic`.
    Social { sites: Vec<String> },
}

/// Serper.dev search source. One instance per feed.
pub struct SerperProvider {
    feed: Feed,
    base_url: String,
    api_key: Option<Secret>,
    client: Result<reqwest::Client, CallError>,
}

impl SerperProvider {
    pub fn news(api_key: Option<Secret>) -> Self {
        Self::with_feed(Feed::News, api_key)
    }

    pub fn social(api_key: Option<Secret>, sites: Vec<String>) -> Self {
        Self::with_feed(Feed::Social { sites }, api_key)
    }

    fn with_feed(feed: Feed, api_key: Option<Secret>) -> Self {
        Self {
            feed,
            base_url: DEFAULT_SERPER_BASE.to_string(),
            api_key,
            client: search_client(),
        }
    }

    /// Point at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    fn scoped_query(&self, query: &str) -> String {
        match &self.feed {
            Feed::News => query.to_string(),
            Feed::Social { sites } if sites.is_empty() => query.to_string(),
            Feed::Social { sites } => {
                let scope = sites
                    .iter()
                    .map(|s| format!("site:{s}"))
                    .collect::<Vec<_>>()
                    .join(" OR ");
                format!("{query} ({scope})")
            }
        }
    }

    fn to_items(&self, resp: SearchResponse) -> Vec<Item> {
        let (hits, origin) = match self.feed {
            Feed::News => (resp.news, Origin::News),
            Feed::Social { .. } => (resp.organic, Origin::Social),
        };
        hits.into_iter()
            .map(|h| {
                let source = h
                    .source
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| host_of(&h.link));
                Item {
                    title: h.title,
                    link: h.link,
                    snippet: h.snippet,
                    source,
                    published_at: h.date.unwrap_or_default(),
                    origin,
                }
            })
            .collect()
    }
}

// Builder failure is kept and reported on the first fetch.
fn search_client() -> Result<reqwest::Client, CallError> {
    reqwest::Client::builder()
        .user_agent(concat!("gold-silver-intel/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| CallError::Setup(format!("search client: {e}")))
}

fn host_of(link: &str) -> String {
    reqwest::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

#[async_trait]
impl SourceProvider for SerperProvider {
    async fn fetch_latest(&self, query: &SearchQuery) -> Result<Vec<Item>, CallError> {
        let Some(key) = &self.api_key else {
            return Err(CallError::Setup("SERPER_API_KEY not configured".into()));
        };
        let client = self.client.as_ref().map_err(Clone::clone)?;
        let path = match self.feed {
            Feed::News => "news",
            Feed::Social { .. } => "search",
        };
        let q = self.scoped_query(&query.query);
        let body = SearchRequest {
            q: &q,
            num: query.result_count,
            tbs: &query.recency_window,
        };

        let t0 = std::time::Instant::now();
        let resp = client
            .post(format!("{}/{}", self.base_url, path))
            .header("X-API-KEY", key.expose())
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), &text));
        }
        let parsed: SearchResponse = resp.json().await?;
        let items = self.to_items(parsed);

        histogram!("search_latency_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("search_requests_total", "feed" => path).increment(1);
        Ok(items)
    }

    fn name(&self) -> &str {
        match self.feed {
            Feed::News => "serper-news",
            Feed::Social { .. } => "serper-social",
        }
    }

    fn origin(&self) -> Origin {
        match self.feed {
            Feed::News => Origin::News,
            Feed::Social { .. } => Origin::Social,
        }
    }
}
