// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::CallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    News,
    Social,
}

/// One fetched news article or social post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub title: String, // as received; dedup uses a derived key
    pub link: String,
    pub snippet: String,
    pub source: String,       // e.g. "Reuters", "Kitco"
    pub published_at: String, // free-form, e.g. "3 hours ago"
    pub origin: Origin,
}

impl Item {
    /// Dedup key: lowercase(trim(title)).
    pub fn normalized_title(&self) -> String {
        self.title.trim().to_lowercase()
    }
}

/// What to search for, shared by every source in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub result_count: u32,
    /// Search-API recency token, e.g. "qdr:d" for the last 24h.
    pub recency_window: String,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// One attempt; retries are applied by the caller.
    async fn fetch_latest(&self, query: &SearchQuery) -> Result<Vec<Item>, CallError>;
    fn name(&self) -> &str;
    fn origin(&self) -> Origin;
}
