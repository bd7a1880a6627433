// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::error::CallError;
use crate::ingest::types::{Item, SearchQuery, SourceProvider};
use crate::retry::{self, RetryPolicy};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One-time metrics registration (so series show up in the snapshot).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items returned by search sources.");
        describe_counter!("ingest_kept_total", "Items kept after deduplication.");
        describe_counter!("ingest_dedup_total", "Items removed as duplicates.");
        describe_counter!(
            "ingest_source_errors_total",
            "Search sources that failed after retries."
        );
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when the ingest step last ran."
        );
    });
}

/// Normalize text for prompt rendering: decode entities, strip tags,
/// straighten quotes, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Drop items whose normalized title or link was already accepted.
///
/// Keeps arrival order and the original (untrimmed) title of the first
/// occurrence. An empty link is an ordinary key, so at most one empty-link
/// item survives.
pub fn normalize(raw: Vec<Item>) -> Vec<Item> {
    let mut seen_titles: HashSet<String> = HashSet::new();
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(raw.len());

    for item in raw {
        let title_key = item.normalized_title();
        if seen_titles.contains(&title_key) || seen_links.contains(&item.link) {
            continue;
        }
        seen_titles.insert(title_key);
        seen_links.insert(item.link.clone());
        keep.push(item);
    }
    keep
}

/// Outcome of one ingest pass.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub items: Vec<Item>,
    pub fetched: usize,
    pub dedup: usize,
    /// Sources that failed after retries, in source order.
    pub failed_sources: Vec<(String, CallError)>,
    pub sources_total: usize,
}

impl IngestReport {
    /// True when at least one source was configured and none answered.
    pub fn all_sources_failed(&self) -> bool {
        self.sources_total > 0 && self.failed_sources.len() == self.sources_total
    }
}

/// Fetch every source in order (each under `policy`), concatenate, dedup.
pub async fn run_once(
    providers: &[Box<dyn SourceProvider>],
    query: &SearchQuery,
    policy: &RetryPolicy,
) -> IngestReport {
    ensure_metrics_described();

    let mut raw = Vec::new();
    let mut failed_sources = Vec::new();
    for p in providers {
        let op = format!("search:{}", p.name());
        match retry::call(policy, &op, || p.fetch_latest(query)).await {
            Ok(mut v) => {
                tracing::debug!(source = p.name(), count = v.len(), "source fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = %e, source = p.name(), "search source failed");
                counter!("ingest_source_errors_total").increment(1);
                failed_sources.push((p.name().to_string(), e));
            }
        }
    }

    let fetched = raw.len();
    let items = normalize(raw);
    let dedup = fetched - items.len();

    counter!("ingest_items_total").increment(fetched as u64);
    counter!("ingest_kept_total").increment(items.len() as u64);
    counter!("ingest_dedup_total").increment(dedup as u64);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    tracing::info!(
        target: "ingest",
        fetched,
        kept = items.len(),
        dedup,
        failed = failed_sources.len(),
        "ingest pass finished"
    );

    IngestReport {
        items,
        fetched,
        dedup,
        failed_sources,
        sources_total: providers.len(),
    }
}
