// src/pipeline.rs
//! # Two-stage pipeline
//! search → dedup → collector stage → analyst stage → combined report.
//!
//! The analyst stage only ever sees the collector's materialized output; a
//! failed collector stage ends the run. Stages never run concurrently.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use sha2::{Digest, Sha256};

use crate::config::{AppConfig, Settings, SourceKind};
use crate::error::{ConfigError, PipelineError};
use crate::ingest::{self, clean_text};
use crate::ingest::providers::serper::SerperProvider;
use crate::ingest::types::{Item, SearchQuery, SourceProvider};
use crate::prompts;
use crate::providers::{ClientFactory, HttpClientFactory, PromptRequest, ProviderRouter};

pub const NOTHING_FOUND_MESSAGE: &str = "❌ No news found. Please try again later.";
pub const STAGE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageRole {
    Collector,
    Analyst,
}

impl fmt::Display for StageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageRole::Collector => f.write_str("collector"),
            StageRole::Analyst => f.write_str("analyst"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Collecting,
    Analyzing,
    Done,
    Failed,
}

impl PipelineState {
    /// Next state after the current stage succeeded (`ok`) or failed.
    /// Terminal states stay put.
    pub fn next(self, ok: bool) -> Self {
        match (self, ok) {
            (PipelineState::Collecting, true) => PipelineState::Analyzing,
            (PipelineState::Analyzing, true) => PipelineState::Done,
            (PipelineState::Collecting | PipelineState::Analyzing, false) => PipelineState::Failed,
            (terminal, _) => terminal,
        }
    }
}

/// What one stage was given and what it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
    pub role: StageRole,
    pub prompt_template: String,
    /// Raw stage input; the analyst's is the collector's output verbatim.
    pub input: String,
    pub output: Option<String>,
    pub provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub collector: StageRecord,
    pub analyst: StageRecord,
    pub items_total: usize,
    pub items_used: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Search returned nothing; no provider was called.
    NothingFound,
    Report(Report),
}

impl PipelineOutcome {
    /// Text to print or deliver.
    pub fn text(&self) -> &str {
        match self {
            PipelineOutcome::NothingFound => NOTHING_FOUND_MESSAGE,
            PipelineOutcome::Report(r) => &r.text,
        }
    }
}

pub struct Orchestrator {
    sources: Vec<Box<dyn SourceProvider>>,
    router: ProviderRouter,
    settings: Settings,
}

impl Orchestrator {
    pub fn new(sources: Vec<Box<dyn SourceProvider>>, router: ProviderRouter, settings: Settings) -> Self {
        Self {
            sources,
            router,
            settings,
        }
    }

    /// Production wiring. Fails when no provider has a credential.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, PipelineError> {
        Self::from_config_with_factory(cfg, Arc::new(HttpClientFactory::from_env()))
    }

    pub fn from_config_with_factory(
        cfg: &AppConfig,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<Self, PipelineError> {
        if !cfg.has_provider_credentials() {
            return Err(ConfigError::NoProviderCredentials {
                checked: cfg.credential_envs(),
            }
            .into());
        }

        let search = &cfg.settings.search;
        let sources: Vec<Box<dyn SourceProvider>> = search
            .sources
            .iter()
            .map(|kind| -> Box<dyn SourceProvider> {
                match kind {
                    SourceKind::News => Box::new(SerperProvider::news(cfg.serper_key.clone())),
                    SourceKind::Social => Box::new(SerperProvider::social(
                        cfg.serper_key.clone(),
                        search.social_sites.clone(),
                    )),
                }
            })
            .collect();

        let router = ProviderRouter::new(cfg.providers.clone(), factory)
            .with_probe(cfg.settings.router.probe);
        Ok(Self::new(sources, router, cfg.settings.clone()))
    }

    /// The single entry point: one query, one sequential run.
    pub async fn run_pipeline(&self, query: &str) -> Result<PipelineOutcome, PipelineError> {
        let query = if query.trim().is_empty() {
            self.settings.search.default_query.clone()
        } else {
            query.trim().to_string()
        };
        tracing::info!(query = %query, "pipeline started");

        let search_query = SearchQuery {
            query,
            result_count: self.settings.search.result_count,
            recency_window: self.settings.search.recency_window.clone(),
        };
        let ingest = ingest::run_once(&self.sources, &search_query, &self.settings.retry.search).await;
        if ingest.all_sources_failed() {
            let detail = ingest
                .failed_sources
                .iter()
                .map(|(name, e)| format!("{name}: {e}"))
                .collect::<Vec<_>>()
                .join("; ");
            counter!("pipeline_runs_total", "result" => "search_failed").increment(1);
            return Err(PipelineError::Search(detail));
        }
        if ingest.items.is_empty() {
            tracing::info!("search returned no items, skipping analysis");
            counter!("pipeline_runs_total", "result" => "nothing_found").increment(1);
            return Ok(PipelineOutcome::NothingFound);
        }

        let limit = self.settings.search.max_items_in_prompt.max(1);
        let items_used = ingest.items.len().min(limit);
        let items_text = render_items(&ingest.items, limit);

        let mut state = PipelineState::Collecting;

        let collector = match self
            .run_stage(StageRole::Collector, prompts::COLLECTOR_PROMPT, items_text)
            .await
        {
            Ok(rec) => rec,
            Err(e) => {
                state = state.next(false);
                tracing::error!(?state, error = %e, "collector stage failed");
                counter!("pipeline_runs_total", "result" => "failed").increment(1);
                return Err(e);
            }
        };
        state = state.next(true);
        tracing::debug!(?state, "collector stage done");

        // hard dependency: analyst input is exactly the collector output
        let analyst_input = collector.output.clone().unwrap_or_default();
        let analyst = match self
            .run_stage(StageRole::Analyst, prompts::ANALYST_PROMPT, analyst_input)
            .await
        {
            Ok(rec) => rec,
            Err(e) => {
                state = state.next(false);
                tracing::error!(?state, error = %e, "analyst stage failed");
                counter!("pipeline_runs_total", "result" => "failed").increment(1);
                return Err(e);
            }
        };
        state = state.next(true);

        let generated_at = Utc::now();
        let text = compose_report(&collector, &analyst, generated_at);
        tracing::info!(
            ?state,
            items = items_used,
            report_len = text.chars().count(),
            report_id = %digest(&text),
            "pipeline finished"
        );
        counter!("pipeline_runs_total", "result" => "done").increment(1);

        Ok(PipelineOutcome::Report(Report {
            text,
            collector,
            analyst,
            items_total: ingest.items.len(),
            items_used,
            generated_at,
        }))
    }

    async fn run_stage(
        &self,
        role: StageRole,
        template: &str,
        input: String,
    ) -> Result<StageRecord, PipelineError> {
        let user_prompt = match role {
            StageRole::Collector => prompts::collector_input(&input),
            StageRole::Analyst => prompts::analyst_input(&input),
        };
        let request = PromptRequest {
            system_prompt: template.to_string(),
            user_prompt,
            max_output_tokens: self.settings.generation.max_output_tokens,
            temperature: self.settings.generation.temperature,
        };
        let routed = self
            .router
            .select_and_invoke(&request)
            .await
            .map_err(|source| PipelineError::StageFailed { stage: role, source })?;

        tracing::info!(stage = %role, provider = %routed.provider.name, "stage completed");
        Ok(StageRecord {
            role,
            prompt_template: template.to_string(),
            input,
            output: Some(routed.text),
            provider: Some(routed.provider.name),
        })
    }
}

/// Render items for the collector prompt (at most `limit`).
pub fn render_items(items: &[Item], limit: usize) -> String {
    items
        .iter()
        .take(limit)
        .map(|it| {
            format!(
                "📰 {}\n   Source: {} | {}\n   {}",
                clean_text(&it.title),
                clean_text(&it.source),
                clean_text(&it.published_at),
                clean_text(&it.snippet)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Provenance line: one provider named once, two providers named per stage.
pub fn provenance_header(collector: &StageRecord, analyst: &StageRecord) -> String {
    let a = collector.provider.as_deref().unwrap_or("unknown");
    let b = analyst.provider.as_deref().unwrap_or("unknown");
    if a == b {
        format!("🤖 _Provider: {a}_")
    } else {
        format!("🤖 _Providers: {a} (collector), {b} (analyst)_")
    }
}

pub fn compose_report(collector: &StageRecord, analyst: &StageRecord, at: DateTime<Utc>) -> String {
    format!(
        "{}\n🕒 {}\n\n{}{}{}",
        provenance_header(collector, analyst),
        at.format("%Y-%m-%d %H:%M UTC"),
        collector.output.as_deref().unwrap_or_default(),
        STAGE_SEPARATOR,
        analyst.output.as_deref().unwrap_or_default()
    )
}

/// Short content digest for logs; report text itself is never logged.
pub fn digest(text: &str) -> String {
    let hash = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in hash.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
