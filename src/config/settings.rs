// src/config/settings.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::providers::ProviderKind;
use crate::retry::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/pipeline.toml";
pub const DEFAULT_JSON_PATH: &str = "config/pipeline.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    News,
    Social,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_query: String,
    pub result_count: u32,
    pub recency_window: String,
    /// Fetch order; items keep first-seen order across this sequence.
    pub sources: Vec<SourceKind>,
    pub social_sites: Vec<String>,
    pub max_items_in_prompt: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_query: "gold silver price news Fed interest rate".into(),
            result_count: 10,
            recency_window: "qdr:d".into(),
            sources: vec![SourceKind::News, SourceKind::Social],
            social_sites: vec!["reddit.com".into(), "x.com".into()],
            max_items_in_prompt: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: 2048,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Send a minimal request to each provider before the real call.
    pub probe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub search: RetryPolicy,
    pub provider: RetryPolicy,
    pub delivery: RetryPolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            search: RetryPolicy::search_default(),
            provider: RetryPolicy::provider_default(),
            delivery: RetryPolicy::delivery_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySettings {
    pub max_message_length: usize,
    pub parse_mode: String,
    pub title: String,
    pub api_base: String,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_message_length: 4096,
            parse_mode: "Markdown".into(),
            title: "Gold-Silver Intelligence Report".into(),
            api_base: "https://api.telegram.org".into(),
        }
    }
}

/// One row of the provider table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub name: String,
    pub kind: ProviderKind,
    pub priority_rank: i32,
    pub model_id: String,
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub credential_env: String,
    /// Overrides `retry.provider` for this provider.
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

pub fn default_providers() -> Vec<ProviderEntry> {
    vec![
        ProviderEntry {
            name: "glm".into(),
            kind: ProviderKind::OpenAiCompatible,
            priority_rank: 1,
            model_id: "glm-4-flash".into(),
            endpoint: "https://open.bigmodel.cn/api/paas/v4/chat/completions".into(),
            credential_env: "GLM_API_KEY".into(),
            retry: None,
        },
        ProviderEntry {
            name: "gemini".into(),
            kind: ProviderKind::Gemini,
            priority_rank: 2,
            model_id: "gemini-2.0-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            credential_env: "GEMINI_API_KEY".into(),
            retry: None,
        },
        ProviderEntry {
            name: "openai".into(),
            kind: ProviderKind::OpenAiCompatible,
            priority_rank: 3,
            model_id: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com/v1/chat/completions".into(),
            credential_env: "OPENAI_API_KEY".into(),
            retry: None,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub search: SearchSettings,
    pub generation: GenerationSettings,
    pub router: RouterSettings,
    pub retry: RetrySettings,
    pub delivery: DeliverySettings,
    pub providers: Vec<ProviderEntry>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search: SearchSettings::default(),
            generation: GenerationSettings::default(),
            router: RouterSettings::default(),
            retry: RetrySettings::default(),
            delivery: DeliverySettings::default(),
            providers: default_providers(),
        }
    }
}

impl Settings {
    /// Clamp out-of-range values instead of failing startup.
    pub fn sanitized(mut self) -> Self {
        if self.delivery.max_message_length == 0 {
            tracing::warn!("delivery.max_message_length=0, using 4096");
            self.delivery.max_message_length = 4096;
        }
        if self.search.result_count == 0 {
            tracing::warn!("search.result_count=0, using 10");
            self.search.result_count = 10;
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            tracing::warn!(
                temperature = self.generation.temperature,
                "temperature out of range, using 0.7"
            );
            self.generation.temperature = 0.7;
        }
        self.retry.search = self.retry.search.sanitized();
        self.retry.provider = self.retry.provider.sanitized();
        self.retry.delivery = self.retry.delivery.sanitized();
        for p in &mut self.providers {
            p.retry = p.retry.take().map(RetryPolicy::sanitized);
        }
        self
    }
}

/// Load settings from an explicit path. Supports TOML or JSON formats.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_settings(&content, ext.as_str()).map(Settings::sanitized)
}

/// Load settings using env var + fallbacks:
/// 1) $PIPELINE_CONFIG_PATH
/// 2) config/pipeline.toml
/// 3) config/pipeline.json
/// 4) built-in defaults
pub fn load_settings_default() -> Result<Settings> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_settings_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_TOML_PATH);
    if toml_p.exists() {
        return load_settings_from(&toml_p);
    }
    let json_p = PathBuf::from(DEFAULT_JSON_PATH);
    if json_p.exists() {
        return load_settings_from(&json_p);
    }
    Ok(Settings::default())
}

fn parse_settings(s: &str, hint_ext: &str) -> Result<Settings> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing settings json");
    }
    if hint_ext == "toml" {
        return toml::from_str(s).context("parsing settings toml");
    }
    // Unknown extension: JSON first if it looks like an object, then TOML.
    if s.trim_start().starts_with('{') {
        if let Ok(v) = serde_json::from_str(s) {
            return Ok(v);
        }
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported settings format: {e}"))
}
