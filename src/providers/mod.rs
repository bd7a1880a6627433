// src/providers/mod.rs
//! Inference providers: descriptors, the client abstraction, concrete HTTP
//! clients, and the priority router that fails over between them.

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod router;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Secret;
use crate::error::CallError;
use crate::retry::RetryPolicy;

pub use router::{ProviderRouter, Routed};

/// Wire protocol spoken by a provider endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// `/chat/completions` (OpenAI, ZhipuAI GLM, most local servers).
    OpenAiCompatible,
    /// Google `models/{model}:generateContent`.
    Gemini,
}

/// One row of the provider table. Built once from configuration.
#[derive(Debug, Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: ProviderKind,
    pub priority_rank: i32,
    pub model_id: String,
    pub endpoint: String,
    pub credential: Option<Secret>,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl PromptRequest {
    /// Smallest request that proves the endpoint answers.
    pub fn probe() -> Self {
        Self {
            system_prompt: "Reply with OK.".into(),
            user_prompt: "ping".into(),
            max_output_tokens: 1,
            temperature: 0.0,
        }
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// One attempt; retries are applied by the router.
    async fn complete(&self, request: &PromptRequest) -> Result<String, CallError>;

    /// Lightweight liveness check.
    async fn probe(&self) -> Result<(), CallError> {
        self.complete(&PromptRequest::probe()).await.map(|_| ())
    }

    fn provider_name(&self) -> &str;
}

/// Builds a client for a descriptor. Failing here (e.g. missing credential)
/// counts as that provider's failure and the router moves on.
pub trait ClientFactory: Send + Sync {
    fn build(&self, descriptor: &ProviderDescriptor) -> Result<Arc<dyn InferenceClient>, CallError>;
}

/// Production factory: real HTTP clients, or a mock when `AI_TEST_MODE=mock`.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    mock_mode: bool,
}

impl HttpClientFactory {
    pub fn from_env() -> Self {
        let mock_mode = std::env::var("AI_TEST_MODE")
            .map(|v| v == "mock")
            .unwrap_or(false);
        Self { mock_mode }
    }
}

impl ClientFactory for HttpClientFactory {
    fn build(&self, d: &ProviderDescriptor) -> Result<Arc<dyn InferenceClient>, CallError> {
        if self.mock_mode {
            return Ok(Arc::new(mock::MockClient::new(&d.name)));
        }
        let Some(key) = d.credential.clone() else {
            return Err(CallError::Setup(format!("no credential for provider {}", d.name)));
        };
        let client: Arc<dyn InferenceClient> = match d.kind {
            ProviderKind::OpenAiCompatible => Arc::new(openai::OpenAiCompatibleClient::new(
                &d.name,
                &d.endpoint,
                &d.model_id,
                key,
            )?),
            ProviderKind::Gemini => Arc::new(gemini::GeminiClient::new(
                &d.name,
                &d.endpoint,
                &d.model_id,
                key,
            )?),
        };
        Ok(client)
    }
}

/// Shared reqwest builder for provider clients (fresh per client).
pub(crate) fn http_client() -> Result<reqwest::Client, CallError> {
    reqwest::Client::builder()
        .user_agent(concat!("gold-silver-intel/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(std::time::Duration::from_secs(4))
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(|e| CallError::Setup(e.to_string()))
}
