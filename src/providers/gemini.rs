// src/providers/gemini.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Secret;
use crate::error::CallError;
use crate::providers::{http_client, InferenceClient, PromptRequest};

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    name: String,
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    base: String,
    model: String,
    api_key: Secret,
}

impl GeminiClient {
    pub fn new(name: &str, base: &str, model: &str, api_key: Secret) -> Result<Self, CallError> {
        Ok(Self {
            http: http_client()?,
            name: name.to_string(),
            base: base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base, self.model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Req<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<PartOut<'a>>,
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, CallError> {
        let req = Req {
            system_instruction: Content {
                role: None,
                parts: vec![PartOut {
                    text: &request.system_prompt,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![PartOut {
                    text: &request.user_prompt,
                }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            },
        };

        let resp = self
            .http
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), &body));
        }
        let body: Resp = resp.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CallError::Decode(format!("{}: empty completion", self.name)));
        }
        Ok(text.trim().to_string())
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
