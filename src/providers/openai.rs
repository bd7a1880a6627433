//! OpenAI-compatible chat completions client (OpenAI, ZhipuAI GLM, local servers).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Secret;
use crate::error::CallError;
use crate::providers::{http_client, InferenceClient, PromptRequest};

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    name: String,
    endpoint: String,
    model: String,
    api_key: Secret,
}

impl OpenAiCompatibleClient {
    /// `endpoint` is the full `/chat/completions` URL.
    pub fn new(name: &str, endpoint: &str, model: &str, api_key: Secret) -> Result<Self, CallError> {
        Ok(Self {
            http: http_client()?,
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl InferenceClient for OpenAiCompatibleClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, CallError> {
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &request.system_prompt,
                },
                Msg {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // Some gateways put "rate limit"/"quota" only in the body.
            let body = resp.text().await.unwrap_or_default();
            return Err(CallError::from_status(status.as_u16(), &body));
        }
        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(CallError::Decode(format!("{}: empty completion", self.name)));
        }
        Ok(content.trim().to_string())
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
