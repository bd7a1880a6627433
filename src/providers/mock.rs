// src/providers/mock.rs
use async_trait::async_trait;

use crate::error::CallError;
use crate::providers::{InferenceClient, PromptRequest};

/// Deterministic offline client, selected with `AI_TEST_MODE=mock`.
/// Echoes the size of the prompt so stage wiring stays observable.
#[derive(Debug, Clone)]
pub struct MockClient {
    name: String,
}

impl MockClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl InferenceClient for MockClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, CallError> {
        Ok(format!(
            "[mock:{}] processed {} chars of input",
            self.name,
            request.user_prompt.chars().count()
        ))
    }

    async fn probe(&self) -> Result<(), CallError> {
        Ok(())
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}
