// src/providers/router.rs
//! Priority-ordered provider selection with optional probing and failover.
//!
//! Providers are tried strictly in ascending `priority_rank` (ties keep
//! configuration order). The first provider that answers serves the request;
//! each failure is recorded and the next provider is tried.

use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::error::{AllProvidersFailed, CallError, ProviderFailure};
use crate::providers::{ClientFactory, InferenceClient, PromptRequest, ProviderDescriptor};
use crate::retry;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("provider_attempts_total", "Providers tried by the router.");
        describe_counter!(
            "provider_failures_total",
            "Providers that failed after retries, probe or setup."
        );
        describe_counter!(
            "provider_exhausted_total",
            "Routed calls where every provider failed."
        );
    });
}

/// Successful routed call, tagged with the provider that served it.
#[derive(Debug, Clone)]
pub struct Routed {
    pub text: String,
    pub provider: ProviderDescriptor,
}

pub struct ProviderRouter {
    providers: Vec<ProviderDescriptor>,
    factory: Arc<dyn ClientFactory>,
    probe: bool,
}

impl ProviderRouter {
    pub fn new(mut providers: Vec<ProviderDescriptor>, factory: Arc<dyn ClientFactory>) -> Self {
        // stable: equal ranks keep table order
        providers.sort_by_key(|p| p.priority_rank);
        Self {
            providers,
            factory,
            probe: false,
        }
    }

    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }

    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    pub async fn select_and_invoke(&self, request: &PromptRequest) -> Result<Routed, AllProvidersFailed> {
        ensure_metrics_described();

        let mut failures = Vec::new();
        for descriptor in &self.providers {
            counter!("provider_attempts_total", "provider" => descriptor.name.clone()).increment(1);
            match self.try_provider(descriptor, request).await {
                Ok(text) => {
                    if !failures.is_empty() {
                        tracing::info!(
                            provider = %descriptor.name,
                            skipped = failures.len(),
                            "served by fallback provider"
                        );
                    }
                    return Ok(Routed {
                        text,
                        provider: descriptor.clone(),
                    });
                }
                Err(error) => {
                    tracing::warn!(provider = %descriptor.name, rank = descriptor.priority_rank, %error, "provider failed, trying next");
                    counter!("provider_failures_total", "provider" => descriptor.name.clone())
                        .increment(1);
                    failures.push(ProviderFailure {
                        provider: descriptor.name.clone(),
                        priority_rank: descriptor.priority_rank,
                        error,
                    });
                }
            }
        }

        counter!("provider_exhausted_total").increment(1);
        Err(AllProvidersFailed { failures })
    }

    async fn try_provider(
        &self,
        descriptor: &ProviderDescriptor,
        request: &PromptRequest,
    ) -> Result<String, CallError> {
        let client: Arc<dyn InferenceClient> = self.factory.build(descriptor)?;
        if self.probe {
            // single attempt; a dead endpoint is skipped without burning the retry budget
            client.probe().await?;
        }
        let op = format!("provider:{}", descriptor.name);
        retry::call(&descriptor.retry, &op, || client.complete(request)).await
    }
}
