// src/config/mod.rs
//! Immutable runtime configuration: file settings + secrets from the environment.

pub mod secrets;
pub mod settings;

pub use secrets::{Secret, TelegramCredentials};
pub use settings::{Settings, SourceKind};

use crate::providers::ProviderDescriptor;
use tracing::{info, warn};

/// Everything the pipeline needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: Settings,
    pub serper_key: Option<Secret>,
    pub telegram: Option<TelegramCredentials>,
    /// Sorted by `priority_rank`.
    pub providers: Vec<ProviderDescriptor>,
}

impl AppConfig {
    /// Settings file (see `settings::load_settings_default`) + process env.
    pub fn load() -> anyhow::Result<Self> {
        let settings = settings::load_settings_default()?;
        Ok(Self::from_parts(settings, &secrets::env_lookup))
    }

    /// Resolve secrets through `lookup` instead of the process environment.
    pub fn from_parts<F>(settings: Settings, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut providers: Vec<ProviderDescriptor> = settings
            .providers
            .iter()
            .map(|entry| {
                let credential = secrets::lookup_secret(lookup, &entry.credential_env);
                let retry = entry
                    .retry
                    .clone()
                    .unwrap_or_else(|| settings.retry.provider.clone());
                ProviderDescriptor {
                    name: entry.name.clone(),
                    kind: entry.kind,
                    priority_rank: entry.priority_rank,
                    model_id: entry.model_id.clone(),
                    endpoint: entry.endpoint.clone(),
                    credential,
                    retry,
                }
            })
            .collect();
        providers.sort_by_key(|p| p.priority_rank);

        let cfg = Self {
            serper_key: secrets::lookup_secret(lookup, secrets::ENV_SERPER_API_KEY),
            telegram: secrets::telegram_from(lookup),
            providers,
            settings,
        };
        cfg.log_status();
        cfg
    }

    pub fn has_provider_credentials(&self) -> bool {
        self.providers.iter().any(|p| p.credential.is_some())
    }

    /// Credential env names that were checked, for error messages.
    pub fn credential_envs(&self) -> String {
        self.settings
            .providers
            .iter()
            .map(|p| p.credential_env.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    // Presence only; never values.
    fn log_status(&self) {
        for p in &self.providers {
            if p.credential.is_some() {
                info!(provider = %p.name, rank = p.priority_rank, "provider configured");
            } else {
                warn!(provider = %p.name, "provider credential missing");
            }
        }
        if self.serper_key.is_none() {
            warn!("SERPER_API_KEY not configured");
        }
        if self.telegram.is_none() {
            warn!("Telegram not fully configured");
        }
    }
}
