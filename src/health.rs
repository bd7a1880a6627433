// src/health.rs
//! Pre-flight checks for the external collaborators.

use crate::config::AppConfig;
use crate::ingest::providers::serper::SerperProvider;
use crate::ingest::types::{SearchQuery, SourceProvider};
use crate::notify::TelegramNotifier;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Ok(String),
    NotConfigured,
    Failed(String),
}

impl CheckStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, CheckStatus::Ok(_))
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub search: CheckStatus,
    pub telegram: CheckStatus,
    /// (provider name, credential present), in rank order.
    pub providers: Vec<(String, bool)>,
}

impl HealthReport {
    pub fn any_provider(&self) -> bool {
        self.providers.iter().any(|(_, ok)| *ok)
    }

    pub fn all_passed(&self) -> bool {
        self.search.is_ok() && self.telegram.is_ok() && self.any_provider()
    }
}

pub async fn check_search(provider: &SerperProvider) -> CheckStatus {
    let q = SearchQuery {
        query: "gold price".into(),
        result_count: 1,
        recency_window: String::new(),
    };
    match provider.fetch_latest(&q).await {
        Ok(items) => CheckStatus::Ok(format!("{} item(s)", items.len())),
        Err(crate::error::CallError::Setup(_)) => CheckStatus::NotConfigured,
        Err(e) => CheckStatus::Failed(e.to_string()),
    }
}

pub async fn check_telegram(notifier: Option<&TelegramNotifier>) -> CheckStatus {
    let Some(n) = notifier else {
        return CheckStatus::NotConfigured;
    };
    match n.get_me().await {
        Ok(username) => CheckStatus::Ok(format!("@{username}")),
        Err(e) => CheckStatus::Failed(e.to_string()),
    }
}

/// Probe Serper and Telegram, and report which providers have credentials.
/// Provider endpoints are not called; that costs tokens.
pub async fn run_health_check(cfg: &AppConfig) -> HealthReport {
    let search = check_search(&SerperProvider::news(cfg.serper_key.clone())).await;
    let notifier = cfg.telegram.clone().map(|t| {
        TelegramNotifier::new(t).with_api_base(&cfg.settings.delivery.api_base)
    });
    let telegram = check_telegram(notifier.as_ref()).await;
    let providers: Vec<(String, bool)> = cfg
        .providers
        .iter()
        .map(|p| (p.name.clone(), p.credential.is_some()))
        .collect();

    let report = HealthReport {
        search,
        telegram,
        providers,
    };
    log_report(&report);
    report
}

fn log_report(r: &HealthReport) {
    for (name, status) in [("search", &r.search), ("telegram", &r.telegram)] {
        match status {
            CheckStatus::Ok(detail) => info!(check = name, %detail, "ok"),
            CheckStatus::NotConfigured => warn!(check = name, "not configured"),
            CheckStatus::Failed(error) => warn!(check = name, %error, "failed"),
        }
    }
    for (name, present) in &r.providers {
        if *present {
            info!(check = "provider", provider = %name, "credential configured");
        } else {
            warn!(check = "provider", provider = %name, "credential missing");
        }
    }
    if !r.any_provider() {
        warn!("no LLM provider credential configured");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Secret, TelegramCredentials};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn telegram_get_me_reports_username() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/botT0KEN/getMe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "result": {"id": 1, "is_bot": true, "username": "gold_bot"}
            })))
            .mount(&server)
            .await;

        let n = TelegramNotifier::new(TelegramCredentials {
            bot_token: Secret::new("T0KEN").unwrap(),
            chat_id: "1".into(),
        })
        .with_api_base(&server.uri());
        assert_eq!(check_telegram(Some(&n)).await, CheckStatus::Ok("@gold_bot".into()));
    }

    #[tokio::test]
    async fn missing_pieces_are_not_configured() {
        assert_eq!(check_telegram(None).await, CheckStatus::NotConfigured);
        let s = SerperProvider::news(None);
        assert_eq!(check_search(&s).await, CheckStatus::NotConfigured);
    }

    #[test]
    fn all_passed_needs_a_provider() {
        let r = HealthReport {
            search: CheckStatus::Ok(String::new()),
            telegram: CheckStatus::Ok(String::new()),
            providers: vec![("glm".into(), false)],
        };
        assert!(!r.all_passed());
        let r = HealthReport {
            providers: vec![("glm".into(), false), ("gemini".into(), true)],
            ..r
        };
        assert!(r.all_passed());
    }
}
