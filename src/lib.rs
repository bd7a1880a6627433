// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod error;
pub mod health;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod retry;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::error::{AllProvidersFailed, CallError, ConfigError, PipelineError};
pub use crate::notify::{deliver, DeliveryResult, MessageTransport, TelegramNotifier};
pub use crate::pipeline::{Orchestrator, PipelineOutcome};
pub use crate::retry::{RetryPolicy, TransientRule};

use tracing::{info, warn};

/// One full run: pipeline, then (optionally) delivery of whatever text it
/// produced. Pipeline failure is returned as `Err`; delivery problems are
/// reported in the `DeliveryResult` only.
///
/// ```ignore
/// let cfg = gold_silver_intel::AppConfig::load()?;
/// let (outcome, delivery) = gold_silver_intel::run_and_deliver(&cfg, "gold price", true).await?;
/// ```
pub async fn run_and_deliver(
    cfg: &AppConfig,
    query: &str,
    send: bool,
) -> Result<(PipelineOutcome, Option<DeliveryResult>), PipelineError> {
    let orchestrator = Orchestrator::from_config(cfg)?;
    let outcome = orchestrator.run_pipeline(query).await?;

    if !send {
        return Ok((outcome, None));
    }
    let Some(creds) = cfg.telegram.clone() else {
        warn!("telegram not configured, report not sent");
        return Ok((outcome, None));
    };

    let delivery = &cfg.settings.delivery;
    let notifier = TelegramNotifier::new(creds)
        .with_parse_mode(&delivery.parse_mode)
        .with_api_base(&delivery.api_base);
    let result = notify::send_report(
        &notifier,
        &delivery.title,
        outcome.text(),
        delivery.max_message_length,
        &cfg.settings.retry.delivery,
    )
    .await;

    if result.is_complete() {
        info!(chunks = result.chunks_total, "report sent to telegram");
    } else {
        warn!(
            failed = ?result.failed_indices(),
            total = result.chunks_total,
            "report partially delivered"
        );
    }
    Ok((outcome, Some(result)))
}
