//! Gold-Silver Intelligence batch entrypoint.
//! Runs one search → analysis → delivery pass and exits.
//!
//! Environment: see `config::secrets` for credentials, `INTEL_QUERY` for the
//! search query and `INTEL_NO_TELEGRAM=1` to skip delivery.

use gold_silver_intel::metrics::Metrics;
use gold_silver_intel::{run_and_deliver, AppConfig, PipelineOutcome};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gold_silver_intel=info,ingest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let cfg = AppConfig::load()?;
    let query = std::env::var("INTEL_QUERY")
        .unwrap_or_else(|_| cfg.settings.search.default_query.clone());
    let send = !std::env::var("INTEL_NO_TELEGRAM")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let result = run_and_deliver(&cfg, &query, send).await;

    if let Some(m) = &metrics {
        if let Err(e) = m.write_snapshot_from_env() {
            tracing::warn!(error = ?e, "metrics snapshot not written");
        }
    }

    let (outcome, _delivery) = result?;
    if let PipelineOutcome::Report(r) = &outcome {
        tracing::info!(
            items_used = r.items_used,
            items_total = r.items_total,
            "analysis completed"
        );
    }
    println!("{}", outcome.text());
    Ok(())
}
