use anyhow::{Context, Result};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::path::Path;

pub const ENV_METRICS_SNAPSHOT_PATH: &str = "METRICS_SNAPSHOT_PATH";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        gauge!("pipeline_start_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(Self { handle })
    }

    /// Prometheus exposition text for everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write a textfile-collector snapshot (tmp file + rename).
    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())
            .with_context(|| format!("writing metrics to {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("renaming metrics to {}", path.display()))?;
        Ok(())
    }

    /// Write the snapshot if `$METRICS_SNAPSHOT_PATH` is set.
    pub fn write_snapshot_from_env(&self) -> Result<()> {
        match std::env::var(ENV_METRICS_SNAPSHOT_PATH) {
            Ok(p) if !p.trim().is_empty() => self.write_snapshot(Path::new(p.trim())),
            _ => Ok(()),
        }
    }
}
