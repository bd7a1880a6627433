// src/retry.rs
//! Bounded retry with linear-by-attempt backoff, shared by every outbound call.
//!
//! The delay before retry `n` (0-based index of the failed attempt) is
//! `base_delay * (n + 1) * backoff_multiplier`. Only failures the policy's
//! `TransientRule` accepts are retried; anything else is returned at once.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CallError;

/// Classifies a failure as transient. A failure is transient if its HTTP
/// status is listed in `statuses` OR its text contains one of `markers`
/// (case-insensitive, at a word start). Some providers only report rate limits in the body, so
/// both signals are supported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransientRule {
    pub statuses: Vec<u16>,
    pub markers: Vec<String>,
}

impl TransientRule {
    pub fn statuses(statuses: &[u16]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            markers: Vec::new(),
        }
    }

    pub fn with_markers(mut self, markers: &[&str]) -> Self {
        self.markers = markers.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn is_transient(&self, err: &CallError) -> bool {
        if let Some(status) = err.status() {
            if self.statuses.contains(&status) {
                return true;
            }
        }
        if self.markers.is_empty() {
            return false;
        }
        let text = err.to_string();
        self.markers
            .iter()
            .filter(|m| !m.is_empty())
            .any(|m| marker_regex(m).is_some_and(|re| re.is_match(&text)))
    }
}

// A marker only counts at a word start: "rate" matches "Rate limit" and
// "rate_limit_exceeded" but not "generateContent".
fn marker_regex(marker: &str) -> Option<Regex> {
    Regex::new(&format!("(?i)(^|[^a-z]){}", regex::escape(marker))).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(rename = "base_delay_ms", with = "duration_ms")]
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    #[serde(default)]
    pub transient: TransientRule,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, transient: TransientRule) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_multiplier: 1.0,
            transient,
        }
        .sanitized()
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self.sanitized()
    }

    /// Search collaborator: 3 attempts, 5s base, HTTP 429/503.
    pub fn search_default() -> Self {
        Self::new(3, Duration::from_secs(5), TransientRule::statuses(&[429, 503]))
    }

    /// Inference providers: 3 attempts, 10s base, HTTP 429/503 or
    /// rate-limit markers in the error text.
    pub fn provider_default() -> Self {
        Self::new(
            3,
            Duration::from_secs(10),
            TransientRule::statuses(&[429, 503]).with_markers(&["429", "rate", "quota"]),
        )
    }

    /// Chat delivery: 3 attempts, 5s base, HTTP 429.
    pub fn delivery_default() -> Self {
        Self::new(3, Duration::from_secs(5), TransientRule::statuses(&[429]))
    }

    /// Clamp to `max_attempts >= 1` and `backoff_multiplier >= 1`.
    pub fn sanitized(mut self) -> Self {
        if self.max_attempts == 0 {
            self.max_attempts = 1;
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            self.backoff_multiplier = 1.0;
        }
        self
    }

    /// Sleep before retrying after the failed attempt `attempt_index` (0-based).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        let factor = (f64::from(attempt_index) + 1.0) * self.backoff_multiplier;
        Duration::try_from_secs_f64(self.base_delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }
}

/// Run `action` under `policy`. Returns the first success, or the first
/// non-transient error, or the last error once attempts are exhausted.
/// `op` names the call site in logs and metrics.
pub async fn call<T, F, Fut>(policy: &RetryPolicy, op: &str, mut action: F) -> Result<T, CallError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;
    loop {
        match action().await {
            Ok(v) => {
                if attempt > 0 {
                    tracing::debug!(op, attempts = attempt + 1, "succeeded after retry");
                }
                return Ok(v);
            }
            Err(e) => {
                let remaining = max_attempts - (attempt + 1);
                if remaining == 0 || !policy.transient.is_transient(&e) {
                    if remaining > 0 {
                        tracing::debug!(op, error = %e, "non-transient failure, not retrying");
                    } else {
                        tracing::warn!(op, attempts = max_attempts, error = %e, "retries exhausted");
                    }
                    return Err(e);
                }
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    op,
                    attempt = attempt + 1,
                    remaining,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, backing off"
                );
                counter!("retry_attempts_total", "op" => op.to_string()).increment(1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
