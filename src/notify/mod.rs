// src/notify/mod.rs
pub mod chunk;
pub mod telegram;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

use crate::error::CallError;
use crate::retry::{self, RetryPolicy};

pub use chunk::{reassemble, split_report, text_len, DeliveryChunk};
pub use telegram::TelegramNotifier;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("delivery_chunks_total", "Report chunks attempted.");
        describe_counter!(
            "delivery_chunk_failures_total",
            "Report chunks that failed after retries."
        );
    });
}

/// A chat channel that accepts one size-limited message per call.
#[async_trait::async_trait]
pub trait MessageTransport: Send + Sync {
    /// One attempt; retries are applied by `deliver`.
    async fn send_message(&self, text: &str) -> Result<(), CallError>;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedChunk {
    pub index: usize,
    pub error: CallError,
}

/// Delivery status, separate from pipeline success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryResult {
    pub chunks_total: usize,
    pub failed: Vec<FailedChunk>,
}

impl DeliveryResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|f| f.index).collect()
    }
}

/// Split `report` and send every chunk in order. A chunk that still fails
/// after retries is recorded and the remaining chunks are still sent.
/// Blank chunks (a run of line breaks at a split point) are not sent; indices
/// count only the chunks that were.
pub async fn deliver<T: MessageTransport + ?Sized>(
    transport: &T,
    report: &str,
    max_len: usize,
    policy: &RetryPolicy,
) -> DeliveryResult {
    ensure_metrics_described();

    let all = split_report(report, max_len);
    let chunks: Vec<DeliveryChunk> = all.into_iter().filter(|c| !c.is_blank()).collect();
    let total = chunks.len();
    let mut failed = Vec::new();

    for (index, chunk) in chunks.iter().enumerate() {
        counter!("delivery_chunks_total").increment(1);
        let op = format!("deliver:{}", transport.name());
        match retry::call(policy, &op, || transport.send_message(&chunk.text)).await {
            Ok(()) => {
                tracing::debug!(transport = transport.name(), chunk = index + 1, total, "chunk sent");
            }
            Err(error) => {
                tracing::warn!(
                    transport = transport.name(),
                    chunk = index + 1,
                    total,
                    %error,
                    "chunk delivery failed"
                );
                counter!("delivery_chunk_failures_total").increment(1);
                failed.push(FailedChunk { index, error });
            }
        }
    }

    if failed.is_empty() {
        tracing::info!(transport = transport.name(), chunks = total, "report delivered");
    }
    DeliveryResult {
        chunks_total: total,
        failed,
    }
}

/// Title line + body, as sent to chat.
pub fn format_report(title: &str, content: &str) -> String {
    format!("📊 *{title}*\n\n{content}")
}

/// `format_report` then `deliver`.
pub async fn send_report<T: MessageTransport + ?Sized>(
    transport: &T,
    title: &str,
    content: &str,
    max_len: usize,
    policy: &RetryPolicy,
) -> DeliveryResult {
    deliver(transport, &format_report(title, content), max_len, policy).await
}
