// src/error.rs
//! Error types shared by every outbound call site and the pipeline.

use std::fmt;
use thiserror::Error;

/// Failure of a single outbound call (search, provider, delivery).
///
/// Whether it is worth retrying is decided by a `TransientRule`, never by the
/// variant alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("client setup failed: {0}")]
    Setup(String),
    #[error("{0}")]
    Other(String),
}

impl CallError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Build a status error, keeping at most 512 chars of the body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body: String = body.trim().chars().take(512).collect();
        CallError::Status { status, body }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CallError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            CallError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            CallError::Transport(e.to_string())
        }
    }
}

/// One provider's terminal failure inside a routed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub priority_rank: i32,
    pub error: CallError,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (rank {}): {}", self.provider, self.priority_rank, self.error)
    }
}

/// Every configured provider failed (or none was configured).
/// Failures are kept in the order the providers were attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct AllProvidersFailed {
    pub failures: Vec<ProviderFailure>,
}

impl fmt::Display for AllProvidersFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "all providers failed: no providers configured");
        }
        write!(f, "all providers failed: ")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no inference provider credential configured (checked: {checked})")]
    NoProviderCredentials { checked: String },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Terminal failure of one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("every search source failed: {0}")]
    Search(String),
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: crate::pipeline::StageRole,
        #[source]
        source: AllProvidersFailed,
    },
}
