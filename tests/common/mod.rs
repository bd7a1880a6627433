// tests/common/mod.rs
// Scripted collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gold_silver_intel::config::Settings;
use gold_silver_intel::ingest::types::{Item, Origin, SearchQuery, SourceProvider};
use gold_silver_intel::notify::MessageTransport;
use gold_silver_intel::providers::{
    ClientFactory, InferenceClient, PromptRequest, ProviderDescriptor, ProviderKind,
};
use gold_silver_intel::retry::{RetryPolicy, TransientRule};
use gold_silver_intel::CallError;
use parking_lot::Mutex;

pub fn item(title: &str, link: &str, origin: Origin) -> Item {
    Item {
        title: title.into(),
        link: link.into(),
        snippet: format!("snippet for {title}"),
        source: "Test".into(),
        published_at: "1 hour ago".into(),
        origin,
    }
}

pub fn no_wait(max_attempts: u32, rule: TransientRule) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO, rule)
}

/// Settings with zero backoff everywhere.
pub fn fast_settings() -> Settings {
    let mut s = Settings::default();
    s.retry.search = no_wait(3, TransientRule::statuses(&[429, 503]));
    s.retry.provider = no_wait(3, TransientRule::statuses(&[429, 503]).with_markers(&["rate", "quota"]));
    s.retry.delivery = no_wait(3, TransientRule::statuses(&[429]));
    s
}

// ---------------------------------------------------------------------------
// Search sources
// ---------------------------------------------------------------------------

pub struct ScriptedSource {
    pub name: &'static str,
    pub origin: Origin,
    outcomes: Mutex<VecDeque<Result<Vec<Item>, CallError>>>,
    pub calls: Mutex<u32>,
}

impl ScriptedSource {
    pub fn ok(name: &'static str, origin: Origin, items: Vec<Item>) -> Self {
        Self::script(name, origin, vec![Ok(items)])
    }

    /// Outcomes are consumed in order; the last one repeats.
    pub fn script(
        name: &'static str,
        origin: Origin,
        outcomes: Vec<Result<Vec<Item>, CallError>>,
    ) -> Self {
        Self {
            name,
            origin,
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl SourceProvider for ScriptedSource {
    async fn fetch_latest(&self, _query: &SearchQuery) -> Result<Vec<Item>, CallError> {
        *self.calls.lock() += 1;
        let mut q = self.outcomes.lock();
        if q.len() > 1 {
            q.pop_front().unwrap()
        } else {
            q.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn name(&self) -> &str {
        self.name
    }

    fn origin(&self) -> Origin {
        self.origin
    }
}

/// Wraps an `Arc` so tests can keep a handle on the call counter.
pub struct SharedSource(pub Arc<ScriptedSource>);

#[async_trait]
impl SourceProvider for SharedSource {
    async fn fetch_latest(&self, query: &SearchQuery) -> Result<Vec<Item>, CallError> {
        self.0.fetch_latest(query).await
    }
    fn name(&self) -> &str {
        self.0.name()
    }
    fn origin(&self) -> Origin {
        self.0.origin()
    }
}

// ---------------------------------------------------------------------------
// Inference providers
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub enum Behavior {
    /// Always answer with this text.
    Reply(String),
    /// Answer `"<name>: <user prompt>"`.
    Echo,
    /// Always fail with this error.
    Fail(CallError),
    /// Fail `n` times with the error, then reply.
    FailThenReply(u32, CallError, String),
    /// `ClientFactory::build` fails.
    SetupFail,
    /// Probe fails, completion would succeed.
    ProbeFail,
    /// Fail when the system prompt equals this text, echo otherwise.
    FailOnSystem(String, CallError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Build(String),
    Probe(String),
    Complete { provider: String, system: String, user: String },
}

#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn completions(&self) -> Vec<(String, String)> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Complete { provider, user, .. } => Some((provider.clone(), user.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn completion_providers(&self) -> Vec<String> {
        self.completions().into_iter().map(|(p, _)| p).collect()
    }

    pub fn built(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Build(p) => Some(p.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

pub struct ScriptedFactory {
    behaviors: HashMap<String, Behavior>,
    pub recorder: Recorder,
}

impl ScriptedFactory {
    pub fn new(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            behaviors: behaviors
                .iter()
                .map(|(n, b)| (n.to_string(), b.clone()))
                .collect(),
            recorder: Recorder::default(),
        }
    }
}

impl ClientFactory for ScriptedFactory {
    fn build(&self, d: &ProviderDescriptor) -> Result<Arc<dyn InferenceClient>, CallError> {
        self.recorder.events.lock().push(Event::Build(d.name.clone()));
        let behavior = self
            .behaviors
            .get(&d.name)
            .cloned()
            .unwrap_or(Behavior::Echo);
        if let Behavior::SetupFail = behavior {
            return Err(CallError::Setup(format!("no credential for {}", d.name)));
        }
        Ok(Arc::new(ScriptedClient {
            name: d.name.clone(),
            behavior,
            failures_left: Mutex::new(None),
            recorder: self.recorder.clone(),
        }))
    }
}

struct ScriptedClient {
    name: String,
    behavior: Behavior,
    failures_left: Mutex<Option<u32>>,
    recorder: Recorder,
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, request: &PromptRequest) -> Result<String, CallError> {
        self.recorder.events.lock().push(Event::Complete {
            provider: self.name.clone(),
            system: request.system_prompt.clone(),
            user: request.user_prompt.clone(),
        });
        match &self.behavior {
            Behavior::Reply(text) => Ok(text.clone()),
            Behavior::Echo | Behavior::ProbeFail => Ok(format!("{}: {}", self.name, request.user_prompt)),
            Behavior::Fail(e) => Err(e.clone()),
            Behavior::FailThenReply(n, e, text) => {
                let mut left = self.failures_left.lock();
                let remaining = left.get_or_insert(*n);
                if *remaining > 0 {
                    *remaining -= 1;
                    Err(e.clone())
                } else {
                    Ok(text.clone())
                }
            }
            Behavior::FailOnSystem(system, e) => {
                if request.system_prompt == *system {
                    Err(e.clone())
                } else {
                    Ok(format!("{}: {}", self.name, request.user_prompt))
                }
            }
            Behavior::SetupFail => unreachable!("setup failures never build a client"),
        }
    }

    async fn probe(&self) -> Result<(), CallError> {
        self.recorder.events.lock().push(Event::Probe(self.name.clone()));
        match self.behavior {
            Behavior::ProbeFail => Err(CallError::Transport("connection refused".into())),
            _ => Ok(()),
        }
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

pub fn descriptor(name: &str, rank: i32, retry: RetryPolicy) -> ProviderDescriptor {
    ProviderDescriptor {
        name: name.into(),
        kind: ProviderKind::OpenAiCompatible,
        priority_rank: rank,
        model_id: format!("{name}-model"),
        endpoint: format!("http://{name}.invalid/v1/chat/completions"),
        credential: gold_silver_intel::config::Secret::new("k"),
        retry,
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Records every send attempt; fails chunks per script.
pub struct RecordingTransport {
    pub attempts: Mutex<Vec<String>>,
    /// chunk text prefix -> errors to return before succeeding (u32::MAX = always)
    failing: Mutex<HashMap<String, (u32, CallError)>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            attempts: Mutex::new(Vec::new()),
            failing: Mutex::new(HashMap::new()),
        }
    }

    pub fn fail_chunk_starting_with(self, prefix: &str, times: u32, error: CallError) -> Self {
        self.failing.lock().insert(prefix.to_string(), (times, error));
        self
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send_message(&self, text: &str) -> Result<(), CallError> {
        self.attempts.lock().push(text.to_string());
        let mut failing = self.failing.lock();
        for (prefix, (left, err)) in failing.iter_mut() {
            if text.starts_with(prefix.as_str()) && *left > 0 {
                if *left != u32::MAX {
                    *left -= 1;
                }
                return Err(err.clone());
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
