//! Testing utilities including mock implementations.
//!
//! These let applications exercise the pipeline without network access or
//! model calls: scripted fetch strategies, a scripted model, and a progress
//! sink that records every event.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult, InferenceError, InferenceResult};
use crate::fetch::FetchStrategy;
use crate::inference::{ModelRequest, StructuredModel};
use crate::progress::{Phase, ProgressEvent, ProgressSink};
use crate::types::attempt::{FetchedText, StrategyKind};

/// What a [`ScriptedStrategy`] does when asked for a URL.
#[derive(Debug, Clone)]
pub enum FetchScript {
    /// Return this text
    Text(String),
    /// Fail with a block
    Blocked,
    /// Fail with a timeout, immediately
    Timeout,
    /// Fail with a generic HTTP error
    Error(String),
    /// Return no text
    Empty,
    /// Wait, then behave like the inner script
    Delayed(Duration, Box<FetchScript>),
}

impl FetchScript {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn delayed(delay: Duration, then: FetchScript) -> Self {
        Self::Delayed(delay, Box::new(then))
    }
}

/// A fetch strategy that never touches the network.
///
/// Answers per URL when a script was registered for it, otherwise with
/// the default script (empty text unless set).
#[derive(Clone)]
pub struct ScriptedStrategy {
    kind: StrategyKind,
    default: FetchScript,
    scripts: Arc<RwLock<HashMap<String, FetchScript>>>,
    calls: Arc<AtomicUsize>,
    requested: Arc<RwLock<Vec<String>>>,
}

impl ScriptedStrategy {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            default: FetchScript::Empty,
            scripts: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(AtomicUsize::new(0)),
            requested: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Script used for URLs without their own entry.
    pub fn with_default(mut self, script: FetchScript) -> Self {
        self.default = script;
        self
    }

    /// Script for one URL.
    pub fn on(self, url: impl Into<String>, script: FetchScript) -> Self {
        self.scripts.write().unwrap().insert(url.into(), script);
        self
    }

    /// Shared counter of fetch calls, readable after the strategy is boxed.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// URLs requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.read().unwrap().clone()
    }

    async fn play(mut script: FetchScript) -> FetchResult<FetchedText> {
        while let FetchScript::Delayed(delay, then) = script {
            tokio::time::sleep(delay).await;
            script = *then;
        }
        match script {
            FetchScript::Text(text) => Ok(FetchedText::new(text)),
            FetchScript::Empty => Ok(FetchedText::default()),
            FetchScript::Blocked => Err(FetchError::Blocked {
                reason: "HTTP 403 Forbidden".into(),
            }),
            FetchScript::Timeout => Err(FetchError::Timeout {
                elapsed: Duration::ZERO,
            }),
            FetchScript::Error(message) => Err(FetchError::http(message)),
            FetchScript::Delayed(..) => Err(FetchError::Empty),
        }
    }
}

#[async_trait]
impl FetchStrategy for ScriptedStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    async fn fetch(&self, url: &str) -> FetchResult<FetchedText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.write().unwrap().push(url.to_string());
        let script = self
            .scripts
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        Self::play(script).await
    }
}

/// A model that replays scripted responses.
///
/// [`ScriptedModel::new`] answers with each response once, in order, then
/// fails with a provider error. [`ScriptedModel::always`] answers every call
/// the same way.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<InferenceResult<String>>>,
    always: Option<InferenceResult<String>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<InferenceResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        }
    }

    pub fn always(response: InferenceResult<String>) -> Self {
        Self {
            always: Some(response),
            ..Default::default()
        }
    }

    /// Number of calls made.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Requests received, in call order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StructuredModel for ScriptedModel {
    async fn generate(&self, request: &ModelRequest) -> InferenceResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(response) = &self.always {
            return response.clone();
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InferenceError::Provider("script exhausted".into())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Progress sink that keeps every event.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Phases reported for one input position, in order.
    pub fn phases_for(&self, url_index: usize) -> Vec<Phase> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.url_index == url_index)
            .map(|e| e.phase)
            .collect()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_strategy_per_url() {
        let strategy = ScriptedStrategy::new(StrategyKind::Plain)
            .with_default(FetchScript::Blocked)
            .on("https://a.example.com", FetchScript::text("hello"));

        let hit = strategy.fetch("https://a.example.com").await.unwrap();
        assert_eq!(hit.text, "hello");
        assert!(matches!(
            strategy.fetch("https://b.example.com").await,
            Err(FetchError::Blocked { .. })
        ));
        assert_eq!(strategy.call_counter().load(Ordering::SeqCst), 2);
        assert_eq!(strategy.requested(), vec!["https://a.example.com", "https://b.example.com"]);
    }

    #[tokio::test]
    async fn test_scripted_model_replays_then_fails() {
        let model = ScriptedModel::new(vec![Ok("one".into())]);
        let request = ModelRequest {
            system: "s".into(),
            user: "u".into(),
            schema: serde_json::json!({}),
            temperature: 0.1,
            max_tokens: 10,
        };

        assert_eq!(model.generate(&request).await.unwrap(), "one");
        assert!(model.generate(&request).await.is_err());
        assert_eq!(model.calls(), 2);
    }
}
