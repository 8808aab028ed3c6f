use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{ApiConnectionError, InferenceGateway};

/// What the scripted gateway answers for a matching prompt.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Fail(String),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// In-process gateway with canned answers.
///
/// Rules are matched in insertion order against the prompt by substring; the
/// first hit wins, otherwise the fallback reply is used. Every prompt is
/// recorded, and the peak number of overlapping calls is tracked so callers
/// can observe fan-out.
#[derive(Debug)]
pub struct ScriptedGateway {
    rules: Vec<(String, ScriptedReply)>,
    fallback: ScriptedReply,
    latency: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(fallback: ScriptedReply) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            latency: None,
            prompts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Answers every prompt with the same text.
    pub fn always(text: impl Into<String>) -> Self {
        Self::new(ScriptedReply::text(text))
    }

    pub fn with_rule(mut self, needle: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push((needle.into(), reply));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        match self.prompts.lock() {
            Ok(prompts) => prompts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, prompt: &str) {
        match self.prompts.lock() {
            Ok(mut prompts) => prompts.push(prompt.to_string()),
            Err(poisoned) => poisoned.into_inner().push(prompt.to_string()),
        }
    }

    fn reply_for(&self, prompt: &str) -> &ScriptedReply {
        self.rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply)
            .unwrap_or(&self.fallback)
    }
}

#[async_trait]
impl InferenceGateway for ScriptedGateway {
    async fn complete(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        self.record(prompt);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.reply_for(prompt) {
            ScriptedReply::Text(text) => Ok(text.clone()),
            ScriptedReply::Fail(message) => Err(ApiConnectionError::Scripted(message.clone())),
        }
    }
}
