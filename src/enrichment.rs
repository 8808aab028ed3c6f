use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::api_connection::{ApiConnectionError, InferenceGateway};
use crate::numeric_extractor::{extract_decimal, extract_integer};

/// Appended to every numeric prompt.
pub const NUMERIC_ONLY_INSTRUCTION: &str =
    "Reply with a single number only. Do not include units, explanations or any other text.";

/// Prompt text with `{name}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate(&'static str);

impl PromptTemplate {
    pub const fn new(text: &'static str) -> Self {
        Self(text)
    }

    /// Fills `{name}` tokens in one pass over the template. Substituted
    /// values are copied verbatim and never scanned for tokens themselves;
    /// tokens without a substitution are left as written.
    pub fn render(&self, substitutions: &[(&str, &str)]) -> String {
        let mut prompt = String::with_capacity(self.0.len());
        let mut rest = self.0;
        while let Some(open) = rest.find('{') {
            prompt.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let token = after.find('}').map(|close| (&after[..close], close));
            match token.and_then(|(name, close)| {
                substitutions
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, close))
            }) {
                Some((value, close)) => {
                    prompt.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    prompt.push('{');
                    rest = after;
                }
            }
        }
        prompt.push_str(rest);
        prompt
    }
}

pub const MEAL_CALORIES_PROMPT: PromptTemplate = PromptTemplate::new(
    "Estimate the calories (kcal) in '{food} {quantity}'.",
);

pub const DAILY_CALORIES_PROMPT: PromptTemplate = PromptTemplate::new(
    "A {age}-year-old {sex}, {height_cm} cm tall and weighing {weight_kg} kg, has a {activity} \
     lifestyle. Estimate their recommended daily calorie intake in kcal.",
);

pub const DAILY_WATER_PROMPT: PromptTemplate = PromptTemplate::new(
    "A {age}-year-old {sex}, {height_cm} cm tall and weighing {weight_kg} kg, has a {activity} \
     lifestyle. Estimate their recommended daily water intake in liters.",
);

pub const SIMILAR_RECIPES_PROMPT: PromptTemplate = PromptTemplate::new(
    "You are a professional nutritionist. Recommend three recipes related to the request below. \
     For each recipe give a title, its nutritional benefit, the main ingredients and short \
     cooking instructions. Format the answer as clean markdown with one section per recipe.\n\n\
     [Request]:\n{query}",
);

/// How the model's answer should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EstimateSource {
    /// The answer contained a usable number.
    Parsed,
    /// The gateway answered but no number could be read; the value is 0.
    Degraded { raw: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub value: f64,
    pub source: EstimateSource,
}

impl Estimate {
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, EstimateSource::Degraded { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentResult {
    Estimated(Estimate),
    Failed { reason: String },
}

/// Counters kept apart so a silent degrade-to-zero can be told from a real
/// gateway failure, even though both look the same to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentStats {
    pub parsed: u64,
    pub degraded: u64,
    pub gateway_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    parsed: AtomicU64,
    degraded: AtomicU64,
    gateway_failures: AtomicU64,
}

/// Turns a prompt into a number via one gateway call.
///
/// Each call is independent: identical prompts are asked again rather than
/// answered from memory.
pub struct EnrichmentPipeline {
    gateway: Arc<dyn InferenceGateway>,
    counters: Counters,
}

impl EnrichmentPipeline {
    pub fn new(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self {
            gateway,
            counters: Counters::default(),
        }
    }

    pub async fn estimate(
        &self,
        template: &PromptTemplate,
        substitutions: &[(&str, &str)],
        kind: NumericKind,
    ) -> EnrichmentResult {
        let prompt = format!("{} {}", template.render(substitutions), NUMERIC_ONLY_INSTRUCTION);
        debug!(%prompt, "requesting numeric estimate");

        let answer = match self.gateway.complete(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                self.counters.gateway_failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "enrichment gateway call failed");
                return EnrichmentResult::Failed {
                    reason: e.to_string(),
                };
            }
        };
        debug!(%answer, "raw estimate answer");

        let parsed = match kind {
            NumericKind::Integer => extract_integer(&answer).map(|value| value as f64),
            NumericKind::Decimal => extract_decimal(&answer),
        };

        match parsed {
            Some(value) => {
                self.counters.parsed.fetch_add(1, Ordering::Relaxed);
                EnrichmentResult::Estimated(Estimate {
                    value,
                    source: EstimateSource::Parsed,
                })
            }
            None => {
                self.counters.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(raw = %answer, "no number in model answer, degrading to 0");
                EnrichmentResult::Estimated(Estimate {
                    value: 0.0,
                    source: EstimateSource::Degraded { raw: answer },
                })
            }
        }
    }

    /// Raw completion text, for answers meant to be displayed rather than
    /// measured. Failures are returned as-is; there is no fallback text.
    pub async fn complete_text(&self, prompt: &str) -> Result<String, ApiConnectionError> {
        debug!(%prompt, "requesting free-text completion");
        self.gateway.complete(prompt).await.map_err(|e| {
            self.counters.gateway_failures.fetch_add(1, Ordering::Relaxed);
            error!(error = %e, "free-text gateway call failed");
            e
        })
    }

    pub fn stats(&self) -> EnrichmentStats {
        EnrichmentStats {
            parsed: self.counters.parsed.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
            gateway_failures: self.counters.gateway_failures.load(Ordering::Relaxed),
        }
    }
}
