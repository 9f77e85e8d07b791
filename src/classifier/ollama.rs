//! Remote classifier backed by an Ollama-style `/api/generate` endpoint.
//!
//! The model is asked for a JSON object mapping emotion labels to scores.
//! Transport failures and non-success statuses are `Unavailable` (retried by
//! the organizer); a reply that cannot be turned into an `EmotionResult` is
//! `InvalidResponse`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EmotionClassifier, validate_content};
use crate::error::ClassifierError;
use crate::pipeline::types::{Emotion, EmotionResult};

const BACKEND: &str = "ollama";

/// Temperature for classification (deterministic-ish).
const CLASSIFY_TEMPERATURE: f32 = 0.0;

/// HTTP classifier for a locally or remotely hosted model.
#[derive(Debug, Clone)]
pub struct OllamaClassifier {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_content_chars: usize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    system: &'static str,
    format: &'static str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClassifier {
    pub fn new(
        base_url: &str,
        model: &str,
        max_content_chars: usize,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClassifierError::Unavailable {
                backend: BACKEND.into(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", base_url.trim_end_matches('/')),
            model: model.to_string(),
            max_content_chars,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmotionClassifier for OllamaClassifier {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn classify(&self, content: &str) -> Result<EmotionResult, ClassifierError> {
        validate_content(content, self.max_content_chars)?;

        let request = GenerateRequest {
            model: &self.model,
            prompt: build_classify_prompt(content),
            system: SYSTEM_PROMPT,
            format: "json",
            stream: false,
            options: GenerateOptions {
                temperature: CLASSIFY_TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, model = %self.model, "Classifier backend returned an error status");
            return Err(unavailable(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| invalid(format!("malformed envelope: {e}")))?;

        debug!(model = %self.model, raw = %generated.response, "Classifier replied");
        parse_scores(&generated.response)
    }
}

// ── Prompt construction ─────────────────────────────────────────────

const SYSTEM_PROMPT: &str = "You are an emotion classifier for email. \
     Rate how strongly the email expresses each emotion.\n\
     Respond with ONLY a JSON object whose keys are exactly: \
     joy, anger, sadness, fear, surprise, neutral. \
     Each value is a number between 0.0 and 1.0.";

fn build_classify_prompt(content: &str) -> String {
    format!("Email:\n{content}\n\nScores:")
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse the model's text into an `EmotionResult`.
///
/// Unknown labels are dropped; at least one known label is required.
fn parse_scores(raw: &str) -> Result<EmotionResult, ClassifierError> {
    let json_str = extract_json_object(raw);
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&json_str).map_err(|e| invalid(format!("JSON parse error: {e}")))?;

    let mut scores = Vec::with_capacity(object.len());
    for (label, value) in &object {
        let Some(emotion) = Emotion::from_label(label) else {
            debug!(label = %label, "Ignoring label outside the emotion vocabulary");
            continue;
        };
        let score = value
            .as_f64()
            .ok_or_else(|| invalid(format!("score for '{label}' is not a number")))?;
        scores.push((emotion, score));
    }

    if scores.is_empty() {
        return Err(invalid("no known emotion labels in response".into()));
    }

    EmotionResult::new(scores).map_err(|e| invalid(e.to_string()))
}

/// Extract a JSON object from model output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

fn unavailable(reason: String) -> ClassifierError {
    ClassifierError::Unavailable {
        backend: BACKEND.into(),
        reason,
    }
}

fn invalid(reason: String) -> ClassifierError {
    ClassifierError::InvalidResponse {
        backend: BACKEND.into(),
        reason,
    }
}
