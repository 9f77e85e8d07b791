//! Emotion classifier backends.
//!
//! Supports:
//! - **Lexicon**: local regex cue lists, deterministic, no I/O
//! - **Ollama**: a remote model behind an Ollama-style HTTP API
//!
//! Every backend implements `EmotionClassifier` and runs the same input
//! checks through `validate_content` before doing any work.

mod lexicon;
mod ollama;

pub use lexicon::LexiconClassifier;
pub use ollama::OllamaClassifier;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::error::ClassifierError;
use crate::pipeline::types::EmotionResult;

/// Message text → emotion distribution.
///
/// Implementations hold no per-call mutable state; one instance is shared by
/// every worker task of a run.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    /// Backend name for logging and error reports.
    fn name(&self) -> &str;

    async fn classify(&self, content: &str) -> Result<EmotionResult, ClassifierError>;
}

/// Reject empty content and content longer than `max_chars` characters.
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), ClassifierError> {
    if content.trim().is_empty() {
        return Err(ClassifierError::EmptyContent);
    }
    let length = content.chars().count();
    if length > max_chars {
        return Err(ClassifierError::ContentTooLong {
            length,
            max: max_chars,
        });
    }
    Ok(())
}

/// Create the configured classifier backend.
pub fn create_classifier(
    config: &ClassifierConfig,
) -> Result<Arc<dyn EmotionClassifier>, ClassifierError> {
    match config.backend {
        ClassifierBackend::Lexicon => {
            tracing::info!("Using lexicon classifier");
            Ok(Arc::new(LexiconClassifier::new(config.max_content_chars)))
        }
        ClassifierBackend::Ollama => {
            tracing::info!(
                "Using Ollama classifier (model: {}, url: {})",
                config.ollama_model,
                config.ollama_url
            );
            Ok(Arc::new(OllamaClassifier::new(
                &config.ollama_url,
                &config.ollama_model,
                config.max_content_chars,
            )?))
        }
    }
}
