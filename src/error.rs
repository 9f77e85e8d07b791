//! Error types for the emotion organizer.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from an `EmotionClassifier`.
///
/// `EmptyContent` and `ContentTooLong` reject the input itself and are never
/// retried. `Unavailable` means the backend could not be reached and is the
/// only retryable variant.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("Message content is empty")]
    EmptyContent,

    #[error("Message content too long: {length} chars > {max}")]
    ContentTooLong { length: usize, max: usize },

    #[error("Classifier {backend} unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Invalid response from {backend}: {reason}")]
    InvalidResponse { backend: String, reason: String },
}

impl ClassifierError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Message source (fetch collaborator) errors.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Unsupported source {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
}

/// Reporting/storage collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Reporter {name} failed to write {path}: {source}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Run-level fatal errors. Per-message failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Message fetch failed: {0}")]
    Fetch(#[from] SourceError),

    #[error("Report failed: {0}")]
    Report(#[from] ReportError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
