//! Configuration types.
//!
//! Everything is built from environment variables (`EMO_*`). Unparsable
//! values fall back to the default; `validate()` rejects values that parse
//! but are out of range.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::ConfigError;

/// Organizer configuration: retry policy, policy thresholds, pool size.
#[derive(Debug, Clone)]
pub struct OrganizerConfig {
    /// Classifier retries per message after an `Unavailable` error.
    pub max_retries: u32,
    /// Below this top score a message goes to "unclassified".
    pub min_confidence: f64,
    /// Scores within this distance of the top score count as tied.
    pub tie_epsilon: f64,
    /// Maximum concurrent classifier calls.
    pub worker_count: usize,
    /// Upper bound on a single classifier attempt.
    pub classify_timeout: Duration,
    /// Backoff before the first retry; doubles on each further retry.
    pub retry_base_delay: Duration,
    /// Backoff ceiling.
    pub retry_max_delay: Duration,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_confidence: 0.3,
            tie_epsilon: 0.01,
            worker_count: default_worker_count(),
            classify_timeout: Duration::from_secs(30),
            retry_base_delay: Duration::from_millis(200),
            retry_max_delay: Duration::from_secs(5),
        }
    }
}

impl OrganizerConfig {
    /// Build from environment variables, defaulting anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_or("EMO_MAX_RETRIES", defaults.max_retries),
            min_confidence: env_or("EMO_MIN_CONFIDENCE", defaults.min_confidence),
            tie_epsilon: env_or("EMO_TIE_EPSILON", defaults.tie_epsilon),
            worker_count: env_or("EMO_WORKER_COUNT", defaults.worker_count),
            classify_timeout: Duration::from_secs(env_or(
                "EMO_CLASSIFY_TIMEOUT_SECS",
                defaults.classify_timeout.as_secs(),
            )),
            retry_base_delay: Duration::from_millis(env_or(
                "EMO_RETRY_BASE_DELAY_MS",
                defaults.retry_base_delay.as_millis() as u64,
            )),
            retry_max_delay: Duration::from_millis(env_or(
                "EMO_RETRY_MAX_DELAY_MS",
                defaults.retry_max_delay.as_millis() as u64,
            )),
        }
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(invalid("min_confidence", "must be within [0, 1]"));
        }
        if !self.tie_epsilon.is_finite() || self.tie_epsilon < 0.0 {
            return Err(invalid("tie_epsilon", "must be a non-negative number"));
        }
        if self.worker_count == 0 {
            return Err(invalid("worker_count", "must be at least 1"));
        }
        if self.worker_count > Semaphore::MAX_PERMITS {
            return Err(invalid(
                "worker_count",
                &format!("must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
        if self.classify_timeout.is_zero() {
            return Err(invalid("classify_timeout", "must be greater than zero"));
        }
        if self.retry_base_delay > self.retry_max_delay {
            return Err(invalid(
                "retry_base_delay",
                "must not exceed retry_max_delay",
            ));
        }
        Ok(())
    }
}

/// Which classifier backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    /// Local regex lexicon.
    Lexicon,
    /// Remote model behind an Ollama-style HTTP API.
    Ollama,
}

impl FromStr for ClassifierBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(Self::Lexicon),
            "ollama" => Ok(Self::Ollama),
            other => Err(invalid(
                "EMO_CLASSIFIER",
                &format!("unknown backend '{other}' (expected lexicon or ollama)"),
            )),
        }
    }
}

/// Classifier backend configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Inputs longer than this many chars are rejected.
    pub max_content_chars: usize,
    /// Base URL of the model server (Ollama backend only).
    pub ollama_url: String,
    /// Model name (Ollama backend only).
    pub ollama_model: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: ClassifierBackend::Lexicon,
            max_content_chars: 20_000,
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
        }
    }
}

impl ClassifierConfig {
    /// Build from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let backend = match std::env::var("EMO_CLASSIFIER") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };
        Ok(Self {
            backend,
            max_content_chars: env_or("EMO_MAX_CONTENT_CHARS", defaults.max_content_chars),
            ollama_url: std::env::var("EMO_OLLAMA_URL").unwrap_or(defaults.ollama_url),
            ollama_model: std::env::var("EMO_OLLAMA_MODEL").unwrap_or(defaults.ollama_model),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_content_chars == 0 {
            return Err(invalid("max_content_chars", "must be at least 1"));
        }
        if self.backend == ClassifierBackend::Ollama && self.ollama_url.trim().is_empty() {
            return Err(invalid("ollama_url", "must not be empty"));
        }
        Ok(())
    }
}

/// Process-level configuration for the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// A `.json` file of messages or a directory of `.eml` files.
    pub source_path: PathBuf,
    /// Where to write the run report, if anywhere.
    pub output_path: Option<PathBuf>,
    /// Serve the latest report over HTTP on this port after the run.
    pub http_port: Option<u16>,
    pub organizer: OrganizerConfig,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    /// Build from environment variables. `EMO_SOURCE_PATH` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source_path = std::env::var("EMO_SOURCE_PATH")
            .map(PathBuf::from)
            .map_err(|_| ConfigError::MissingEnvVar("EMO_SOURCE_PATH".to_string()))?;

        let config = Self {
            source_path,
            output_path: std::env::var("EMO_OUTPUT_PATH").ok().map(PathBuf::from),
            http_port: std::env::var("EMO_HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            organizer: OrganizerConfig::from_env(),
            classifier: ClassifierConfig::from_env()?,
        };
        config.organizer.validate()?;
        config.classifier.validate()?;
        Ok(config)
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = OrganizerConfig::default();
        assert_eq!(config.max_retries, 2);
        assert!((config.min_confidence - 0.3).abs() < f64::EPSILON);
        assert!((config.tie_epsilon - 0.01).abs() < f64::EPSILON);
        assert!(config.worker_count >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let config = OrganizerConfig {
            min_confidence: 1.5,
            ..OrganizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "min_confidence"
        ));
    }

    #[test]
    fn rejects_negative_epsilon_and_nan() {
        let negative = OrganizerConfig {
            tie_epsilon: -0.1,
            ..OrganizerConfig::default()
        };
        assert!(negative.validate().is_err());

        let nan = OrganizerConfig {
            tie_epsilon: f64::NAN,
            ..OrganizerConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        let config = OrganizerConfig {
            worker_count: 0,
            ..OrganizerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_oversized_worker_count() {
        let at_limit = OrganizerConfig {
            worker_count: Semaphore::MAX_PERMITS,
            ..OrganizerConfig::default()
        };
        assert!(at_limit.validate().is_ok());

        let config = OrganizerConfig {
            worker_count: usize::MAX,
            ..OrganizerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "worker_count"
        ));
    }

    #[test]
    fn rejects_base_delay_above_cap() {
        let config = OrganizerConfig {
            retry_base_delay: Duration::from_secs(10),
            retry_max_delay: Duration::from_secs(1),
            ..OrganizerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!(
            "Ollama".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Ollama
        );
        assert_eq!(
            " lexicon ".parse::<ClassifierBackend>().unwrap(),
            ClassifierBackend::Lexicon
        );
        assert!("bert".parse::<ClassifierBackend>().is_err());
    }

    #[test]
    fn classifier_config_rejects_zero_limit() {
        let config = ClassifierConfig {
            max_content_chars: 0,
            ..ClassifierConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
