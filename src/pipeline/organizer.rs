//! Organizer: classifies a batch of messages and builds the bucket store.
//!
//! **Core invariant: bucket order is input order, never completion order.**
//!
//! Flow:
//! 1. De-duplicate by message ID (first occurrence wins)
//! 2. Dispatch classification onto a bounded worker pool, retrying
//!    `Unavailable` errors with exponential backoff
//! 3. Collect outcomes by input index
//! 4. Single-threaded pass: apply the policy and fill the store in input order
//!
//! Per-message failures land in "unclassified" with a `FailureRecord`; nothing
//! here returns an error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classifier::EmotionClassifier;
use crate::config::OrganizerConfig;
use crate::error::{ClassifierError, ConfigError};
use crate::pipeline::policy::OrganizationPolicy;
use crate::pipeline::types::{
    BucketName, EmotionResult, FailureKind, FailureRecord, Message, OrganizeOutcome,
    OrganizedStore,
};

/// How one message's classification ended.
#[derive(Debug)]
enum Classified {
    Scored(EmotionResult),
    Failed { error: ClassifierError, attempts: u32 },
    /// Never dispatched, or a retry was cut short by cancellation.
    Cancelled,
}

/// Retry schedule for `Unavailable` errors.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based).
    fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Turns an ordered batch of messages into an `OrganizeOutcome`.
pub struct Organizer {
    classifier: Arc<dyn EmotionClassifier>,
    policy: OrganizationPolicy,
    retry: RetryPolicy,
    worker_count: usize,
}

impl Organizer {
    /// Create an organizer. Fails only on invalid configuration.
    pub fn new(
        classifier: Arc<dyn EmotionClassifier>,
        config: &OrganizerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            classifier,
            policy: OrganizationPolicy::from_config(config)?,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_base_delay,
                max_delay: config.retry_max_delay,
                attempt_timeout: config.classify_timeout,
            },
            worker_count: config.worker_count,
        })
    }

    /// Organize a full batch with no cancellation.
    pub async fn organize(&self, messages: &[Message]) -> OrganizeOutcome {
        self.organize_until(messages, &CancellationToken::new()).await
    }

    /// Organize a batch, stopping new dispatch once `cancel` fires.
    ///
    /// In-flight attempts finish (or time out); messages that never got a
    /// result are listed in `skipped`. The store is only built after every
    /// worker has settled.
    pub async fn organize_until(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> OrganizeOutcome {
        let (unique, duplicates) = dedupe(messages);
        let count = unique.len();
        info!(
            count,
            duplicates = duplicates.len(),
            workers = self.worker_count,
            classifier = self.classifier.name(),
            "Organizing message batch"
        );

        let mut outcomes: Vec<Option<Classified>> = (0..count).map(|_| None).collect();
        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut tasks = JoinSet::new();

        for (index, message) in unique.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                outcomes[index] = Some(Classified::Cancelled);
                continue;
            };

            let classifier = Arc::clone(&self.classifier);
            let retry = self.retry;
            let cancel = cancel.clone();
            let id = message.id.clone();
            let content = message.content.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let outcome =
                    classify_with_retry(&*classifier, &id, &content, retry, &cancel).await;
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => error!(error = %e, "Classification task failed to complete"),
            }
        }

        let outcome = self.finalize(&unique, outcomes, duplicates);
        info!(
            buckets = outcome.store.bucket_count(),
            failures = outcome.failures.len(),
            skipped = outcome.skipped.len(),
            total = count,
            "Batch organized"
        );
        outcome
    }

    /// Build the store from per-index outcomes, in input order.
    fn finalize(
        &self,
        messages: &[&Message],
        outcomes: Vec<Option<Classified>>,
        duplicates: Vec<String>,
    ) -> OrganizeOutcome {
        let mut store = OrganizedStore::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        for (message, outcome) in messages.iter().zip(outcomes) {
            let id = message.id.as_str();
            match outcome {
                Some(Classified::Scored(result)) => {
                    for bucket in self.policy.select_buckets(&result) {
                        store.push(bucket, id);
                        debug!(id = %id, bucket = %bucket, "Placed message");
                    }
                }
                Some(Classified::Failed { error, attempts }) => {
                    store.push(BucketName::Unclassified, id);
                    failures.push(FailureRecord {
                        message_id: id.to_string(),
                        kind: failure_kind(&error),
                        reason: error.to_string(),
                        attempts,
                    });
                }
                Some(Classified::Cancelled) => skipped.push(id.to_string()),
                None => {
                    store.push(BucketName::Unclassified, id);
                    failures.push(FailureRecord {
                        message_id: id.to_string(),
                        kind: FailureKind::Aborted,
                        reason: "classification task aborted before reporting".to_string(),
                        attempts: 0,
                    });
                }
            }
        }

        OrganizeOutcome {
            store,
            failures,
            skipped,
            duplicates,
        }
    }
}

/// Classify one message, retrying `Unavailable` up to `max_retries` times.
async fn classify_with_retry(
    classifier: &dyn EmotionClassifier,
    id: &str,
    content: &str,
    retry: RetryPolicy,
    cancel: &CancellationToken,
) -> Classified {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let attempt = tokio::time::timeout(retry.attempt_timeout, classifier.classify(content));
        let result = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(ClassifierError::Unavailable {
                backend: classifier.name().to_string(),
                reason: format!("timed out after {:?}", retry.attempt_timeout),
            }),
        };

        let error = match result {
            Ok(scores) => return Classified::Scored(scores),
            Err(error) => error,
        };

        if !error.is_retryable() {
            warn!(id = %id, error = %error, "Message rejected by classifier");
            return Classified::Failed { error, attempts };
        }

        if attempts > retry.max_retries {
            warn!(id = %id, attempts, error = %error, "Classifier retries exhausted");
            return Classified::Failed { error, attempts };
        }

        let delay = retry.delay(attempts);
        debug!(id = %id, attempt = attempts, ?delay, error = %error, "Classifier unavailable, retrying");

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(id = %id, attempts, "Retry abandoned on cancellation");
                return Classified::Cancelled;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

fn failure_kind(error: &ClassifierError) -> FailureKind {
    match error {
        ClassifierError::EmptyContent | ClassifierError::ContentTooLong { .. } => {
            FailureKind::InvalidInput
        }
        ClassifierError::Unavailable { .. } => FailureKind::Unavailable,
        ClassifierError::InvalidResponse { .. } => FailureKind::InvalidResponse,
    }
}

/// Keep the first message for each ID; report the IDs of later repeats.
fn dedupe(messages: &[Message]) -> (Vec<&Message>, Vec<String>) {
    let mut seen = HashSet::with_capacity(messages.len());
    let mut unique = Vec::with_capacity(messages.len());
    let mut duplicates = Vec::new();
    for message in messages {
        if seen.insert(message.id.as_str()) {
            unique.push(message);
        } else {
            warn!(id = %message.id, "Duplicate message ID in batch, ignoring repeat");
            duplicates.push(message.id.clone());
        }
    }
    (unique, duplicates)
}
