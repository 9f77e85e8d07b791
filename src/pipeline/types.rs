//! Shared types for the classification pipeline.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ReportError, SourceError};

/// Stable message identifier (Message-ID header or source-assigned).
pub type MessageId = String;

// ── Message ─────────────────────────────────────────────────────────

/// A fetched email message. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique ID, stable across runs.
    pub id: MessageId,
    /// Text the classifier sees.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Message with content only; metadata left empty.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            subject: None,
            sender: None,
            received_at: None,
        }
    }
}

// ── Emotions ────────────────────────────────────────────────────────

/// Closed emotion vocabulary every classifier must map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Joy,
    Anger,
    Sadness,
    Fear,
    Surprise,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 6] = [
        Self::Joy,
        Self::Anger,
        Self::Sadness,
        Self::Fear,
        Self::Surprise,
        Self::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Joy => "joy",
            Self::Anger => "anger",
            Self::Sadness => "sadness",
            Self::Fear => "fear",
            Self::Surprise => "surprise",
            Self::Neutral => "neutral",
        }
    }

    /// Parse a label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|e| e.as_str() == label)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A score outside `[0, 1]` (or NaN) offered to `EmotionResult::new`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("score {score} for {emotion} is outside [0, 1]")]
pub struct InvalidScore {
    pub emotion: Emotion,
    pub score: f64,
}

/// Confidence distribution over the emotion vocabulary for one message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EmotionResult {
    scores: BTreeMap<Emotion, f64>,
}

impl EmotionResult {
    /// Build from `(emotion, score)` pairs. A repeated emotion keeps the last score.
    pub fn new(scores: impl IntoIterator<Item = (Emotion, f64)>) -> Result<Self, InvalidScore> {
        let mut map = BTreeMap::new();
        for (emotion, score) in scores {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(InvalidScore { emotion, score });
            }
            map.insert(emotion, score);
        }
        Ok(Self { scores: map })
    }

    /// Certain single-emotion result.
    pub fn single(emotion: Emotion) -> Self {
        Self {
            scores: BTreeMap::from([(emotion, 1.0)]),
        }
    }

    pub fn score(&self, emotion: Emotion) -> Option<f64> {
        self.scores.get(&emotion).copied()
    }

    /// Scores in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.scores.iter().map(|(e, s)| (*e, *s))
    }

    /// Highest score, if any.
    pub fn top_score(&self) -> Option<f64> {
        self.scores.values().copied().reduce(f64::max)
    }
}

// ── Buckets ─────────────────────────────────────────────────────────

/// Name of a bucket: one per emotion, plus the "unclassified" fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketName {
    Joy,
    Anger,
    Sadness,
    Fear,
    Surprise,
    Neutral,
    Unclassified,
}

impl BucketName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Joy => Emotion::Joy.as_str(),
            Self::Anger => Emotion::Anger.as_str(),
            Self::Sadness => Emotion::Sadness.as_str(),
            Self::Fear => Emotion::Fear.as_str(),
            Self::Surprise => Emotion::Surprise.as_str(),
            Self::Neutral => Emotion::Neutral.as_str(),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        if label.trim().eq_ignore_ascii_case("unclassified") {
            return Some(Self::Unclassified);
        }
        Emotion::from_label(label).map(Self::from)
    }
}

impl From<Emotion> for BucketName {
    fn from(emotion: Emotion) -> Self {
        match emotion {
            Emotion::Joy => Self::Joy,
            Emotion::Anger => Self::Anger,
            Emotion::Sadness => Self::Sadness,
            Emotion::Fear => Self::Fear,
            Emotion::Surprise => Self::Surprise,
            Emotion::Neutral => Self::Neutral,
        }
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Bucket name → message IDs in input order.
///
/// Serializes as a plain JSON object; BTreeMap key order keeps the output
/// stable across re-serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizedStore {
    buckets: BTreeMap<BucketName, Vec<MessageId>>,
}

impl OrganizedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `id` to `bucket`.
    ///
    /// Callers place each unique ID at most once per bucket; the organizer
    /// dedupes its input and the policy yields a set.
    pub(crate) fn push(&mut self, bucket: BucketName, id: &str) {
        self.buckets.entry(bucket).or_default().push(id.to_string());
    }

    /// IDs in `bucket`, empty if the bucket was never created.
    pub fn bucket(&self, bucket: BucketName) -> &[MessageId] {
        self.buckets.get(&bucket).map_or(&[], Vec::as_slice)
    }

    /// Non-empty buckets in name order.
    pub fn buckets(&self) -> impl Iterator<Item = (BucketName, &[MessageId])> + '_ {
        self.buckets.iter().map(|(name, ids)| (*name, ids.as_slice()))
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets that contain `id`.
    pub fn buckets_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = BucketName> + 'a {
        self.buckets
            .iter()
            .filter(move |(_, ids)| ids.iter().any(|m| m == id))
            .map(|(name, _)| *name)
    }
}

// ── Failures and outcomes ───────────────────────────────────────────

/// Why a message could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Content rejected (empty or too long).
    InvalidInput,
    /// Backend unreachable after all retries.
    Unavailable,
    /// Backend answered with something unusable.
    InvalidResponse,
    /// The worker task died before reporting.
    Aborted,
}

impl FailureKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unavailable => "unavailable",
            Self::InvalidResponse => "invalid_response",
            Self::Aborted => "aborted",
        }
    }
}

/// One message that ended in "unclassified" because of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub message_id: MessageId,
    pub kind: FailureKind,
    pub reason: String,
    /// Classifier calls made (0 for aborted tasks).
    pub attempts: u32,
}

/// Everything `Organizer::organize` produces for one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizeOutcome {
    pub store: OrganizedStore,
    /// Classification failures, in input order.
    pub failures: Vec<FailureRecord>,
    /// Messages never classified because the run was cancelled, in input order.
    pub skipped: Vec<MessageId>,
    /// IDs that appeared more than once in the input (first occurrence used).
    pub duplicates: Vec<MessageId>,
}

/// Result of one pipeline run, handed to reporters and returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_messages: usize,
    pub cancelled: bool,
    pub buckets: OrganizedStore,
    pub failures: Vec<FailureRecord>,
    pub skipped: Vec<MessageId>,
    pub duplicates: Vec<MessageId>,
}

// ── Collaborator traits ─────────────────────────────────────────────

/// Fetch collaborator: pure I/O, no classification logic.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Fetch the batch to organize, in a stable order.
    async fn fetch_messages(&self) -> Result<Vec<Message>, SourceError>;
}

/// Reporting/storage collaborator for finished runs.
#[async_trait]
pub trait Reporter: Send + Sync {
    fn name(&self) -> &str;

    async fn report(&self, report: &RunReport) -> Result<(), ReportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emotion_result_rejects_out_of_range() {
        assert!(EmotionResult::new([(Emotion::Joy, 1.2)]).is_err());
        assert!(EmotionResult::new([(Emotion::Joy, -0.1)]).is_err());
        assert!(EmotionResult::new([(Emotion::Joy, f64::NAN)]).is_err());
        assert!(EmotionResult::new([(Emotion::Joy, 0.0), (Emotion::Fear, 1.0)]).is_ok());
    }

    #[test]
    fn emotion_result_top_score() {
        let result = EmotionResult::new([(Emotion::Joy, 0.2), (Emotion::Anger, 0.7)]).unwrap();
        assert_eq!(result.top_score(), Some(0.7));
        assert_eq!(EmotionResult::default().top_score(), None);
    }

    #[test]
    fn emotion_labels_parse_case_insensitive() {
        assert_eq!(Emotion::from_label(" Joy "), Some(Emotion::Joy));
        assert_eq!(Emotion::from_label("SADNESS"), Some(Emotion::Sadness));
        assert_eq!(Emotion::from_label("disgust"), None);
    }

    #[test]
    fn bucket_name_from_label() {
        assert_eq!(BucketName::from_label("unclassified"), Some(BucketName::Unclassified));
        assert_eq!(BucketName::from_label("fear"), Some(BucketName::Fear));
        assert_eq!(BucketName::from_label("mixed"), None);
    }

    #[test]
    fn store_tracks_membership_per_bucket() {
        let mut store = OrganizedStore::new();
        store.push(BucketName::Joy, "a");
        store.push(BucketName::Anger, "a");
        store.push(BucketName::Joy, "b");
        assert_eq!(store.bucket(BucketName::Joy), ["a".to_string(), "b".to_string()]);
        assert_eq!(store.buckets_of("a").count(), 2);
        assert!(store.bucket(BucketName::Fear).is_empty());
    }

    #[test]
    fn store_serializes_as_name_to_id_list() {
        let mut store = OrganizedStore::new();
        store.push(BucketName::Unclassified, "m3");
        store.push(BucketName::Joy, "m1");
        store.push(BucketName::Joy, "m2");

        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"joy":["m1","m2"],"unclassified":["m3"]}"#);

        let parsed: OrganizedStore = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, store);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }

    #[test]
    fn message_deserializes_without_metadata() {
        let msg: Message = serde_json::from_str(r#"{"id": "m1", "content": "hello"}"#).unwrap();
        assert_eq!(msg, Message::new("m1", "hello"));
    }
}
