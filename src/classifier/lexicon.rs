//! Lexicon classifier: case-insensitive cue words per emotion.
//!
//! Each emotion's score is its share of all cue hits in the message. A
//! message with no cue hits is `neutral` with full confidence.

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error};

use super::{EmotionClassifier, validate_content};
use crate::error::ClassifierError;
use crate::pipeline::types::{Emotion, EmotionResult};

const JOY_CUES: &[&str] = &[
    "happy", "glad", "delighted", "thrilled", "excited", "great news", "congratulations",
    "congrats", "wonderful", "awesome", "fantastic", "love it", "thank you so much",
    "grateful", "celebrate", "yay", "pleased",
];

const ANGER_CUES: &[&str] = &[
    "angry", "furious", "outraged", "unacceptable", "ridiculous", "annoyed", "irritated",
    "fed up", "sick of", "frustrated", "frustrating", "disgusted", "how dare", "livid",
    "complaint",
];

const SADNESS_CUES: &[&str] = &[
    "sad", "sorry to hear", "unfortunately", "heartbroken", "disappointed", "miss you",
    "passed away", "condolences", "lonely", "regret", "depressed", "upset", "grief",
];

const FEAR_CUES: &[&str] = &[
    "afraid", "scared", "worried", "anxious", "nervous", "panic", "terrified", "urgent",
    "concerned", "deadline", "risk", "threat", "overdue", "final notice",
];

const SURPRISE_CUES: &[&str] = &[
    "surprise", "surprised", "unexpected", "wow", "can't believe", "cannot believe",
    "shocked", "no way", "out of nowhere", "amazed", "astonished",
];

/// One emotion and its compiled cue pattern.
#[derive(Debug, Clone)]
struct CueSet {
    emotion: Emotion,
    regex: Regex,
}

/// Deterministic local classifier.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    cues: Vec<CueSet>,
    max_content_chars: usize,
}

impl LexiconClassifier {
    /// Create a classifier with the built-in cue lists.
    pub fn new(max_content_chars: usize) -> Self {
        let defaults = [
            (Emotion::Joy, JOY_CUES),
            (Emotion::Anger, ANGER_CUES),
            (Emotion::Sadness, SADNESS_CUES),
            (Emotion::Fear, FEAR_CUES),
            (Emotion::Surprise, SURPRISE_CUES),
        ];

        let mut cues = Vec::with_capacity(defaults.len());
        for (emotion, words) in defaults {
            match compile_cues(words) {
                Ok(regex) => cues.push(CueSet { emotion, regex }),
                Err(e) => error!(%emotion, error = %e, "Failed to compile built-in cue list"),
            }
        }

        Self {
            cues,
            max_content_chars,
        }
    }

    /// Create a classifier with no cues (every message scores neutral).
    pub fn empty(max_content_chars: usize) -> Self {
        Self {
            cues: Vec::new(),
            max_content_chars,
        }
    }

    /// Add extra cue words for an emotion.
    pub fn add_cues(&mut self, emotion: Emotion, words: &[&str]) -> Result<(), regex::Error> {
        self.cues.push(CueSet {
            emotion,
            regex: compile_cues(words)?,
        });
        Ok(())
    }

    fn count_hits(&self, content: &str) -> Vec<(Emotion, usize)> {
        let mut hits: Vec<(Emotion, usize)> = Vec::new();
        for cue in &self.cues {
            let count = cue.regex.find_iter(content).count();
            if count == 0 {
                continue;
            }
            match hits.iter_mut().find(|(e, _)| *e == cue.emotion) {
                Some((_, total)) => *total += count,
                None => hits.push((cue.emotion, count)),
            }
        }
        hits
    }
}

#[async_trait]
impl EmotionClassifier for LexiconClassifier {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn classify(&self, content: &str) -> Result<EmotionResult, ClassifierError> {
        validate_content(content, self.max_content_chars)?;

        let hits = self.count_hits(content);
        let total: usize = hits.iter().map(|(_, n)| n).sum();
        if total == 0 {
            return Ok(EmotionResult::single(Emotion::Neutral));
        }

        debug!(total_hits = total, "Lexicon cues matched");

        let scores = Emotion::ALL.into_iter().map(|emotion| {
            let count = hits
                .iter()
                .find(|(e, _)| *e == emotion)
                .map_or(0, |(_, n)| *n);
            (emotion, count as f64 / total as f64)
        });

        EmotionResult::new(scores).map_err(|e| ClassifierError::InvalidResponse {
            backend: "lexicon".into(),
            reason: e.to_string(),
        })
    }
}

/// Build `(?i)\b(?:w1|w2|...)\b` from literal cue words.
fn compile_cues(words: &[&str]) -> Result<Regex, regex::Error> {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LexiconClassifier {
        LexiconClassifier::new(1_000)
    }

    #[tokio::test]
    async fn joyful_message_scores_joy() {
        let result = classifier()
            .classify("Great news! I'm so happy and excited about the launch.")
            .await
            .unwrap();
        assert_eq!(result.score(Emotion::Joy), Some(1.0));
        assert_eq!(result.score(Emotion::Neutral), Some(0.0));
    }

    #[tokio::test]
    async fn no_cues_is_neutral() {
        let result = classifier()
            .classify("Please find the quarterly report attached.")
            .await
            .unwrap();
        assert_eq!(result, EmotionResult::single(Emotion::Neutral));
    }

    #[tokio::test]
    async fn mixed_cues_split_the_score() {
        let result = classifier()
            .classify("I'm angry about the delay and worried we miss the deadline.")
            .await
            .unwrap();
        // anger: angry; fear: worried, deadline
        let anger = result.score(Emotion::Anger).unwrap();
        let fear = result.score(Emotion::Fear).unwrap();
        assert!((anger - 1.0 / 3.0).abs() < 1e-9);
        assert!((fear - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn matching_is_case_insensitive_and_word_bounded() {
        let c = classifier();
        let upper = c.classify("I am FURIOUS").await.unwrap();
        assert_eq!(upper.score(Emotion::Anger), Some(1.0));

        // "sadder" / "gladiator" must not hit "sad" / "glad"
        let bounded = c.classify("The gladiator film was sadder than expected").await.unwrap();
        assert_eq!(bounded, EmotionResult::single(Emotion::Neutral));
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_content() {
        let c = LexiconClassifier::new(10);
        assert!(matches!(
            c.classify("   ").await,
            Err(ClassifierError::EmptyContent)
        ));
        assert!(matches!(
            c.classify("this is far too long").await,
            Err(ClassifierError::ContentTooLong { .. })
        ));
    }

    #[tokio::test]
    async fn custom_cues_extend_an_emotion() {
        let mut c = LexiconClassifier::empty(1_000);
        c.add_cues(Emotion::Surprise, &["plot twist"]).unwrap();
        let result = c.classify("What a plot twist").await.unwrap();
        assert_eq!(result.score(Emotion::Surprise), Some(1.0));
    }

    #[tokio::test]
    async fn same_input_same_result() {
        let c = classifier();
        let text = "Congrats! Unexpected but wonderful news.";
        assert_eq!(c.classify(text).await.unwrap(), c.classify(text).await.unwrap());
    }
}
