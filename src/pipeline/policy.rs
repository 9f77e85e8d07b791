//! Organization policy: emotion scores → bucket names.
//!
//! - No score at or above `min_confidence` → `{unclassified}`
//! - Otherwise every emotion within `tie_epsilon` of the top score is selected,
//!   so near-equal scores put the message in several buckets instead of
//!   letting float ordering pick one.

use std::collections::BTreeSet;

use crate::config::OrganizerConfig;
use crate::error::ConfigError;
use crate::pipeline::types::{BucketName, EmotionResult};

/// Slack for float rounding in the tie check, scaled by the top score.
const TIE_ROUNDING: f64 = 4.0 * f64::EPSILON;

/// Deterministic bucket selection rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrganizationPolicy {
    min_confidence: f64,
    tie_epsilon: f64,
}

impl OrganizationPolicy {
    /// Create a policy, validating both thresholds.
    pub fn new(min_confidence: f64, tie_epsilon: f64) -> Result<Self, ConfigError> {
        if !min_confidence.is_finite() || !(0.0..=1.0).contains(&min_confidence) {
            return Err(ConfigError::InvalidValue {
                key: "min_confidence".into(),
                message: format!("{min_confidence} is outside [0, 1]"),
            });
        }
        if !tie_epsilon.is_finite() || tie_epsilon < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "tie_epsilon".into(),
                message: format!("{tie_epsilon} must be a non-negative number"),
            });
        }
        Ok(Self {
            min_confidence,
            tie_epsilon,
        })
    }

    pub fn from_config(config: &OrganizerConfig) -> Result<Self, ConfigError> {
        Self::new(config.min_confidence, config.tie_epsilon)
    }

    /// Select the buckets for one classification result. Never returns an empty set.
    pub fn select_buckets(&self, result: &EmotionResult) -> BTreeSet<BucketName> {
        let Some(top) = result.top_score() else {
            return BTreeSet::from([BucketName::Unclassified]);
        };

        if top < self.min_confidence {
            return BTreeSet::from([BucketName::Unclassified]);
        }

        // 0.51 - 0.50 is 0.010000000000000009, so an exact-epsilon gap needs slack
        let tie_limit = self.tie_epsilon + TIE_ROUNDING * top.max(1.0);
        result
            .iter()
            .filter(|(_, score)| top - score <= tie_limit)
            .map(|(emotion, _)| BucketName::from(emotion))
            .collect()
    }
}

impl Default for OrganizationPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            tie_epsilon: 0.01,
        }
    }
}
