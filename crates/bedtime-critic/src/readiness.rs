use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rubric::MAX_SCORE;
use crate::StoryFeedback;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Readiness threshold {0} is outside 0..={max}", max = MAX_SCORE)]
pub struct RubricError(pub i64);

/// Minimum score every rubric axis must reach for a draft to ship unrevised
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ReadinessThreshold(u8);

impl ReadinessThreshold {
    pub const DEFAULT: ReadinessThreshold = ReadinessThreshold(4);

    pub fn new(value: i64) -> Result<Self, RubricError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_SCORE)
            .map(Self)
            .ok_or(RubricError(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for ReadinessThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for ReadinessThreshold {
    type Error = RubricError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReadinessThreshold> for u8 {
    fn from(threshold: ReadinessThreshold) -> Self {
        threshold.0
    }
}

impl std::fmt::Display for ReadinessThreshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A draft is ready only when every axis meets the threshold.
///
/// One weak axis is enough to force a revision; high scores elsewhere never
/// compensate for it.
pub fn is_ready(feedback: &StoryFeedback, threshold: ReadinessThreshold) -> bool {
    feedback.scores.min() >= threshold.value()
}
