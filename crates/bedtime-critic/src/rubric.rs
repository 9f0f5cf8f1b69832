use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest score any rubric axis can take
pub const MAX_SCORE: u8 = 5;

/// One axis of the bedtime rubric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricAxis {
    AgeFit,
    SafetySensitivity,
    ClarityStructure,
    ToneBedtime,
    EngagementCreativity,
    LengthFit,
}

impl RubricAxis {
    pub const ALL: [RubricAxis; 6] = [
        RubricAxis::AgeFit,
        RubricAxis::SafetySensitivity,
        RubricAxis::ClarityStructure,
        RubricAxis::ToneBedtime,
        RubricAxis::EngagementCreativity,
        RubricAxis::LengthFit,
    ];

    /// Field name used on the wire
    pub fn name(self) -> &'static str {
        match self {
            RubricAxis::AgeFit => "age_fit",
            RubricAxis::SafetySensitivity => "safety_sensitivity",
            RubricAxis::ClarityStructure => "clarity_structure",
            RubricAxis::ToneBedtime => "tone_bedtime",
            RubricAxis::EngagementCreativity => "engagement_creativity",
            RubricAxis::LengthFit => "length_fit",
        }
    }
}

impl std::fmt::Display for RubricAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Missing rubric score: {0}")]
    MissingAxis(RubricAxis),

    #[error("Rubric score {axis} = {value} is outside 0..={max}", max = MAX_SCORE)]
    OutOfRange { axis: RubricAxis, value: i64 },
}

/// Six validated rubric scores, each in `0..=5`.
///
/// Values can only be built through [`RubricScores::new`] or deserialization,
/// both of which reject missing or out-of-range axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScores")]
pub struct RubricScores {
    age_fit: u8,
    safety_sensitivity: u8,
    clarity_structure: u8,
    tone_bedtime: u8,
    engagement_creativity: u8,
    length_fit: u8,
}

impl RubricScores {
    pub fn new(
        age_fit: i64,
        safety_sensitivity: i64,
        clarity_structure: i64,
        tone_bedtime: i64,
        engagement_creativity: i64,
        length_fit: i64,
    ) -> Result<Self, ScoreError> {
        Ok(Self {
            age_fit: checked(RubricAxis::AgeFit, age_fit)?,
            safety_sensitivity: checked(RubricAxis::SafetySensitivity, safety_sensitivity)?,
            clarity_structure: checked(RubricAxis::ClarityStructure, clarity_structure)?,
            tone_bedtime: checked(RubricAxis::ToneBedtime, tone_bedtime)?,
            engagement_creativity: checked(
                RubricAxis::EngagementCreativity,
                engagement_creativity,
            )?,
            length_fit: checked(RubricAxis::LengthFit, length_fit)?,
        })
    }

    /// Every axis at the same score
    pub fn uniform(score: i64) -> Result<Self, ScoreError> {
        Self::new(score, score, score, score, score, score)
    }

    pub fn get(&self, axis: RubricAxis) -> u8 {
        match axis {
            RubricAxis::AgeFit => self.age_fit,
            RubricAxis::SafetySensitivity => self.safety_sensitivity,
            RubricAxis::ClarityStructure => self.clarity_structure,
            RubricAxis::ToneBedtime => self.tone_bedtime,
            RubricAxis::EngagementCreativity => self.engagement_creativity,
            RubricAxis::LengthFit => self.length_fit,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (RubricAxis, u8)> + '_ {
        RubricAxis::ALL.into_iter().map(|axis| (axis, self.get(axis)))
    }

    pub fn min(&self) -> u8 {
        self.iter().map(|(_, score)| score).min().unwrap_or(0)
    }

    /// Axes scoring strictly below the given bar
    pub fn below(&self, bar: u8) -> Vec<RubricAxis> {
        self.iter()
            .filter(|(_, score)| *score < bar)
            .map(|(axis, _)| axis)
            .collect()
    }

    /// Compact `axis=score` listing for logs
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(axis, score)| format!("{}={}", axis, score))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn checked(axis: RubricAxis, value: i64) -> Result<u8, ScoreError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_SCORE)
        .ok_or(ScoreError::OutOfRange { axis, value })
}

/// Untrusted score payload straight off the wire
#[derive(Debug, Default, Deserialize)]
pub struct RawScores {
    age_fit: Option<i64>,
    safety_sensitivity: Option<i64>,
    clarity_structure: Option<i64>,
    tone_bedtime: Option<i64>,
    engagement_creativity: Option<i64>,
    length_fit: Option<i64>,
}

impl TryFrom<RawScores> for RubricScores {
    type Error = ScoreError;

    fn try_from(raw: RawScores) -> Result<Self, Self::Error> {
        let require = |axis: RubricAxis, value: Option<i64>| {
            value.ok_or(ScoreError::MissingAxis(axis))
        };
        Self::new(
            require(RubricAxis::AgeFit, raw.age_fit)?,
            require(RubricAxis::SafetySensitivity, raw.safety_sensitivity)?,
            require(RubricAxis::ClarityStructure, raw.clarity_structure)?,
            require(RubricAxis::ToneBedtime, raw.tone_bedtime)?,
            require(RubricAxis::EngagementCreativity, raw.engagement_creativity)?,
            require(RubricAxis::LengthFit, raw.length_fit)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_full_range() {
        let scores = RubricScores::new(0, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(scores.get(RubricAxis::AgeFit), 0);
        assert_eq!(scores.get(RubricAxis::LengthFit), 5);
        assert_eq!(scores.min(), 0);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        let err = RubricScores::new(5, 5, 6, 5, 5, 5).unwrap_err();
        assert_eq!(
            err,
            ScoreError::OutOfRange {
                axis: RubricAxis::ClarityStructure,
                value: 6
            }
        );

        let err = RubricScores::new(5, -1, 5, 5, 5, 5).unwrap_err();
        assert!(matches!(
            err,
            ScoreError::OutOfRange {
                axis: RubricAxis::SafetySensitivity,
                ..
            }
        ));
    }

    #[test]
    fn test_deserialize_requires_every_axis() {
        let json = r#"{"age_fit":5,"safety_sensitivity":5,"clarity_structure":5,"tone_bedtime":5,"engagement_creativity":5}"#;
        let err = serde_json::from_str::<RubricScores>(json).unwrap_err();
        assert!(err.to_string().contains("length_fit"));
    }

    #[test]
    fn test_below_and_summary() {
        let scores = RubricScores::new(5, 5, 3, 4, 4, 2).unwrap();
        assert_eq!(
            scores.below(4),
            vec![RubricAxis::ClarityStructure, RubricAxis::LengthFit]
        );
        assert_eq!(
            scores.summary(),
            "age_fit=5 safety_sensitivity=5 clarity_structure=3 tone_bedtime=4 engagement_creativity=4 length_fit=2"
        );
    }

    #[test]
    fn test_serializes_with_axis_names() {
        let scores = RubricScores::uniform(4).unwrap();
        let json = serde_json::to_value(scores).unwrap();
        assert_eq!(json["tone_bedtime"], 4);
        let back: RubricScores = serde_json::from_value(json).unwrap();
        assert_eq!(back, scores);
    }
}
