use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::rubric::{RawScores, ScoreError, MAX_SCORE};
use crate::{is_ready, ReadinessThreshold, RubricScores};

/// Soft cap on the length of a revision plan
pub const EDIT_INSTRUCTIONS_WORD_CAP: usize = 120;

/// The judge's verdict on one draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryFeedback {
    pub scores: RubricScores,
    /// Short problem statements, possibly empty
    #[serde(default)]
    pub issues: Vec<String>,
    /// One compact revision plan for a single pass
    #[serde(default)]
    pub edit_instructions: String,
    /// Descriptive echo (age, tone, target length, word count); never drives control flow
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

#[derive(Error, Debug)]
pub enum FeedbackParseError {
    #[error("No feedback payload found in judge output")]
    NoPayload,

    #[error("Failed to parse feedback JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Feedback is missing the scores object")]
    MissingScores,

    #[error("Invalid rubric scores: {0}")]
    InvalidScores(#[from] ScoreError),

    #[error("Feedback has scores below {max} but no edit instructions", max = MAX_SCORE)]
    MissingEditInstructions,
}

/// Untrusted feedback shape as produced by the judge model
#[derive(Debug, Deserialize)]
struct RawFeedback {
    scores: Option<RawScores>,
    #[serde(default)]
    issues: Option<Vec<String>>,
    #[serde(default)]
    edit_instructions: Option<String>,
    #[serde(default)]
    metadata: Option<BTreeMap<String, Value>>,
}

impl StoryFeedback {
    pub fn new(scores: RubricScores) -> Self {
        Self {
            scores,
            issues: Vec::new(),
            edit_instructions: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    pub fn with_edit_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.edit_instructions = instructions.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_ready(&self, threshold: ReadinessThreshold) -> bool {
        is_ready(self, threshold)
    }

    /// Parse and validate feedback from the judge's output text
    ///
    /// The judge runs in JSON mode and normally answers with a single object:
    /// ```text
    /// {"scores": {"age_fit": 5, ...}, "issues": [...], "edit_instructions": "..."}
    /// ```
    /// A `<feedback>` block, a fenced ```json block, or an object embedded in
    /// surrounding prose is accepted as well.
    pub fn parse(judge_output: &str) -> Result<Self, FeedbackParseError> {
        debug!(output_len = judge_output.len(), "Parsing judge feedback");

        let payload = Self::locate_payload(judge_output).ok_or(FeedbackParseError::NoPayload)?;
        let raw: RawFeedback = serde_json::from_str(payload)?;
        let scores = RubricScores::try_from(raw.scores.ok_or(FeedbackParseError::MissingScores)?)?;

        let feedback = StoryFeedback {
            scores,
            issues: raw
                .issues
                .unwrap_or_default()
                .into_iter()
                .map(|issue| issue.trim().to_string())
                .filter(|issue| !issue.is_empty())
                .collect(),
            edit_instructions: raw.edit_instructions.unwrap_or_default().trim().to_string(),
            metadata: raw.metadata.unwrap_or_default(),
        };
        feedback.validate()?;
        Ok(feedback)
    }

    /// Any score short of perfect fails at least one plausible threshold, so
    /// such feedback must say how to fix the story.
    fn validate(&self) -> Result<(), FeedbackParseError> {
        if self.scores.min() < MAX_SCORE && self.edit_instructions.is_empty() {
            return Err(FeedbackParseError::MissingEditInstructions);
        }

        let words = self.edit_instructions.split_whitespace().count();
        if words > EDIT_INSTRUCTIONS_WORD_CAP {
            warn!(
                words,
                cap = EDIT_INSTRUCTIONS_WORD_CAP,
                "Edit instructions exceed soft word cap"
            );
        }
        Ok(())
    }

    fn locate_payload(output: &str) -> Option<&str> {
        if let (Some(start), Some(end)) = (output.find("<feedback>"), output.rfind("</feedback>")) {
            if start < end {
                return Some(output[start + "<feedback>".len()..end].trim());
            }
        }

        if let Some(fence) = output.find("```json") {
            let body = &output[fence + "```json".len()..];
            if let Some(close) = body.find("```") {
                return Some(body[..close].trim());
            }
        }

        Self::embedded_object(output)
    }

    /// First complete JSON object in free text, preferring one with a `scores` key
    fn embedded_object(output: &str) -> Option<&str> {
        let mut first_object = None;
        for (start, _) in output.match_indices('{') {
            let rest = &output[start..];
            let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
            if let Some(Ok(Value::Object(map))) = stream.next() {
                let candidate = &rest[..stream.byte_offset()];
                if map.contains_key("scores") {
                    return Some(candidate);
                }
                first_object.get_or_insert(candidate);
            }
        }
        first_object
    }

    /// Get a short description of the verdict for logging
    pub fn short_description(&self, threshold: ReadinessThreshold) -> String {
        if self.is_ready(threshold) {
            format!("READY (min score {})", self.scores.min())
        } else {
            let weak: Vec<String> = self
                .scores
                .below(threshold.value())
                .into_iter()
                .map(|axis| format!("{}={}", axis, self.scores.get(axis)))
                .collect();
            format!("REVISE ({})", weak.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RubricAxis;

    #[test]
    fn test_parse_feedback_block() {
        let output = r#"
The story is sweet but the middle drags.

<feedback>
{"scores": {"age_fit": 5, "safety_sensitivity": 5, "clarity_structure": 3, "tone_bedtime": 4, "engagement_creativity": 4, "length_fit": 4},
 "issues": ["pacing dips in act two"],
 "edit_instructions": "tighten the middle section for clarity"}
</feedback>
"#;

        let feedback = StoryFeedback::parse(output).unwrap();
        assert_eq!(feedback.scores.get(RubricAxis::ClarityStructure), 3);
        assert_eq!(feedback.issues, vec!["pacing dips in act two"]);
        assert_eq!(
            feedback.edit_instructions,
            "tighten the middle section for clarity"
        );
        assert!(!feedback.is_ready(ReadinessThreshold::DEFAULT));
        assert_eq!(
            feedback.short_description(ReadinessThreshold::DEFAULT),
            "REVISE (clarity_structure=3)"
        );
    }

    #[test]
    fn test_parse_fenced_json() {
        let output = "Here you go:\n```json\n{\"scores\": {\"age_fit\": 5, \"safety_sensitivity\": 5, \"clarity_structure\": 5, \"tone_bedtime\": 5, \"engagement_creativity\": 5, \"length_fit\": 5}}\n```";
        let feedback = StoryFeedback::parse(output).unwrap();
        assert!(feedback.issues.is_empty());
        assert!(feedback.edit_instructions.is_empty());
        assert!(feedback.is_ready(ReadinessThreshold::DEFAULT));
    }

    #[test]
    fn test_parse_bare_json_with_metadata() {
        let output = r#"{"scores": {"age_fit": 4, "safety_sensitivity": 4, "clarity_structure": 4, "tone_bedtime": 4, "engagement_creativity": 4, "length_fit": 4}, "edit_instructions": "minor polish", "metadata": {"tone": "soothing"}}"#;
        let feedback = StoryFeedback::parse(output).unwrap();
        assert_eq!(feedback.metadata["tone"], "soothing");
        assert_eq!(
            feedback.short_description(ReadinessThreshold::DEFAULT),
            "READY (min score 4)"
        );
    }

    #[test]
    fn test_parse_skips_braces_in_leading_prose() {
        let output = r#"Scores use the {0-5} scale, see {"note": "rubric"} below.
{"scores": {"age_fit": 5, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5, "length_fit": 5}} Sweet dreams {zzz}"#;
        let feedback = StoryFeedback::parse(output).unwrap();
        assert_eq!(feedback.scores.min(), 5);
    }

    #[test]
    fn test_parse_missing_axis_is_rejected() {
        let output = r#"<feedback>{"scores": {"age_fit": 5, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5}, "edit_instructions": "x"}</feedback>"#;
        let err = StoryFeedback::parse(output).unwrap_err();
        assert!(matches!(
            err,
            FeedbackParseError::InvalidScores(ScoreError::MissingAxis(RubricAxis::LengthFit))
        ));
    }

    #[test]
    fn test_parse_out_of_range_is_rejected_not_clamped() {
        let output = r#"<feedback>{"scores": {"age_fit": 7, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5, "length_fit": 5}, "edit_instructions": "x"}</feedback>"#;
        let err = StoryFeedback::parse(output).unwrap_err();
        assert!(matches!(
            err,
            FeedbackParseError::InvalidScores(ScoreError::OutOfRange {
                axis: RubricAxis::AgeFit,
                value: 7
            })
        ));
    }

    #[test]
    fn test_parse_fractional_score_is_rejected() {
        let output = r#"{"scores": {"age_fit": 4.5, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5, "length_fit": 5}}"#;
        let err = StoryFeedback::parse(output).unwrap_err();
        assert!(matches!(err, FeedbackParseError::JsonParseError(_)));
    }

    #[test]
    fn test_parse_requires_instructions_when_imperfect() {
        let output = r#"{"scores": {"age_fit": 5, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5, "length_fit": 2}, "edit_instructions": "   "}"#;
        let err = StoryFeedback::parse(output).unwrap_err();
        assert!(matches!(err, FeedbackParseError::MissingEditInstructions));
    }

    #[test]
    fn test_parse_missing_scores_object() {
        let output = r#"{"issues": [], "edit_instructions": "none"}"#;
        let err = StoryFeedback::parse(output).unwrap_err();
        assert!(matches!(err, FeedbackParseError::MissingScores));
    }

    #[test]
    fn test_parse_no_payload() {
        let err = StoryFeedback::parse("Looks lovely, no notes.").unwrap_err();
        assert!(matches!(err, FeedbackParseError::NoPayload));
    }

    #[test]
    fn test_blank_issues_are_dropped() {
        let output = r#"{"scores": {"age_fit": 5, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5, "length_fit": 5}, "issues": ["", "  ", "tiny typo"]}"#;
        let feedback = StoryFeedback::parse(output).unwrap();
        assert_eq!(feedback.issues, vec!["tiny typo"]);
    }
}
