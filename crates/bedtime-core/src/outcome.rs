use serde::{Deserialize, Serialize};
use std::time::Duration;

use bedtime_critic::StoryFeedback;

use crate::error::ErrorKind;
use crate::stage::{PipelineStage, TransitionRecord};

/// The final outcome of one story pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineResult {
    /// A final story was chosen
    Completed {
        final_story: String,
        /// Verdict on the first draft, never on the revision
        judge_feedback: StoryFeedback,
        revised: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transitions: Vec<TransitionRecord>,
        duration_secs: f64,
    },
    /// A collaborator failed; whatever was produced before is kept
    Failed {
        error_kind: ErrorKind,
        stage: PipelineStage,
        error: String,
        partial_draft: Option<String>,
        partial_feedback: Option<StoryFeedback>,
        duration_secs: f64,
    },
    /// Cancelled while waiting on a collaborator
    Cancelled {
        stage: PipelineStage,
        partial_draft: Option<String>,
        partial_feedback: Option<StoryFeedback>,
        duration_secs: f64,
    },
}

impl PipelineResult {
    pub fn completed(
        final_story: String,
        judge_feedback: StoryFeedback,
        revised: bool,
        transitions: Vec<TransitionRecord>,
        duration: Duration,
    ) -> Self {
        Self::Completed {
            final_story,
            judge_feedback,
            revised,
            transitions,
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn failed(
        error_kind: ErrorKind,
        stage: PipelineStage,
        error: String,
        partial_draft: Option<String>,
        partial_feedback: Option<StoryFeedback>,
        duration: Duration,
    ) -> Self {
        Self::Failed {
            error_kind,
            stage,
            error,
            partial_draft,
            partial_feedback,
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn cancelled(
        stage: PipelineStage,
        partial_draft: Option<String>,
        partial_feedback: Option<StoryFeedback>,
        duration: Duration,
    ) -> Self {
        Self::Cancelled {
            stage,
            partial_draft,
            partial_feedback,
            duration_secs: duration.as_secs_f64(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Failed { .. } => 2,
            Self::Cancelled { .. } => 130,
        }
    }

    pub fn final_story(&self) -> Option<&str> {
        match self {
            Self::Completed { final_story, .. } => Some(final_story),
            _ => None,
        }
    }

    /// Feedback on the first draft, if the run got that far
    pub fn judge_feedback(&self) -> Option<&StoryFeedback> {
        match self {
            Self::Completed { judge_feedback, .. } => Some(judge_feedback),
            Self::Failed {
                partial_feedback, ..
            }
            | Self::Cancelled {
                partial_feedback, ..
            } => partial_feedback.as_ref(),
        }
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { partial_draft, .. } | Self::Cancelled { partial_draft, .. } => {
                partial_draft.as_deref()
            }
        }
    }

    pub fn duration_secs(&self) -> f64 {
        match self {
            Self::Completed { duration_secs, .. }
            | Self::Failed { duration_secs, .. }
            | Self::Cancelled { duration_secs, .. } => *duration_secs,
        }
    }

    /// True when the run failed after the draft was judged, during the revision
    pub fn is_revision_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed {
                stage: PipelineStage::Revising,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_critic::RubricScores;

    #[test]
    fn test_exit_codes() {
        let feedback = StoryFeedback::new(RubricScores::uniform(5).unwrap());
        let done = PipelineResult::completed(
            "story".into(),
            feedback,
            false,
            Vec::new(),
            Duration::from_secs(1),
        );
        let failed = PipelineResult::failed(
            ErrorKind::GenerationError,
            PipelineStage::Generating,
            "boom".into(),
            None,
            None,
            Duration::ZERO,
        );
        let cancelled =
            PipelineResult::cancelled(PipelineStage::Evaluating, None, None, Duration::ZERO);

        assert_eq!(done.exit_code(), 0);
        assert_eq!(failed.exit_code(), 2);
        assert_eq!(cancelled.exit_code(), 130);
        assert!(done.is_success());
        assert!(!failed.is_success());
    }

    #[test]
    fn test_serializes_with_status_tag() {
        let failed = PipelineResult::failed(
            ErrorKind::CritiqueError,
            PipelineStage::Evaluating,
            "bad payload".into(),
            Some("draft".into()),
            None,
            Duration::from_millis(500),
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "critique_error");
        assert_eq!(json["stage"], "evaluating");
        assert_eq!(json["partial_draft"], "draft");
        assert!(json["partial_feedback"].is_null());
    }

    #[test]
    fn test_revision_failure_keeps_partials() {
        let feedback = StoryFeedback::new(RubricScores::uniform(3).unwrap())
            .with_edit_instructions("Shorten the middle.");
        let failed = PipelineResult::failed(
            ErrorKind::GenerationError,
            PipelineStage::Revising,
            "timeout".into(),
            Some("draft".into()),
            Some(feedback.clone()),
            Duration::ZERO,
        );
        assert!(failed.is_revision_failure());
        assert_eq!(failed.draft(), Some("draft"));
        assert_eq!(failed.judge_feedback(), Some(&feedback));
        assert!(failed.final_story().is_none());
    }
}
