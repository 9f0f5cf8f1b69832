use std::time::{Duration, Instant};

use bedtime_agent::ConversationHistory;
use bedtime_critic::StoryFeedback;
use uuid::Uuid;

use crate::stage::{IllegalTransition, PipelineStage, StageMachine};

/// Everything one pipeline run owns
#[derive(Debug)]
pub struct PipelineState {
    pub run_id: Uuid,
    /// Original story request
    pub user_request: String,
    /// First draft, once generated
    pub draft_story: Option<String>,
    /// Verdict on the first draft, once evaluated
    pub judge_feedback: Option<StoryFeedback>,
    /// Story handed back to the caller; set once, after feedback exists
    final_story: Option<String>,
    /// Whether the final story came from the revision pass
    revised: bool,
    /// Exchanges with the storyteller during this run
    pub history: ConversationHistory,
    machine: StageMachine,
    started_at: Instant,
}

impl PipelineState {
    pub fn new(user_request: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            user_request: user_request.into(),
            draft_story: None,
            judge_feedback: None,
            final_story: None,
            revised: false,
            history: ConversationHistory::new(),
            machine: StageMachine::new(),
            started_at: Instant::now(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.machine.current()
    }

    pub fn advance(
        &mut self,
        to: PipelineStage,
        reason: Option<&str>,
    ) -> Result<(), IllegalTransition> {
        self.machine.advance(to, reason)
    }

    pub fn machine(&self) -> &StageMachine {
        &self.machine
    }

    /// Choose the final story and move to `Done`.
    ///
    /// Refused unless feedback exists and no final story was chosen yet.
    pub fn finalize(&mut self, story: String, revised: bool) -> Result<(), IllegalTransition> {
        if self.judge_feedback.is_none() || self.final_story.is_some() {
            return Err(IllegalTransition {
                from: self.stage(),
                to: PipelineStage::Done,
            });
        }
        self.machine.advance(
            PipelineStage::Done,
            Some(if revised { "revised" } else { "ready" }),
        )?;
        self.final_story = Some(story);
        self.revised = revised;
        Ok(())
    }

    pub fn final_story(&self) -> Option<&str> {
        self.final_story.as_deref()
    }

    pub fn revised(&self) -> bool {
        self.revised
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Split a finished run into its final story and the feedback behind it
    pub(crate) fn into_completed(self) -> Option<(String, StoryFeedback, bool)> {
        match (self.final_story, self.judge_feedback) {
            (Some(story), Some(feedback)) => Some((story, feedback, self.revised)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_critic::RubricScores;

    fn feedback() -> StoryFeedback {
        StoryFeedback::new(RubricScores::uniform(5).unwrap())
    }

    #[test]
    fn test_finalize_requires_feedback() {
        let mut state = PipelineState::new("a cat story");
        state.draft_story = Some("draft".into());
        state.advance(PipelineStage::Evaluating, None).unwrap();
        state.advance(PipelineStage::Deciding, None).unwrap();

        assert!(state.finalize("draft".into(), false).is_err());
        assert!(state.final_story().is_none());
        assert_eq!(state.stage(), PipelineStage::Deciding);
    }

    #[test]
    fn test_finalize_only_once() {
        let mut state = PipelineState::new("a cat story");
        state.advance(PipelineStage::Evaluating, None).unwrap();
        state.judge_feedback = Some(feedback());
        state.advance(PipelineStage::Deciding, None).unwrap();

        state.finalize("first".into(), false).unwrap();
        assert_eq!(state.stage(), PipelineStage::Done);
        assert!(state.finalize("second".into(), true).is_err());
        assert_eq!(state.final_story(), Some("first"));
        assert!(!state.revised());
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        let a = PipelineState::new("x");
        let b = PipelineState::new("x");
        assert_ne!(a.run_id, b.run_id);
    }
}
