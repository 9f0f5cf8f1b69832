use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use bedtime_agent::{ChatMessage, ChatModel, ModelConfig, ModelError};

use crate::prompts::word_count;
use crate::{FeedbackParseError, JudgePrompts, StoryFeedback};

/// Audience and shape the judge scores against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOptions {
    pub child_age: u32,
    pub tone: String,
    /// Target story length in words
    pub length_target: u32,
}

impl Default for ReviewOptions {
    fn default() -> Self {
        Self {
            child_age: 7,
            tone: "soothing".to_string(),
            length_target: 500,
        }
    }
}

/// Capability to score a draft against the rubric
#[async_trait]
pub trait StoryCritic: Send + Sync {
    async fn review(
        &self,
        user_request: &str,
        draft_story: &str,
    ) -> Result<StoryFeedback, CritiqueError>;
}

/// Critic backed by a chat model prompted as a children's literature judge
pub struct StoryJudge {
    model: Arc<dyn ChatModel>,
    config: ModelConfig,
    options: ReviewOptions,
}

impl StoryJudge {
    /// The judge always runs in JSON mode, whatever `config` asks for
    pub fn new(model: Arc<dyn ChatModel>, config: ModelConfig) -> Self {
        Self {
            model,
            config: config.with_json_response(true),
            options: ReviewOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReviewOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ReviewOptions {
        &self.options
    }
}

#[async_trait]
impl StoryCritic for StoryJudge {
    async fn review(
        &self,
        user_request: &str,
        draft_story: &str,
    ) -> Result<StoryFeedback, CritiqueError> {
        let prompt = JudgePrompts::build_review_prompt(user_request, draft_story, &self.options);
        let messages = [
            ChatMessage::system(JudgePrompts::system_prompt()),
            ChatMessage::user(prompt),
        ];

        debug!(
            prompt_len = messages[1].content.len(),
            "Running judge evaluation"
        );

        let output = self
            .model
            .complete(&messages, &self.config)
            .await?;

        info!(
            model = self.model.name(),
            duration_secs = output.duration.as_secs_f64(),
            "Judge completed"
        );

        let mut feedback = StoryFeedback::parse(&output.content)?;
        feedback = feedback
            .with_metadata("age", self.options.child_age)
            .with_metadata("tone", self.options.tone.clone())
            .with_metadata("target_length", self.options.length_target)
            .with_metadata("word_count", word_count(draft_story));
        Ok(feedback)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CritiqueError {
    #[error("Judge model error: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to parse judge feedback: {0}")]
    ParseError(#[from] FeedbackParseError),

    #[error("Judge timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedtime_agent::ChatOutput;

    struct CannedModel(&'static str);

    #[async_trait]
    impl ChatModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
            config: &ModelConfig,
        ) -> Result<ChatOutput, ModelError> {
            assert_eq!(messages.len(), 2);
            assert!(config.json_response, "judge must request a JSON object");
            Ok(ChatOutput::new(self.0.to_string(), Duration::from_millis(1)))
        }
    }

    struct DownModel;

    #[async_trait]
    impl ChatModel for DownModel {
        fn name(&self) -> &str {
            "down"
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _config: &ModelConfig,
        ) -> Result<ChatOutput, ModelError> {
            Err(ModelError::Status {
                status: 503,
                body: "unavailable".into(),
            })
        }
    }

    #[tokio::test]
    async fn test_review_attaches_metadata() {
        let model = Arc::new(CannedModel(
            r#"{"scores": {"age_fit": 5, "safety_sensitivity": 5, "clarity_structure": 5, "tone_bedtime": 5, "engagement_creativity": 5, "length_fit": 4}, "issues": [], "edit_instructions": "add a closing line about the moon"}"#,
        ));
        let judge = StoryJudge::new(model, ModelConfig::default().with_json_response(false));

        let feedback = judge
            .review("a cat story", "Bob the cat curls up to sleep.")
            .await
            .unwrap();

        assert_eq!(feedback.metadata["age"], 7);
        assert_eq!(feedback.metadata["tone"], "soothing");
        assert_eq!(feedback.metadata["target_length"], 500);
        assert_eq!(feedback.metadata["word_count"], 7);
    }

    #[tokio::test]
    async fn test_review_never_falls_back_on_bad_payload() {
        let judge = StoryJudge::new(Arc::new(CannedModel("I liked it!")), ModelConfig::default());
        let err = judge.review("a cat story", "Bob naps.").await.unwrap_err();
        assert!(matches!(
            err,
            CritiqueError::ParseError(FeedbackParseError::NoPayload)
        ));
    }

    #[tokio::test]
    async fn test_review_surfaces_model_failure() {
        let judge = StoryJudge::new(Arc::new(DownModel), ModelConfig::default());
        let err = judge.review("a cat story", "Bob naps.").await.unwrap_err();
        assert!(matches!(
            err,
            CritiqueError::Model(ModelError::Status { status: 503, .. })
        ));
        assert!(err.to_string().contains("503"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
