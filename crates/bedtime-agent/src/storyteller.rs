use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    ChatModel, ConversationHistory, ModelConfig, ModelError, StoryPrompts, DEFAULT_SYSTEM_PROMPT,
};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Chat model error: {0}")]
    Model(#[from] ModelError),

    #[error("Chat model returned an empty story")]
    EmptyStory,

    #[error("Story generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Capability to write and rewrite stories.
///
/// Both calls receive the run's conversation log and append to it on success.
#[async_trait]
pub trait StoryGenerator: Send + Sync {
    /// Produce the first draft for a request
    async fn generate(
        &self,
        history: &mut ConversationHistory,
        user_request: &str,
    ) -> Result<String, GenerationError>;

    /// Produce a revised story that applies the edit instructions to the draft
    async fn revise(
        &self,
        history: &mut ConversationHistory,
        user_request: &str,
        draft_story: &str,
        edit_instructions: &str,
    ) -> Result<String, GenerationError>;
}

/// Story generator backed by a chat model and a fixed system framing
pub struct StoryTeller {
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    config: ModelConfig,
}

impl StoryTeller {
    pub fn new(model: Arc<dyn ChatModel>, config: ModelConfig) -> Self {
        Self {
            model,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            config,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: String) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    async fn exchange(
        &self,
        history: &mut ConversationHistory,
        user_turn: String,
    ) -> Result<String, GenerationError> {
        let messages = history.request_with(&self.system_prompt, &user_turn);
        let output = self.model.complete(&messages, &self.config).await?;

        if output.is_blank() {
            return Err(GenerationError::EmptyStory);
        }

        info!(
            model = self.model.name(),
            words = output.word_count(),
            duration_secs = output.duration.as_secs_f64(),
            "Storyteller completed"
        );

        let story = output.content.trim().to_string();
        history.push_exchange(user_turn, story.clone());
        Ok(story)
    }
}

#[async_trait]
impl StoryGenerator for StoryTeller {
    async fn generate(
        &self,
        history: &mut ConversationHistory,
        user_request: &str,
    ) -> Result<String, GenerationError> {
        debug!(request_len = user_request.len(), "Generating draft story");
        self.exchange(history, user_request.to_string()).await
    }

    async fn revise(
        &self,
        history: &mut ConversationHistory,
        user_request: &str,
        draft_story: &str,
        edit_instructions: &str,
    ) -> Result<String, GenerationError> {
        debug!(
            history = history.exchanges(),
            instructions_len = edit_instructions.len(),
            "Revising story"
        );
        let prompt =
            StoryPrompts::build_revision_prompt(user_request, draft_story, edit_instructions);
        self.exchange(history, prompt).await
    }
}
