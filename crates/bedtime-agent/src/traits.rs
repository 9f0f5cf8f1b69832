use async_trait::async_trait;
use thiserror::Error;

use crate::{ChatMessage, ChatOutput};

/// Errors that can occur while talking to a chat model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Chat model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Chat model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Chat model credentials missing: {0}")]
    MissingCredentials(String),

    #[error("Malformed chat model response: {0}")]
    MalformedResponse(String),
}

/// Sampling configuration for a single chat completion
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Model identifier sent to the provider
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Ask the provider to emit a JSON object
    pub json_response: bool,
}

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 3000,
            json_response: false,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_json_response(mut self, json_response: bool) -> Self {
        self.json_response = json_response;
        self
    }
}

/// The core abstraction for text-generating chat models
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Human-readable name of the provider (e.g., "OpenAI")
    fn name(&self) -> &str;

    /// Run a single chat completion over the given messages
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &ModelConfig,
    ) -> Result<ChatOutput, ModelError>;

    /// Whether credentials are present for this provider
    fn is_configured(&self) -> bool;
}
