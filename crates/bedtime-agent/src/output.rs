use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output captured from a chat completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutput {
    /// Assistant message text
    pub content: String,
    /// Model that actually served the request, when reported
    pub model: Option<String>,
    /// Prompt tokens billed, when reported
    pub prompt_tokens: Option<u32>,
    /// Completion tokens billed, when reported
    pub completion_tokens: Option<u32>,
    /// Wall-clock duration of the request
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl ChatOutput {
    pub fn new(content: String, duration: Duration) -> Self {
        Self {
            content,
            model: None,
            prompt_tokens: None,
            completion_tokens: None,
            duration,
        }
    }

    /// Check whether the model produced any visible text
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Count whitespace-separated words in the content
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
