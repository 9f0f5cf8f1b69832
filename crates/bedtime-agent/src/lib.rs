mod history;
mod openai;
mod output;
mod prompts;
mod storyteller;
mod traits;

pub use history::{ChatMessage, ConversationHistory, Role};
pub use openai::{OpenAiChatModel, OPENAI_API_BASE};
pub use output::ChatOutput;
pub use prompts::{StoryPrompts, DEFAULT_SYSTEM_PROMPT};
pub use storyteller::{GenerationError, StoryGenerator, StoryTeller};
pub use traits::{ChatModel, ModelConfig, ModelError, DEFAULT_MODEL};
