use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only log of exchanges within one pipeline run.
///
/// The system framing is never stored here; callers prepend it when building
/// a request so that history can be replayed under the same framing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed user/assistant exchange
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(ChatMessage::user(user));
        self.messages.push(ChatMessage::assistant(assistant));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of completed exchanges
    pub fn exchanges(&self) -> usize {
        self.messages.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Build a full request: system framing, prior exchanges, then the new turn
    pub fn request_with(&self, system_prompt: &str, user_turn: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.messages.len() + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(self.messages.iter().cloned());
        messages.push(ChatMessage::user(user_turn));
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_exchange_preserves_order() {
        let mut history = ConversationHistory::new();
        assert!(history.is_empty());

        history.push_exchange("first request", "first story");
        history.push_exchange("revise it", "second story");

        assert_eq!(history.exchanges(), 2);
        let roles: Vec<Role> = history.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(history.messages()[3].content, "second story");
    }

    #[test]
    fn test_request_with_frames_history() {
        let mut history = ConversationHistory::new();
        history.push_exchange("a cat story", "Once upon a time...");

        let request = history.request_with("be gentle", "make it calmer");
        assert_eq!(request.len(), 4);
        assert_eq!(request[0], ChatMessage::system("be gentle"));
        assert_eq!(request[1], ChatMessage::user("a cat story"));
        assert_eq!(request[3], ChatMessage::user("make it calmer"));
        // building a request never mutates the log
        assert_eq!(history.exchanges(), 1);
    }
}
