use serde::{Deserialize, Serialize};

use super::{Message, MessageRole};

/// Chat completion input: the messages plus an optional sampling temperature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: None,
        }
    }

    /// The `[system, user]` pair every workflow generation uses
    pub fn instructed(system_instruction: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::system(system_instruction), Message::user(prompt)])
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn system_text(&self) -> Option<&str> {
        self.find_text(MessageRole::System)
    }

    /// Text of the last user message, if any
    pub fn last_user_text(&self) -> Option<&str> {
        self.find_text(MessageRole::User)
    }

    fn find_text(&self, role: MessageRole) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == role)
            .map(Message::content_text)
    }
}
