use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry of the conversation fed to the completion API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    /// Rough token count: one token per four characters.
    pub fn estimate_tokens(&self) -> usize {
        self.content.chars().count() / 4
    }
}

/// Frame sent by a chat client.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(alias = "user")]
    pub sender: String,
    pub text: String,
}

/// Frame broadcast to every connected client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    Message { sender: String, text: String },
    Typing,
}
