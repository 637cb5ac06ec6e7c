use std::collections::VecDeque;

use super::message::{ChatMessage, Role};

/// Bounded conversation window anchored by a single system message.
///
/// `max_items` counts the system message. Eviction drops the oldest
/// non-system turns until both bounds hold; the system message stays even
/// when it alone exceeds `max_tokens`.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    system: ChatMessage,
    turns: VecDeque<ChatMessage>,
    max_items: usize,
    max_tokens: usize,
}

impl ChatHistory {
    pub fn new(system_prompt: impl Into<String>, max_items: usize, max_tokens: usize) -> Self {
        Self {
            system: ChatMessage::system(system_prompt),
            turns: VecDeque::new(),
            max_items,
            max_tokens,
        }
    }

    /// Appends a turn and truncates. A system-role message replaces the anchor.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.system = message;
        } else {
            self.turns.push_back(message);
        }
        self.truncate();
    }

    fn truncate(&mut self) {
        while self.len() > self.max_items || self.total_tokens() > self.max_tokens {
            if self.turns.pop_front().is_none() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len() + 1
    }

    pub fn total_tokens(&self) -> usize {
        self.system.estimate_tokens() + self.turns.iter().map(ChatMessage::estimate_tokens).sum::<usize>()
    }

    /// System message first, then turns oldest to newest.
    pub fn messages(&self) -> Vec<ChatMessage> {
        std::iter::once(&self.system)
            .chain(self.turns.iter())
            .cloned()
            .collect()
    }
}
