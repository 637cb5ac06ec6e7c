use std::sync::Arc;

use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info};

use super::{
    actor::HistoryHandle,
    completion::CompletionClient,
    history::ChatHistory,
    message::{ChatEvent, ChatMessage, IncomingMessage},
};

pub const FALLBACK_ANSWER: &str = "Sorry, I didn't understand that.";
const EVENT_CAPACITY: usize = 256;

/// Fans chat traffic out to subscribers and asks the model for replies.
#[derive(Clone)]
pub struct ChatRelay {
    history: HistoryHandle,
    events: broadcast::Sender<ChatEvent>,
    completions: Arc<dyn CompletionClient>,
    bot_name: Arc<str>,
}

impl ChatRelay {
    pub fn new(
        history: ChatHistory,
        completions: Arc<dyn CompletionClient>,
        bot_name: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            history: HistoryHandle::spawn(history),
            events,
            completions,
            bot_name: Arc::from(bot_name.into()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.events.subscribe()
    }

    pub fn history(&self) -> &HistoryHandle {
        &self.history
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Echoes `incoming` to everyone and, unless the bot wrote it or it is
    /// blank, records it and starts the reply task. Returns that task's handle.
    pub async fn handle(&self, incoming: IncomingMessage) -> Option<JoinHandle<()>> {
        self.broadcast(ChatEvent::Message {
            sender: incoming.sender.clone(),
            text: incoming.text.clone(),
        });

        if incoming.sender == *self.bot_name {
            return None;
        }
        let text = incoming.text.trim().to_string();
        if text.is_empty() {
            debug!(sender = %incoming.sender, "blank chat message not forwarded");
            return None;
        }

        let window = match self.history.record(ChatMessage::user(text)).await {
            Ok(window) => window,
            Err(e) => {
                error!(error = ?e, "recording chat message failed");
                return None;
            }
        };

        let relay = self.clone();
        Some(tokio::spawn(async move { relay.reply(window).await }))
    }

    async fn reply(&self, window: Vec<ChatMessage>) {
        self.broadcast(ChatEvent::Typing);

        let answer = match self.completions.complete(&window).await {
            Ok(answer) => {
                if let Err(e) = self.history.record(ChatMessage::assistant(answer.clone())).await {
                    error!(error = ?e, "recording chat answer failed");
                }
                answer
            }
            Err(e) => {
                error!(error = ?e, "chat completion failed");
                FALLBACK_ANSWER.to_string()
            }
        };

        info!(context_len = window.len(), "chat answer ready");
        self.broadcast(ChatEvent::Message {
            sender: self.bot_name.to_string(),
            text: answer,
        });
    }

    fn broadcast(&self, event: ChatEvent) -> usize {
        match self.events.send(event) {
            Ok(subscribers) => {
                debug!(subscribers, "chat event broadcast");
                subscribers
            }
            Err(_) => {
                debug!("no chat subscribers");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chat::message::Role, testing::ScriptedCompletions};

    fn relay_with(completions: Arc<ScriptedCompletions>) -> ChatRelay {
        ChatRelay::new(ChatHistory::new("prime", 10, 2000), completions, "FURIA IA")
    }

    fn incoming(sender: &str, text: &str) -> IncomingMessage {
        IncomingMessage {
            sender: sender.into(),
            text: text.into(),
        }
    }

    fn drain(rx: &mut broadcast::Receiver<ChatEvent>) -> Vec<ChatEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn user_message_is_echoed_answered_and_recorded() {
        let completions = Arc::new(ScriptedCompletions::replying(["Vamos FURIA!"]));
        let relay = relay_with(completions.clone());
        let mut rx = relay.subscribe();

        let task = relay.handle(incoming("Ana", "quem joga hoje?")).await.unwrap();
        task.await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                ChatEvent::Message { sender: "Ana".into(), text: "quem joga hoje?".into() },
                ChatEvent::Typing,
                ChatEvent::Message { sender: "FURIA IA".into(), text: "Vamos FURIA!".into() },
            ]
        );

        let seen = completions.calls();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], vec![ChatMessage::system("prime"), ChatMessage::user("quem joga hoje?")]);

        let history = relay.history().snapshot().await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2], ChatMessage::assistant("Vamos FURIA!"));
    }

    #[tokio::test]
    async fn bot_messages_are_only_echoed() {
        let completions = Arc::new(ScriptedCompletions::replying(["unused"]));
        let relay = relay_with(completions.clone());
        let mut rx = relay.subscribe();

        assert!(relay.handle(incoming("FURIA IA", "hello")).await.is_none());

        assert_eq!(
            drain(&mut rx),
            vec![ChatEvent::Message { sender: "FURIA IA".into(), text: "hello".into() }]
        );
        assert!(completions.calls().is_empty());
        assert_eq!(relay.history().snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_completion_falls_back() {
        let completions = Arc::new(ScriptedCompletions::failing());
        let relay = relay_with(completions);
        let mut rx = relay.subscribe();

        relay.handle(incoming("Ana", "oi")).await.unwrap().await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&ChatEvent::Message { sender: "FURIA IA".into(), text: FALLBACK_ANSWER.into() })
        );
        let history = relay.history().snapshot().await.unwrap();
        assert!(history.iter().all(|m| m.role != Role::Assistant));
    }

    #[tokio::test]
    async fn blank_messages_are_echoed_but_not_answered() {
        let completions = Arc::new(ScriptedCompletions::replying(["x"]));
        let relay = relay_with(completions.clone());
        let mut rx = relay.subscribe();

        assert!(relay.handle(incoming("Ana", "   ")).await.is_none());

        assert_eq!(
            drain(&mut rx),
            vec![ChatEvent::Message { sender: "Ana".into(), text: "   ".into() }]
        );
        assert!(completions.calls().is_empty());
        assert_eq!(relay.history().snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn window_stays_bounded_across_turns() {
        let completions = Arc::new(ScriptedCompletions::replying(["a"; 8]));
        let relay = ChatRelay::new(ChatHistory::new("prime", 4, 2000), completions, "FURIA IA");

        for i in 0..8 {
            relay.handle(incoming("Ana", &format!("q{i}"))).await.unwrap().await.unwrap();
        }
        let history = relay.history().snapshot().await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatMessage::system("prime"));
    }
}
