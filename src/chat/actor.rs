//! Task that owns the chat history. All reads and writes go through its
//! channel, so appends and truncations never interleave.

use anyhow::Context;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use super::{history::ChatHistory, message::ChatMessage};

enum Command {
    Record {
        message: ChatMessage,
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },
}

#[derive(Clone)]
pub struct HistoryHandle {
    tx: mpsc::Sender<Command>,
}

impl HistoryHandle {
    /// Must be called from within a Tokio runtime.
    pub fn spawn(history: ChatHistory) -> Self {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(run(history, rx));
        Self { tx }
    }

    /// Appends `message`, truncates, and returns the resulting window.
    pub async fn record(&self, message: ChatMessage) -> anyhow::Result<Vec<ChatMessage>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Record { message, reply })
            .await
            .map_err(|_| anyhow::anyhow!("chat history actor stopped"))?;
        rx.await.context("chat history reply")
    }

    pub async fn snapshot(&self) -> anyhow::Result<Vec<ChatMessage>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| anyhow::anyhow!("chat history actor stopped"))?;
        rx.await.context("chat history reply")
    }
}

async fn run(mut history: ChatHistory, mut rx: mpsc::Receiver<Command>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Record { message, reply } => {
                history.push(message);
                debug!(len = history.len(), tokens = history.total_tokens(), "chat history updated");
                let _ = reply.send(history.messages());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(history.messages());
            }
        }
    }
    debug!("chat history actor stopped");
}
