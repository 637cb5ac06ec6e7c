use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, instrument, warn};

use super::{
    message::{ChatMessage, IncomingMessage, Role},
    relay::ChatRelay,
};
use crate::{error::AppError, state::AppState};

pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/ws/chat", get(chat_socket))
        .route("/api/chat/history", get(chat_history))
}

/// Current conversation window without the system prompt, for clients that join late.
#[instrument(skip_all)]
pub async fn chat_history(State(state): State<AppState>) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let window = state.chat.history().snapshot().await?;
    Ok(Json(
        window.into_iter().filter(|m| m.role != Role::System).collect(),
    ))
}

#[instrument(skip_all)]
pub async fn chat_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.chat.clone()))
}

async fn handle_socket(socket: WebSocket, relay: ChatRelay) {
    let (mut sink, mut stream) = socket.split();
    let mut events = relay.subscribe();
    debug!(bot = %relay.bot_name(), "chat socket opened");

    let mut send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Ok(frame) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "chat subscriber lagging");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = stream.next().await {
            match frame {
                Message::Text(text) => match serde_json::from_str::<IncomingMessage>(&text) {
                    Ok(incoming) => {
                        relay.handle(incoming).await;
                    }
                    Err(e) => debug!(error = %e, "ignoring malformed chat frame"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    debug!("chat socket closed");
}
