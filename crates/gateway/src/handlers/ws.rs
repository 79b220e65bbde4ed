//! WebSocket chat handler
//!
//! Mirrors the POST /chat contract over a persistent connection: each
//! text frame carries a JSON chat request, each reply frame the JSON
//! chat response with the session id echoed back. The session is shared
//! with the HTTP endpoint, so a client may mix the two transports.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::chat::ChatReply;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct WsChatRequest {
    query: String,
    #[serde(default)]
    session_id: Option<Uuid>,
}

#[derive(Serialize)]
struct WsError {
    error: String,
}

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("WebSocket client connected");

    while let Some(message) = receiver.next().await {
        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(error = %e, "WebSocket receive error, closing");
                break;
            }
        };

        let frame = match message {
            Message::Text(text) => handle_frame(&state, text.as_str()).await,
            Message::Close(_) => break,
            // Pings are answered by axum automatically
            _ => continue,
        };

        if sender.send(Message::Text(frame.into())).await.is_err() {
            break;
        }
    }

    tracing::debug!("WebSocket client disconnected");
}

/// Process one inbound text frame into an outbound JSON string.
async fn handle_frame(state: &AppState, text: &str) -> String {
    let request: WsChatRequest = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => return error_frame(format!("Invalid request: {e}")),
    };

    if request.query.trim().is_empty() {
        return error_frame("No query provided".to_string());
    }

    let (session_id, memory) = state.sessions.get_or_create(request.session_id).await;
    let mut memory = memory.lock().await;
    let body = state.chatbot.process_query(&mut memory, &request.query).await;

    let reply = ChatReply { session_id, body };
    serde_json::to_string(&reply)
        .unwrap_or_else(|e| error_frame(format!("Failed to encode response: {e}")))
}

fn error_frame(error: String) -> String {
    serde_json::to_string(&WsError { error })
        .unwrap_or_else(|_| r#"{"error":"internal error"}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_request_parses_without_session() {
        let request: WsChatRequest =
            serde_json::from_str(r#"{"query": "what is a monad?"}"#).unwrap();
        assert!(request.session_id.is_none());
    }

    #[test]
    fn test_error_frame_shape() {
        let frame = error_frame("No query provided".to_string());
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["error"], "No query provided");
    }
}
