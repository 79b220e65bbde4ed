//! Chat handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use paperchat_common::{
    chat::ChatResponse,
    errors::{AppError, Result},
};

/// Chat request
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub query: String,

    /// Conversation to continue. A fresh session is created when absent.
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

/// Chat response with the session id echoed back
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub body: ChatResponse,
}

/// Reject blank or oversized queries before the pipeline runs
fn validate_request(request: &ChatRequest) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(AppError::Validation {
            message: "No query provided".to_string(),
            field: Some("query".to_string()),
        });
    }
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}

/// Run one query through the chat pipeline
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    validate_request(&request)?;

    let (session_id, memory) = state.sessions.get_or_create(request.session_id).await;
    let mut memory = memory.lock().await;
    let body = state.chatbot.process_query(&mut memory, &request.query).await;

    tracing::info!(
        session_id = %session_id,
        sources = body.sources.as_ref().map_or(0, Vec::len),
        "Chat completed"
    );

    Ok(Json(ChatReply { session_id, body }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_blank_query_is_rejected_before_pipeline() {
        for query in ["", "   ", "\n\t"] {
            let request = ChatRequest {
                query: query.to_string(),
                session_id: None,
            };
            let err = validate_request(&request).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
            match err {
                AppError::Validation { message, .. } => {
                    assert_eq!(message, "No query provided");
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_nonblank_query_passes_validation() {
        let request = ChatRequest {
            query: "explain transformers".to_string(),
            session_id: None,
        };
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_chat_request_accepts_missing_session_id() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"query": "explain transformers"}"#).unwrap();
        assert_eq!(request.query, "explain transformers");
        assert!(request.session_id.is_none());
    }

    #[test]
    fn test_chat_reply_flattens_body() {
        let reply = ChatReply {
            session_id: Uuid::nil(),
            body: ChatResponse::text("hello"),
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["response"], "hello");
        assert!(json.get("sources").is_none());
    }
}
