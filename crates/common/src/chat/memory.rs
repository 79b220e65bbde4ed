//! Conversation memory
//!
//! One memory instance per logical session, addressed by an explicit
//! session id passed through every pipeline call. There is deliberately
//! no process-wide shared history: concurrent sessions never interleave.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Ordered history of one conversation
#[derive(Debug, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, role: Role, text: impl Into<String>) {
        self.turns.push(Turn {
            role,
            text: text.into(),
            at: Utc::now(),
        });
    }

    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Process-wide registry of session memories. Sessions are created on
/// first contact and addressed by id thereafter.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ConversationMemory>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a session id to its memory, creating a fresh session when
    /// the id is absent or unknown. Returns the effective id so callers
    /// can echo it back.
    pub async fn get_or_create(
        &self,
        session_id: Option<Uuid>,
    ) -> (Uuid, Arc<Mutex<ConversationMemory>>) {
        if let Some(id) = session_id {
            let sessions = self.sessions.read().await;
            if let Some(memory) = sessions.get(&id) {
                return (id, memory.clone());
            }
        }

        let id = session_id.unwrap_or_else(Uuid::new_v4);
        let memory = Arc::new(Mutex::new(ConversationMemory::new()));
        self.sessions.write().await.insert(id, memory.clone());
        (id, memory)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_records_turns_in_order() {
        let mut memory = ConversationMemory::new();
        memory.record(Role::User, "explain b-trees");
        memory.record(Role::Assistant, "A B-tree is...");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.history()[0].role, Role::User);
        assert_eq!(memory.history()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let (id_a, memory_a) = store.get_or_create(None).await;
        let (id_b, memory_b) = store.get_or_create(None).await;
        assert_ne!(id_a, id_b);

        memory_a.lock().await.record(Role::User, "hello");
        assert!(memory_b.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_known_session_is_reused() {
        let store = SessionStore::new();
        let (id, memory) = store.get_or_create(None).await;
        memory.lock().await.record(Role::User, "first");

        let (same_id, same_memory) = store.get_or_create(Some(id)).await;
        assert_eq!(id, same_id);
        assert_eq!(same_memory.lock().await.len(), 1);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_session_id_is_adopted() {
        let store = SessionStore::new();
        let external = Uuid::new_v4();
        let (id, _) = store.get_or_create(Some(external)).await;
        assert_eq!(id, external);
    }
}
