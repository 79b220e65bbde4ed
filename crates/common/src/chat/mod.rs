//! Chat pipeline
//!
//! Raw query -> intent classification -> response composition (which may
//! call the paper lookup gateway) -> reference extraction -> chat response.

pub mod composer;
pub mod extractor;
pub mod intent;
pub mod memory;

pub use composer::Chatbot;
pub use intent::Intent;
pub use memory::{ConversationMemory, SessionStore};

use serde::{Deserialize, Serialize};

/// A structured citation surfaced to the end user alongside an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Freshly generated opaque identifier, or the paper id on the
    /// summarize-by-id path
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub url: String,
    pub year: String,
}

/// Terminal output of the chat pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ChatResponse {
    /// Plain text response with no sources and no image
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            sources: None,
            image: None,
        }
    }

    /// Response with extracted or constructed sources
    pub fn with_sources(response: impl Into<String>, sources: Vec<SourceRecord>) -> Self {
        Self {
            response: response.into(),
            sources: Some(sources),
            image: None,
        }
    }
}
