//! PaperChat Common Library
//!
//! Shared code for the PaperChat backend including:
//! - Chat pipeline (intent classification, response composition, reference extraction)
//! - Paper lookup gateway (external arXiv tool invocation)
//! - LLM client abstraction
//! - Diagram rendering
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod arxiv;
pub mod chat;
pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod render;

// Re-export commonly used types
pub use arxiv::{ArxivToolClient, PaperAnalysis, PaperRecord, PaperTool};
pub use chat::{ChatResponse, Chatbot, SourceRecord};
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::Generator;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default LLM model
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
