//! LLM generation abstraction
//!
//! Provides a unified interface over the model runtime:
//! - Ollama (local models, e.g. llama3.1:8b)
//! - Scripted generator for tests and offline development
//!
//! Generation is a single blocking call from the pipeline's point of view:
//! one prompt in, one completion out, no token streaming.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Trait for single-turn text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Ollama generation client
pub struct OllamaGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaGenerator {
    /// Create a new Ollama client
    pub fn new(endpoint: String, model: String, temperature: f32, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint,
            model,
            temperature,
        })
    }

    /// Base URL of the runtime, used by readiness probes
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Generation {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("Runtime error {}: {}", status, body),
            });
        }

        let result: OllamaResponse = response.json().await.map_err(|e| AppError::Generation {
            message: format!("Failed to parse response: {}", e),
        })?;

        Ok(result.response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted generator for testing and offline development.
/// Returns queued responses in order, then repeats the last one.
pub struct ScriptedGenerator {
    responses: std::sync::Mutex<Vec<String>>,
    fallback: String,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<String>) -> Self {
        let fallback = responses
            .last()
            .cloned()
            .unwrap_or_else(|| "Scripted response.".to_string());
        // Stored reversed so pop() yields them in order
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: std::sync::Mutex::new(responses),
            fallback,
        }
    }

    /// A generator that always answers with a canned explanation plus
    /// one well-formed citation line
    pub fn canned() -> Self {
        Self::new(vec![
            "This is a scripted answer for offline development.\n\n\
             Attention Is All You Need | Vaswani, Shazeer | 2017 | arXiv:1706.03762"
                .to_string(),
        ])
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        let mut responses = self.responses.lock().map_err(|_| AppError::Internal {
            message: "Scripted generator poisoned".to_string(),
        })?;
        Ok(responses.pop().unwrap_or_else(|| self.fallback.clone()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.temperature,
            config.timeout_secs,
        )?)),
        "scripted" => Ok(Arc::new(ScriptedGenerator::canned())),
        other => {
            tracing::warn!(provider = other, "Unknown LLM provider, using scripted");
            Ok(Arc::new(ScriptedGenerator::canned()))
        }
    }
}
