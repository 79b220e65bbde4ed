//! Configuration management for the PaperChat backend
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/<env>.toml, config/local.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// LLM runtime configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// External paper tool configuration
    #[serde(default)]
    pub paper_tool: PaperToolConfig,

    /// Diagram rendering configuration
    #[serde(default)]
    pub render: RenderConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Generation provider: ollama, scripted
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Base URL of the Ollama runtime
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds (generation can be slow)
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaperToolConfig {
    /// Executable invoked once per tool call
    #[serde(default = "default_tool_command")]
    pub command: String,

    /// Directory handed to the tool for downloaded papers.
    /// Defaults to a subdirectory of the system temp dir.
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Graphviz binary used to render DOT output
    #[serde(default = "default_dot_binary")]
    pub dot_binary: String,

    /// Directory where generated images are written and served from
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_shutdown_timeout() -> u64 {
    30
}
fn default_llm_provider() -> String {
    "ollama".to_string()
}
fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    crate::DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f32 {
    crate::DEFAULT_TEMPERATURE
}
fn default_llm_timeout() -> u64 {
    300
}
fn default_tool_command() -> String {
    "arxiv-mcp-server".to_string()
}
fn default_dot_binary() -> String {
    "dot".to_string()
}
fn default_image_dir() -> String {
    "static/images".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8001
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Storage directory for the paper tool, falling back to the temp dir
    pub fn paper_storage_path(&self) -> std::path::PathBuf {
        match &self.paper_tool.storage_path {
            Some(p) => std::path::PathBuf::from(p),
            None => std::env::temp_dir().join("arxiv-papers"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for PaperToolConfig {
    fn default() -> Self {
        Self {
            command: default_tool_command(),
            storage_path: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dot_binary: default_dot_binary(),
            image_dir: default_image_dir(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
            paper_tool: PaperToolConfig::default(),
            render: RenderConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.llm.model, "llama3.1:8b");
        assert_eq!(config.paper_tool.command, "arxiv-mcp-server");
    }

    #[test]
    fn test_storage_path_fallback() {
        let config = AppConfig::default();
        assert!(config.paper_storage_path().ends_with("arxiv-papers"));
    }
}
