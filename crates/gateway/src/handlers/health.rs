//! Health check handlers

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
pub struct RootResponse {
    pub service: String,
    pub version: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub llm: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Service banner at the root path
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        service: "paperchat".to_string(),
        version: paperchat_common::VERSION.to_string(),
        message: "arXiv CS expert chat API. POST /chat to talk.".to_string(),
    })
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - checks that the LLM runtime answers
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let start = std::time::Instant::now();

    let llm_check = match ping_llm(&state.config.llm.endpoint).await {
        Ok(_) => CheckResult {
            status: "up".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => CheckResult {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(e.to_string()),
        },
    };

    let all_healthy = llm_check.status == "up";

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks: HealthChecks { llm: llm_check },
    })
}

/// Prometheus exposition endpoint
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

async fn ping_llm(endpoint: &str) -> Result<(), reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    client
        .get(format!("{}/api/tags", endpoint.trim_end_matches('/')))
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
