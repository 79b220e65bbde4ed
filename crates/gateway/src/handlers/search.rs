//! Paper search handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use paperchat_common::{
    arxiv::{PaperRecord, PaperTool},
    errors::{AppError, Result},
};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    /// Maximum results to return
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    10
}

/// Search response
#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<PaperRecord>,
    pub processing_time_ms: u64,
}

/// Search arXiv through the paper tool
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    if request.max_results == 0 || request.max_results > 50 {
        return Err(AppError::Validation {
            message: "max_results must be between 1 and 50".to_string(),
            field: Some("max_results".to_string()),
        });
    }

    let results = state
        .paper_tool
        .search(&request.query, request.max_results)
        .await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query = %request.query,
        results = results.len(),
        latency_ms = processing_time_ms,
        "Paper search completed"
    );

    Ok(Json(SearchResponse {
        query: request.query,
        total_results: results.len(),
        results,
        processing_time_ms,
    }))
}
