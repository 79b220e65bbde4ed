//! Diagram rendering handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use paperchat_common::errors::{AppError, Result};

/// Visualization request
#[derive(Debug, Deserialize, Validate)]
pub struct VisualizationRequest {
    #[validate(length(min = 1, max = 500))]
    pub concept: String,
}

/// Visualization response
#[derive(Serialize)]
pub struct VisualizationResponse {
    pub message: String,
    /// URL path of the rendered image, relative to this server
    pub image: String,
}

/// Reject blank or oversized concepts before rendering starts
fn validate_request(request: &VisualizationRequest) -> Result<()> {
    if request.concept.trim().is_empty() {
        return Err(AppError::Validation {
            message: "No concept provided".to_string(),
            field: Some("concept".to_string()),
        });
    }
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}

/// Render a concept diagram and return its image path
pub async fn visualize(
    State(state): State<AppState>,
    Json(request): Json<VisualizationRequest>,
) -> Result<Json<VisualizationResponse>> {
    validate_request(&request)?;

    let concept = request.concept.trim();
    let output_path = Path::new(&state.config.render.image_dir)
        .join(format!("diagram_{}.png", Uuid::new_v4()));

    let written = state
        .renderer
        .generate_diagram(state.generator.as_ref(), concept, &output_path)
        .await?;

    let filename = written
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Render {
            message: "rendered image has no usable filename".to_string(),
        })?
        .to_string();

    tracing::info!(concept = %concept, image = %filename, "Diagram rendered");

    Ok(Json(VisualizationResponse {
        message: format!("Here is a visualization of: {}", concept),
        image: format!("/images/{}", filename),
    }))
}
