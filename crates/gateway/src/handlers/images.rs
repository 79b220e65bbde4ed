//! Rendered image serving

use axum::{
    extract::{Path as PathParam, State},
    http::header,
    response::IntoResponse,
};
use std::path::Path;

use crate::AppState;
use paperchat_common::errors::{AppError, Result};

/// Filenames are flat identifiers; anything path-like is rejected
fn validate_filename(filename: &str) -> Result<()> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(AppError::Validation {
            message: "Invalid image name".to_string(),
            field: Some("filename".to_string()),
        });
    }
    Ok(())
}

/// Serve a previously rendered diagram by filename
pub async fn get_image(
    State(state): State<AppState>,
    PathParam(filename): PathParam<String>,
) -> Result<impl IntoResponse> {
    validate_filename(&filename)?;

    let path = Path::new(&state.config.render.image_dir).join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::ImageNotFound {
            name: filename.clone(),
        })?;

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => "image/svg+xml",
        _ => "image/png",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_path_traversal_names_are_rejected() {
        for name in ["../secret", "..", "a/b.png", r"a\b.png", "..%2fetc"] {
            let err = validate_filename(name).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_flat_filenames_are_accepted() {
        for name in ["diagram_abc123.png", "diagram_abc123.svg"] {
            assert!(validate_filename(name).is_ok());
        }
    }
}
