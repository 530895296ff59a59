//! File serving routes
//!
//! Serves stored objects (thumbnails, avatars) so local-backend URLs resolve.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::validate_key;

/// Create the files router
pub fn router() -> Router<AppState> {
    Router::new().route("/*path", get(serve_file))
}

/// Serve an object from the content store
async fn serve_file(State(state): State<AppState>, Path(path): Path<String>) -> Result<Response> {
    validate_key(&path)?;

    let bytes = state
        .store()
        .download(&path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File not found: {}", path)))?;

    let filename = path.rsplit('/').next().unwrap_or(&path);
    let length = bytes.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, guess_content_type(&path))
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", filename),
        )
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Guess content type from file extension
fn guess_content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext.to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
