//! User image uploads

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::upload_image;

const AVATAR_FOLDER: &str = "avatar";

pub fn router() -> Router<AppState> {
    Router::new().route("/avatar", post(upload_avatar))
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    key: String,
    url: Option<String>,
}

/// Store a JPEG or PNG from the multipart `file` field
async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        let key = upload_image(
            state.store().as_ref(),
            data.to_vec(),
            &content_type,
            file_name.as_deref(),
            user.user_id,
            AVATAR_FOLDER,
        )
        .await?;
        let url = state.store().resolve_url(&key);

        tracing::info!(user_id = user.user_id, key = %key, "Avatar uploaded");
        return Ok(Json(UploadResponse { key, url }));
    }

    Err(AppError::BadRequest("Missing multipart field: file".to_string()))
}
