//! Saved paper routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::auth::AuthUser;
use crate::db::{CreatePaper, Paper, PaperRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the papers router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_papers).post(create_paper))
        .route("/:id", get(get_paper))
}

/// Save a paper and attach its first-page thumbnail.
///
/// The thumbnail is best effort: the paper is kept when it cannot be produced.
async fn create_paper(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<CreatePaper>,
) -> Result<(StatusCode, Json<Paper>)> {
    let repo = PaperRepository::new(state.db());
    let mut paper = repo.create(user.user_id, &data).await?;

    let config = state.thumbnails().config();
    let thumbnail = state
        .thumbnails()
        .get_or_create(&paper.pdf_url, user.user_id, config.width, &config.folder)
        .await;

    match thumbnail {
        Some(url) => match repo.set_thumbnail_url(paper.id, &url).await {
            Ok(_) => paper.thumbnail_url = Some(url),
            Err(e) => {
                tracing::warn!(arxiv_id = %paper.arxiv_id, "Failed to record thumbnail: {}", e);
            }
        },
        None => {
            tracing::warn!(arxiv_id = %paper.arxiv_id, "Thumbnail generation failed");
        }
    }

    tracing::info!(user_id = user.user_id, arxiv_id = %paper.arxiv_id, "Paper saved");
    Ok((StatusCode::CREATED, Json(paper)))
}

/// List the caller's papers
async fn list_papers(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Paper>>> {
    let repo = PaperRepository::new(state.db());
    Ok(Json(repo.list_for_user(user.user_id).await?))
}

/// Get one of the caller's papers
async fn get_paper(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Paper>> {
    let repo = PaperRepository::new(state.db());
    repo.get(id, user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Paper {} not found", id)))
}
