//! arXiv search, topic feeds and thumbnail routes

use std::str::FromStr;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::arxiv::{ArxivEntry, PageOptions, SortBy, SortOrder};
use crate::auth::AuthUser;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::validate_folder;
use crate::thumbnail::{BulkOptions, ThumbnailMode};

/// Create the arXiv router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/feed", get(feed))
        .route("/feed/string", get(feed_string))
        .route("/thumbnail", post(create_thumbnail).delete(delete_thumbnail))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    search_query: String,
    #[serde(default)]
    start: u32,
    #[serde(default = "default_max_results")]
    max_results: u32,
    sort_by: Option<SortBy>,
    sort_order: Option<SortOrder>,
}

fn default_max_results() -> u32 {
    10
}

/// Feed query options. Parsed from raw pairs because `topics` repeats.
#[derive(Debug, Default)]
struct FeedQuery {
    topics: Option<Vec<String>>,
    topics_csv: Option<String>,
    page: PageOptions,
    include_thumbnails: bool,
    max_thumbnail_concurrency: Option<usize>,
    thumbnail_timeout_sec: Option<u64>,
}

impl FeedQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Result<Self> {
        let mut query = FeedQuery::default();

        for (name, value) in pairs {
            match name.as_str() {
                "topics" => query.topics.get_or_insert_with(Vec::new).push(value),
                "topics_csv" => query.topics_csv = Some(value),
                "start" => query.page.start = parse_param(&name, &value)?,
                "max_results" => query.page.max_results = parse_param(&name, &value)?,
                "sort_by" => query.page.sort_by = Some(parse_param(&name, &value)?),
                "sort_order" => query.page.sort_order = Some(parse_param(&name, &value)?),
                "include_thumbnails" => query.include_thumbnails = parse_flag(&name, &value)?,
                "max_thumbnail_concurrency" => {
                    query.max_thumbnail_concurrency = Some(parse_param(&name, &value)?)
                }
                "thumbnail_timeout_sec" => {
                    query.thumbnail_timeout_sec = Some(parse_param(&name, &value)?)
                }
                _ => {}
            }
        }

        Ok(query)
    }

    /// Bulk options for this request, clamped to the configured ceilings
    fn bulk_options(&self, state: &AppState) -> BulkOptions {
        let config = state.thumbnails().config();
        let mode = if self.include_thumbnails {
            ThumbnailMode::Eager
        } else {
            ThumbnailMode::Lazy
        };

        let mut options = BulkOptions::from_config(config, mode);
        if let Some(limit) = self.max_thumbnail_concurrency {
            options.concurrency_limit = limit;
        }
        options.concurrency_limit = options
            .concurrency_limit
            .clamp(1, config.max_concurrency.max(1));

        if let Some(secs) = self.thumbnail_timeout_sec {
            options.per_item_timeout =
                Duration::from_secs(secs.clamp(1, config.max_timeout_secs.max(1)));
        }
        options
    }
}

fn parse_param<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid value for {}: {}", name, value)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::BadRequest(format!("Invalid value for {}: {}", name, value))),
    }
}

fn check_max_results(state: &AppState, max_results: u32) -> Result<()> {
    let limit = state.config().arxiv.max_results;
    if max_results > limit {
        return Err(AppError::BadRequest(format!(
            "max_results must be at most {}",
            limit
        )));
    }
    Ok(())
}

/// Search arXiv with a raw query
async fn search(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ArxivEntry>>> {
    check_max_results(&state, params.max_results)?;

    let page = PageOptions {
        start: params.start,
        max_results: params.max_results,
        sort_by: params.sort_by,
        sort_order: params.sort_order,
    };
    let entries = state.arxiv().search(&params.search_query, &page).await?;
    Ok(Json(entries))
}

/// Feed for repeated `topics` parameters, OR-combined
async fn feed(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ArxivEntry>>> {
    let query = FeedQuery::from_pairs(pairs)?;
    let topics = query
        .topics
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("topics is required".to_string()))?;
    check_max_results(&state, query.page.max_results)?;

    let entries = state.arxiv().feed_by_topics(topics, &query.page).await?;
    Ok(Json(with_thumbnails(&state, entries, user.user_id, &query).await))
}

/// Feed for a comma separated `topics_csv` parameter
async fn feed_string(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<ArxivEntry>>> {
    let query = FeedQuery::from_pairs(pairs)?;
    let topics_csv = query
        .topics_csv
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("topics_csv is required".to_string()))?;
    check_max_results(&state, query.page.max_results)?;

    let entries = state
        .arxiv()
        .feed_by_topic_string(topics_csv, &query.page)
        .await?;
    Ok(Json(with_thumbnails(&state, entries, user.user_id, &query).await))
}

async fn with_thumbnails(
    state: &AppState,
    entries: Vec<ArxivEntry>,
    user_id: i64,
    query: &FeedQuery,
) -> Vec<ArxivEntry> {
    if entries.is_empty() {
        return entries;
    }
    let options = query.bulk_options(state);
    state
        .thumbnails()
        .populate_thumbnails(entries, user_id, &options)
        .await
}

#[derive(Debug, Deserialize)]
struct ThumbnailRequest {
    pdf_url: String,
    target_width: Option<i64>,
    folder: Option<String>,
}

#[derive(Debug, Serialize)]
struct ThumbnailResponse {
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InvalidateParams {
    pdf_url: String,
    folder: Option<String>,
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
    deleted: bool,
}

fn resolve_folder(state: &AppState, folder: Option<String>) -> Result<String> {
    let folder = folder.unwrap_or_else(|| state.thumbnails().config().folder.clone());
    validate_folder(&folder)
        .map_err(|_| AppError::BadRequest(format!("Invalid folder: {}", folder)))?;
    Ok(folder)
}

/// Get or generate the thumbnail for one PDF
async fn create_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ThumbnailRequest>,
) -> Result<Json<ThumbnailResponse>> {
    let width = request
        .target_width
        .unwrap_or(i64::from(state.thumbnails().config().width));
    let width = u32::try_from(width)
        .ok()
        .filter(|w| *w > 0)
        .ok_or_else(|| AppError::BadRequest("target_width must be positive".to_string()))?;
    let folder = resolve_folder(&state, request.folder)?;

    let url = state
        .thumbnails()
        .get_or_create(&request.pdf_url, user.user_id, width, &folder)
        .await
        .ok_or_else(|| AppError::BadRequest("Unable to generate thumbnail".to_string()))?;

    Ok(Json(ThumbnailResponse {
        thumbnail_url: Some(url),
    }))
}

/// Drop a cached thumbnail so the next request renders it again
async fn delete_thumbnail(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<InvalidateParams>,
) -> Result<Json<InvalidateResponse>> {
    let folder = resolve_folder(&state, params.folder)?;
    let deleted = state
        .thumbnails()
        .invalidate(&params.pdf_url, user.user_id, &folder)
        .await;

    Ok(Json(InvalidateResponse { deleted }))
}
