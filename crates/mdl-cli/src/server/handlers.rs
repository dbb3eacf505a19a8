//! Handlers for the `/api` routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use mdl_core::url_model::{non_blank_urls, normalize_source_url};
use mdl_core::{files, ConcurrencyLimitReached, DownloadOptions};

use super::error::{ApiError, ApiResult};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct InfoRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default)]
    pub options: Option<DownloadOptions>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub urls: Vec<String>,
    #[serde(default)]
    pub options: Option<DownloadOptions>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub filename: String,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "message": "Media download service",
    }))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "downloads_dir": state.downloads_dir.display().to_string(),
        "active_downloads": state.manager.active_count(),
        "max_concurrent_downloads": state.manager.ceiling(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/info
// ---------------------------------------------------------------------------

/// Fetch metadata for one URL. The engine call blocks, so it runs off the
/// async workers.
pub async fn info(
    State(state): State<AppState>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let url = normalize_source_url(&req.url)?;
    let engine = Arc::clone(state.manager.engine());
    let info = tokio::task::spawn_blocking(move || engine.fetch_info(&url)).await??;
    Ok(Json(json!({ "success": true, "info": info })))
}

// ---------------------------------------------------------------------------
// POST /api/download
// ---------------------------------------------------------------------------

pub async fn start_download(
    State(state): State<AppState>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let url = normalize_source_url(&req.url)?;
    let task_id = state
        .manager
        .submit(&url, req.options.unwrap_or_default())?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "task_id": task_id })),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/download/batch
// ---------------------------------------------------------------------------

/// Submit several URLs with shared options. URLs past the ceiling are
/// counted in `skipped` rather than failing the request. If a task fails to
/// start after others were admitted, the admitted ids are still returned
/// along with the failure in `failed`.
pub async fn start_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let urls = non_blank_urls(req.urls.iter().map(String::as_str));
    if urls.is_empty() {
        return Err(ApiError::BadRequest("no URLs supplied".to_string()));
    }
    let urls = urls
        .iter()
        .map(|u| normalize_source_url(u))
        .collect::<Result<Vec<_>, _>>()?;

    let options = req.options.unwrap_or_default();
    let batch = state.manager.submit_batch(&urls, &options);
    if batch.task_ids.is_empty() {
        if let Some(err) = batch.failed {
            return Err(err.into());
        }
        return Err(ApiError::Busy(ConcurrencyLimitReached {
            active: state.manager.active_count(),
            ceiling: state.manager.ceiling(),
        }));
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "task_ids": batch.task_ids,
            "skipped": batch.skipped,
            "failed": batch.failed.as_ref().map(ToString::to_string),
        })),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/progress/{task_id}
// ---------------------------------------------------------------------------

pub async fn progress(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .manager
        .status(&task_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

// ---------------------------------------------------------------------------
// GET /api/downloads
// ---------------------------------------------------------------------------

pub async fn list_files(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let dir = Arc::clone(&state.downloads_dir);
    let files = tokio::task::spawn_blocking(move || files::list_downloads(&dir)).await??;
    Ok(Json(json!({ "success": true, "files": files })))
}

// ---------------------------------------------------------------------------
// POST /api/delete
// ---------------------------------------------------------------------------

pub async fn delete_file(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let dir = Arc::clone(&state.downloads_dir);
    tokio::task::spawn_blocking(move || files::delete_download(&dir, &req.filename)).await??;
    Ok(Json(json!({ "success": true })))
}
