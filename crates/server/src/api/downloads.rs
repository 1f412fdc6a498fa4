//! Download job handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use mediaq_core::{DownloadProgress, DownloadRequest, FormatsInfo, JobSummary};

use super::error::{bad_request, service_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for a single submission
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
}

/// Response for a playlist submission
#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub ids: Vec<String>,
}

/// Request body for watching a livestream
#[derive(Debug, Deserialize)]
pub struct LivestreamBody {
    pub url: String,
}

/// Response for killing every job
#[derive(Debug, Serialize)]
pub struct KillAllResponse {
    pub stopped: usize,
}

/// Query parameters for format listings
#[derive(Debug, Deserialize)]
pub struct FormatsParams {
    pub url: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Queue a single download
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let id = state.service().submit(request).await.map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

/// Queue every entry of a playlist, or the item itself for single sources
pub async fn submit_playlist(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<(StatusCode, Json<PlaylistResponse>), ApiError> {
    let ids = state
        .service()
        .submit_playlist(request)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(PlaylistResponse { ids })))
}

/// Watch an upcoming livestream
pub async fn submit_livestream(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LivestreamBody>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let id = state
        .service()
        .submit_livestream(&body.url)
        .await
        .map_err(service_error)?;
    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.service().list().await)
}

pub async fn list_ids(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.service().list_ids().await)
}

/// Progress of one job
pub async fn progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DownloadProgress>, ApiError> {
    let progress = state.service().progress(&id).await.map_err(service_error)?;
    Ok(Json(progress))
}

pub async fn kill(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    info!("Kill requested for {}", id);
    state.service().kill(&id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn kill_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<KillAllResponse>, ApiError> {
    let stopped = state.service().kill_all().await.map_err(service_error)?;
    Ok(Json(KillAllResponse { stopped }))
}

/// Forget a job, stopping it first if it is running
pub async fn clear(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service().clear(&id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn formats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FormatsParams>,
) -> Result<Json<FormatsInfo>, ApiError> {
    let Some(url) = params.url else {
        return Err(bad_request("url query parameter is required"));
    };
    let formats = state.service().formats(&url).await.map_err(service_error)?;
    Ok(Json(formats))
}
