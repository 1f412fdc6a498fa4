use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use mediaq_core::{QueueStatus, SanitizedConfig};

use super::error::{service_error, ApiError};
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// Server version.
    pub server: String,
    /// Version reported by the downloader executable.
    pub downloader: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub output: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn version(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VersionResponse>, ApiError> {
    let downloader = state.service().version().await.map_err(service_error)?;
    Ok(Json(VersionResponse {
        server: env!("CARGO_PKG_VERSION").to_string(),
        downloader,
    }))
}

/// Run the downloader's self-update.
pub async fn update(State(state): State<Arc<AppState>>) -> Result<Json<UpdateResponse>, ApiError> {
    info!("Updating downloader executable");
    let output = state
        .service()
        .update_executable()
        .await
        .map_err(service_error)?;
    Ok(Json(UpdateResponse { output }))
}

pub async fn queue_status(State(state): State<Arc<AppState>>) -> Json<QueueStatus> {
    Json(state.service().queue_status())
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
