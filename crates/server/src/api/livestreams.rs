//! Livestream watch-list handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::collections::HashMap;
use std::sync::Arc;

use mediaq_core::LivestreamStatus;

use super::downloads::LivestreamBody;
use super::error::{service_error, ApiError};
use crate::state::AppState;

/// Status of every watched stream, keyed by URL
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Json<HashMap<String, LivestreamStatus>> {
    Json(state.service().livestream_status().await)
}

pub async fn kill(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LivestreamBody>,
) -> Result<StatusCode, ApiError> {
    state
        .service()
        .kill_livestream(&body.url)
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn kill_all(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state
        .service()
        .kill_all_livestreams()
        .await
        .map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}
