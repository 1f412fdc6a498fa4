use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{downloads, handlers, livestreams, middleware::metrics_middleware, rpc, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // REST routes
    let api_routes = Router::new()
        // Health, config and the executable
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/version", get(handlers::version))
        .route("/update", post(handlers::update))
        .route("/queue", get(handlers::queue_status))
        // Downloads
        .route("/downloads", post(downloads::submit))
        .route("/downloads", get(downloads::list))
        .route("/downloads/ids", get(downloads::list_ids))
        .route("/downloads/playlist", post(downloads::submit_playlist))
        .route("/downloads/livestream", post(downloads::submit_livestream))
        .route("/downloads/kill", post(downloads::kill_all))
        .route("/downloads/{id}", get(downloads::progress))
        .route("/downloads/{id}", delete(downloads::clear))
        .route("/downloads/{id}/kill", post(downloads::kill))
        .route("/formats", get(downloads::formats))
        // Livestreams
        .route("/livestreams", get(livestreams::status))
        .route("/livestreams", delete(livestreams::kill_all))
        .route("/livestreams/kill", post(livestreams::kill));

    // JSON-RPC transports
    let rpc_routes = Router::new()
        .route("/http", post(rpc::rpc_http))
        .route("/ws", get(ws::rpc_ws));

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/rpc", rpc_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
