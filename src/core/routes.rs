// HTTP routes configuration

use crate::core::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Public endpoints
        .route("/health", get(crate::handlers::health::health_handler))
        .route("/api/torrents", get(crate::handlers::torrents::list_torrents_handler))
        .route("/api/sync/status", get(crate::handlers::sync::sync_status_handler))

        // Torrent operations (require API key)
        .route("/api/torrents/add", post(crate::handlers::torrents::add_torrent_handler))
        .route("/api/torrents/remove", post(crate::handlers::torrents::remove_torrents_handler))
        .route("/api/torrents/{id}/action", post(crate::handlers::torrents::torrent_action_handler))

        // Sync and monitoring (require API key)
        .route("/api/torrents/sync", post(crate::handlers::sync::force_sync_handler))
        .route("/metrics", get(crate::handlers::metrics::metrics_handler))

        // 404 fallback for all unmatched routes
        .fallback(crate::handlers::fallback::fallback_handler)

        .with_state(state)
}
