// Metrics endpoint

use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::api::ApiKeyQuery;
use crate::store::TorrentStore;
use crate::utils::auth::verify_api_key;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::warn;

/// Returns JSON with all sync statistics including:
/// - Pass counts, failure counts, success rate
/// - Records created/updated/deleted
/// - Stored torrent count, scheduler state, last sync time
/// - Uptime
///
/// Requires valid API key for authentication.
pub async fn metrics_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    if !verify_api_key(&params.api_key, &state.config.server.api_key) {
        warn!("Unauthorized metrics access attempt");
        return Err(ApiError::InvalidApiKey);
    }

    let snapshot = state.metrics.get_snapshot(
        state.store.count().await,
        state.sync_service.is_running(),
        state.sync_service.last_sync_time(),
    );

    Ok((StatusCode::OK, Json(snapshot)).into_response())
}
