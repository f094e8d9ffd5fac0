use crate::core::error::ApiError;
use crate::core::state::AppState;
use crate::models::api::{ApiKeyQuery, SyncResponse, SyncStatusResponse};
use crate::utils::auth::verify_api_key;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

/// Run a reconciliation pass right now instead of waiting for the next
/// scheduled one
///
/// POST /api/torrents/sync?api_key=<key>
pub async fn force_sync_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
) -> Result<Response, ApiError> {
    // Verify API key
    if !verify_api_key(&params.api_key, &state.config.server.api_key) {
        warn!("Unauthorized sync attempt");
        return Err(ApiError::InvalidApiKey);
    }

    let processed = state.sync_service.force_sync().await?;

    info!(processed, "Manual sync completed");

    Ok((
        StatusCode::OK,
        Json(SyncResponse {
            success: true,
            processed,
        }),
    )
        .into_response())
}

/// Scheduler health signal: whether the background worker is running and
/// when a pass last completed
///
/// GET /api/sync/status
pub async fn sync_status_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(SyncStatusResponse {
            running: state.sync_service.is_running(),
            last_sync: state.sync_service.last_sync_time(),
        }),
    )
}
