use crate::core::error::{ApiError, SyncError};
use crate::core::state::AppState;
use crate::daemon::DaemonClient;
use crate::models::api::{
    ActionRequest, AddTorrentRequest, AddTorrentResponse, ApiKeyQuery, RemoveTorrentsRequest,
    SuccessResponse, TorrentListResponse,
};
use crate::store::TorrentStore;
use crate::utils::auth::verify_api_key;
use crate::utils::base64::normalize_base64;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// List all stored torrent records
///
/// GET /api/torrents
pub async fn list_torrents_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let mut torrents = state
        .store
        .list()
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    // Newest first; record id breaks added_date ties so the order is stable
    torrents.sort_by(|a, b| b.added_date.cmp(&a.added_date).then_with(|| a.id.cmp(&b.id)));

    Ok((
        StatusCode::OK,
        Json(TorrentListResponse {
            success: true,
            count: torrents.len(),
            torrents,
        }),
    )
        .into_response())
}

/// Add a torrent to the daemon
///
/// POST /api/torrents/add?api_key=<key>
/// Body: {"torrent": <magnet link or base64 file>, "downloadDir": ..., "autoStart": ...}
pub async fn add_torrent_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
    Json(request): Json<AddTorrentRequest>,
) -> Result<Response, ApiError> {
    // Verify API key
    if !verify_api_key(&params.api_key, &state.config.server.api_key) {
        warn!("Unauthorized torrent add attempt");
        return Err(ApiError::InvalidApiKey);
    }

    if request.torrent.is_empty() {
        return Err(ApiError::InvalidParameter(
            "Torrent data is required".to_string(),
        ));
    }

    // Magnet links pass through untouched; anything else must be valid
    // base64 torrent-file data
    let torrent = if request.torrent.starts_with("magnet:") {
        request.torrent.clone()
    } else {
        normalize_base64(&request.torrent)
            .map_err(|_| ApiError::InvalidParameter("Invalid base64 torrent data".to_string()))?
    };

    let added = state
        .daemon
        .add_torrent(&torrent, request.download_dir.as_deref())
        .await
        .map_err(|e| ApiError::DaemonError(e.to_string()))?;

    // Torrents are added paused; auto-start is best-effort and never fails
    // the request
    if request.auto_start == Some(true) {
        if let Err(e) = state.daemon.start_torrents(&[added.id]).await {
            warn!(daemon_id = added.id, error = %e, "Failed to auto-start torrent");
        }
    }

    trigger_sync(&state, "add").await;

    info!(
        daemon_id = added.id,
        name = %added.name,
        "Torrent added"
    );

    Ok((
        StatusCode::OK,
        Json(AddTorrentResponse {
            success: true,
            daemon_id: added.id,
            message: "Torrent added successfully".to_string(),
        }),
    )
        .into_response())
}

/// Remove torrents from the daemon
///
/// POST /api/torrents/remove?api_key=<key>
/// Body: {"ids": [...], "deleteLocalData": ...}
pub async fn remove_torrents_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ApiKeyQuery>,
    Json(request): Json<RemoveTorrentsRequest>,
) -> Result<Response, ApiError> {
    // Verify API key
    if !verify_api_key(&params.api_key, &state.config.server.api_key) {
        warn!("Unauthorized torrent remove attempt");
        return Err(ApiError::InvalidApiKey);
    }

    if request.ids.is_empty() {
        return Err(ApiError::InvalidParameter(
            "At least one torrent ID is required".to_string(),
        ));
    }

    let delete_local_data = request.delete_local_data.unwrap_or(false);

    state
        .daemon
        .remove_torrents(&request.ids, delete_local_data)
        .await
        .map_err(|e| ApiError::DaemonError(e.to_string()))?;

    trigger_sync(&state, "remove").await;

    info!(
        ids = ?request.ids,
        delete_local_data,
        "Torrents removed"
    );

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: format!("Successfully removed {} torrent(s)", request.ids.len()),
        }),
    )
        .into_response())
}

/// Start, stop or remove a single torrent
///
/// POST /api/torrents/{id}/action?api_key=<key>
/// Body: {"action": "start"|"stop"|"remove", "params": {...}}
///
/// The path id is either a numeric daemon id or a stored record id.
pub async fn torrent_action_handler(
    State(state): State<Arc<AppState>>,
    Path(torrent_id): Path<String>,
    Query(params): Query<ApiKeyQuery>,
    Json(request): Json<ActionRequest>,
) -> Result<Response, ApiError> {
    // Verify API key
    if !verify_api_key(&params.api_key, &state.config.server.api_key) {
        warn!("Unauthorized torrent action attempt");
        return Err(ApiError::InvalidApiKey);
    }

    let daemon_id = resolve_daemon_id(&state, &torrent_id).await?;

    match request.action.as_str() {
        "start" => {
            state
                .daemon
                .start_torrents(&[daemon_id])
                .await
                .map_err(|e| ApiError::DaemonError(e.to_string()))?;
        }
        "stop" => {
            state
                .daemon
                .stop_torrents(&[daemon_id])
                .await
                .map_err(|e| ApiError::DaemonError(e.to_string()))?;
        }
        "remove" => {
            let delete_local_data = request
                .params
                .as_ref()
                .and_then(|p| p.delete_local_data)
                .unwrap_or(false);
            state
                .daemon
                .remove_torrents(&[daemon_id], delete_local_data)
                .await
                .map_err(|e| ApiError::DaemonError(e.to_string()))?;
        }
        other => {
            return Err(ApiError::InvalidParameter(format!(
                "Invalid action: {}",
                other
            )));
        }
    }

    trigger_sync(&state, &request.action).await;

    info!(
        daemon_id,
        action = %request.action,
        "Torrent action performed"
    );

    Ok((
        StatusCode::OK,
        Json(SuccessResponse {
            success: true,
            message: format!("Torrent {} successful", request.action),
        }),
    )
        .into_response())
}

/// Map a path id to a daemon id. Numeric ids are used as-is; anything else
/// is looked up as a stored record id.
async fn resolve_daemon_id(state: &AppState, torrent_id: &str) -> Result<i64, ApiError> {
    if let Ok(id) = torrent_id.parse::<i64>() {
        return Ok(id);
    }

    let record = state
        .store
        .get(torrent_id)
        .await
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Torrent not found".to_string()))?;

    if record.daemon_id == 0 {
        return Err(ApiError::InvalidParameter(
            "Record has no daemon id".to_string(),
        ));
    }

    Ok(record.daemon_id)
}

/// Refresh the record set after a daemon mutation. Losing the race against
/// the scheduled pass is normal; any other failure is logged and the
/// request that triggered the sync still succeeds.
async fn trigger_sync(state: &AppState, operation: &str) {
    match state.sync_service.force_sync().await {
        Ok(_) => {}
        Err(SyncError::AlreadyRunning) => {
            debug!(operation, "Sync already in progress, skipping follow-up pass");
        }
        Err(e) => {
            warn!(operation, error = %e, "Failed to sync after torrent operation");
        }
    }
}
