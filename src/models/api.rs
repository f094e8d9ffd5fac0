use crate::models::record::TorrentRecord;
use serde::{Deserialize, Serialize};

/// Query parameters for endpoints guarded by the API key.
#[derive(Deserialize)]
pub struct ApiKeyQuery {
    pub api_key: String,
}

/// Body of POST /api/torrents/add.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTorrentRequest {
    /// Magnet link or base64-encoded torrent file contents.
    pub torrent: String,
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub auto_start: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTorrentResponse {
    pub success: bool,
    pub daemon_id: i64,
    pub message: String,
}

/// Body of POST /api/torrents/remove.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTorrentsRequest {
    /// Daemon ids of the torrents to remove. Must be non-empty.
    pub ids: Vec<i64>,
    #[serde(default)]
    pub delete_local_data: Option<bool>,
}

/// Body of POST /api/torrents/{id}/action.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// One of "start", "stop" or "remove".
    pub action: String,
    #[serde(default)]
    pub params: Option<ActionParams>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionParams {
    #[serde(default)]
    pub delete_local_data: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TorrentListResponse {
    pub success: bool,
    pub count: usize,
    pub torrents: Vec<TorrentRecord>,
}

/// Body returned by POST /api/torrents/sync: how many snapshot torrents the
/// pass processed.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub success: bool,
    pub processed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    pub running: bool,
    pub last_sync: Option<i64>,
}
