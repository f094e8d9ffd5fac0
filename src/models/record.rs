use crate::models::torrent::TorrentStatus;
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of store-assigned record identifiers.
const RECORD_ID_LEN: usize = 15;

/// Durable projection of the latest daemon snapshot for one torrent, plus
/// store bookkeeping. One record per torrent the daemon reports; the sync
/// pass keeps the set converged with the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentRecord {
    /// Store-assigned identifier, fixed at creation.
    pub id: String,
    /// Daemon-assigned id as of the last sync pass. Used as the fallback
    /// identity while a torrent has no content hash yet.
    pub daemon_id: i64,
    pub name: String,
    /// Content hash, or a deterministic placeholder while the real hash is
    /// unknown. Never empty; unique across all records.
    pub hash: String,
    pub status: TorrentStatus,
    pub percent_done: f64,
    pub size_when_done: i64,
    pub total_size: i64,
    pub downloaded_ever: i64,
    pub uploaded_ever: i64,
    pub rate_download: i64,
    pub rate_upload: i64,
    pub upload_ratio: f64,
    pub eta: i64,
    pub added_date: i64,
    /// Completion time, set once when the torrent first finishes.
    pub done_date: Option<i64>,
    pub error: i64,
    pub error_string: String,
    /// Owning user reference; unset for records created by the sync pass.
    pub user: Option<String>,
    /// Verbatim copy of the last daemon snapshot, kept so fields this
    /// schema does not model are not lost.
    pub snapshot: serde_json::Value,
    pub created: i64,
    pub updated: i64,
}

/// Generate a fresh record id: random alphanumeric characters, fixed
/// length.
pub fn generate_record_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(RECORD_ID_LEN)
        .map(char::from)
        .collect()
}
