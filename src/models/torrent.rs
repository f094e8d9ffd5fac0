use serde::{Deserialize, Serialize};

/// Lifecycle states reported by the torrent daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TorrentStatus {
    Stopped,
    CheckWait,
    Check,
    DownloadWait,
    Download,
    SeedWait,
    Seed,
    /// Only present in records written by older deployments that marked
    /// vanished torrents instead of deleting them. Daemon snapshots never
    /// carry it and the sync pass never writes it.
    Removed,
}

impl TorrentStatus {
    /// Map the daemon's numeric status codes onto the enum. Unknown codes
    /// are treated as stopped.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => TorrentStatus::Stopped,
            1 => TorrentStatus::CheckWait,
            2 => TorrentStatus::Check,
            3 => TorrentStatus::DownloadWait,
            4 => TorrentStatus::Download,
            5 => TorrentStatus::SeedWait,
            6 => TorrentStatus::Seed,
            _ => TorrentStatus::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentStatus::Stopped => "stopped",
            TorrentStatus::CheckWait => "checkWait",
            TorrentStatus::Check => "check",
            TorrentStatus::DownloadWait => "downloadWait",
            TorrentStatus::Download => "download",
            TorrentStatus::SeedWait => "seedWait",
            TorrentStatus::Seed => "seed",
            TorrentStatus::Removed => "removed",
        }
    }
}

/// Point-in-time state of one torrent as reported by the daemon. Produced
/// fresh on every snapshot fetch and never persisted directly; the sync
/// pass projects it into a stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentSnapshot {
    /// Daemon-assigned id. Stable within one daemon session, but may be
    /// reassigned after a torrent is removed and another is added.
    pub id: i64,
    /// Content hash. Empty for a magnet link whose metadata has not
    /// arrived yet.
    pub hash: String,
    pub name: String,
    pub status: TorrentStatus,
    /// Completion fraction in [0.0, 1.0].
    pub percent_done: f64,
    pub size_when_done: i64,
    pub total_size: i64,
    pub downloaded_ever: i64,
    pub uploaded_ever: i64,
    pub rate_download: i64,
    pub rate_upload: i64,
    pub upload_ratio: f64,
    /// Estimated seconds remaining; negative when unknown or complete.
    pub eta: i64,
    pub added_date: i64,
    pub done_date: Option<i64>,
    /// Daemon error code, zero when healthy.
    pub error: i64,
    pub error_string: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_maps_known_codes() {
        assert_eq!(TorrentStatus::from_code(0), TorrentStatus::Stopped);
        assert_eq!(TorrentStatus::from_code(1), TorrentStatus::CheckWait);
        assert_eq!(TorrentStatus::from_code(2), TorrentStatus::Check);
        assert_eq!(TorrentStatus::from_code(3), TorrentStatus::DownloadWait);
        assert_eq!(TorrentStatus::from_code(4), TorrentStatus::Download);
        assert_eq!(TorrentStatus::from_code(5), TorrentStatus::SeedWait);
        assert_eq!(TorrentStatus::from_code(6), TorrentStatus::Seed);
    }

    #[test]
    fn test_from_code_unknown_is_stopped() {
        assert_eq!(TorrentStatus::from_code(7), TorrentStatus::Stopped);
        assert_eq!(TorrentStatus::from_code(-1), TorrentStatus::Stopped);
        assert_eq!(TorrentStatus::from_code(99), TorrentStatus::Stopped);
    }

    #[test]
    fn test_from_code_never_yields_removed() {
        for code in -10..20 {
            assert_ne!(TorrentStatus::from_code(code), TorrentStatus::Removed);
        }
    }

    #[test]
    fn test_status_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&TorrentStatus::DownloadWait).unwrap(),
            "\"downloadWait\""
        );
        assert_eq!(
            serde_json::to_string(&TorrentStatus::Seed).unwrap(),
            "\"seed\""
        );
    }

    #[test]
    fn test_legacy_removed_status_still_parses() {
        let status: TorrentStatus = serde_json::from_str("\"removed\"").unwrap();
        assert_eq!(status, TorrentStatus::Removed);
    }

    #[test]
    fn test_as_str_matches_serde_names() {
        for status in [
            TorrentStatus::Stopped,
            TorrentStatus::CheckWait,
            TorrentStatus::Check,
            TorrentStatus::DownloadWait,
            TorrentStatus::Download,
            TorrentStatus::SeedWait,
            TorrentStatus::Seed,
            TorrentStatus::Removed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_snapshot_serializes_camel_case_fields() {
        let snapshot = TorrentSnapshot {
            id: 3,
            hash: "abc123".to_string(),
            name: "test.iso".to_string(),
            status: TorrentStatus::Download,
            percent_done: 0.5,
            size_when_done: 2048,
            total_size: 2048,
            downloaded_ever: 1024,
            uploaded_ever: 0,
            rate_download: 100,
            rate_upload: 0,
            upload_ratio: 0.0,
            eta: 10,
            added_date: 1700000000,
            done_date: None,
            error: 0,
            error_string: String::new(),
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["percentDone"], 0.5);
        assert_eq!(value["sizeWhenDone"], 2048);
        assert_eq!(value["rateDownload"], 100);
        assert_eq!(value["errorString"], "");
        assert!(value["doneDate"].is_null());
    }
}
