use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::DaemonConfig;
use crate::daemon::mock::MockClient;
use crate::daemon::rpc::RpcClient;
use crate::daemon::DaemonClient;
use crate::store::memory::MemoryStore;
use crate::store::TorrentStore;
use crate::wal::wal::{Wal, WalEntry};

/// How long the startup connectivity probe waits for the daemon.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Rebuild the record store from the write-ahead log, then compact the log
/// down to one save per surviving record.
pub async fn restore_from_wal(wal: &Wal, store: &MemoryStore) -> Result<usize> {
    let entries = wal.replay().context("Failed to replay WAL")?;
    let replayed = entries.len();
    store.apply(&entries);

    let records = store.list().await?;
    let compacted: Vec<WalEntry> = records
        .into_iter()
        .map(|record| WalEntry::Save { record })
        .collect();
    wal.rewrite(&compacted)
        .context("Failed to compact WAL after replay")?;

    info!(
        entries_replayed = replayed,
        records_restored = compacted.len(),
        "Record store restored from WAL"
    );
    Ok(compacted.len())
}

/// Pick the daemon client for this process: the real JSON-RPC client when
/// it answers a probe, otherwise the simulated daemon. With the fallback
/// disabled an unreachable daemon fails startup instead.
pub async fn select_daemon_client(config: &DaemonConfig) -> Result<Arc<dyn DaemonClient>> {
    match RpcClient::new(
        config.url.clone(),
        config.username.clone(),
        config.password.clone(),
    ) {
        Ok(client) => {
            match tokio::time::timeout(PROBE_TIMEOUT, client.get_torrents()).await {
                Ok(Ok(torrents)) => {
                    info!(
                        url = %config.url,
                        torrents = torrents.len(),
                        "Connected to torrent daemon"
                    );
                    return Ok(Arc::new(client));
                }
                Ok(Err(e)) => {
                    warn!(url = %config.url, error = %e, "Torrent daemon probe failed");
                }
                Err(_) => {
                    warn!(url = %config.url, "Torrent daemon probe timed out");
                }
            }
        }
        Err(e) => {
            warn!(url = %config.url, error = %e, "Failed to build daemon client");
        }
    }

    if !config.mock_fallback {
        bail!(
            "torrent daemon at {} is unreachable and mock_fallback is disabled",
            config.url
        );
    }

    warn!("Falling back to simulated daemon with demo data");
    Ok(Arc::new(MockClient::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::TorrentRecord;
    use crate::models::torrent::TorrentStatus;
    use tempfile::TempDir;

    fn create_test_record(id: &str, hash: &str) -> TorrentRecord {
        TorrentRecord {
            id: id.to_string(),
            daemon_id: 1,
            name: "restored torrent".to_string(),
            hash: hash.to_string(),
            status: TorrentStatus::Seed,
            percent_done: 1.0,
            size_when_done: 2048,
            total_size: 2048,
            downloaded_ever: 2048,
            uploaded_ever: 512,
            rate_download: 0,
            rate_upload: 0,
            upload_ratio: 0.25,
            eta: -1,
            added_date: 1700000000,
            done_date: Some(1700000500),
            error: 0,
            error_string: String::new(),
            user: None,
            snapshot: serde_json::Value::Null,
            created: 1700000000,
            updated: 1700000500,
        }
    }

    #[tokio::test]
    async fn test_restore_from_wal_rebuilds_records() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Wal::new(temp_dir.path().join("records.wal")).unwrap();
        wal.append(&WalEntry::Save {
            record: create_test_record("r1", "hash1"),
        })
        .unwrap();
        wal.append(&WalEntry::Save {
            record: create_test_record("r2", "hash2"),
        })
        .unwrap();

        let store = MemoryStore::new(None);
        let restored = restore_from_wal(&wal, &store).await.unwrap();

        assert_eq!(restored, 2);
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn test_restore_drops_deleted_records_and_compacts() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Wal::new(temp_dir.path().join("records.wal")).unwrap();
        wal.append(&WalEntry::Save {
            record: create_test_record("r1", "hash1"),
        })
        .unwrap();
        wal.append(&WalEntry::Save {
            record: create_test_record("r2", "hash2"),
        })
        .unwrap();
        wal.append(&WalEntry::Delete {
            id: "r1".to_string(),
        })
        .unwrap();

        let store = MemoryStore::new(None);
        let restored = restore_from_wal(&wal, &store).await.unwrap();

        assert_eq!(restored, 1);
        assert!(store.get("r2").await.unwrap().is_some());
        assert!(store.get("r1").await.unwrap().is_none());

        // Compaction leaves exactly one save per live record.
        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0], WalEntry::Save { record } if record.id == "r2"));
    }

    #[tokio::test]
    async fn test_select_daemon_falls_back_to_mock() {
        let config = DaemonConfig {
            // Nothing listens on the discard port.
            url: "http://127.0.0.1:9/transmission/rpc".to_string(),
            username: String::new(),
            password: String::new(),
            mock_fallback: true,
        };

        let client = select_daemon_client(&config).await.unwrap();
        let torrents = client.get_torrents().await.unwrap();
        assert!(!torrents.is_empty());
    }

    #[tokio::test]
    async fn test_select_daemon_fails_without_fallback() {
        let config = DaemonConfig {
            url: "http://127.0.0.1:9/transmission/rpc".to_string(),
            username: String::new(),
            password: String::new(),
            mock_fallback: false,
        };

        assert!(select_daemon_client(&config).await.is_err());
    }
}
