use anyhow::{bail, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::warn;

use crate::models::record::TorrentRecord;
use crate::store::TorrentStore;
use crate::wal::wal::{Wal, WalEntry};

/// In-memory record store backed by the write-ahead log.
///
/// Two maps are kept in step: records by store id, and a hash index that
/// enforces hash uniqueness and lets a record re-keyed by the sync pass
/// release its old hash. Mutations are logged to the WAL after the maps
/// are updated; a failed log write is reported but does not roll the
/// in-memory change back.
pub struct MemoryStore {
    records: DashMap<String, TorrentRecord>,
    hash_index: DashMap<String, String>,
    wal: Option<Arc<Wal>>,
}

impl MemoryStore {
    pub fn new(wal: Option<Arc<Wal>>) -> Self {
        Self {
            records: DashMap::new(),
            hash_index: DashMap::new(),
            wal,
        }
    }

    /// Apply replayed WAL entries without logging them back. Entries that
    /// conflict with already-applied state are logged and skipped, same as
    /// corrupt lines during replay.
    pub fn apply(&self, entries: &[WalEntry]) {
        for entry in entries {
            match entry {
                WalEntry::Save { record } => {
                    if let Err(e) = self.insert_local(record.clone()) {
                        warn!(
                            record_id = %record.id,
                            hash = %record.hash,
                            error = %e,
                            "Skipping conflicting WAL record"
                        );
                    }
                }
                WalEntry::Delete { id } => {
                    self.remove_local(id);
                }
            }
        }
    }

    fn insert_local(&self, record: TorrentRecord) -> Result<()> {
        let hash_owner = self.hash_index.get(&record.hash).map(|e| e.value().clone());
        if let Some(owner) = hash_owner {
            if owner != record.id {
                bail!("hash {} already belongs to record {}", record.hash, owner);
            }
        }

        // A record whose hash was rewritten must release its old index slot.
        let stale_hash = self.records.get(&record.id).and_then(|existing| {
            if existing.hash != record.hash {
                Some(existing.hash.clone())
            } else {
                None
            }
        });
        if let Some(hash) = stale_hash {
            self.hash_index.remove(&hash);
        }

        self.hash_index
            .insert(record.hash.clone(), record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    fn remove_local(&self, id: &str) -> Option<TorrentRecord> {
        let (_, record) = self.records.remove(id)?;
        self.hash_index.remove(&record.hash);
        Some(record)
    }
}

#[async_trait]
impl TorrentStore for MemoryStore {
    async fn list(&self) -> Result<Vec<TorrentRecord>> {
        let mut records: Vec<TorrentRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<TorrentRecord>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, record: TorrentRecord) -> Result<()> {
        self.insert_local(record.clone())?;

        if let Some(wal) = &self.wal {
            if let Err(e) = wal.append(&WalEntry::Save { record }) {
                // The in-memory store stays authoritative; a lost log entry
                // only costs durability across a restart.
                warn!(error = %e, "Failed to log record save to WAL");
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if self.remove_local(id).is_none() {
            return Ok(());
        }

        if let Some(wal) = &self.wal {
            if let Err(e) = wal.append(&WalEntry::Delete { id: id.to_string() }) {
                warn!(error = %e, "Failed to log record delete to WAL");
            }
        }
        Ok(())
    }

    async fn count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::torrent::TorrentStatus;
    use tempfile::TempDir;

    fn test_record(id: &str, hash: &str) -> TorrentRecord {
        TorrentRecord {
            id: id.to_string(),
            daemon_id: 1,
            name: "test torrent".to_string(),
            hash: hash.to_string(),
            status: TorrentStatus::Download,
            percent_done: 0.25,
            size_when_done: 4096,
            total_size: 4096,
            downloaded_ever: 1024,
            uploaded_ever: 0,
            rate_download: 256,
            rate_upload: 0,
            upload_ratio: 0.0,
            eta: 12,
            added_date: 1700000000,
            done_date: None,
            error: 0,
            error_string: String::new(),
            user: None,
            snapshot: serde_json::Value::Null,
            created: 1700000000,
            updated: 1700000000,
        }
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemoryStore::new(None);
        store.save(test_record("record1", "hash1")).await.unwrap();

        let record = store.get("record1").await.unwrap().unwrap();
        assert_eq!(record.hash, "hash1");
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new(None);
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_updates_in_place() {
        let store = MemoryStore::new(None);
        store.save(test_record("record1", "hash1")).await.unwrap();

        let mut updated = test_record("record1", "hash1");
        updated.percent_done = 0.75;
        store.save(updated).await.unwrap();

        let record = store.get("record1").await.unwrap().unwrap();
        assert_eq!(record.percent_done, 0.75);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_save_rejects_duplicate_hash() {
        let store = MemoryStore::new(None);
        store.save(test_record("record1", "shared")).await.unwrap();

        let result = store.save(test_record("record2", "shared")).await;
        assert!(result.is_err());
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_hash_rewrite_releases_old_slot() {
        let store = MemoryStore::new(None);
        store
            .save(test_record("record1", "placeholder-7"))
            .await
            .unwrap();

        // The sync pass rewrites the placeholder once the real hash arrives.
        store.save(test_record("record1", "realhash")).await.unwrap();

        // The old placeholder slot must be free for another record.
        store
            .save(test_record("record2", "placeholder-7"))
            .await
            .unwrap();
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_hash() {
        let store = MemoryStore::new(None);
        store.save(test_record("record1", "hash1")).await.unwrap();

        store.delete("record1").await.unwrap();
        assert_eq!(store.count().await, 0);
        assert!(store.get("record1").await.unwrap().is_none());

        // The hash is reusable after the delete.
        store.save(test_record("record2", "hash1")).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let store = MemoryStore::new(None);
        store.delete("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_sorted_by_created_then_id() {
        let store = MemoryStore::new(None);

        let mut first = test_record("bbb", "hash1");
        first.created = 100;
        let mut second = test_record("aaa", "hash2");
        second.created = 200;
        let mut third = test_record("ccc", "hash3");
        third.created = 200;

        store.save(second).await.unwrap();
        store.save(third).await.unwrap();
        store.save(first).await.unwrap();

        let records = store.list().await.unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["bbb", "aaa", "ccc"]);
    }

    #[tokio::test]
    async fn test_mutations_reach_the_wal() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Arc::new(Wal::new(temp_dir.path().join("test.wal")).unwrap());

        let store = MemoryStore::new(Some(Arc::clone(&wal)));
        store.save(test_record("record1", "hash1")).await.unwrap();
        store.delete("record1").await.unwrap();

        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], WalEntry::Save { .. }));
        assert!(matches!(entries[1], WalEntry::Delete { .. }));
    }

    #[tokio::test]
    async fn test_delete_of_missing_record_not_logged() {
        let temp_dir = TempDir::new().unwrap();
        let wal = Arc::new(Wal::new(temp_dir.path().join("test.wal")).unwrap());

        let store = MemoryStore::new(Some(Arc::clone(&wal)));
        store.delete("ghost").await.unwrap();

        assert!(wal.replay().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_replays_saves_and_deletes() {
        let store = MemoryStore::new(None);
        store.apply(&[
            WalEntry::Save {
                record: test_record("record1", "hash1"),
            },
            WalEntry::Save {
                record: test_record("record2", "hash2"),
            },
            WalEntry::Delete {
                id: "record1".to_string(),
            },
        ]);

        assert_eq!(store.count().await, 1);
        assert!(store.get("record2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_apply_skips_conflicting_entries() {
        let store = MemoryStore::new(None);
        store.apply(&[
            WalEntry::Save {
                record: test_record("record1", "shared"),
            },
            WalEntry::Save {
                record: test_record("record2", "shared"),
            },
        ]);

        assert_eq!(store.count().await, 1);
        assert!(store.get("record1").await.unwrap().is_some());
        assert!(store.get("record2").await.unwrap().is_none());
    }
}
