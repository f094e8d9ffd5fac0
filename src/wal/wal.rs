use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::models::record::TorrentRecord;

/// One durable store mutation, JSON-encoded one per line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalEntry {
    Save { record: TorrentRecord },
    Delete { id: String },
}

/// Append-only log of record mutations. Replayed at startup to rebuild the
/// in-memory store, then compacted down to one save per live record.
pub struct Wal {
    file: Arc<Mutex<File>>,
    path: PathBuf,
}

impl Wal {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context("Failed to open WAL file")?;

        Ok(Wal {
            file: Arc::new(Mutex::new(file)),
            path,
        })
    }

    pub fn append(&self, entry: &WalEntry) -> Result<()> {
        let line = serde_json::to_string(entry).context("Failed to encode WAL entry")?;
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", line).context("Failed to write to WAL")?;
        file.flush().context("Failed to flush WAL")?;
        Ok(())
    }

    /// Read every entry back in write order. Lines that fail to parse are
    /// logged and skipped so a single corrupt entry cannot block startup.
    pub fn replay(&self) -> Result<Vec<WalEntry>> {
        let file = File::open(&self.path).context("Failed to open WAL for replay")?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from WAL")?;
            let line = line.trim();

            // Skip empty lines
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<WalEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(
                        line_num = line_num + 1,
                        error = %e,
                        "Failed to parse WAL line, skipping"
                    );
                }
            }
        }

        Ok(entries)
    }

    /// Replace the log contents with the given entries. Used after replay
    /// to drop superseded saves and deletes.
    pub fn rewrite(&self, entries: &[WalEntry]) -> Result<()> {
        let mut file = self.file.lock().unwrap();
        file.set_len(0).context("Failed to truncate WAL")?;
        for entry in entries {
            let line = serde_json::to_string(entry).context("Failed to encode WAL entry")?;
            writeln!(file, "{}", line).context("Failed to write to WAL")?;
        }
        file.flush().context("Failed to flush WAL after rewrite")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::torrent::TorrentStatus;
    use std::fs;
    use tempfile::TempDir;

    fn test_record(id: &str, hash: &str) -> TorrentRecord {
        TorrentRecord {
            id: id.to_string(),
            daemon_id: 1,
            name: "test torrent".to_string(),
            hash: hash.to_string(),
            status: TorrentStatus::Download,
            percent_done: 0.5,
            size_when_done: 1024,
            total_size: 1024,
            downloaded_ever: 512,
            uploaded_ever: 0,
            rate_download: 100,
            rate_upload: 0,
            upload_ratio: 0.0,
            eta: 5,
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

    #[test]
    fn test_wal_append_and_replay() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let wal = Wal::new(wal_path).unwrap();

        wal.append(&WalEntry::Save {
            record: test_record("record1", "hash1"),
        })
        .unwrap();
        wal.append(&WalEntry::Save {
            record: test_record("record2", "hash2"),
        })
        .unwrap();
        wal.append(&WalEntry::Delete {
            id: "record1".to_string(),
        })
        .unwrap();

        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 3);

        match &entries[0] {
            WalEntry::Save { record } => {
                assert_eq!(record.id, "record1");
                assert_eq!(record.hash, "hash1");
            }
            _ => panic!("Expected Save"),
        }

        match &entries[2] {
            WalEntry::Delete { id } => assert_eq!(id, "record1"),
            _ => panic!("Expected Delete"),
        }
    }

    #[test]
    fn test_wal_entry_round_trip() {
        let entry = WalEntry::Save {
            record: test_record("abcdefghij12345", "deadbeef"),
        };
        let line = serde_json::to_string(&entry).unwrap();
        let parsed: WalEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, entry);

        let entry = WalEntry::Delete {
            id: "abcdefghij12345".to_string(),
        };
        let line = serde_json::to_string(&entry).unwrap();
        assert!(line.contains("\"op\":\"delete\""));
        let parsed: WalEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_wal_rewrite_compacts() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let wal = Wal::new(wal_path).unwrap();

        wal.append(&WalEntry::Save {
            record: test_record("record1", "hash1"),
        })
        .unwrap();
        wal.append(&WalEntry::Delete {
            id: "record1".to_string(),
        })
        .unwrap();
        wal.append(&WalEntry::Save {
            record: test_record("record2", "hash2"),
        })
        .unwrap();

        wal.rewrite(&[WalEntry::Save {
            record: test_record("record2", "hash2"),
        }])
        .unwrap();

        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 1);
        match &entries[0] {
            WalEntry::Save { record } => assert_eq!(record.id, "record2"),
            _ => panic!("Expected Save"),
        }
    }

    #[test]
    fn test_wal_append_after_rewrite() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let wal = Wal::new(wal_path).unwrap();
        wal.rewrite(&[]).unwrap();
        wal.append(&WalEntry::Delete {
            id: "record9".to_string(),
        })
        .unwrap();

        let entries = wal.replay().unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_wal_invalid_lines_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let valid = serde_json::to_string(&WalEntry::Delete {
            id: "record1".to_string(),
        })
        .unwrap();
        fs::write(&wal_path, format!("not json at all\n{{\"op\":\"bogus\"}}\n{}\n", valid)).unwrap();

        let wal = Wal::new(wal_path).unwrap();
        let entries = wal.replay().unwrap();

        assert_eq!(entries.len(), 1);
        match &entries[0] {
            WalEntry::Delete { id } => assert_eq!(id, "record1"),
            _ => panic!("Expected Delete"),
        }
    }
}
