use crate::models::record::TorrentRecord;
use crate::models::torrent::TorrentSnapshot;
use std::collections::HashMap;

/// Prefix for synthetic hashes assigned to torrents the daemon has not
/// resolved metadata for yet (magnet links before the swarm answers).
pub const PLACEHOLDER_PREFIX: &str = "placeholder-";

/// Deterministic stand-in hash for a torrent with no content hash.
pub fn placeholder_hash(daemon_id: i64) -> String {
    format!("{PLACEHOLDER_PREFIX}{daemon_id}")
}

/// Lookup tables over the stored record set, built once per sync pass.
///
/// Hash is the primary identity: it survives daemon restarts, which renumber
/// torrents. The daemon id is only a fallback for records that do not have a
/// real hash yet.
pub struct RecordIndex<'a> {
    by_hash: HashMap<&'a str, &'a TorrentRecord>,
    by_daemon_id: HashMap<i64, &'a TorrentRecord>,
}

impl<'a> RecordIndex<'a> {
    pub fn build(records: &'a [TorrentRecord]) -> Self {
        let mut by_hash = HashMap::new();
        let mut by_daemon_id = HashMap::new();

        for record in records {
            if !record.hash.is_empty() {
                by_hash.insert(record.hash.as_str(), record);
            }
            if record.daemon_id != 0 {
                by_daemon_id.insert(record.daemon_id, record);
            }
        }

        Self {
            by_hash,
            by_daemon_id,
        }
    }

    /// Find the stored record a daemon snapshot corresponds to, if any.
    ///
    /// A hash match always wins over a daemon-id match. An id-only match is
    /// how a placeholder record reconnects with its torrent once the real
    /// hash becomes known.
    pub fn resolve(&self, snapshot: &TorrentSnapshot) -> Option<&'a TorrentRecord> {
        if !snapshot.hash.is_empty() {
            if let Some(record) = self.by_hash.get(snapshot.hash.as_str()) {
                return Some(record);
            }
        }

        if snapshot.id != 0 {
            return self.by_daemon_id.get(&snapshot.id).copied();
        }

        None
    }
}
