use anyhow::Result;
use async_trait::async_trait;

use crate::models::record::TorrentRecord;

pub mod memory;

/// Persistence seam for torrent records. The sync pass and the HTTP
/// handlers only ever see this trait, so the backing store can change
/// without touching either.
#[async_trait]
pub trait TorrentStore: Send + Sync {
    /// Every persisted record, in a stable order.
    async fn list(&self) -> Result<Vec<TorrentRecord>>;

    /// Look up one record by its store id.
    async fn get(&self, id: &str) -> Result<Option<TorrentRecord>>;

    /// Insert or update a record. Fails when a different record already
    /// owns the same hash.
    async fn save(&self, record: TorrentRecord) -> Result<()>;

    /// Remove a record. Deleting an id that is no longer present is not an
    /// error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Number of persisted records.
    async fn count(&self) -> usize;
}
