use anyhow::Result;
use async_trait::async_trait;

use crate::models::torrent::TorrentSnapshot;

pub mod mock;
pub mod rpc;

/// Operations the rest of the system needs from a torrent daemon.
/// Implemented by the JSON-RPC client and, when no daemon is reachable at
/// startup, by the simulated daemon; callers cannot tell which they hold.
#[async_trait]
pub trait DaemonClient: Send + Sync {
    /// Fetch the full list of torrents the daemon currently manages.
    async fn get_torrents(&self) -> Result<Vec<TorrentSnapshot>>;

    /// Add a torrent from a magnet link or base64-encoded file contents.
    /// The torrent is added paused; callers start it separately.
    async fn add_torrent(
        &self,
        torrent: &str,
        download_dir: Option<&str>,
    ) -> Result<TorrentSnapshot>;

    async fn start_torrents(&self, ids: &[i64]) -> Result<()>;

    async fn stop_torrents(&self, ids: &[i64]) -> Result<()>;

    async fn remove_torrents(&self, ids: &[i64], delete_local_data: bool) -> Result<()>;
}
