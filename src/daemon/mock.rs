use anyhow::Result;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Mutex;

use crate::daemon::DaemonClient;
use crate::models::torrent::{TorrentSnapshot, TorrentStatus};
use crate::utils::time::current_timestamp;

/// Seconds between simulated progress ticks.
const PROGRESS_TICK_SECS: i64 = 2;

/// Simulated daemon used when no real daemon is reachable at startup.
/// Serves a fixed set of demo torrents and nudges their progress forward
/// between snapshot reads so consecutive snapshots differ the way a real
/// daemon's would.
pub struct MockClient {
    state: Mutex<MockState>,
}

struct MockState {
    torrents: Vec<TorrentSnapshot>,
    next_id: i64,
    last_tick: i64,
}

impl MockClient {
    pub fn new() -> Self {
        let now = current_timestamp();
        Self {
            state: Mutex::new(MockState {
                torrents: demo_torrents(now),
                next_id: 4,
                last_tick: now,
            }),
        }
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DaemonClient for MockClient {
    async fn get_torrents(&self) -> Result<Vec<TorrentSnapshot>> {
        let mut state = self.state.lock().unwrap();
        let now = current_timestamp();
        if now - state.last_tick > PROGRESS_TICK_SECS {
            advance_progress(&mut state.torrents, now);
            state.last_tick = now;
        }
        Ok(state.torrents.clone())
    }

    async fn add_torrent(
        &self,
        _torrent: &str,
        _download_dir: Option<&str>,
    ) -> Result<TorrentSnapshot> {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;

        let snapshot = TorrentSnapshot {
            id,
            hash: format!("mock_hash_{}", id),
            name: format!("New Torrent {}", id),
            status: TorrentStatus::Download,
            percent_done: 0.0,
            size_when_done: 1024 * 1024 * 1024,
            total_size: 1024 * 1024 * 1024,
            downloaded_ever: 0,
            uploaded_ever: 0,
            rate_download: 1024 * 1024,
            rate_upload: 0,
            upload_ratio: 0.0,
            eta: 3600,
            added_date: current_timestamp(),
            done_date: None,
            error: 0,
            error_string: String::new(),
        };

        state.torrents.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn start_torrents(&self, ids: &[i64]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for torrent in state.torrents.iter_mut() {
            if ids.contains(&torrent.id) && torrent.status == TorrentStatus::Stopped {
                torrent.status = TorrentStatus::Download;
                torrent.rate_download = rand::rng().random_range(0_i64..5 * 1024 * 1024);
            }
        }
        Ok(())
    }

    async fn stop_torrents(&self, ids: &[i64]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        for torrent in state.torrents.iter_mut() {
            if ids.contains(&torrent.id) {
                torrent.status = TorrentStatus::Stopped;
                torrent.rate_download = 0;
                torrent.rate_upload = 0;
            }
        }
        Ok(())
    }

    async fn remove_torrents(&self, ids: &[i64], _delete_local_data: bool) -> Result<()> {
        // Removed torrents drop out of the snapshot entirely so the next
        // sync pass deletes their records.
        let mut state = self.state.lock().unwrap();
        state.torrents.retain(|t| !ids.contains(&t.id));
        Ok(())
    }
}

fn demo_torrents(now: i64) -> Vec<TorrentSnapshot> {
    vec![
        TorrentSnapshot {
            id: 1,
            hash: "mock_hash_ubuntu_24_04".to_string(),
            name: "Ubuntu 24.04 LTS Desktop amd64.iso".to_string(),
            status: TorrentStatus::Download,
            percent_done: 0.65,
            size_when_done: 4294967296,
            total_size: 4294967296,
            downloaded_ever: 2791728742,
            uploaded_ever: 0,
            rate_download: 2097152,
            rate_upload: 0,
            upload_ratio: 0.0,
            eta: 1800,
            added_date: now - 2 * 3600,
            done_date: None,
            error: 0,
            error_string: String::new(),
        },
        TorrentSnapshot {
            id: 2,
            hash: "mock_hash_big_buck_bunny".to_string(),
            name: "Big Buck Bunny 4K (2008).mkv".to_string(),
            status: TorrentStatus::Seed,
            percent_done: 1.0,
            size_when_done: 8589934592,
            total_size: 8589934592,
            downloaded_ever: 8589934592,
            uploaded_ever: 15461882265,
            rate_download: 0,
            rate_upload: 524288,
            upload_ratio: 1.8,
            eta: -1,
            added_date: now - 24 * 3600,
            done_date: Some(now - 12 * 3600),
            error: 0,
            error_string: String::new(),
        },
        TorrentSnapshot {
            id: 3,
            hash: "mock_hash_linux_kernel".to_string(),
            name: "Linux.Kernel.Source.tar.xz".to_string(),
            status: TorrentStatus::Stopped,
            percent_done: 0.12,
            size_when_done: 209715200,
            total_size: 209715200,
            downloaded_ever: 25165824,
            uploaded_ever: 0,
            rate_download: 0,
            rate_upload: 0,
            upload_ratio: 0.0,
            eta: -1,
            added_date: now - 30 * 60,
            done_date: None,
            error: 0,
            error_string: String::new(),
        },
    ]
}

fn advance_progress(torrents: &mut [TorrentSnapshot], now: i64) {
    let mut rng = rand::rng();
    for torrent in torrents.iter_mut() {
        if torrent.status == TorrentStatus::Download && torrent.percent_done < 1.0 {
            // 1-3% forward per tick.
            let step = 0.01 + rng.random_range(0.0..0.02);
            torrent.percent_done = (torrent.percent_done + step).min(1.0);
            torrent.downloaded_ever =
                (torrent.percent_done * torrent.total_size as f64) as i64;

            if torrent.rate_download > 0 {
                let remaining = torrent.total_size - torrent.downloaded_ever;
                torrent.eta = remaining / torrent.rate_download;
            }

            if torrent.percent_done >= 1.0 {
                torrent.status = TorrentStatus::Seed;
                torrent.rate_download = 0;
                torrent.rate_upload = rng.random_range(0_i64..1024 * 1024);
                torrent.eta = -1;
                if torrent.done_date.is_none() {
                    torrent.done_date = Some(now);
                }
            }
        }

        if torrent.status == TorrentStatus::Seed && torrent.rate_upload > 0 {
            torrent.uploaded_ever += torrent.rate_upload * 5;
            torrent.upload_ratio = torrent.uploaded_ever as f64 / torrent.total_size as f64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_torrents_seeded() {
        let client = MockClient::new();
        let torrents = client.get_torrents().await.unwrap();

        assert_eq!(torrents.len(), 3);
        assert_eq!(torrents[0].hash, "mock_hash_ubuntu_24_04");
        assert_eq!(torrents[1].status, TorrentStatus::Seed);
        assert!(torrents[1].done_date.is_some());
        assert_eq!(torrents[2].status, TorrentStatus::Stopped);
    }

    #[tokio::test]
    async fn test_add_torrent_appends_with_fresh_id() {
        let client = MockClient::new();
        let added = client
            .add_torrent("magnet:?xt=urn:btih:abc", None)
            .await
            .unwrap();

        assert_eq!(added.id, 4);
        assert_eq!(added.hash, "mock_hash_4");
        assert_eq!(added.status, TorrentStatus::Download);

        let torrents = client.get_torrents().await.unwrap();
        assert_eq!(torrents.len(), 4);
    }

    #[tokio::test]
    async fn test_add_ids_stay_fresh_after_remove() {
        let client = MockClient::new();
        let first = client.add_torrent("magnet:?xt=a", None).await.unwrap();
        client.remove_torrents(&[first.id], false).await.unwrap();

        let second = client.add_torrent("magnet:?xt=b", None).await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_stop_zeroes_rates() {
        let client = MockClient::new();
        client.stop_torrents(&[1]).await.unwrap();

        let torrents = client.get_torrents().await.unwrap();
        let stopped = torrents.iter().find(|t| t.id == 1).unwrap();
        assert_eq!(stopped.status, TorrentStatus::Stopped);
        assert_eq!(stopped.rate_download, 0);
        assert_eq!(stopped.rate_upload, 0);
    }

    #[tokio::test]
    async fn test_start_resumes_stopped_only() {
        let client = MockClient::new();
        client.start_torrents(&[2, 3]).await.unwrap();

        let torrents = client.get_torrents().await.unwrap();
        let seeding = torrents.iter().find(|t| t.id == 2).unwrap();
        let resumed = torrents.iter().find(|t| t.id == 3).unwrap();
        // Seeding torrent is left alone, the stopped one downloads again.
        assert_eq!(seeding.status, TorrentStatus::Seed);
        assert_eq!(resumed.status, TorrentStatus::Download);
    }

    #[tokio::test]
    async fn test_remove_drops_from_snapshot() {
        let client = MockClient::new();
        client.remove_torrents(&[1, 3], false).await.unwrap();

        let torrents = client.get_torrents().await.unwrap();
        assert_eq!(torrents.len(), 1);
        assert_eq!(torrents[0].id, 2);
    }

    #[test]
    fn test_progress_advances_downloads() {
        let now = current_timestamp();
        let mut torrents = demo_torrents(now);
        let before = torrents[0].percent_done;

        advance_progress(&mut torrents, now);

        assert!(torrents[0].percent_done > before);
        assert!(torrents[0].downloaded_ever > 2791728742);
        // Stopped torrent does not move.
        assert_eq!(torrents[2].percent_done, 0.12);
    }

    #[test]
    fn test_progress_completes_into_seeding() {
        let now = current_timestamp();
        let mut torrents = demo_torrents(now);
        torrents[0].percent_done = 0.999;

        advance_progress(&mut torrents, now);

        assert_eq!(torrents[0].status, TorrentStatus::Seed);
        assert_eq!(torrents[0].percent_done, 1.0);
        assert_eq!(torrents[0].rate_download, 0);
        assert_eq!(torrents[0].eta, -1);
        assert_eq!(torrents[0].done_date, Some(now));
    }

    #[test]
    fn test_seeding_accumulates_upload() {
        let now = current_timestamp();
        let mut torrents = demo_torrents(now);
        let before = torrents[1].uploaded_ever;

        advance_progress(&mut torrents, now);

        assert!(torrents[1].uploaded_ever > before);
        assert!(torrents[1].upload_ratio > 1.8);
    }
}
