use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub sync_passes: AtomicU64,
    pub sync_failures: AtomicU64,
    pub records_created: AtomicU64,
    pub records_updated: AtomicU64,
    pub records_deleted: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    pub sync_passes: u64,
    pub sync_failures: u64,
    pub success_rate: f64,
    pub records_created: u64,
    pub records_updated: u64,
    pub records_deleted: u64,
    pub stored_torrents: usize,
    pub sync_running: bool,
    pub last_sync: Option<i64>,
    pub uptime_seconds: i64,
}

impl Metrics {
    pub fn new() -> Self {
        let start_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        Self {
            sync_passes: AtomicU64::new(0),
            sync_failures: AtomicU64::new(0),
            records_created: AtomicU64::new(0),
            records_updated: AtomicU64::new(0),
            records_deleted: AtomicU64::new(0),
            start_time,
        }
    }

    pub fn increment_passes(&self) {
        self.sync_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pass_failures(&self) {
        self.sync_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_created(&self) {
        self.records_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updated(&self) {
        self.records_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deleted(&self) {
        self.records_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Combine the counters with store and scheduler state into one
    /// snapshot, deriving success_rate and uptime_seconds.
    pub fn get_snapshot(
        &self,
        stored_torrents: usize,
        sync_running: bool,
        last_sync: Option<i64>,
    ) -> MetricsSnapshot {
        let current_time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        let sync_passes = self.sync_passes.load(Ordering::Relaxed);
        let sync_failures = self.sync_failures.load(Ordering::Relaxed);

        let success_rate = if sync_passes > 0 {
            (sync_passes.saturating_sub(sync_failures) as f64 / sync_passes as f64) * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            sync_passes,
            sync_failures,
            success_rate,
            records_created: self.records_created.load(Ordering::Relaxed),
            records_updated: self.records_updated.load(Ordering::Relaxed),
            records_deleted: self.records_deleted.load(Ordering::Relaxed),
            stored_torrents,
            sync_running,
            last_sync,
            uptime_seconds: current_time - self.start_time,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
