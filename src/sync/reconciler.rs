use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::error::SyncError;
use crate::daemon::DaemonClient;
use crate::metrics::collector::Metrics;
use crate::models::record::{generate_record_id, TorrentRecord};
use crate::models::torrent::TorrentSnapshot;
use crate::store::TorrentStore;
use crate::sync::identity::{placeholder_hash, RecordIndex};
use crate::utils::time::{current_timestamp, is_expired};

/// Runs one reconciliation pass: fetch the daemon's full torrent list and
/// converge the persisted record set to match it.
///
/// A pass is all-or-nothing at the fetch boundary: if the snapshot cannot
/// be read, nothing is written. Past that point convergence is best-effort;
/// a record the store rejects is skipped and reconsidered from scratch on
/// the next pass.
pub struct Reconciler {
    daemon: Arc<dyn DaemonClient>,
    store: Arc<dyn TorrentStore>,
    metrics: Arc<Metrics>,
    fetch_timeout: Duration,
    stale_refresh: i64,
    shutdown: watch::Receiver<bool>,
}

impl Reconciler {
    pub fn new(
        daemon: Arc<dyn DaemonClient>,
        store: Arc<dyn TorrentStore>,
        metrics: Arc<Metrics>,
        fetch_timeout: Duration,
        stale_refresh: i64,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            daemon,
            store,
            metrics,
            fetch_timeout,
            stale_refresh,
            shutdown,
        }
    }

    /// Perform a single reconciliation pass. Returns the number of snapshot
    /// torrents processed.
    pub async fn run_pass(&self) -> Result<usize, SyncError> {
        self.metrics.increment_passes();

        match self.run_pass_inner().await {
            Ok(processed) => Ok(processed),
            Err(e) => {
                self.metrics.increment_pass_failures();
                Err(e)
            }
        }
    }

    async fn run_pass_inner(&self) -> Result<usize, SyncError> {
        debug!("Starting sync pass");
        let snapshot = self.fetch_snapshot().await?;

        let records = self.store.list().await.map_err(SyncError::Store)?;
        let index = RecordIndex::build(&records);

        // Every stored record starts out slated for deletion; a snapshot
        // match rescues it.
        let mut pending_deletion: HashSet<String> =
            records.iter().map(|record| record.id.clone()).collect();

        let now = current_timestamp();
        let mut created = 0usize;
        let mut updated = 0usize;

        for torrent in &snapshot {
            match index.resolve(torrent) {
                Some(existing) => {
                    pending_deletion.remove(&existing.id);
                    if self.update_record(existing, torrent, now).await {
                        updated += 1;
                    }
                }
                None => {
                    if self.create_record(torrent, now).await {
                        created += 1;
                    }
                }
            }
        }

        // The sweep runs strictly after every create/update decision; a
        // torrent late in the snapshot can still rescue a record through
        // the id index built at pass start.
        let mut deleted = 0usize;
        for id in &pending_deletion {
            match self.store.delete(id).await {
                Ok(()) => {
                    self.metrics.increment_deleted();
                    deleted += 1;
                }
                Err(e) => {
                    warn!(record_id = %id, error = %e, "Failed to delete stale torrent record");
                }
            }
        }

        info!(
            processed = snapshot.len(),
            created, updated, deleted, "Sync pass complete"
        );
        Ok(snapshot.len())
    }

    /// Fetch the daemon snapshot under the configured timeout, aborting
    /// early if shutdown is signalled.
    async fn fetch_snapshot(&self) -> Result<Vec<TorrentSnapshot>, SyncError> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(SyncError::Cancelled);
        }

        tokio::select! {
            result = tokio::time::timeout(self.fetch_timeout, self.daemon.get_torrents()) => {
                match result {
                    Ok(Ok(snapshot)) => Ok(snapshot),
                    Ok(Err(e)) => Err(SyncError::Fetch(e)),
                    Err(_) => Err(SyncError::FetchTimeout(self.fetch_timeout)),
                }
            }
            _ = shutdown.changed() => Err(SyncError::Cancelled),
        }
    }

    /// Apply the update decision for a matched record. Returns whether a
    /// write was persisted.
    async fn update_record(
        &self,
        existing: &TorrentRecord,
        snapshot: &TorrentSnapshot,
        now: i64,
    ) -> bool {
        let stale = is_expired(existing.updated, self.stale_refresh, now);
        if !significant_change(existing, snapshot) && !stale {
            return false;
        }

        let record = refreshed_record(existing, snapshot, now);
        match self.store.save(record).await {
            Ok(()) => {
                self.metrics.increment_updated();
                true
            }
            Err(e) => {
                warn!(
                    record_id = %existing.id,
                    hash = %existing.hash,
                    error = %e,
                    "Failed to update torrent record"
                );
                false
            }
        }
    }

    /// Create a record for a snapshot torrent with no identity match.
    /// Returns whether the create was persisted.
    async fn create_record(&self, snapshot: &TorrentSnapshot, now: i64) -> bool {
        let record = new_record(snapshot, now);
        match self.store.save(record).await {
            Ok(()) => {
                self.metrics.increment_created();
                true
            }
            Err(e) => {
                warn!(
                    daemon_id = snapshot.id,
                    hash = %snapshot.hash,
                    error = %e,
                    "Failed to create torrent record"
                );
                false
            }
        }
    }
}

/// Decide whether a fresh snapshot differs from its stored record in a way
/// that merits an immediate durable write. Rates, transfer counters, eta
/// and error fields drift continuously and are deliberately excluded; they
/// ride along whenever some other change (or staleness) forces a write.
fn significant_change(record: &TorrentRecord, snapshot: &TorrentSnapshot) -> bool {
    if record.status != snapshot.status {
        return true;
    }
    if record.percent_done != snapshot.percent_done {
        return true;
    }
    // An empty incoming hash never displaces a known one.
    if !snapshot.hash.is_empty() && record.hash != snapshot.hash {
        return true;
    }
    if record.size_when_done != snapshot.size_when_done
        || record.total_size != snapshot.total_size
    {
        return true;
    }
    // Pre-metadata snapshots report an empty name; the stored name must
    // not regress.
    if !snapshot.name.is_empty() && record.name != snapshot.name {
        return true;
    }
    // The daemon reassigns ids on remove+re-add.
    if record.daemon_id != snapshot.id {
        return true;
    }
    // Completion is recorded once, the first time it appears.
    if record.done_date.is_none() && snapshot.done_date.is_some() {
        return true;
    }
    false
}

/// Build the persisted form of an existing record refreshed from a
/// snapshot. All data fields are taken fresh; hash and name keep their
/// stored values when the incoming ones are empty, and done_date is kept
/// once set.
fn refreshed_record(record: &TorrentRecord, snapshot: &TorrentSnapshot, now: i64) -> TorrentRecord {
    let hash = if snapshot.hash.is_empty() {
        record.hash.clone()
    } else {
        snapshot.hash.clone()
    };
    let name = if snapshot.name.is_empty() {
        record.name.clone()
    } else {
        snapshot.name.clone()
    };

    TorrentRecord {
        id: record.id.clone(),
        daemon_id: snapshot.id,
        name,
        hash,
        status: snapshot.status,
        percent_done: snapshot.percent_done,
        size_when_done: snapshot.size_when_done,
        total_size: snapshot.total_size,
        downloaded_ever: snapshot.downloaded_ever,
        uploaded_ever: snapshot.uploaded_ever,
        rate_download: snapshot.rate_download,
        rate_upload: snapshot.rate_upload,
        upload_ratio: snapshot.upload_ratio,
        eta: snapshot.eta,
        added_date: snapshot.added_date,
        done_date: record.done_date.or(snapshot.done_date),
        error: snapshot.error,
        error_string: snapshot.error_string.clone(),
        user: record.user.clone(),
        snapshot: serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null),
        created: record.created,
        updated: now,
    }
}

/// Build a brand-new record for an unmatched snapshot torrent.
fn new_record(snapshot: &TorrentSnapshot, now: i64) -> TorrentRecord {
    let hash = if snapshot.hash.is_empty() {
        placeholder_hash(snapshot.id)
    } else {
        snapshot.hash.clone()
    };

    TorrentRecord {
        id: generate_record_id(),
        daemon_id: snapshot.id,
        name: display_name(snapshot),
        hash,
        status: snapshot.status,
        percent_done: snapshot.percent_done,
        size_when_done: snapshot.size_when_done,
        total_size: snapshot.total_size,
        downloaded_ever: snapshot.downloaded_ever,
        uploaded_ever: snapshot.uploaded_ever,
        rate_download: snapshot.rate_download,
        rate_upload: snapshot.rate_upload,
        upload_ratio: snapshot.upload_ratio,
        eta: snapshot.eta,
        added_date: snapshot.added_date,
        done_date: snapshot.done_date,
        error: snapshot.error,
        error_string: snapshot.error_string.clone(),
        user: None,
        snapshot: serde_json::to_value(snapshot).unwrap_or(serde_json::Value::Null),
        created: now,
        updated: now,
    }
}

/// Human-readable label for a torrent the daemon has not named yet.
fn display_name(snapshot: &TorrentSnapshot) -> String {
    if !snapshot.name.is_empty() {
        return snapshot.name.clone();
    }
    if !snapshot.hash.is_empty() {
        return snapshot.hash.clone();
    }
    "Pending torrent".to_string()
}
