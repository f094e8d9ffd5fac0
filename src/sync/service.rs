use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::core::error::SyncError;
use crate::daemon::DaemonClient;
use crate::metrics::collector::Metrics;
use crate::store::TorrentStore;
use crate::sync::reconciler::Reconciler;
use crate::utils::time::current_timestamp;

/// Scalars shared between the worker and the public accessors. One lock
/// guards them all; readers take the read half.
#[derive(Default)]
struct SchedulerState {
    started: bool,
    stopped: bool,
    pass_active: bool,
    last_sync: Option<i64>,
}

/// Drives reconciliation passes: a fixed-interval background worker plus
/// on-demand force sync, with at most one pass in flight at any time.
///
/// The service is single-use. Once stopped it cannot be restarted; the
/// process builds a fresh one instead.
pub struct SyncService {
    reconciler: Reconciler,
    interval: Duration,
    state: RwLock<SchedulerState>,
    shutdown_tx: watch::Sender<bool>,
}

impl SyncService {
    pub fn new(
        daemon: Arc<dyn DaemonClient>,
        store: Arc<dyn TorrentStore>,
        metrics: Arc<Metrics>,
        interval: Duration,
        fetch_timeout: Duration,
        stale_refresh: i64,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let reconciler = Reconciler::new(
            daemon,
            store,
            metrics,
            fetch_timeout,
            stale_refresh,
            shutdown_rx,
        );

        Self {
            reconciler,
            interval,
            state: RwLock::new(SchedulerState::default()),
            shutdown_tx,
        }
    }

    /// Spawn the background worker. The first pass runs immediately;
    /// subsequent passes follow the configured interval.
    pub fn start(self: &Arc<Self>) -> Result<(), SyncError> {
        {
            let mut state = self.state.write().unwrap();
            if state.started {
                return Err(SyncError::AlreadyStarted);
            }
            state.started = true;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "Starting sync service"
        );

        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.run_loop().await;
        });

        Ok(())
    }

    async fn run_loop(&self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        // Stop may have landed before the worker's first poll.
        if *shutdown.borrow() {
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_single_pass().await {
                        Ok(_) => {}
                        Err(SyncError::AlreadyRunning) => {
                            debug!("Skipping scheduled pass, one is already in flight");
                        }
                        Err(e) => warn!(error = %e, "Scheduled sync pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Sync service worker stopping");
                    return;
                }
            }
        }
    }

    /// Run one pass under the single-flight guard.
    async fn run_single_pass(&self) -> Result<usize, SyncError> {
        {
            let mut state = self.state.write().unwrap();
            if state.pass_active {
                return Err(SyncError::AlreadyRunning);
            }
            state.pass_active = true;
        }

        let result = self.reconciler.run_pass().await;

        let mut state = self.state.write().unwrap();
        state.pass_active = false;
        if result.is_ok() {
            state.last_sync = Some(current_timestamp());
        }
        result
    }

    /// Run a pass right now. Reports `AlreadyRunning` when one is in
    /// flight; the request is never queued. Works whether or not the
    /// background worker was started.
    pub async fn force_sync(&self) -> Result<usize, SyncError> {
        self.run_single_pass().await
    }

    /// Stop the worker. A pass already past its fetch runs to completion;
    /// an in-flight fetch is cancelled. Idempotent.
    pub fn stop(&self) {
        {
            let mut state = self.state.write().unwrap();
            if state.stopped {
                return;
            }
            state.stopped = true;
        }

        info!("Stopping sync service");
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_running(&self) -> bool {
        let state = self.state.read().unwrap();
        state.started && !state.stopped
    }

    pub fn last_sync_time(&self) -> Option<i64> {
        self.state.read().unwrap().last_sync
    }
}
