// Application state (AppState)

use crate::core::config::Config;
use crate::daemon::DaemonClient;
use crate::metrics::collector::Metrics;
use crate::store::TorrentStore;
use crate::sync::service::SyncService;
use std::sync::Arc;

/// Shared application state
///
/// Contains all shared components that are accessed by request handlers.
/// All fields are wrapped in Arc for efficient cloning across threads.
#[derive(Clone)]
pub struct AppState {
    /// Persisted torrent records
    pub store: Arc<dyn TorrentStore>,

    /// Daemon client, real or simulated
    pub daemon: Arc<dyn DaemonClient>,

    /// Reconciliation scheduler
    pub sync_service: Arc<SyncService>,

    /// Metrics collector for tracking statistics
    pub metrics: Arc<Metrics>,

    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn TorrentStore>,
        daemon: Arc<dyn DaemonClient>,
        sync_service: Arc<SyncService>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            daemon,
            sync_service,
            metrics,
            config,
        }
    }
}
