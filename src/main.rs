mod core;
mod models;
mod store;
mod daemon;
mod sync;
mod wal;
mod metrics;
mod utils;
mod handlers;

use crate::core::config::Config;
use crate::core::startup::{restore_from_wal, select_daemon_client};
use crate::core::state::AppState;
use crate::metrics::collector::Metrics;
use crate::store::memory::MemoryStore;
use crate::store::TorrentStore;
use crate::sync::service::SyncService;
use crate::wal::wal::Wal;
use anyhow::{bail, Context, Result};
use axum::serve;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UnixListener};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        If this is your first time running the server, copy config.example.toml to config.toml and adjust the values.",
        config_path.display()
    ))?;

    // Initialize tracing/logging
    crate::core::tracing_init::init_tracing(&config.logging);

    // Build Tokio runtime with configured number of threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    // Run the async main function
    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        port = ?config.server.port,
        unix_socket = ?config.server.unix_socket,
        num_threads = config.server.num_threads,
        daemon_url = %config.daemon.url,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Torrent sync server starting"
    );

    // Initialize the WAL when a path is configured; without one the record
    // set lives in memory only and is rebuilt from the daemon
    let wal = match &config.store.wal_path {
        Some(path) => {
            let wal = Arc::new(Wal::new(path.clone()).context(format!(
                "Failed to initialize WAL at {}",
                path.display()
            ))?);
            info!(wal_path = %path.display(), "WAL initialized");
            Some(wal)
        }
        None => {
            warn!("No wal_path configured, records will not survive restarts");
            None
        }
    };

    let store = Arc::new(MemoryStore::new(wal.clone()));

    // Replay the WAL to restore the record set
    if let Some(wal) = &wal {
        info!("Replaying WAL entries");
        let restored = restore_from_wal(wal, &store)
            .await
            .context("Failed to restore records from WAL")?;
        info!(records_restored = restored, "WAL replay completed");
    }

    // Connect to the torrent daemon, or fall back to the simulated one
    let daemon = select_daemon_client(&config.daemon)
        .await
        .context("Failed to initialize daemon client")?;

    let metrics = Arc::new(Metrics::new());

    let sync_service = Arc::new(SyncService::new(
        Arc::clone(&daemon),
        Arc::clone(&store) as Arc<dyn TorrentStore>,
        Arc::clone(&metrics),
        Duration::from_secs(config.sync.interval_secs),
        Duration::from_secs(config.sync.fetch_timeout_secs),
        config.sync.stale_refresh_secs,
    ));

    sync_service.start()?;

    info!(
        sync_interval_seconds = config.sync.interval_secs,
        stale_refresh_seconds = config.sync.stale_refresh_secs,
        "Sync scheduler started"
    );

    let state = AppState::new(
        Arc::new(config.clone()),
        Arc::clone(&store) as Arc<dyn TorrentStore>,
        Arc::clone(&daemon),
        Arc::clone(&sync_service),
        Arc::clone(&metrics),
    );

    // Log final startup statistics
    info!(
        stored_torrents = store.count().await,
        "Torrent sync server startup complete"
    );

    // Build the router with middleware
    let app = crate::core::routes::build_router(Arc::new(state)).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    // Start HTTP server(s)
    let tcp_handle = if let Some(port) = config.server.port {
        let addr = format!("0.0.0.0:{}", port);
        info!(address = %addr, "Starting TCP listener");

        let listener = TcpListener::bind(&addr)
            .await
            .context(format!("Failed to bind TCP listener to {}", addr))?;

        info!(address = %addr, "TCP listener bound successfully");

        let app_clone = app.clone();
        Some(tokio::spawn(async move {
            serve(listener, app_clone.into_make_service())
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("TCP server error")
        }))
    } else {
        None
    };

    let unix_handle = if let Some(unix_socket) = &config.server.unix_socket {
        info!(path = %unix_socket.display(), "Starting Unix socket listener");

        // Remove existing socket file if it exists
        if unix_socket.exists() {
            std::fs::remove_file(unix_socket).context(format!(
                "Failed to remove existing Unix socket: {}",
                unix_socket.display()
            ))?;
        }

        let listener = UnixListener::bind(unix_socket).context(format!(
            "Failed to bind Unix socket listener to {}",
            unix_socket.display()
        ))?;

        info!(path = %unix_socket.display(), "Unix socket listener bound successfully");

        let mut make_service = app.into_make_service();
        Some(tokio::spawn(async move {
            use tower::Service;

            loop {
                let (socket, _remote_addr) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "Failed to accept Unix socket connection");
                        continue;
                    }
                };

                let tower_service = match make_service.call(&socket).await {
                    Ok(svc) => svc,
                    Err(infallible) => match infallible {},
                };

                tokio::spawn(async move {
                    let socket = hyper_util::rt::TokioIo::new(socket);

                    let hyper_service = hyper::service::service_fn(
                        move |request: hyper::Request<hyper::body::Incoming>| {
                            tower_service.clone().call(request)
                        },
                    );

                    if let Err(err) = hyper_util::server::conn::auto::Builder::new(
                        hyper_util::rt::TokioExecutor::new(),
                    )
                    .serve_connection_with_upgrades(socket, hyper_service)
                    .await
                    {
                        error!(error = %err, "Error serving Unix socket connection");
                    }
                });
            }
        }))
    } else {
        None
    };

    info!("HTTP server(s) started, waiting for shutdown signal");

    // Wait for both servers to complete (if they exist)
    match (tcp_handle, unix_handle) {
        (Some(tcp), Some(unix)) => {
            tokio::select! {
                result = tcp => {
                    if let Err(e) = result {
                        error!(error = %e, "TCP server task failed");
                    }
                }
                result = unix => {
                    if let Err(e) = result {
                        error!(error = %e, "Unix socket server task failed");
                    }
                }
            }
        }
        (Some(tcp), None) => {
            if let Err(e) = tcp.await {
                error!(error = %e, "TCP server task failed");
            }
        }
        (None, Some(unix)) => {
            if let Err(e) = unix.await {
                error!(error = %e, "Unix socket server task failed");
            }
        }
        (None, None) => {
            error!("No listeners configured");
            bail!("No listeners configured");
        }
    }

    // Stop the background sync worker before exiting
    sync_service.stop();

    info!("Shutting down gracefully");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
