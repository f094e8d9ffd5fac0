use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub unix_socket: Option<PathBuf>,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    /// Key required on mutating and metrics endpoints.
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_daemon_url")]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Fall back to the simulated daemon when the real one is unreachable
    /// at startup.
    #[serde(default = "default_mock_fallback")]
    pub mock_fallback: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            url: default_daemon_url(),
            username: String::new(),
            password: String::new(),
            mock_fallback: default_mock_fallback(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Write-ahead log path. Without one the record set lives only in
    /// memory and is rebuilt from the daemon after a restart.
    pub wal_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_stale_refresh")]
    pub stale_refresh_secs: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
            fetch_timeout_secs: default_fetch_timeout(),
            stale_refresh_secs: default_stale_refresh(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_daemon_url() -> String {
    "http://localhost:9091/transmission/rpc".to_string()
}

fn default_mock_fallback() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    5
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_stale_refresh() -> i64 {
    300 // 5 minutes
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate server config
        if self.server.port.is_none() && self.server.unix_socket.is_none() {
            bail!("Either port or unix_socket must be specified in server config");
        }

        if let Some(port) = self.server.port {
            if port == 0 {
                bail!("Server port must be greater than 0");
            }
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.server.api_key.is_empty() {
            bail!("api_key must not be empty");
        }

        // Validate daemon config
        if self.daemon.url.is_empty() {
            bail!("daemon url must not be empty");
        }

        // Validate sync config
        if self.sync.interval_secs == 0 {
            bail!("sync interval_secs must be greater than 0");
        }

        if self.sync.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be greater than 0");
        }

        if self.sync.stale_refresh_secs <= 0 {
            bail!("stale_refresh_secs must be greater than 0");
        }

        // A stale window shorter than the interval would turn every pass
        // into a full rewrite of the record set.
        if self.sync.stale_refresh_secs <= self.sync.interval_secs as i64 {
            bail!(
                "stale_refresh_secs ({}) must be greater than interval_secs ({})",
                self.sync.stale_refresh_secs,
                self.sync.interval_secs
            );
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}
