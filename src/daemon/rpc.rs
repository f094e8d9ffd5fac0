use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

use crate::daemon::DaemonClient;
use crate::models::torrent::{TorrentSnapshot, TorrentStatus};

/// Session id header used by the daemon's CSRF handshake.
const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Snapshot fields requested from the daemon on every fetch.
const TORRENT_FIELDS: &[&str] = &[
    "id",
    "name",
    "hashString",
    "status",
    "percentDone",
    "sizeWhenDone",
    "totalSize",
    "rateDownload",
    "rateUpload",
    "uploadRatio",
    "eta",
    "downloadedEver",
    "uploadedEver",
    "addedDate",
    "doneDate",
    "error",
    "errorString",
];

/// JSON-RPC client for a Transmission-compatible torrent daemon.
///
/// The daemon rejects requests carrying a stale session id with a 409 that
/// includes a fresh one; the client stores it and retries the request once.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    username: String,
    password: String,
    session_id: RwLock<String>,
}

#[derive(Serialize)]
struct RpcRequest<'a, A: Serialize> {
    method: &'a str,
    arguments: A,
}

#[derive(Deserialize)]
struct RpcResponse<A> {
    result: String,
    arguments: A,
}

#[derive(Serialize)]
struct GetTorrentsArgs<'a> {
    fields: &'a [&'a str],
}

#[derive(Deserialize)]
struct GetTorrentsBody {
    #[serde(default)]
    torrents: Vec<RpcTorrent>,
}

#[derive(Serialize)]
struct AddTorrentArgs<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metainfo: Option<&'a str>,
    #[serde(rename = "download-dir", skip_serializing_if = "Option::is_none")]
    download_dir: Option<&'a str>,
    paused: bool,
}

#[derive(Deserialize)]
struct AddTorrentBody {
    #[serde(rename = "torrent-added")]
    torrent_added: Option<RpcTorrent>,
    #[serde(rename = "torrent-duplicate")]
    torrent_duplicate: Option<RpcTorrent>,
}

#[derive(Serialize)]
struct IdsArgs<'a> {
    ids: &'a [i64],
}

#[derive(Serialize)]
struct RemoveTorrentsArgs<'a> {
    ids: &'a [i64],
    #[serde(rename = "delete-local-data")]
    delete_local_data: bool,
}

/// Wire shape of one torrent in a daemon response. Fields the daemon omits
/// fall back to zero values, which is exactly how a magnet link looks
/// before its metadata arrives.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RpcTorrent {
    id: i64,
    name: String,
    hash_string: String,
    status: i64,
    percent_done: f64,
    size_when_done: i64,
    total_size: i64,
    rate_download: i64,
    rate_upload: i64,
    upload_ratio: f64,
    eta: i64,
    downloaded_ever: i64,
    uploaded_ever: i64,
    added_date: i64,
    done_date: i64,
    error: i64,
    error_string: String,
}

impl RpcTorrent {
    fn into_snapshot(self) -> TorrentSnapshot {
        TorrentSnapshot {
            id: self.id,
            hash: self.hash_string,
            name: self.name,
            status: TorrentStatus::from_code(self.status),
            percent_done: self.percent_done,
            size_when_done: self.size_when_done,
            total_size: self.total_size,
            downloaded_ever: self.downloaded_ever,
            uploaded_ever: self.uploaded_ever,
            rate_download: self.rate_download,
            rate_upload: self.rate_upload,
            upload_ratio: self.upload_ratio,
            eta: self.eta,
            added_date: self.added_date,
            // The daemon reports zero for a torrent that never finished.
            done_date: if self.done_date > 0 {
                Some(self.done_date)
            } else {
                None
            },
            error: self.error,
            error_string: self.error_string,
        }
    }
}

impl RpcClient {
    pub fn new(url: String, username: String, password: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url,
            username,
            password,
            session_id: RwLock::new(String::new()),
        })
    }

    async fn call<A: Serialize, R: DeserializeOwned>(&self, method: &str, arguments: A) -> Result<R> {
        let body = serde_json::to_value(RpcRequest { method, arguments })
            .context("Failed to encode rpc request")?;

        let mut renegotiated = false;
        loop {
            let session_id = self.session_id.read().unwrap().clone();
            let mut request = self.client.post(&self.url).json(&body);
            if !session_id.is_empty() {
                request = request.header(SESSION_HEADER, session_id);
            }
            if !self.username.is_empty() {
                request = request.basic_auth(&self.username, Some(&self.password));
            }

            let response = request
                .send()
                .await
                .context("Failed to send rpc request to daemon")?;

            if response.status() == StatusCode::CONFLICT && !renegotiated {
                let fresh = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.to_string());

                if let Some(fresh) = fresh {
                    debug!(method, "Renegotiated daemon session id");
                    *self.session_id.write().unwrap() = fresh;
                    renegotiated = true;
                    continue;
                }
                bail!("daemon returned 409 without a session id header");
            }

            if !response.status().is_success() {
                bail!("Daemon returned error status: {}", response.status());
            }

            let envelope = response
                .json::<RpcResponse<R>>()
                .await
                .context("Failed to parse rpc response from daemon")?;

            if envelope.result != "success" {
                bail!("daemon rpc call '{}' failed: {}", method, envelope.result);
            }

            return Ok(envelope.arguments);
        }
    }
}

#[async_trait]
impl DaemonClient for RpcClient {
    async fn get_torrents(&self) -> Result<Vec<TorrentSnapshot>> {
        let body: GetTorrentsBody = self
            .call(
                "torrent-get",
                GetTorrentsArgs {
                    fields: TORRENT_FIELDS,
                },
            )
            .await?;

        Ok(body
            .torrents
            .into_iter()
            .map(RpcTorrent::into_snapshot)
            .collect())
    }

    async fn add_torrent(
        &self,
        torrent: &str,
        download_dir: Option<&str>,
    ) -> Result<TorrentSnapshot> {
        let args = if torrent.starts_with("magnet:") {
            AddTorrentArgs {
                filename: Some(torrent),
                metainfo: None,
                download_dir,
                paused: true,
            }
        } else {
            AddTorrentArgs {
                filename: None,
                metainfo: Some(torrent),
                download_dir,
                paused: true,
            }
        };

        let body: AddTorrentBody = self.call("torrent-add", args).await?;
        let added = body
            .torrent_added
            .or(body.torrent_duplicate)
            .context("daemon returned no torrent data for add")?;

        let snapshot = added.into_snapshot();
        if snapshot.error != 0 || !snapshot.error_string.is_empty() {
            bail!(
                "daemon reported error adding torrent: {} (code {})",
                snapshot.error_string,
                snapshot.error
            );
        }

        Ok(snapshot)
    }

    async fn start_torrents(&self, ids: &[i64]) -> Result<()> {
        let _: serde_json::Value = self.call("torrent-start", IdsArgs { ids }).await?;
        Ok(())
    }

    async fn stop_torrents(&self, ids: &[i64]) -> Result<()> {
        let _: serde_json::Value = self.call("torrent-stop", IdsArgs { ids }).await?;
        Ok(())
    }

    async fn remove_torrents(&self, ids: &[i64], delete_local_data: bool) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "torrent-remove",
                RemoveTorrentsArgs {
                    ids,
                    delete_local_data,
                },
            )
            .await?;
        Ok(())
    }
}
