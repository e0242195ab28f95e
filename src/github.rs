use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use log::{info, warn};
use reqwest::Client;
use reqwest::header;
use serde::Deserialize;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;

use crate::resolve::ReleaseTarget;

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "fetch-temurin/1.0";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ATTEMPTS: u32 = 3;
const TIMEOUT_SECS: u64 = 60;

/// Release metadata as served by the GitHub releases API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// HTTP client for the binary release feed.
#[derive(Clone)]
pub struct FeedClient {
    client: Client,
    token: Option<String>,
}

impl FeedClient {
    pub fn new(token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|err| {
                warn!("feed client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client, token }
    }

    /// Fetch and parse release metadata for `target`.
    pub async fn fetch_release(&self, target: &ReleaseTarget) -> Result<Release, String> {
        let url = if target.use_latest {
            format!("{API_BASE}/repos/{}/releases/latest", target.repo)
        } else {
            format!("{API_BASE}/repos/{}/releases/tags/{}", target.repo, target.tag)
        };
        info!("Fetching release metadata: {url}");
        let body = self
            .get_text(&url, Some(ACCEPT_JSON))
            .await
            .map_err(|err| format!("cannot fetch release metadata from {}: {err}", target.repo))?;
        serde_json::from_str(&body)
            .map_err(|err| format!("malformed release metadata from {}: {err}", target.repo))
    }

    /// Fetch a small text asset such as a checksum listing.
    pub async fn fetch_text(&self, url: &str) -> Result<String, String> {
        self.get_text(url, None).await
    }

    /// Stream a binary asset to `dest`, retrying the whole transfer on failure.
    pub async fn download_to_path(&self, url: &str, dest: &Path) -> Result<(), String> {
        with_retry(url, async || self.stream_to_path(url, dest).await).await
    }

    async fn get_text(&self, url: &str, accept: Option<&str>) -> Result<String, String> {
        with_retry(url, async || {
            let resp = self.send(url, accept).await?;
            resp.text()
                .await
                .map_err(|err| format!("body read error: {err}"))
        })
        .await
    }

    async fn stream_to_path(&self, url: &str, dest: &Path) -> Result<(), String> {
        let resp = self.send(url, None).await?;
        if let Some(parent) = dest.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|err| format!("failed to create download dir: {err}"))?;
        }
        // Truncates whatever an earlier failed attempt left behind.
        let mut file = async_fs::File::create(dest)
            .await
            .map_err(|err| format!("failed to create archive file: {err}"))?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| format!("download read error: {err}"))?;
            file.write_all(&chunk)
                .await
                .map_err(|err| format!("failed to write archive: {err}"))?;
        }
        file.flush()
            .await
            .map_err(|err| format!("failed to flush archive: {err}"))?;
        Ok(())
    }

    async fn send(&self, url: &str, accept: Option<&str>) -> Result<reqwest::Response, String> {
        let mut request = self.client.get(url).header(header::USER_AGENT, USER_AGENT);
        if let Some(accept) = accept {
            request = request.header(header::ACCEPT, accept);
        }
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("token {token}"));
        }
        request
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| format!("GET {url} failed: {err}"))
    }
}

/// Run `op` up to a bounded number of times with no backoff, surfacing the
/// last error once the attempts are exhausted. The whole operation, body
/// read included, sits inside the loop so a connection dropped mid-transfer
/// is retried like any other transport failure.
async fn with_retry<T>(
    what: &str,
    mut op: impl AsyncFnMut() -> Result<T, String>,
) -> Result<T, String> {
    let mut last_err = String::new();
    for attempt in 1..=ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                last_err = err;
                if attempt < ATTEMPTS {
                    warn!("{what}: {last_err} (attempt {attempt}/{ATTEMPTS}, retrying)");
                }
            }
        }
    }
    Err(last_err)
}
