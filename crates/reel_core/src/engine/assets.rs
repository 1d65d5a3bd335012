//! Download and cache of the two engine artifacts.
//!
//! Artifacts are opaque blobs fetched from one origin and cached on disk
//! under a name derived from the SHA-256 of their URL. A cached blob is
//! reused without touching the network.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::EngineSettings;

/// Errors while fetching one artifact.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The two artifacts that make up a remote engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAssets {
    pub origin: String,
    /// Runtime artifact URL (the engine executable).
    pub runtime: String,
    /// Compute payload URL (the probe executable).
    pub payload: String,
}

impl EngineAssets {
    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self {
            origin: settings.origin.clone(),
            runtime: settings.runtime_url(),
            payload: settings.payload_url(),
        }
    }
}

/// Streaming downloader with a content-addressed cache.
pub struct AssetFetcher {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl AssetFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("reel-core/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the blob for `url` lives in the cache.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        let key: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
        let file_name = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("artifact");
        self.cache_dir.join(format!("{}-{}", key, file_name))
    }

    /// Return the cached blob for `url`, downloading it first if needed.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf, AssetError> {
        let target = self.cache_path(url);
        if let Ok(meta) = tokio::fs::metadata(&target).await {
            if meta.is_file() && meta.len() > 0 {
                debug!("Using cached engine artifact {}", target.display());
                return Ok(target);
            }
        }

        tokio::fs::create_dir_all(&self.cache_dir).await?;
        info!("Downloading engine artifact from {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AssetError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let partial = target.with_extension("part");
        let stored = match download(response, &partial).await {
            Ok(downloaded) => tokio::fs::rename(&partial, &target)
                .await
                .map(|()| downloaded)
                .map_err(AssetError::from),
            Err(e) => Err(e),
        };
        let downloaded = match stored {
            Ok(downloaded) => downloaded,
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&partial).await {
                    if remove.kind() != io::ErrorKind::NotFound {
                        warn!("Could not remove {}: {}", partial.display(), remove);
                    }
                }
                return Err(e);
            }
        };

        info!("Cached engine artifact at {} ({} bytes)", target.display(), downloaded);
        Ok(target)
    }
}

/// Stream the response body into `path`; returns the byte count.
async fn download(response: reqwest::Response, path: &Path) -> Result<u64, AssetError> {
    let total_size = response.content_length().unwrap_or(0);
    let mut file = tokio::fs::File::create(path).await?;
    let mut downloaded: u64 = 0;
    let mut last_logged = 0u64;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if total_size > 0 {
            let percent = downloaded * 100 / total_size;
            if percent >= last_logged + 25 {
                debug!("Artifact download {}%", percent);
                last_logged = percent;
            }
        }
    }

    file.sync_all().await?;
    Ok(downloaded)
}
