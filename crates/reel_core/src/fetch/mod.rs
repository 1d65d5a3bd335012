//! Retrieval of source clips and audio tracks.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::FetchSettings;

/// Errors while fetching a source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to read {path}: {source}")]
    Local {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Local sources are disabled: {0}")]
    LocalDisabled(String),

    #[error("Unsupported source locator: {0}")]
    InvalidUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Turns a source locator into bytes.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `http(s)://` URLs with reqwest and, when allowed, local files
/// (`file://` URLs or bare paths).
pub struct HttpFetcher {
    client: reqwest::Client,
    allow_local: bool,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        if settings.connect_timeout_secs > 0 {
            builder = builder.connect_timeout(Duration::from_secs(settings.connect_timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            allow_local: settings.allow_local,
        })
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let network = |e: reqwest::Error| FetchError::Network {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(network)?;
        tracing::debug!("Fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn fetch_local(&self, url: &str, path: PathBuf) -> Result<Vec<u8>, FetchError> {
        if !self.allow_local {
            return Err(FetchError::LocalDisabled(url.to_string()));
        }
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| FetchError::Local { path, source })?;
        tracing::debug!("Read local source {} ({} bytes)", url, bytes.len());
        Ok(bytes)
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url).await
        } else if let Some(path) = url.strip_prefix("file://") {
            self.fetch_local(url, PathBuf::from(path)).await
        } else if !url.is_empty() && !url.contains("://") {
            self.fetch_local(url, PathBuf::from(url)).await
        } else {
            Err(FetchError::InvalidUrl(url.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fetcher(allow_local: bool) -> HttpFetcher {
        let settings = FetchSettings {
            allow_local,
            ..FetchSettings::default()
        };
        HttpFetcher::new(&settings).unwrap()
    }

    #[tokio::test]
    async fn reads_local_paths_and_file_urls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene1.mp4");
        std::fs::write(&path, b"clip").unwrap();

        let fetcher = fetcher(true);
        assert_eq!(fetcher.fetch(path.to_str().unwrap()).await.unwrap(), b"clip");
        let url = format!("file://{}", path.display());
        assert_eq!(fetcher.fetch(&url).await.unwrap(), b"clip");
    }

    #[tokio::test]
    async fn local_sources_can_be_disabled() {
        let result = fetcher(false).fetch("/tmp/scene1.mp4").await;
        assert!(matches!(result, Err(FetchError::LocalDisabled(_))));
    }

    #[tokio::test]
    async fn missing_local_file_is_local_error() {
        let result = fetcher(true).fetch("/nonexistent/scene1.mp4").await;
        assert!(matches!(result, Err(FetchError::Local { .. })));
    }

    #[tokio::test]
    async fn unknown_scheme_is_rejected() {
        let result = fetcher(true).fetch("ftp://example.com/scene1.mp4").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        let result = fetcher(true).fetch("http://127.0.0.1:9/scene1.mp4").await;
        assert!(matches!(result, Err(FetchError::Network { .. })));
    }
}
