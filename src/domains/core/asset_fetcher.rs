use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Server returned status {0}")]
    Status(u16),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Outcome of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadedAsset {
    pub bytes_written: u64,
    pub content_type: Option<String>,
}

/// Service trait for fetching remote assets onto local disk.
///
/// Callers treat every failure as best-effort: on error the original remote
/// reference is retained and the export carries on.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Stream the resource at `url` to `dest`. A failed download never leaves
    /// a partial file behind to be mistaken for a complete asset.
    async fn download(&self, url: &str, dest: &Path) -> FetchResult<DownloadedAsset>;
}

/// `reqwest`-backed fetcher used in production.
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn stream_to_disk(&self, url: &str, dest: &Path) -> FetchResult<DownloadedAsset> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        // Chunked copy keeps memory bounded for multi-megabyte models.
        let mut file = tokio::fs::File::create(dest).await?;
        let mut response = response;
        let mut bytes_written: u64 = 0;
        loop {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| FetchError::Request(e.to_string()))?;
            let Some(chunk) = chunk else { break };
            file.write_all(&chunk).await?;
            bytes_written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded {} ({} bytes) to {}", url, bytes_written, dest.display());
        Ok(DownloadedAsset {
            bytes_written,
            content_type,
        })
    }
}

impl Default for HttpAssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn download(&self, url: &str, dest: &Path) -> FetchResult<DownloadedAsset> {
        match self.stream_to_disk(url, dest).await {
            Ok(asset) => Ok(asset),
            Err(e) => {
                let _ = tokio::fs::remove_file(dest).await;
                Err(e)
            }
        }
    }
}

/// Mock implementation for testing
#[cfg(test)]
pub struct MockAssetFetcher {
    pub body: Vec<u8>,
    pub fail_matching: Vec<String>,
}

#[cfg(test)]
impl MockAssetFetcher {
    pub fn new(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            fail_matching: Vec::new(),
        }
    }

    pub fn failing_on(mut self, fragment: &str) -> Self {
        self.fail_matching.push(fragment.to_string());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl AssetFetcher for MockAssetFetcher {
    async fn download(&self, url: &str, dest: &Path) -> FetchResult<DownloadedAsset> {
        if self.fail_matching.iter().any(|f| url.contains(f)) {
            return Err(FetchError::Status(502));
        }
        tokio::fs::write(dest, &self.body).await?;
        Ok(DownloadedAsset {
            bytes_written: self.body.len() as u64,
            content_type: None,
        })
    }
}
