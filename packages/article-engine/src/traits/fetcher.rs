//! Media download seam.
//!
//! Image candidates come from arbitrary third-party hosts; the fetcher
//! enforces the status/content-type/size checks once so the enrichment
//! flow only sees bytes it can decode or a typed error it can retry past.

use async_trait::async_trait;

use crate::error::{EngineError, Result};

/// Downloaded media bytes with their declared content type.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// HTTP download trait for images.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch a URL, requiring a 2xx response.
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

/// Reqwest-backed fetcher with a size ceiling.
pub struct HttpMediaFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl Default for HttpMediaFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpMediaFetcher {
    /// Create a fetcher with the default 10 MiB ceiling.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            max_bytes: 10 * 1024 * 1024,
        }
    }

    /// Set the download size ceiling.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| EngineError::MediaFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::MediaFetch {
                url: url.to_string(),
                reason: format!("status {}", status),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| EngineError::MediaFetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if bytes.len() > self.max_bytes {
            return Err(EngineError::MediaFetch {
                url: url.to_string(),
                reason: format!("{} bytes exceeds limit {}", bytes.len(), self.max_bytes),
            });
        }

        Ok(FetchedMedia {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
