//! Web search trait covering the general, image, and video variants.
//!
//! All three variants return the same normalized hit shape; kind-specific
//! fields are optional. The pipeline only ever consumes titles, URLs, and
//! snippets/descriptions, so provider quirks stay inside the impl.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::security::SecretString;

/// Which search index to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchKind {
    Web,
    Image,
    Video,
}

/// A normalized search result record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result title
    pub title: String,

    /// Target URL (page URL for web/video, full-size image URL for image)
    pub url: String,

    /// Snippet or description, if the provider returned one
    pub snippet: Option<String>,

    /// Thumbnail URL (image/video results)
    pub thumbnail: Option<String>,

    /// Channel or source name (video/image results)
    pub channel: Option<String>,

    /// Duration string (video results)
    pub duration: Option<String>,
}

impl SearchHit {
    /// Create a hit with the two fields every variant carries.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a snippet.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// Add a channel/source name.
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

/// Web search trait for competitive context, citations, images, and video.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the given index for the query.
    async fn search(&self, query: &str, kind: SearchKind, limit: usize)
        -> Result<Vec<SearchHit>>;
}

/// Mock web searcher for testing.
#[derive(Default)]
pub struct MockWebSearcher {
    results:
        std::sync::RwLock<std::collections::HashMap<(SearchKind, String), Vec<SearchHit>>>,
    calls: std::sync::RwLock<Vec<(SearchKind, String)>>,
}

impl MockWebSearcher {
    /// Create a new mock searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add results for a (kind, query) pair.
    pub fn with_results(self, kind: SearchKind, query: &str, results: Vec<SearchHit>) -> Self {
        self.results
            .write()
            .unwrap()
            .insert((kind, query.to_string()), results);
        self
    }

    /// Add URL strings as results.
    pub fn with_urls(self, kind: SearchKind, query: &str, urls: &[&str]) -> Self {
        let results = urls
            .iter()
            .map(|u| SearchHit::new(format!("Result for {}", query), *u))
            .collect();
        self.with_results(kind, query, results)
    }

    /// Queries received, in order.
    pub fn calls(&self) -> Vec<(SearchKind, String)> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        self.calls
            .write()
            .unwrap()
            .push((kind, query.to_string()));
        let mut hits = self
            .results
            .read()
            .unwrap()
            .get(&(kind, query.to_string()))
            .cloned()
            .unwrap_or_default();
        hits.truncate(limit);
        Ok(hits)
    }
}

/// Serper-backed web searcher.
///
/// Uses Serper's search/images/videos endpoints and normalizes each
/// response shape into [`SearchHit`]s.
pub struct SerperWebSearcher {
    api_key: SecretString,
    client: reqwest::Client,
    base_url: String,
}

impl SerperWebSearcher {
    /// Create a new Serper searcher.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key),
            client: reqwest::Client::new(),
            base_url: "https://google.serper.dev".to_string(),
        }
    }

    /// Set a custom base URL (for proxies/testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn endpoint(&self, kind: SearchKind) -> String {
        let path = match kind {
            SearchKind::Web => "search",
            SearchKind::Image => "images",
            SearchKind::Video => "videos",
        };
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl WebSearcher for SerperWebSearcher {
    async fn search(
        &self,
        query: &str,
        kind: SearchKind,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        #[derive(serde::Serialize)]
        struct Request<'a> {
            q: &'a str,
            num: usize,
        }

        #[derive(serde::Deserialize, Default)]
        #[serde(default)]
        struct Response {
            organic: Vec<OrganicResult>,
            images: Vec<ImageResult>,
            videos: Vec<VideoResult>,
        }

        #[derive(serde::Deserialize)]
        struct OrganicResult {
            title: String,
            link: String,
            snippet: Option<String>,
        }

        #[derive(serde::Deserialize)]
        struct ImageResult {
            title: String,
            #[serde(rename = "imageUrl")]
            image_url: String,
            #[serde(rename = "thumbnailUrl")]
            thumbnail_url: Option<String>,
            source: Option<String>,
        }

        #[derive(serde::Deserialize)]
        struct VideoResult {
            title: String,
            link: String,
            snippet: Option<String>,
            channel: Option<String>,
            duration: Option<String>,
        }

        let response = self
            .client
            .post(self.endpoint(kind))
            .header("X-API-KEY", self.api_key.expose())
            .header("Content-Type", "application/json")
            .json(&Request { q: query, num: limit })
            .send()
            .await
            .map_err(EngineError::search)?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::Search(
                format!("search API returned {}", status).into(),
            ));
        }

        let parsed: Response = response.json().await.map_err(EngineError::search)?;

        let hits = match kind {
            SearchKind::Web => parsed
                .organic
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.link,
                    snippet: r.snippet,
                    ..Default::default()
                })
                .collect::<Vec<_>>(),
            SearchKind::Image => parsed
                .images
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.image_url,
                    thumbnail: r.thumbnail_url,
                    channel: r.source,
                    ..Default::default()
                })
                .collect(),
            SearchKind::Video => parsed
                .videos
                .into_iter()
                .map(|r| SearchHit {
                    title: r.title,
                    url: r.link,
                    snippet: r.snippet,
                    channel: r.channel,
                    duration: r.duration,
                    ..Default::default()
                })
                .collect(),
        };

        Ok(hits.into_iter().take(limit).collect())
    }
}
