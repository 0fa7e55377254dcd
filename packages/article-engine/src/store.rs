//! Run-scoped dedup memory for enrichment.
//!
//! One `ContentStore` exists per pipeline run and remembers which external
//! link URLs, image source URLs, and video ids this article has already
//! used. Claim operations are atomic insert-if-absent so per-section
//! enrichment could run concurrently without two sections claiming the
//! same URL. The failed-image set outlives the dedup intent of one
//! article: a URL that failed download/decode once is not worth retrying
//! for any section.

use std::collections::HashSet;
use std::sync::RwLock;

use uuid::Uuid;

/// Normalize a URL for duplicate comparison: lower-cased, `www.`
/// stripped, trailing slash removed.
pub fn normalize_url(url: &str) -> String {
    let mut normalized = url.trim().to_lowercase();
    if let Some(rest) = normalized.strip_suffix('/') {
        normalized = rest.to_string();
    }
    for scheme in ["https://", "http://"] {
        if let Some(rest) = normalized.strip_prefix(scheme) {
            let host_path = rest.strip_prefix("www.").unwrap_or(rest);
            return format!("{}{}", scheme, host_path);
        }
    }
    normalized
}

/// Per-run enrichment memory.
pub struct ContentStore {
    run_id: Uuid,
    used_external_urls: RwLock<HashSet<String>>,
    used_image_sources: RwLock<HashSet<String>>,
    used_video_ids: RwLock<HashSet<String>>,
    failed_image_urls: RwLock<HashSet<String>>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Create an empty store for a new run.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            used_external_urls: RwLock::new(HashSet::new()),
            used_image_sources: RwLock::new(HashSet::new()),
            used_video_ids: RwLock::new(HashSet::new()),
            failed_image_urls: RwLock::new(HashSet::new()),
        }
    }

    /// This run's id.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Claim an external link URL. Returns false if an equivalent URL was
    /// already used anywhere in this article.
    pub fn claim_external_url(&self, url: &str) -> bool {
        self.used_external_urls
            .write()
            .unwrap()
            .insert(normalize_url(url))
    }

    /// Whether an equivalent external URL has been used.
    pub fn external_url_used(&self, url: &str) -> bool {
        self.used_external_urls
            .read()
            .unwrap()
            .contains(&normalize_url(url))
    }

    /// Claim an image source URL (pre-upload). Returns false on duplicate.
    pub fn claim_image_source(&self, url: &str) -> bool {
        self.used_image_sources
            .write()
            .unwrap()
            .insert(normalize_url(url))
    }

    /// Whether an image source URL has been used in this article.
    pub fn image_source_used(&self, url: &str) -> bool {
        self.used_image_sources
            .read()
            .unwrap()
            .contains(&normalize_url(url))
    }

    /// Remember a video id that was embedded.
    pub fn record_video(&self, video_id: &str) {
        self.used_video_ids
            .write()
            .unwrap()
            .insert(video_id.to_string());
    }

    /// Mark an image URL as unusable (download/decode/upload failed).
    pub fn mark_image_failed(&self, url: &str) {
        self.failed_image_urls
            .write()
            .unwrap()
            .insert(normalize_url(url));
    }

    /// Whether an image URL is known to be unusable.
    pub fn image_failed(&self, url: &str) -> bool {
        self.failed_image_urls
            .read()
            .unwrap()
            .contains(&normalize_url(url))
    }

    /// Number of external URLs claimed so far.
    pub fn external_url_count(&self) -> usize {
        self.used_external_urls.read().unwrap().len()
    }

    /// Number of image sources claimed so far.
    pub fn image_source_count(&self) -> usize {
        self.used_image_sources.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url("https://WWW.Example.com/Path/"),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("http://example.com/path"),
            "http://example.com/path"
        );
        // Non-http strings pass through lowercased and de-slashed
        assert_eq!(normalize_url("Example.com/"), "example.com");
    }

    #[test]
    fn test_claim_external_url_is_atomic_dedup() {
        let store = ContentStore::new();
        assert!(store.claim_external_url("https://example.com/page"));
        // Variants normalize to the same entry
        assert!(!store.claim_external_url("https://www.example.com/page/"));
        assert!(!store.claim_external_url("HTTPS://EXAMPLE.COM/PAGE"));
        assert_eq!(store.external_url_count(), 1);
    }

    #[test]
    fn test_image_dedup_separate_from_links() {
        let store = ContentStore::new();
        assert!(store.claim_external_url("https://example.com/a"));
        // Same URL can still be claimed as an image source
        assert!(store.claim_image_source("https://example.com/a"));
        assert!(!store.claim_image_source("https://example.com/a"));
    }

    #[test]
    fn test_failed_image_memory() {
        let store = ContentStore::new();
        assert!(!store.image_failed("https://cdn.example.com/broken.jpg"));
        store.mark_image_failed("https://cdn.example.com/broken.jpg");
        assert!(store.image_failed("https://www.cdn.example.com/broken.jpg/"));
    }

    #[test]
    fn test_runs_have_distinct_ids() {
        assert_ne!(ContentStore::new().run_id(), ContentStore::new().run_id());
    }
}
