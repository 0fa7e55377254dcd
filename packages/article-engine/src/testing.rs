//! Testing utilities including mock implementations.
//!
//! Scripted mocks for every collaborator trait, with call recording so
//! tests can assert what the pipeline did (and did not) touch. Responses
//! are matched by substring of the user prompt, in registration order.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{EngineError, Result};
use crate::traits::cms::{Category, CmsGateway, MediaItem, NewPost, PostRef, PostUpdate};
use crate::traits::completion::TextCompletion;
use crate::traits::fetcher::{FetchedMedia, MediaFetcher};
use crate::traits::relational::RelationalGateway;
use crate::traits::spreadsheet::{SheetRow, SpreadsheetGateway};
use crate::traits::vector_index::{IndexMatch, VectorIndexGateway};
use crate::types::keyword::{ArticleType, AuthorPersona, KeywordAnalysis, PreparationResult};

fn mock_err(message: impl Into<String>) -> EngineError {
    let message: String = message.into();
    EngineError::Completion(message.into())
}

/// A ready-made preparation result for stage tests.
pub fn sample_preparation() -> PreparationResult {
    PreparationResult {
        keyword: "best budget electric guitars".to_string(),
        author: AuthorPersona::new(
            2,
            "Priya Raman",
            "Former industry analyst who writes practical, numbers-first buying advice.",
        ),
        serp_context: Some("Competitor roundup titles".to_string()),
        analysis: KeywordAnalysis {
            search_intent: "commercial".to_string(),
            content_format: "listicle".to_string(),
            article_type: ArticleType::ListOfProducts,
            model_framework: "AIDA".to_string(),
            semantic_keywords: vec!["budget guitars".to_string(), "starter guitars".to_string()],
        },
    }
}

/// A tiny valid PNG for image-flow tests.
pub fn tiny_png() -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, RgbImage};
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([10, 200, 90])));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

// =============================================================================
// MockCompletion
// =============================================================================

/// Record of a call made to the mock completion client.
#[derive(Debug, Clone)]
pub enum CompletionCall {
    Complete { prompt: String },
    CompleteJson { prompt: String },
    Embed { text: String },
    GenerateImage { prompt: String },
}

/// Scripted completion client.
///
/// Responses are registered against a prompt substring ("needle") and
/// matched in registration order. Unscripted JSON calls error so a test
/// can't silently exercise an unplanned path; unscripted text calls fall
/// back to the configured default, if any.
#[derive(Default)]
pub struct MockCompletion {
    text_responses: Arc<RwLock<Vec<(String, String)>>>,
    json_responses: Arc<RwLock<Vec<(String, serde_json::Value)>>>,
    text_default: Arc<RwLock<Option<String>>>,
    failures: Arc<RwLock<Vec<String>>>,
    embedding: Arc<RwLock<Option<Vec<f32>>>>,
    image_url: Arc<RwLock<Option<String>>>,
    calls: Arc<RwLock<Vec<CompletionCall>>>,
}

impl MockCompletion {
    /// Create a new mock with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a plain-text response for prompts containing `needle`.
    pub fn with_text_response(self, needle: &str, response: &str) -> Self {
        self.text_responses
            .write()
            .unwrap()
            .push((needle.to_string(), response.to_string()));
        self
    }

    /// Default plain-text response for unscripted prompts.
    pub fn with_text_default(self, response: &str) -> Self {
        *self.text_default.write().unwrap() = Some(response.to_string());
        self
    }

    /// Script a JSON response for prompts containing `needle`.
    pub fn with_json_response(self, needle: &str, response: serde_json::Value) -> Self {
        self.json_responses
            .write()
            .unwrap()
            .push((needle.to_string(), response));
        self
    }

    /// Fail any call whose prompt contains `needle`.
    pub fn with_failure(self, needle: &str) -> Self {
        self.failures.write().unwrap().push(needle.to_string());
        self
    }

    /// Fixed embedding returned for every embed call.
    pub fn with_embedding(self, embedding: Vec<f32>) -> Self {
        *self.embedding.write().unwrap() = Some(embedding);
        self
    }

    /// URL returned by image generation (unset means generation fails).
    pub fn with_image_url(self, url: &str) -> Self {
        *self.image_url.write().unwrap() = Some(url.to_string());
        self
    }

    /// All recorded calls.
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.read().unwrap().clone()
    }

    /// Prompts sent to `complete`, in order.
    pub fn complete_prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                CompletionCall::Complete { prompt } => Some(prompt),
                _ => None,
            })
            .collect()
    }

    /// Number of `complete` calls.
    pub fn complete_calls(&self) -> usize {
        self.complete_prompts().len()
    }

    /// Number of `complete_json` calls.
    pub fn json_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CompletionCall::CompleteJson { .. }))
            .count()
    }

    /// Number of `embed` calls.
    pub fn embed_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, CompletionCall::Embed { .. }))
            .count()
    }

    fn check_failure(&self, prompt: &str) -> Result<()> {
        let failing = self
            .failures
            .read()
            .unwrap()
            .iter()
            .any(|needle| prompt.contains(needle));
        if failing {
            Err(mock_err("scripted failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TextCompletion for MockCompletion {
    async fn complete(&self, _system: &str, user: &str) -> Result<String> {
        self.calls.write().unwrap().push(CompletionCall::Complete {
            prompt: user.to_string(),
        });
        self.check_failure(user)?;

        if let Some((_, response)) = self
            .text_responses
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| user.contains(needle))
        {
            return Ok(response.clone());
        }
        self.text_default
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| mock_err("no scripted text response"))
    }

    async fn complete_json(&self, _system: &str, user: &str) -> Result<serde_json::Value> {
        self.calls
            .write()
            .unwrap()
            .push(CompletionCall::CompleteJson {
                prompt: user.to_string(),
            });
        self.check_failure(user)?;

        self.json_responses
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| user.contains(needle))
            .map(|(_, response)| response.clone())
            .ok_or_else(|| mock_err("no scripted JSON response"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.write().unwrap().push(CompletionCall::Embed {
            text: text.to_string(),
        });

        if let Some(embedding) = self.embedding.read().unwrap().clone() {
            return Ok(embedding);
        }
        // Deterministic non-zero vector derived from the text
        Ok(text
            .bytes()
            .take(8)
            .map(|b| f32::from(b) / 255.0 + 0.1)
            .chain(std::iter::repeat(0.1))
            .take(8)
            .collect())
    }

    async fn generate_image(&self, prompt: &str, _size: &str) -> Result<String> {
        self.calls
            .write()
            .unwrap()
            .push(CompletionCall::GenerateImage {
                prompt: prompt.to_string(),
            });

        self.image_url
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| mock_err("no scripted image URL"))
    }
}

// =============================================================================
// MockSpreadsheet
// =============================================================================

/// A recorded spreadsheet row update.
#[derive(Debug, Clone)]
pub struct RecordedUpdate {
    pub sheet: String,
    pub key_column: String,
    pub key_value: String,
    pub updates: Vec<(String, String)>,
}

/// In-memory spreadsheet gateway.
#[derive(Default)]
pub struct MockSpreadsheet {
    rows: Arc<RwLock<Vec<SheetRow>>>,
    updates: Arc<RwLock<Vec<RecordedUpdate>>>,
}

impl MockSpreadsheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the sheet with rows.
    pub fn with_rows(self, rows: Vec<SheetRow>) -> Self {
        *self.rows.write().unwrap() = rows;
        self
    }

    /// Convenience: seed keyword-queue rows as (keyword, used) pairs.
    pub fn with_keywords(self, pairs: &[(&str, &str)]) -> Self {
        let rows = pairs
            .iter()
            .map(|(keyword, used)| {
                let mut row = HashMap::new();
                row.insert("keyword".to_string(), keyword.to_string());
                row.insert("used".to_string(), used.to_string());
                row
            })
            .collect();
        self.with_rows(rows)
    }

    /// All recorded updates, in order.
    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.updates.read().unwrap().clone()
    }
}

#[async_trait]
impl SpreadsheetGateway for MockSpreadsheet {
    async fn read_rows(&self, _sheet: &str) -> Result<Vec<SheetRow>> {
        Ok(self.rows.read().unwrap().clone())
    }

    async fn update_row(
        &self,
        sheet: &str,
        key_column: &str,
        key_value: &str,
        updates: &[(String, String)],
    ) -> Result<()> {
        self.updates.write().unwrap().push(RecordedUpdate {
            sheet: sheet.to_string(),
            key_column: key_column.to_string(),
            key_value: key_value.to_string(),
            updates: updates.to_vec(),
        });
        Ok(())
    }
}

// =============================================================================
// MockVectorIndex
// =============================================================================

/// In-memory vector index gateway.
#[derive(Default)]
pub struct MockVectorIndex {
    matches: Arc<RwLock<Vec<IndexMatch>>>,
    upserts: Arc<RwLock<Vec<(String, Vec<f32>)>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a nearest-neighbor match.
    pub fn with_match(self, id: &str, score: f32) -> Self {
        self.matches.write().unwrap().push(IndexMatch {
            id: id.to_string(),
            score,
        });
        self
    }

    /// Make every index operation fail.
    pub fn failing(self) -> Self {
        *self.fail.write().unwrap() = true;
        self
    }

    /// Number of upserts performed.
    pub fn upsert_count(&self) -> usize {
        self.upserts.read().unwrap().len()
    }

    /// Recorded upserts.
    pub fn upserts(&self) -> Vec<(String, Vec<f32>)> {
        self.upserts.read().unwrap().clone()
    }
}

#[async_trait]
impl VectorIndexGateway for MockVectorIndex {
    async fn query_nearest(&self, _vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        if *self.fail.read().unwrap() {
            return Err(EngineError::VectorIndex("mock index down".into()));
        }
        let mut matches = self.matches.read().unwrap().clone();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn upsert(&self, id: &str, vector: &[f32]) -> Result<()> {
        if *self.fail.read().unwrap() {
            return Err(EngineError::VectorIndex("mock index down".into()));
        }
        self.upserts
            .write()
            .unwrap()
            .push((id.to_string(), vector.to_vec()));
        Ok(())
    }
}

// =============================================================================
// MockCms
// =============================================================================

/// In-memory CMS gateway.
#[derive(Default)]
pub struct MockCms {
    categories: Arc<RwLock<Vec<Category>>>,
    created_categories: Arc<RwLock<Vec<String>>>,
    uploads: Arc<RwLock<Vec<(String, String)>>>,
    posts: Arc<RwLock<Vec<NewPost>>>,
    post_updates: Arc<RwLock<Vec<(u64, PostUpdate)>>>,
    next_media_id: AtomicU64,
    next_category_id: AtomicU64,
    fail_create_post: Arc<RwLock<bool>>,
}

impl MockCms {
    pub fn new() -> Self {
        Self {
            next_media_id: AtomicU64::new(1),
            next_category_id: AtomicU64::new(100),
            ..Default::default()
        }
    }

    /// Seed the category tree.
    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        *self.categories.write().unwrap() = categories;
        self
    }

    /// Make post creation fail.
    pub fn fail_post_creation(self) -> Self {
        *self.fail_create_post.write().unwrap() = true;
        self
    }

    /// Names of categories created through the gateway.
    pub fn created_categories(&self) -> Vec<String> {
        self.created_categories.read().unwrap().clone()
    }

    /// (filename, mime) pairs of uploaded media.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.read().unwrap().clone()
    }

    /// Posts created through the gateway.
    pub fn created_posts(&self) -> Vec<NewPost> {
        self.posts.read().unwrap().clone()
    }

    /// Recorded post updates.
    pub fn post_updates(&self) -> Vec<(u64, PostUpdate)> {
        self.post_updates.read().unwrap().clone()
    }
}

#[async_trait]
impl CmsGateway for MockCms {
    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.read().unwrap().clone())
    }

    async fn create_category(&self, name: &str) -> Result<u64> {
        let id = self.next_category_id.fetch_add(1, Ordering::SeqCst);
        self.created_categories
            .write()
            .unwrap()
            .push(name.to_string());
        self.categories.write().unwrap().push(Category {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn upload_media(&self, _data: Vec<u8>, filename: &str, mime: &str) -> Result<MediaItem> {
        let id = self.next_media_id.fetch_add(1, Ordering::SeqCst);
        self.uploads
            .write()
            .unwrap()
            .push((filename.to_string(), mime.to_string()));
        Ok(MediaItem {
            id,
            url: format!("https://cms.example.com/media/{}.jpg", id),
        })
    }

    async fn create_post(&self, post: &NewPost) -> Result<PostRef> {
        if *self.fail_create_post.read().unwrap() {
            return Err(EngineError::Cms("mock post creation refused".into()));
        }
        let mut posts = self.posts.write().unwrap();
        posts.push(post.clone());
        let id = 500 + posts.len() as u64;
        Ok(PostRef {
            id,
            url: format!("https://cms.example.com/?p={}", id),
        })
    }

    async fn update_post(&self, id: u64, update: &PostUpdate) -> Result<()> {
        self.post_updates.write().unwrap().push((id, update.clone()));
        Ok(())
    }
}

// =============================================================================
// MockRelational
// =============================================================================

/// In-memory relational gateway.
#[derive(Default)]
pub struct MockRelational {
    query_result: Arc<RwLock<Vec<Vec<serde_json::Value>>>>,
    queries: Arc<RwLock<Vec<(String, Vec<serde_json::Value>)>>>,
    executes: Arc<RwLock<Vec<(String, Vec<serde_json::Value>)>>>,
}

impl MockRelational {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the result of every query.
    pub fn with_query_result(self, rows: Vec<Vec<serde_json::Value>>) -> Self {
        *self.query_result.write().unwrap() = rows;
        self
    }

    /// Recorded queries.
    pub fn queries(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.queries.read().unwrap().clone()
    }

    /// Recorded statements.
    pub fn executes(&self) -> Vec<(String, Vec<serde_json::Value>)> {
        self.executes.read().unwrap().clone()
    }
}

#[async_trait]
impl RelationalGateway for MockRelational {
    async fn query(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<Vec<Vec<serde_json::Value>>> {
        self.queries
            .write()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(self.query_result.read().unwrap().clone())
    }

    async fn execute(&self, sql: &str, params: &[serde_json::Value]) -> Result<u64> {
        self.executes
            .write()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }
}

// =============================================================================
// MockFetcher
// =============================================================================

/// Scripted media fetcher; unknown URLs fail like a dead host.
#[derive(Default)]
pub struct MockFetcher {
    media: Arc<RwLock<HashMap<String, FetchedMedia>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script bytes for a URL.
    pub fn with_media(self, url: &str, bytes: Vec<u8>, content_type: &str) -> Self {
        self.media.write().unwrap().insert(
            url.to_string(),
            FetchedMedia {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl MediaFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia> {
        self.media
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| EngineError::MediaFetch {
                url: url.to_string(),
                reason: "mock connection refused".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_completion_needle_matching() {
        let mock = MockCompletion::new()
            .with_json_response("suitable", serde_json::json!({"suitable": "yes"}))
            .with_text_response("query", "guitar history sources");

        let json = mock.complete_json("sys", "is this suitable?").await.unwrap();
        assert_eq!(json["suitable"], "yes");

        let text = mock.complete("sys", "write a query please").await.unwrap();
        assert_eq!(text, "guitar history sources");

        // Unscripted JSON calls error rather than inventing data
        assert!(mock.complete_json("sys", "unexpected").await.is_err());

        assert_eq!(mock.json_calls(), 2);
        assert_eq!(mock.complete_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_completion_embed_deterministic() {
        let mock = MockCompletion::new();
        let a = mock.embed("hello").await.unwrap();
        let b = mock.embed("hello").await.unwrap();
        let c = mock.embed("world").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 8);
        assert_eq!(mock.embed_calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_cms_post_lifecycle() {
        let cms = MockCms::new();
        let post = cms
            .create_post(&NewPost {
                title: "T".into(),
                content: "<p>c</p>".into(),
                slug: "t".into(),
                status: crate::traits::cms::PostStatus::Publish,
                category_id: 1,
                author_id: 1,
                excerpt: "e".into(),
            })
            .await
            .unwrap();
        assert_eq!(post.id, 501);
        assert!(post.url.contains("?p=501"));

        cms.update_post(
            post.id,
            &PostUpdate {
                featured_media: Some(9),
            },
        )
        .await
        .unwrap();
        assert_eq!(cms.post_updates()[0].0, 501);
    }

    #[tokio::test]
    async fn test_mock_fetcher_unknown_url_fails() {
        let fetcher = MockFetcher::new().with_media("https://a.com/x.png", tiny_png(), "image/png");
        assert!(fetcher.fetch("https://a.com/x.png").await.is_ok());
        assert!(fetcher.fetch("https://b.com/missing.png").await.is_err());
    }
}
