//! CMS gateway: categories, media library, and posts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A CMS category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

/// An item in the CMS media library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: u64,
    pub url: String,
}

/// Post publication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Publish,
}

/// Fields for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub slug: String,
    pub status: PostStatus,
    pub category_id: u64,
    pub author_id: u32,
    pub excerpt: String,
}

/// Reference to a created post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRef {
    pub id: u64,
    pub url: String,
}

/// Partial post update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostUpdate {
    /// Attach a featured image by media id
    pub featured_media: Option<u64>,
}

/// Gateway to the CMS.
#[async_trait]
pub trait CmsGateway: Send + Sync {
    /// Fetch the category tree (flat list with ids).
    async fn categories(&self) -> Result<Vec<Category>>;

    /// Create a category, returning its id.
    async fn create_category(&self, name: &str) -> Result<u64>;

    /// Upload a file to the media library.
    async fn upload_media(&self, data: Vec<u8>, filename: &str, mime: &str) -> Result<MediaItem>;

    /// Create a post.
    async fn create_post(&self, post: &NewPost) -> Result<PostRef>;

    /// Update an existing post.
    async fn update_post(&self, id: u64, update: &PostUpdate) -> Result<()>;
}
