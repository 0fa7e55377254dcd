//! Typed errors for the article engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Language model call failed
    #[error("completion error: {0}")]
    Completion(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Web search call failed
    #[error("search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Spreadsheet gateway failed
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Vector index gateway failed
    #[error("vector index error: {0}")]
    VectorIndex(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// CMS gateway failed
    #[error("CMS error: {0}")]
    Cms(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Relational gateway failed
    #[error("database error: {0}")]
    Relational(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Media download failed or content was not an image
    #[error("media fetch error for {url}: {reason}")]
    MediaFetch { url: String, reason: String },

    /// Image decode/resize/encode failed
    #[error("image processing error: {0}")]
    ImageProcessing(String),

    /// A structured response was missing a required field
    #[error("missing field in model response: {field}")]
    MissingField { field: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl EngineError {
    /// Wrap an arbitrary error as a completion failure.
    pub fn completion(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Completion(Box::new(e))
    }

    /// Wrap an arbitrary error as a search failure.
    pub fn search(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Search(Box::new(e))
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
