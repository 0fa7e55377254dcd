//! Pipeline configuration.
//!
//! One explicit value object constructed at startup and passed by
//! reference into every stage — no ambient globals.

use serde::{Deserialize, Serialize};

use super::keyword::AuthorPersona;
use crate::media::ImageEncoding;

/// Configuration for the article pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cosine similarity above which a keyword counts as a near-duplicate
    /// of already-published content. Default: 0.85.
    pub similarity_threshold: f32,

    /// Dimensionality of the vector index; embeddings are truncated to
    /// this length before normalization. Default: 1536.
    pub embedding_dim: usize,

    /// Inclusive range for the number of candidate anchor phrases
    /// requested per section. Default: 2..=4.
    pub candidate_phrase_range: (usize, usize),

    /// Maximum external links inserted per section. Default: 2.
    pub links_per_section: usize,

    /// Sections with less plain text than this receive no external
    /// links. Default: 250 characters.
    pub min_section_chars_for_links: usize,

    /// Maximum image candidate attempts per section. Default: 4.
    pub image_max_attempts: usize,

    /// Downloaded and generated images are resized to fit this width.
    /// Default: 1200.
    pub image_max_width: u32,

    /// Re-encoding target for uploaded images. Default: JPEG.
    pub image_encoding: ImageEncoding,

    /// Probability that an eligible section receives a video embed.
    /// Intentional variability, not an error path. Default: 0.35.
    pub video_probability: f64,

    /// Result count requested from web/image/video search. Default: 8.
    pub search_result_limit: usize,

    /// Generated featured-image size parameter. Default: "1792x1024".
    pub featured_image_size: String,

    /// Fallback CMS category when resolution fails. Default: 1.
    pub default_category_id: u64,

    /// Number of related keywords generated for internal-link metadata.
    /// Default: 5.
    pub internal_link_keyword_count: usize,

    /// Spreadsheet tab holding the keyword queue. Default: "keywords".
    pub keyword_sheet: String,

    /// Author roster; the model picks one persona per article.
    pub authors: Vec<AuthorPersona>,

    /// Roster id used when persona selection fails.
    pub default_author_id: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            embedding_dim: 1536,
            candidate_phrase_range: (2, 4),
            links_per_section: 2,
            min_section_chars_for_links: 250,
            image_max_attempts: 4,
            image_max_width: 1200,
            image_encoding: ImageEncoding::Jpeg,
            video_probability: 0.35,
            search_result_limit: 8,
            featured_image_size: "1792x1024".to_string(),
            default_category_id: 1,
            internal_link_keyword_count: 5,
            keyword_sheet: "keywords".to_string(),
            authors: default_roster(),
            default_author_id: 1,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the uniqueness similarity threshold.
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Set the vector index dimensionality.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Set the per-section link quota.
    pub fn with_links_per_section(mut self, quota: usize) -> Self {
        self.links_per_section = quota;
        self
    }

    /// Set the video insertion probability (clamped to 0.0..=1.0).
    pub fn with_video_probability(mut self, p: f64) -> Self {
        self.video_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Set the image attempt ceiling.
    pub fn with_image_max_attempts(mut self, attempts: usize) -> Self {
        self.image_max_attempts = attempts.max(1);
        self
    }

    /// Set the fallback category id.
    pub fn with_default_category(mut self, id: u64) -> Self {
        self.default_category_id = id;
        self
    }

    /// Replace the author roster.
    pub fn with_authors(mut self, authors: Vec<AuthorPersona>, default_id: u32) -> Self {
        self.authors = authors;
        self.default_author_id = default_id;
        self
    }

    /// The roster persona with the given id, if present.
    pub fn author_by_id(&self, id: u32) -> Option<&AuthorPersona> {
        self.authors.iter().find(|a| a.id == id)
    }

    /// The fallback persona. Panics only on a misconfigured roster, which
    /// `validate` rejects at construction time.
    pub fn default_author(&self) -> &AuthorPersona {
        self.author_by_id(self.default_author_id)
            .unwrap_or(&self.authors[0])
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.authors.is_empty() {
            return Err(crate::error::EngineError::Config(
                "author roster is empty".to_string(),
            ));
        }
        if self.embedding_dim == 0 {
            return Err(crate::error::EngineError::Config(
                "embedding_dim must be positive".to_string(),
            ));
        }
        let (lo, hi) = self.candidate_phrase_range;
        if lo == 0 || lo > hi {
            return Err(crate::error::EngineError::Config(format!(
                "invalid candidate phrase range {}..={}",
                lo, hi
            )));
        }
        Ok(())
    }
}

fn default_roster() -> Vec<AuthorPersona> {
    vec![
        AuthorPersona::new(
            1,
            "Jordan Hale",
            "Product reviewer with a decade of hands-on testing across consumer gear.",
        ),
        AuthorPersona::new(
            2,
            "Priya Raman",
            "Former industry analyst who writes practical, numbers-first buying advice.",
        ),
        AuthorPersona::new(
            3,
            "Sam Okafor",
            "Longtime hobbyist and teacher who explains technical topics plainly.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_author().id, 1);
    }

    #[test]
    fn test_builder_methods() {
        let config = EngineConfig::new()
            .with_similarity_threshold(0.9)
            .with_video_probability(1.5)
            .with_image_max_attempts(0);

        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.video_probability, 1.0); // clamped
        assert_eq!(config.image_max_attempts, 1); // floored
    }

    #[test]
    fn test_validate_rejects_empty_roster() {
        let config = EngineConfig::new().with_authors(vec![], 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_phrase_range() {
        let mut config = EngineConfig::new();
        config.candidate_phrase_range = (3, 2);
        assert!(config.validate().is_err());
    }
}
