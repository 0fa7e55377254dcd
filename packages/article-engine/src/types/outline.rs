//! Outline draft tree (model output) and article-level metadata.

use serde::{Deserialize, Serialize};

use super::keyword::ArticleType;
use super::section::Section;

/// The outline tree as the model returns it, before flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineDraft {
    /// Final article title
    pub title: String,

    /// URL slug
    pub slug: String,

    /// Short excerpt for the CMS
    pub excerpt: String,

    /// Ordered chapters
    #[serde(default)]
    pub chapters: Vec<DraftChapter>,
}

/// A chapter in the draft tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftChapter {
    /// Chapter heading
    pub name: String,

    /// Prompt role description ("comparison", "buying guide"...)
    #[serde(default)]
    pub model_role: Option<String>,

    /// Target word count
    #[serde(default)]
    pub target_length: Option<u32>,

    /// Author voice notes (added by the enrichment call)
    #[serde(default)]
    pub author_info: Option<String>,

    /// Narrative hook (added by the enrichment call)
    #[serde(default)]
    pub hook_text: Option<String>,

    /// Related terms for this chapter
    #[serde(default)]
    pub semantic_keywords: Vec<String>,

    /// Ordered subchapters (empty for prose-only chapters)
    #[serde(default)]
    pub subchapters: Vec<DraftSubchapter>,
}

/// A subchapter in the draft tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSubchapter {
    /// Subchapter heading
    pub name: String,

    /// Optional display headline (product subchapters)
    #[serde(default)]
    pub headline: Option<String>,

    #[serde(default)]
    pub model_role: Option<String>,

    #[serde(default)]
    pub target_length: Option<u32>,

    #[serde(default)]
    pub author_info: Option<String>,

    #[serde(default)]
    pub hook_text: Option<String>,

    #[serde(default)]
    pub semantic_keywords: Vec<String>,
}

/// Article-level metadata derived once from the enriched outline.
///
/// Conceptually immutable; passed by reference into every later stage and
/// the external CMS/spreadsheet calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleMeta {
    /// Final title
    pub title: String,

    /// URL slug
    pub slug: String,

    /// Short excerpt
    pub excerpt: String,

    /// Article shape
    pub article_type: ArticleType,

    /// CMS author id (from the chosen persona)
    pub author_id: u32,

    /// The original keyword
    pub keyword: String,
}

/// Output of the outline stage: metadata plus the flattened section list.
#[derive(Debug, Clone)]
pub struct OutlineResult {
    pub meta: ArticleMeta,
    pub sections: Vec<Section>,
}
