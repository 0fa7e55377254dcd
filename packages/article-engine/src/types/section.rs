//! Flattened section types and per-section enrichment records.
//!
//! The flattening step in the outline stage is the single authority that
//! assigns `index`, `tag`, and container status. Every later stage keys its
//! work by `index` and dispatches on the closed enums here instead of
//! re-deriving roles from names.

use serde::{Deserialize, Serialize};

/// Whether a section is a top-level chapter or a nested subchapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    Chapter,
    Subchapter,
}

/// Closed-set role label driving template choice and skip predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectionTag {
    Introduction,
    Conclusion,
    Faqs,
    /// The product-list header chapter (list-of-products articles only)
    TopRated,
    /// A single product review under the TopRated chapter
    Product,
    /// No special role
    #[default]
    None,
}

impl SectionTag {
    /// Tags whose sections never receive inline media or citations.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SectionTag::Introduction | SectionTag::Conclusion | SectionTag::Faqs
        )
    }
}

/// Section prose state.
///
/// `Container` marks a chapter that exists purely to hold subchapters and
/// intentionally has no prose; `Failed` marks a generation failure. The
/// two are distinct so assembly and enrichment can tell "skip by design"
/// from "model let us down".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionBody {
    /// Not yet written
    Pending,

    /// Navigational wrapper, no prose by design
    Container,

    /// Generation failed; treated as "no content" downstream
    Failed,

    /// Generated HTML prose
    Html(String),
}

impl SectionBody {
    /// The HTML content, if any was successfully generated.
    pub fn html(&self) -> Option<&str> {
        match self {
            SectionBody::Html(html) => Some(html),
            _ => None,
        }
    }

    /// Whether the section holds usable prose.
    pub fn is_written(&self) -> bool {
        matches!(self, SectionBody::Html(_))
    }
}

/// One chapter or subchapter of the final article.
///
/// `index` is 1-based document order and is the cross-stage join key:
/// image records, video records, and assembly all key by it, so it must
/// stay stable once assigned by flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Section heading text
    pub name: String,

    /// Chapter or subchapter
    pub kind: SectionKind,

    /// 1-based position in final document order
    pub index: u32,

    /// Role label assigned by flattening
    pub tag: SectionTag,

    /// True when the chapter exists only to group subchapters
    pub is_container: bool,

    /// Owning chapter name (subchapters only)
    pub parent_name: Option<String>,

    /// Optional display headline (product subchapters)
    pub headline: Option<String>,

    /// Author voice notes for the writing prompt
    pub author_info: Option<String>,

    /// Narrative hook for the writing prompt
    pub hook_text: Option<String>,

    /// Related terms to weave into this section
    pub semantic_keywords: Vec<String>,

    /// Target word count
    pub target_length: Option<u32>,

    /// Prompt role description from the outline
    pub model_role: Option<String>,

    /// Prose state
    pub body: SectionBody,
}

impl Section {
    /// Plain text of the section's prose (tags stripped), if written.
    pub fn plain_text(&self) -> Option<String> {
        self.body.html().map(crate::html::strip_tags)
    }
}

/// Why a section ended up with or without an image.
///
/// Any non-`Uploaded` outcome means "no image for this section" and is
/// never escalated to a pipeline failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageOutcome {
    /// Uploaded to the CMS media library
    Uploaded {
        /// CMS-hosted URL
        url: String,
        /// Alt text derived from the section
        alt_text: String,
    },

    /// Section type never receives images
    SkippedSectionType,

    /// Image search returned nothing usable
    NoneFound,

    /// All candidates failed or attempts were exhausted
    Failed(String),
}

impl ImageOutcome {
    /// The uploaded URL, if the outcome was a success.
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageOutcome::Uploaded { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Per-section image enrichment record, keyed by section index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub index: u32,
    pub outcome: ImageOutcome,
}

/// Per-section video enrichment record, keyed by section index.
///
/// `None` means no video was inserted — whether skipped by predicate,
/// skipped by the probability draw, or simply not found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub index: u32,
    pub video_id: Option<String>,
}
