//! Keyword preparation types: personas, analysis, and the preparation result.

use serde::{Deserialize, Serialize};

/// An author persona from the configured roster.
///
/// Selected once per article and attached to every section's writing
/// prompt for a consistent voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorPersona {
    /// Stable roster id (also the CMS author id)
    pub id: u32,

    /// Display name
    pub name: String,

    /// Short biography used for voice grounding in prompts
    pub bio: String,
}

impl AuthorPersona {
    /// Create a new persona.
    pub fn new(id: u32, name: impl Into<String>, bio: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bio: bio.into(),
        }
    }
}

/// The article shape the keyword calls for.
///
/// Drives outline template and content template selection. Unrecognized
/// model output is preserved in `Other` rather than failing the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArticleType {
    /// Ranked product roundup ("best X for Y")
    ListOfProducts,

    /// How-to / explainer content
    Informational,

    /// Anything else the model labeled
    Other(String),
}

impl ArticleType {
    /// Whether this article carries a ranked product list.
    pub fn is_product_list(&self) -> bool {
        matches!(self, ArticleType::ListOfProducts)
    }
}

impl From<String> for ArticleType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ListOfProducts" => ArticleType::ListOfProducts,
            "Informational" => ArticleType::Informational,
            _ => ArticleType::Other(s),
        }
    }
}

impl From<ArticleType> for String {
    fn from(t: ArticleType) -> Self {
        match t {
            ArticleType::ListOfProducts => "ListOfProducts".to_string(),
            ArticleType::Informational => "Informational".to_string(),
            ArticleType::Other(s) => s,
        }
    }
}

/// Structured keyword analysis returned by the model.
///
/// Every later stage depends on this field set; a response missing any
/// required field fails the preparation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordAnalysis {
    /// What the searcher is trying to accomplish
    pub search_intent: String,

    /// The content format the SERP rewards (listicle, guide, review...)
    pub content_format: String,

    /// Article shape selector
    pub article_type: ArticleType,

    /// Copywriting framework the outline should follow
    pub model_framework: String,

    /// Related terms to weave into sections, in priority order
    #[serde(default)]
    pub semantic_keywords: Vec<String>,
}

/// Output of the keyword preparation stage.
///
/// Only constructed when the keyword passed both the suitability and
/// uniqueness checks; the stage returns no result otherwise.
#[derive(Debug, Clone)]
pub struct PreparationResult {
    /// The original keyword, unmodified
    pub keyword: String,

    /// The persona chosen for this article
    pub author: AuthorPersona,

    /// Concatenated competitor titles/snippets, if the search returned any
    pub serp_context: Option<String>,

    /// Structured keyword analysis
    pub analysis: KeywordAnalysis,
}
