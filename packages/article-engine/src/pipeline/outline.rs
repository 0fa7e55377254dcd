//! Outline stage: draft tree, enrichment pass, and deterministic
//! flattening.
//!
//! Flattening is the single authority for `index`, `tag`, and container
//! status. Everything downstream dispatches on what it assigns here.

use tracing::{debug, warn};

use crate::html::slugify;
use crate::pipeline::prompts;
use crate::traits::completion::TextCompletion;
use crate::types::keyword::{ArticleType, PreparationResult};
use crate::types::outline::{ArticleMeta, DraftChapter, OutlineDraft, OutlineResult};
use crate::types::section::{Section, SectionBody, SectionKind, SectionTag};

/// The outline stage.
pub struct OutlineStage<'a> {
    completion: &'a dyn TextCompletion,
}

impl<'a> OutlineStage<'a> {
    pub fn new(completion: &'a dyn TextCompletion) -> Self {
        Self { completion }
    }

    /// Build the outline for a prepared keyword.
    ///
    /// Returns None when the model produced no usable chapters — a fatal
    /// condition for the run.
    pub async fn build(&self, prep: &PreparationResult) -> Option<OutlineResult> {
        let draft = match self.draft_outline(prep).await {
            Ok(draft) => draft,
            Err(e) => {
                warn!(keyword = %prep.keyword, error = %e, "outline draft failed");
                return None;
            }
        };
        if draft.chapters.is_empty() {
            warn!(keyword = %prep.keyword, "outline draft has zero chapters");
            return None;
        }

        // Second pass adds author_info/hook_text; fall back to the plain
        // draft when it fails or comes back with a different shape.
        let enriched = match self.enrich_outline(&draft, prep).await {
            Ok(enriched) if same_shape(&draft.chapters, &enriched.chapters) => enriched,
            Ok(_) => {
                warn!(keyword = %prep.keyword, "enrichment reshaped the outline; using draft");
                draft.clone()
            }
            Err(e) => {
                warn!(keyword = %prep.keyword, error = %e, "outline enrichment failed; using draft");
                draft.clone()
            }
        };

        let slug = if enriched.slug.trim().is_empty() {
            slugify(&enriched.title)
        } else {
            slugify(&enriched.slug)
        };
        let meta = ArticleMeta {
            title: enriched.title.clone(),
            slug,
            excerpt: enriched.excerpt.clone(),
            article_type: prep.analysis.article_type.clone(),
            author_id: prep.author.id,
            keyword: prep.keyword.clone(),
        };

        let sections = flatten_outline(&enriched, &meta.article_type);
        if sections.is_empty() {
            warn!(keyword = %prep.keyword, "flattening produced zero sections");
            return None;
        }
        debug!(
            keyword = %prep.keyword,
            sections = sections.len(),
            article_type = ?meta.article_type,
            "outline ready"
        );

        Some(OutlineResult { meta, sections })
    }

    async fn draft_outline(&self, prep: &PreparationResult) -> crate::error::Result<OutlineDraft> {
        let template = if prep.analysis.article_type.is_product_list() {
            prompts::OUTLINE_PRODUCTS_PROMPT
        } else {
            prompts::OUTLINE_INFORMATIONAL_PROMPT
        };
        let prompt = prompts::fill(
            template,
            &[
                ("keyword", &prep.keyword),
                ("search_intent", &prep.analysis.search_intent),
                ("framework", &prep.analysis.model_framework),
                ("semantic_keywords", &prep.analysis.semantic_keywords.join(", ")),
            ],
        );
        let response = self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn enrich_outline(
        &self,
        draft: &OutlineDraft,
        prep: &PreparationResult,
    ) -> crate::error::Result<OutlineDraft> {
        let author = format!("{} — {}", prep.author.name, prep.author.bio);
        let outline_json = serde_json::to_string_pretty(draft)?;
        let prompt = prompts::fill(
            prompts::OUTLINE_ENRICH_PROMPT,
            &[("author", &author), ("outline", &outline_json)],
        );
        let response = self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await?;
        Ok(serde_json::from_value(response)?)
    }
}

/// Whether two chapter lists have the same chapter/subchapter skeleton.
fn same_shape(a: &[DraftChapter], b: &[DraftChapter]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.subchapters.len() == y.subchapters.len())
}

/// Whether a chapter name indicates FAQ content.
fn is_faq_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("faq") || lower.contains("frequently asked")
}

/// Flatten the outline tree into the ordered section list.
///
/// Pure function of tree shape + article type:
/// - sequential 1-based `index` in document order;
/// - first chapter tagged Introduction, last Conclusion;
/// - second-to-last tagged Faqs when its name indicates FAQ content;
/// - for product-list articles, the second chapter is TopRated and its
///   subchapters Product;
/// - a chapter with subchapters is a container and gets
///   `SectionBody::Container` unless its tag is structural.
pub fn flatten_outline(draft: &OutlineDraft, article_type: &ArticleType) -> Vec<Section> {
    let chapter_count = draft.chapters.len();
    let mut sections = Vec::new();
    let mut index: u32 = 0;

    for (i, chapter) in draft.chapters.iter().enumerate() {
        let tag = if i == 0 {
            SectionTag::Introduction
        } else if i + 1 == chapter_count {
            SectionTag::Conclusion
        } else if article_type.is_product_list() && i == 1 {
            SectionTag::TopRated
        } else if i + 2 == chapter_count && is_faq_name(&chapter.name) {
            SectionTag::Faqs
        } else {
            SectionTag::None
        };

        let is_container = !chapter.subchapters.is_empty();
        let body = if is_container && !tag.is_structural() {
            SectionBody::Container
        } else {
            SectionBody::Pending
        };

        index += 1;
        sections.push(Section {
            name: chapter.name.clone(),
            kind: SectionKind::Chapter,
            index,
            tag,
            is_container,
            parent_name: None,
            headline: None,
            author_info: chapter.author_info.clone(),
            hook_text: chapter.hook_text.clone(),
            semantic_keywords: chapter.semantic_keywords.clone(),
            target_length: chapter.target_length,
            model_role: chapter.model_role.clone(),
            body,
        });

        for sub in &chapter.subchapters {
            let sub_tag = if tag == SectionTag::TopRated {
                SectionTag::Product
            } else {
                SectionTag::None
            };
            index += 1;
            sections.push(Section {
                name: sub.name.clone(),
                kind: SectionKind::Subchapter,
                index,
                tag: sub_tag,
                is_container: false,
                parent_name: Some(chapter.name.clone()),
                headline: sub.headline.clone(),
                author_info: sub.author_info.clone(),
                hook_text: sub.hook_text.clone(),
                semantic_keywords: sub.semantic_keywords.clone(),
                target_length: sub.target_length,
                model_role: sub.model_role.clone(),
                body: SectionBody::Pending,
            });
        }
    }

    sections
}
