//! Content writing stage: one prose call per non-container section.

use tracing::{debug, warn};

use crate::html::strip_code_fences;
use crate::pipeline::prompts;
use crate::traits::completion::TextCompletion;
use crate::types::keyword::PreparationResult;
use crate::types::outline::ArticleMeta;
use crate::types::section::{Section, SectionBody, SectionKind, SectionTag};

/// The content writing stage.
pub struct WritingStage<'a> {
    completion: &'a dyn TextCompletion,
}

impl<'a> WritingStage<'a> {
    pub fn new(completion: &'a dyn TextCompletion) -> Self {
        Self { completion }
    }

    /// Write prose for every pending section.
    ///
    /// A per-section failure records `SectionBody::Failed` and moves on;
    /// the batch never aborts. Returns the number of sections written.
    pub async fn write_all(
        &self,
        sections: &mut [Section],
        meta: &ArticleMeta,
        prep: &PreparationResult,
    ) -> usize {
        // Stable context shared across prompts
        let section_names = sections
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let product_names: Vec<String> = sections
            .iter()
            .filter(|s| s.tag == SectionTag::Product)
            .map(|s| s.name.clone())
            .collect();

        let mut written = 0;
        for i in 0..sections.len() {
            if sections[i].body != SectionBody::Pending {
                // Containers were settled at flatten time
                continue;
            }

            let prompt = build_prompt(&sections[i], meta, prep, &section_names, &product_names);
            match self
                .completion
                .complete(prompts::SYSTEM_WRITER, &prompt)
                .await
            {
                Ok(html) => {
                    let html = strip_code_fences(&html).to_string();
                    if html.is_empty() {
                        warn!(section = %sections[i].name, "empty prose response");
                        sections[i].body = SectionBody::Failed;
                    } else {
                        sections[i].body = SectionBody::Html(html);
                        written += 1;
                    }
                }
                Err(e) => {
                    warn!(section = %sections[i].name, error = %e, "prose generation failed");
                    sections[i].body = SectionBody::Failed;
                }
            }
        }

        debug!(written, total = sections.len(), "content writing complete");
        written
    }
}

/// Select and fill the template for one section.
fn build_prompt(
    section: &Section,
    meta: &ArticleMeta,
    prep: &PreparationResult,
    section_names: &str,
    product_names: &[String],
) -> String {
    let target_length = section
        .target_length
        .map(|n| n.to_string())
        .unwrap_or_else(|| "400".to_string());
    let author_info = section.author_info.as_deref().unwrap_or(&prep.author.bio);
    let hook_text = section.hook_text.as_deref().unwrap_or("");
    let semantic_keywords = section.semantic_keywords.join(", ");
    let model_role = section.model_role.as_deref().unwrap_or("");

    match (section.tag, section.kind) {
        (SectionTag::Introduction, _) => prompts::fill(
            prompts::INTRODUCTION_PROMPT,
            &[
                ("title", &meta.title),
                ("keyword", &meta.keyword),
                ("semantic_keywords", &semantic_keywords),
                ("author_info", author_info),
                ("hook_text", hook_text),
                ("section_names", section_names),
                ("target_length", &target_length),
            ],
        ),
        (SectionTag::Conclusion, _) => prompts::fill(
            prompts::CONCLUSION_PROMPT,
            &[
                ("title", &meta.title),
                ("keyword", &meta.keyword),
                ("author_info", author_info),
                ("target_length", &target_length),
            ],
        ),
        (SectionTag::Faqs, _) => {
            prompts::fill(prompts::FAQ_PROMPT, &[("title", &meta.title)])
        }
        (SectionTag::Product, _) => {
            let siblings = product_names
                .iter()
                .filter(|n| n.as_str() != section.name)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            prompts::fill(
                prompts::PRODUCT_PROMPT,
                &[
                    ("name", &section.name),
                    ("title", &meta.title),
                    ("headline", section.headline.as_deref().unwrap_or("")),
                    ("model_role", model_role),
                    ("author_info", author_info),
                    ("sibling_products", &siblings),
                    ("target_length", &target_length),
                ],
            )
        }
        (_, SectionKind::Chapter) => prompts::fill(
            prompts::CHAPTER_PROMPT,
            &[
                ("name", &section.name),
                ("title", &meta.title),
                ("model_role", model_role),
                ("keyword", &meta.keyword),
                ("semantic_keywords", &semantic_keywords),
                ("author_info", author_info),
                ("hook_text", hook_text),
                ("target_length", &target_length),
            ],
        ),
        (_, SectionKind::Subchapter) => prompts::fill(
            prompts::SUBCHAPTER_PROMPT,
            &[
                ("name", &section.name),
                ("parent_name", section.parent_name.as_deref().unwrap_or("")),
                ("title", &meta.title),
                ("model_role", model_role),
                ("keyword", &meta.keyword),
                ("semantic_keywords", &semantic_keywords),
                ("author_info", author_info),
                ("hook_text", hook_text),
                ("target_length", &target_length),
            ],
        ),
    }
}
