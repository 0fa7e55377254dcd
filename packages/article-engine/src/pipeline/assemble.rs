//! Assembly stage: merge prose, media, and the comparison table into one
//! HTML document.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::html::{extract_table, slugify, strip_code_fences, unescape_entities};
use crate::pipeline::prompts;
use crate::traits::completion::TextCompletion;
use crate::types::outline::ArticleMeta;
use crate::types::section::{ImageRecord, Section, SectionKind, SectionTag, VideoRecord};

/// The assembly stage.
pub struct AssemblyStage<'a> {
    completion: &'a dyn TextCompletion,
}

impl<'a> AssemblyStage<'a> {
    pub fn new(completion: &'a dyn TextCompletion) -> Self {
        Self { completion }
    }

    /// Merge everything into the final document.
    ///
    /// `outline_sections` is the pre-content section list; the comparison
    /// table's product names come from there so content failures cannot
    /// change the table shape. Returns None when nothing emittable
    /// survived — fatal for the run.
    pub async fn assemble(
        &self,
        sections: &[Section],
        meta: &ArticleMeta,
        outline_sections: &[Section],
        images: &[ImageRecord],
        videos: &[VideoRecord],
    ) -> Option<String> {
        let mut table = None;
        if meta.article_type.is_product_list() {
            let product_names: Vec<String> = outline_sections
                .iter()
                .filter(|s| s.tag == SectionTag::Product)
                .map(|s| s.name.clone())
                .collect();
            if !product_names.is_empty() {
                table = self.comparison_table(meta, &product_names).await;
            }
        }

        let image_by_index: HashMap<u32, &ImageRecord> =
            images.iter().map(|r| (r.index, r)).collect();
        let video_by_index: HashMap<u32, &VideoRecord> =
            videos.iter().map(|r| (r.index, r)).collect();

        let mut ordered: Vec<&Section> = sections.iter().collect();
        ordered.sort_by_key(|s| s.index);

        let mut blocks: Vec<String> = Vec::new();
        let mut any_content = false;
        let mut table_emitted = false;

        for section in ordered {
            let mut parts: Vec<String> = Vec::new();

            // Heading (Introduction opens the article without one)
            match section.kind {
                SectionKind::Chapter if section.tag != SectionTag::Introduction => {
                    parts.push(format!(
                        "<h2 id=\"{}\">{}</h2>",
                        slugify(&section.name),
                        section.name
                    ));
                }
                SectionKind::Subchapter => {
                    parts.push(format!(
                        "<h3 id=\"{}\" style=\"text-align: center;\">{}</h3>",
                        slugify(&section.name),
                        section.name
                    ));
                    if let Some(headline) = &section.headline {
                        parts.push(format!("<h4>{}</h4>", headline));
                    }
                }
                SectionKind::Chapter => {}
            }

            // The comparison table goes exactly once, inside the first
            // container chapter
            if let Some(table_html) = &table {
                if !table_emitted && section.is_container {
                    parts.push(table_html.clone());
                    table_emitted = true;
                    any_content = true;
                }
            }

            if let Some(record) = image_by_index.get(&section.index) {
                if let crate::types::section::ImageOutcome::Uploaded { url, alt_text } =
                    &record.outcome
                {
                    parts.push(format!("<img src=\"{}\" alt=\"{}\" />", url, alt_text));
                    any_content = true;
                }
            }

            if let Some(html) = section.body.html() {
                parts.push(html.to_string());
                any_content = true;
            }

            if let Some(record) = video_by_index.get(&section.index) {
                if let Some(id) = &record.video_id {
                    parts.push(format!(
                        "<p><iframe width=\"560\" height=\"315\" \
                         src=\"https://www.youtube.com/embed/{}\" frameborder=\"0\" \
                         allowfullscreen></iframe></p>",
                        id
                    ));
                    any_content = true;
                }
            }

            if !parts.is_empty() {
                blocks.push(parts.join("\n"));
            }
        }

        if !any_content {
            warn!(keyword = %meta.keyword, "assembly produced no content");
            return None;
        }
        debug!(keyword = %meta.keyword, blocks = blocks.len(), "document assembled");
        Some(blocks.join("\n\n"))
    }

    /// Ask the model for the product comparison table, defensively
    /// cleaning the response. Failure degrades to no table.
    async fn comparison_table(
        &self,
        meta: &ArticleMeta,
        product_names: &[String],
    ) -> Option<String> {
        let prompt = prompts::fill(
            prompts::COMPARISON_TABLE_PROMPT,
            &[
                ("title", &meta.title),
                ("products", &product_names.join("\n")),
            ],
        );
        let raw = match self
            .completion
            .complete(prompts::SYSTEM_PLANNER, &prompt)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "comparison table generation failed");
                return None;
            }
        };

        let cleaned = unescape_entities(strip_code_fences(&raw));
        match extract_table(&cleaned) {
            Some(table) => Some(table.to_string()),
            None => {
                warn!("comparison table response held no <table> element");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;
    use crate::types::keyword::ArticleType;
    use crate::types::section::{ImageOutcome, SectionBody};

    fn meta(article_type: ArticleType) -> ArticleMeta {
        ArticleMeta {
            title: "Best Budget Electric Guitars".into(),
            slug: "best-budget-electric-guitars".into(),
            excerpt: "E".into(),
            article_type,
            author_id: 1,
            keyword: "best budget electric guitars".into(),
        }
    }

    fn section(
        index: u32,
        name: &str,
        kind: SectionKind,
        tag: SectionTag,
        is_container: bool,
        body: SectionBody,
    ) -> Section {
        Section {
            name: name.to_string(),
            kind,
            index,
            tag,
            is_container,
            parent_name: None,
            headline: None,
            author_info: None,
            hook_text: None,
            semantic_keywords: vec![],
            target_length: None,
            model_role: None,
            body,
        }
    }

    fn product_sections() -> Vec<Section> {
        vec![
            section(
                1,
                "Introduction",
                SectionKind::Chapter,
                SectionTag::Introduction,
                false,
                SectionBody::Html("<p>Intro.</p>".into()),
            ),
            section(
                2,
                "Top Rated Electric Guitars",
                SectionKind::Chapter,
                SectionTag::TopRated,
                true,
                SectionBody::Container,
            ),
            section(
                3,
                "Squier Classic Vibe",
                SectionKind::Subchapter,
                SectionTag::Product,
                false,
                SectionBody::Html("<p>Review.</p>".into()),
            ),
            section(
                4,
                "Conclusion",
                SectionKind::Chapter,
                SectionTag::Conclusion,
                false,
                SectionBody::Html("<p>Bye.</p>".into()),
            ),
        ]
    }

    #[tokio::test]
    async fn test_assemble_product_article_with_table() {
        let completion = MockCompletion::new().with_text_response(
            "comparison table",
            "```html\n<table><tr><td>Squier</td></tr></table>\n```",
        );
        let stage = AssemblyStage::new(&completion);
        let sections = product_sections();

        let html = stage
            .assemble(
                &sections,
                &meta(ArticleType::ListOfProducts),
                &sections,
                &[],
                &[],
            )
            .await
            .unwrap();

        // Intro has no heading; container chapter gets H2 + the table
        assert!(!html.contains("<h2 id=\"introduction\""));
        assert!(html.contains("<h2 id=\"top-rated-electric-guitars\">"));
        assert!(html.contains("<table><tr><td>Squier</td></tr></table>"));
        assert_eq!(html.matches("<table").count(), 1);
        // Subchapter heading is centered H3
        assert!(html.contains("<h3 id=\"squier-classic-vibe\" style=\"text-align: center;\">"));
        // Table sits between the container heading and the first product
        let table_at = html.find("<table").unwrap();
        let product_at = html.find("<h3").unwrap();
        assert!(table_at < product_at);

        // The table prompt received exactly the product names
        let prompt = completion
            .complete_prompts()
            .into_iter()
            .find(|p| p.contains("comparison table"))
            .unwrap();
        assert!(prompt.contains("Squier Classic Vibe"));
        assert!(!prompt.contains("Conclusion\n"));
    }

    #[tokio::test]
    async fn test_informational_article_has_no_table_call() {
        let completion = MockCompletion::new();
        let stage = AssemblyStage::new(&completion);
        let sections = vec![section(
            1,
            "Introduction",
            SectionKind::Chapter,
            SectionTag::Introduction,
            false,
            SectionBody::Html("<p>Intro.</p>".into()),
        )];

        let html = stage
            .assemble(
                &sections,
                &meta(ArticleType::Informational),
                &sections,
                &[],
                &[],
            )
            .await
            .unwrap();

        assert!(html.contains("<p>Intro.</p>"));
        assert_eq!(completion.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_sentinel_media_emits_nothing() {
        let completion = MockCompletion::new();
        let stage = AssemblyStage::new(&completion);
        let sections = vec![section(
            1,
            "Guide",
            SectionKind::Chapter,
            SectionTag::None,
            false,
            SectionBody::Html("<p>Guide.</p>".into()),
        )];
        let images = vec![ImageRecord {
            index: 1,
            outcome: ImageOutcome::NoneFound,
        }];
        let videos = vec![VideoRecord {
            index: 1,
            video_id: None,
        }];

        let html = stage
            .assemble(
                &sections,
                &meta(ArticleType::Informational),
                &sections,
                &images,
                &videos,
            )
            .await
            .unwrap();

        assert!(!html.contains("<img"));
        assert!(!html.contains("<iframe"));
    }

    #[tokio::test]
    async fn test_real_media_is_emitted_in_order() {
        let completion = MockCompletion::new();
        let stage = AssemblyStage::new(&completion);
        let sections = vec![section(
            1,
            "Guide",
            SectionKind::Chapter,
            SectionTag::None,
            false,
            SectionBody::Html("<p>Guide.</p>".into()),
        )];
        let images = vec![ImageRecord {
            index: 1,
            outcome: ImageOutcome::Uploaded {
                url: "https://cms.example.com/media/1.jpg".into(),
                alt_text: "a guide image".into(),
            },
        }];
        let videos = vec![VideoRecord {
            index: 1,
            video_id: Some("vid123".into()),
        }];

        let html = stage
            .assemble(
                &sections,
                &meta(ArticleType::Informational),
                &sections,
                &images,
                &videos,
            )
            .await
            .unwrap();

        let img_at = html.find("<img").unwrap();
        let prose_at = html.find("<p>Guide.</p>").unwrap();
        let video_at = html.find("youtube.com/embed/vid123").unwrap();
        assert!(img_at < prose_at && prose_at < video_at);
    }

    #[tokio::test]
    async fn test_failed_sections_emit_heading_only() {
        let completion = MockCompletion::new();
        let stage = AssemblyStage::new(&completion);
        let sections = vec![
            section(
                1,
                "Guide",
                SectionKind::Chapter,
                SectionTag::None,
                false,
                SectionBody::Html("<p>Guide.</p>".into()),
            ),
            section(
                2,
                "Broken",
                SectionKind::Chapter,
                SectionTag::None,
                false,
                SectionBody::Failed,
            ),
        ];

        let html = stage
            .assemble(
                &sections,
                &meta(ArticleType::Informational),
                &sections,
                &[],
                &[],
            )
            .await
            .unwrap();

        assert!(html.contains("<h2 id=\"broken\">Broken</h2>"));
        assert!(!html.contains("Failed"));
    }

    #[tokio::test]
    async fn test_all_empty_returns_none() {
        let completion = MockCompletion::new();
        let stage = AssemblyStage::new(&completion);
        let sections = vec![section(
            1,
            "Broken",
            SectionKind::Chapter,
            SectionTag::None,
            false,
            SectionBody::Failed,
        )];

        let html = stage
            .assemble(
                &sections,
                &meta(ArticleType::Informational),
                &sections,
                &[],
                &[],
            )
            .await;

        assert!(html.is_none());
    }
}
