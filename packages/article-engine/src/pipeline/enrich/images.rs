//! Image selection, processing, and CMS upload.
//!
//! One image search per section (cached for the whole attempt loop), then
//! a bounded pick → download → resize → upload loop over the candidates.
//! URLs that fail anywhere go into the process-wide failed set so no
//! later section retries them.

use tracing::{debug, warn};

use crate::media::{image_filename, prepare_image};
use crate::pipeline::enrich::{should_skip, Concern, EnrichCtx};
use crate::pipeline::{decode, prompts};
use crate::traits::searcher::{SearchHit, SearchKind};
use crate::types::outline::ArticleMeta;
use crate::types::section::{ImageOutcome, ImageRecord, Section};

pub(crate) async fn select_images(
    ctx: &EnrichCtx<'_>,
    sections: &[Section],
    meta: &ArticleMeta,
) -> Vec<ImageRecord> {
    let mut records = Vec::with_capacity(sections.len());
    for section in sections {
        let outcome = if should_skip(section, Concern::Images) {
            ImageOutcome::SkippedSectionType
        } else {
            image_for_section(ctx, section, meta).await
        };
        records.push(ImageRecord {
            index: section.index,
            outcome,
        });
    }
    records
}

async fn image_for_section(
    ctx: &EnrichCtx<'_>,
    section: &Section,
    meta: &ArticleMeta,
) -> ImageOutcome {
    let phrase = match search_phrase(ctx, section, meta).await {
        Ok(p) => p,
        Err(e) => {
            warn!(section = %section.name, error = %e, "image phrase generation failed");
            return ImageOutcome::Failed("phrase_generation".to_string());
        }
    };

    // One search per section; the attempt loop reuses these results.
    let hits = match ctx
        .searcher
        .search(&phrase, SearchKind::Image, ctx.config.search_result_limit)
        .await
    {
        Ok(hits) => hits,
        Err(e) => {
            warn!(section = %section.name, error = %e, "image search failed");
            return ImageOutcome::Failed("search".to_string());
        }
    };
    if hits.is_empty() {
        return ImageOutcome::NoneFound;
    }

    for _attempt in 0..ctx.config.image_max_attempts {
        let candidates: Vec<&SearchHit> = hits
            .iter()
            .filter(|h| !ctx.store.image_failed(&h.url) && !ctx.store.image_source_used(&h.url))
            .collect();
        if candidates.is_empty() {
            break;
        }

        let chosen = match pick_candidate(ctx, section, &candidates).await {
            Ok(Some(hit)) => hit,
            // The model saw the remaining options and declined them all
            Ok(None) => return ImageOutcome::NoneFound,
            Err(e) => {
                warn!(section = %section.name, error = %e, "image pick failed");
                continue;
            }
        };

        match download_and_upload(ctx, section, meta, chosen, &phrase).await {
            Ok(outcome) => return outcome,
            Err(reason) => {
                debug!(section = %section.name, url = %chosen.url, reason, "image candidate failed");
                ctx.store.mark_image_failed(&chosen.url);
            }
        }
    }

    ImageOutcome::Failed("max_attempts_or_no_options".to_string())
}

async fn search_phrase(
    ctx: &EnrichCtx<'_>,
    section: &Section,
    meta: &ArticleMeta,
) -> crate::error::Result<String> {
    let parent_line = section
        .parent_name
        .as_deref()
        .map(|p| format!("\nChapter: {}", p))
        .unwrap_or_default();
    let prompt = prompts::fill(
        prompts::IMAGE_QUERY_PROMPT,
        &[
            ("title", &meta.title),
            ("section_name", &section.name),
            ("parent_line", &parent_line),
        ],
    );
    let phrase = ctx
        .completion
        .complete(prompts::SYSTEM_PLANNER, &prompt)
        .await?;
    Ok(phrase.trim().trim_matches('"').to_string())
}

async fn pick_candidate<'h>(
    ctx: &EnrichCtx<'_>,
    section: &Section,
    candidates: &[&'h SearchHit],
) -> crate::error::Result<Option<&'h SearchHit>> {
    let lines: Vec<String> = candidates
        .iter()
        .map(|h| {
            format!(
                "{} — {} ({})",
                h.title,
                h.channel.as_deref().unwrap_or("unknown source"),
                h.url
            )
        })
        .collect();
    let prompt = prompts::fill(
        prompts::IMAGE_PICK_PROMPT,
        &[
            ("section_name", &section.name),
            ("candidates", &prompts::numbered_candidates(&lines)),
        ],
    );
    let response = ctx
        .completion
        .complete_json(prompts::SYSTEM_PLANNER, &prompt)
        .await?;

    Ok(decode::choice_index(&response, &["choice", "selection"])
        .and_then(|i| candidates.get(i).copied()))
}

/// Download, validate, resize, and upload one candidate. The error string
/// is a short reason for the failed-URL log line.
async fn download_and_upload(
    ctx: &EnrichCtx<'_>,
    section: &Section,
    meta: &ArticleMeta,
    hit: &SearchHit,
    phrase: &str,
) -> Result<ImageOutcome, String> {
    let media = ctx
        .fetcher
        .fetch(&hit.url)
        .await
        .map_err(|e| format!("download: {}", e))?;

    if !media.content_type.starts_with("image/") {
        return Err(format!("not an image: {}", media.content_type));
    }

    let processed = prepare_image(
        &media.bytes,
        ctx.config.image_max_width,
        ctx.config.image_encoding,
    )
    .map_err(|e| format!("processing: {}", e))?;

    let filename = image_filename(&meta.slug, section.index, ctx.config.image_encoding);
    let uploaded = ctx
        .cms
        .upload_media(processed, &filename, ctx.config.image_encoding.mime())
        .await
        .map_err(|e| format!("upload: {}", e))?;

    // Claim the source URL only after the upload stuck
    if !ctx.store.claim_image_source(&hit.url) {
        return Err("source claimed by another section".to_string());
    }

    debug!(section = %section.name, source = %hit.url, cms_url = %uploaded.url, "image uploaded");
    Ok(ImageOutcome::Uploaded {
        url: uploaded.url,
        alt_text: phrase.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::enrich::EnrichmentStage;
    use crate::store::ContentStore;
    use crate::testing::{tiny_png, MockCms, MockCompletion, MockFetcher};
    use crate::traits::searcher::MockWebSearcher;
    use crate::types::config::EngineConfig;
    use crate::types::keyword::ArticleType;
    use crate::types::section::{SectionBody, SectionKind, SectionTag};
    use serde_json::json;

    fn meta() -> ArticleMeta {
        ArticleMeta {
            title: "Best Budget Electric Guitars".into(),
            slug: "best-budget-electric-guitars".into(),
            excerpt: "E".into(),
            article_type: ArticleType::ListOfProducts,
            author_id: 1,
            keyword: "best budget electric guitars".into(),
        }
    }

    fn section(index: u32, name: &str, tag: SectionTag) -> Section {
        Section {
            name: name.to_string(),
            kind: SectionKind::Subchapter,
            index,
            tag,
            is_container: false,
            parent_name: Some("Top Rated Electric Guitars".to_string()),
            headline: None,
            author_info: None,
            hook_text: None,
            semantic_keywords: vec![],
            target_length: None,
            model_role: None,
            body: SectionBody::Html("<p>Prose.</p>".to_string()),
        }
    }

    fn scripted_completion() -> MockCompletion {
        MockCompletion::new()
            .with_text_response("image search phrase", "squier classic vibe guitar")
            .with_json_response("best photo", json!({"choice": 1}))
    }

    #[tokio::test]
    async fn test_image_uploaded_happy_path() {
        let completion = scripted_completion();
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Image,
            "squier classic vibe guitar",
            &["https://photos.example.com/squier.jpg"],
        );
        let cms = MockCms::new();
        let fetcher =
            MockFetcher::new().with_media("https://photos.example.com/squier.jpg", tiny_png(), "image/png");
        let store = ContentStore::new();
        let config = EngineConfig::default();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(1);

        let sections = vec![section(3, "Squier Classic Vibe", SectionTag::Product)];
        let records = select_images(&stage.ctx, &sections, &meta()).await;

        assert_eq!(records.len(), 1);
        let ImageOutcome::Uploaded { url, alt_text } = &records[0].outcome else {
            panic!("expected upload, got {:?}", records[0].outcome);
        };
        assert!(url.starts_with("https://cms.example.com/media/"));
        assert_eq!(alt_text, "squier classic vibe guitar");
        assert_eq!(records[0].index, 3);
        assert!(store.image_source_used("https://photos.example.com/squier.jpg"));
        // Uploaded with the slug-derived filename
        assert_eq!(cms.uploads()[0].0, "best-budget-electric-guitars-3.jpg");
    }

    #[tokio::test]
    async fn test_zero_results_is_none_found() {
        let completion = scripted_completion();
        let searcher = MockWebSearcher::new(); // no image results
        let cms = MockCms::new();
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = EngineConfig::default();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(1);

        let sections = vec![section(3, "Squier Classic Vibe", SectionTag::Product)];
        let records = select_images(&stage.ctx, &sections, &meta()).await;

        assert_eq!(records[0].outcome, ImageOutcome::NoneFound);
    }

    #[tokio::test]
    async fn test_structural_sections_get_skip_sentinel() {
        let completion = MockCompletion::new();
        let searcher = MockWebSearcher::new();
        let cms = MockCms::new();
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = EngineConfig::default();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(1);

        let sections = vec![section(1, "Introduction", SectionTag::Introduction)];
        let records = select_images(&stage.ctx, &sections, &meta()).await;

        assert_eq!(records[0].outcome, ImageOutcome::SkippedSectionType);
        assert_eq!(completion.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_download_marks_failed_and_exhausts() {
        let completion = scripted_completion();
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Image,
            "squier classic vibe guitar",
            &["https://photos.example.com/broken.jpg"],
        );
        let cms = MockCms::new();
        // Fetcher has no entry for the URL, so every fetch errors
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = EngineConfig::default();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(1);

        let sections = vec![section(3, "Squier Classic Vibe", SectionTag::Product)];
        let records = select_images(&stage.ctx, &sections, &meta()).await;

        assert_eq!(
            records[0].outcome,
            ImageOutcome::Failed("max_attempts_or_no_options".to_string())
        );
        assert!(store.image_failed("https://photos.example.com/broken.jpg"));
    }

    #[tokio::test]
    async fn test_non_image_content_type_rejected() {
        let completion = scripted_completion();
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Image,
            "squier classic vibe guitar",
            &["https://photos.example.com/page.html"],
        );
        let cms = MockCms::new();
        let fetcher = MockFetcher::new().with_media(
            "https://photos.example.com/page.html",
            b"<html></html>".to_vec(),
            "text/html",
        );
        let store = ContentStore::new();
        let config = EngineConfig::default();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(1);

        let sections = vec![section(3, "Squier Classic Vibe", SectionTag::Product)];
        let records = select_images(&stage.ctx, &sections, &meta()).await;

        assert!(matches!(records[0].outcome, ImageOutcome::Failed(_)));
        assert_eq!(cms.uploads().len(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_source_not_reused_across_sections() {
        let completion = scripted_completion();
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Image,
            "squier classic vibe guitar",
            &["https://photos.example.com/squier.jpg"],
        );
        let cms = MockCms::new();
        let fetcher =
            MockFetcher::new().with_media("https://photos.example.com/squier.jpg", tiny_png(), "image/png");
        let store = ContentStore::new();
        let config = EngineConfig::default();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(1);

        // Both sections generate the same phrase and see the same results
        let sections = vec![
            section(3, "Squier Classic Vibe", SectionTag::Product),
            section(4, "Squier Classic Vibe", SectionTag::Product),
        ];
        let records = select_images(&stage.ctx, &sections, &meta()).await;

        assert!(matches!(records[0].outcome, ImageOutcome::Uploaded { .. }));
        // Second section found its only candidate already used
        assert!(matches!(
            records[1].outcome,
            ImageOutcome::Failed(_) | ImageOutcome::NoneFound
        ));
        assert_eq!(store.image_source_count(), 1);
    }
}
