//! External citation insertion.
//!
//! For each eligible section: ask the model for candidate anchor phrases
//! drawn verbatim from the section's plain text, then resolve each
//! candidate to a citation URL via search, dedup against the whole
//! article, and wrap the first linkable occurrence in an anchor. Any
//! failure skips the candidate, never the section or the run.

use rand::Rng;
use tracing::{debug, warn};

use crate::html::{insert_anchor, phrase_present, sentence_around};
use crate::pipeline::enrich::{should_skip, Concern, EnrichCtx};
use crate::pipeline::{decode, prompts};
use crate::traits::searcher::SearchKind;
use crate::types::outline::ArticleMeta;
use crate::types::section::{Section, SectionBody};

/// Keys the model has been seen using for the phrase list.
const PHRASE_KEYS: &[&str] = &["phrases", "citations", "essential_citations", "key_phrases"];

pub(crate) async fn insert_external_links(
    ctx: &EnrichCtx<'_>,
    sections: &mut [Section],
    meta: &ArticleMeta,
) {
    for section in sections.iter_mut() {
        if should_skip(section, Concern::Links) {
            continue;
        }
        let Some(text) = section.plain_text() else {
            continue;
        };
        if text.len() < ctx.config.min_section_chars_for_links {
            debug!(section = %section.name, "too little text for citations");
            continue;
        }

        let phrases = match candidate_phrases(ctx, section, &text).await {
            Ok(phrases) => phrases,
            Err(e) => {
                warn!(section = %section.name, error = %e, "phrase generation failed");
                continue;
            }
        };

        let mut inserted = 0;
        for phrase in phrases {
            if inserted >= ctx.config.links_per_section {
                break;
            }
            if link_candidate(ctx, section, meta, &text, &phrase).await {
                inserted += 1;
            }
        }
    }
}

async fn candidate_phrases(
    ctx: &EnrichCtx<'_>,
    section: &Section,
    text: &str,
) -> crate::error::Result<Vec<String>> {
    let count = {
        let (lo, hi) = ctx.config.candidate_phrase_range;
        ctx.rng.lock().unwrap().random_range(lo..=hi)
    };
    let prompt = prompts::fill(
        prompts::ANCHOR_PHRASES_PROMPT,
        &[
            ("section_name", &section.name),
            ("text", text),
            ("count", &count.to_string()),
        ],
    );
    let response = ctx
        .completion
        .complete_json(prompts::SYSTEM_PLANNER, &prompt)
        .await?;
    Ok(decode::string_list(&response, PHRASE_KEYS))
}

/// Try to turn one candidate phrase into an inserted citation link.
/// Returns true only when an anchor was actually committed.
async fn link_candidate(
    ctx: &EnrichCtx<'_>,
    section: &mut Section,
    meta: &ArticleMeta,
    original_text: &str,
    phrase: &str,
) -> bool {
    let Some(html) = section.body.html() else {
        return false;
    };

    // The phrase must still occur in linkable text; earlier insertions
    // may have consumed it.
    if !phrase_present(html, phrase) {
        debug!(section = %section.name, phrase, "phrase no longer present");
        return false;
    }

    // Context window comes from the original plain text, not the
    // accumulating HTML.
    let Some(context) = sentence_around(original_text, phrase) else {
        return false;
    };

    let query_prompt = prompts::fill(
        prompts::CITATION_QUERY_PROMPT,
        &[
            ("title", &meta.title),
            ("section_name", &section.name),
            ("phrase", phrase),
            ("context", context),
        ],
    );
    let query = match ctx
        .completion
        .complete(prompts::SYSTEM_PLANNER, &query_prompt)
        .await
    {
        Ok(q) => q.trim().trim_matches('"').to_string(),
        Err(e) => {
            warn!(section = %section.name, phrase, error = %e, "citation query failed");
            return false;
        }
    };
    if query.is_empty() {
        return false;
    }

    let hits = match ctx
        .searcher
        .search(&query, SearchKind::Web, ctx.config.search_result_limit)
        .await
    {
        Ok(hits) if !hits.is_empty() => hits,
        Ok(_) => return false,
        Err(e) => {
            warn!(section = %section.name, phrase, error = %e, "citation search failed");
            return false;
        }
    };

    let candidates: Vec<String> = hits
        .iter()
        .map(|h| {
            format!(
                "{} — {} ({})",
                h.title,
                h.snippet.as_deref().unwrap_or(""),
                h.url
            )
        })
        .collect();
    let pick_prompt = prompts::fill(
        prompts::CITATION_PICK_PROMPT,
        &[
            ("phrase", phrase),
            ("candidates", &prompts::numbered_candidates(&candidates)),
        ],
    );
    let picked_url = match ctx
        .completion
        .complete_json(prompts::SYSTEM_PLANNER, &pick_prompt)
        .await
    {
        Ok(response) => decode::string_field(&response, &["url", "link"]),
        Err(e) => {
            warn!(section = %section.name, phrase, error = %e, "citation pick failed");
            return false;
        }
    };
    let Some(picked_url) = picked_url.filter(|u| u != "none") else {
        return false;
    };

    // The pick must be one of the offered results, not an invention.
    if !hits.iter().any(|h| h.url == picked_url) {
        debug!(section = %section.name, url = %picked_url, "pick not among candidates");
        return false;
    }

    // One article never cites the same URL twice.
    if ctx.store.external_url_used(&picked_url) {
        debug!(section = %section.name, url = %picked_url, "duplicate citation rejected");
        return false;
    }

    let Some(updated) = insert_anchor(html, phrase, &picked_url) else {
        return false;
    };
    if !ctx.store.claim_external_url(&picked_url) {
        // Lost a claim race; leave the section untouched
        return false;
    }
    section.body = SectionBody::Html(updated);
    debug!(section = %section.name, phrase, url = %picked_url, "citation inserted");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::enrich::EnrichmentStage;
    use crate::store::ContentStore;
    use crate::testing::{MockCms, MockCompletion, MockFetcher};
    use crate::traits::searcher::MockWebSearcher;
    use crate::types::config::EngineConfig;
    use crate::types::keyword::ArticleType;
    use crate::types::section::{SectionKind, SectionTag};
    use serde_json::json;

    fn meta() -> ArticleMeta {
        ArticleMeta {
            title: "Guitar History".into(),
            slug: "guitar-history".into(),
            excerpt: "E".into(),
            article_type: ArticleType::Informational,
            author_id: 1,
            keyword: "guitar history".into(),
        }
    }

    fn prose_section(index: u32, name: &str, html: &str) -> Section {
        Section {
            name: name.to_string(),
            kind: SectionKind::Chapter,
            index,
            tag: SectionTag::None,
            is_container: false,
            parent_name: None,
            headline: None,
            author_info: None,
            hook_text: None,
            semantic_keywords: vec![],
            target_length: None,
            model_role: None,
            body: SectionBody::Html(html.to_string()),
        }
    }

    fn long_html(phrase: &str) -> String {
        format!(
            "<p>The guitar has a {}. Antonio de Torres Jurado changed its design. {}</p>",
            phrase,
            "Filler sentence to cross the minimum text threshold. ".repeat(6)
        )
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.candidate_phrase_range = (1, 1);
        config
    }

    #[tokio::test]
    async fn test_link_inserted_and_recorded() {
        let completion = MockCompletion::new()
            .with_json_response("phrases worth citing", json!({"phrases": ["rich history"]}))
            .with_text_response("web search query", "history of the guitar")
            .with_json_response(
                "single best source",
                json!({"url": "https://museum.example.org/guitar"}),
            );
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Web,
            "history of the guitar",
            &["https://museum.example.org/guitar", "https://other.example.com"],
        );
        let cms = MockCms::new();
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = config();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(7);

        let mut sections = vec![prose_section(3, "Origins", &long_html("rich history"))];
        insert_external_links(&stage.ctx, &mut sections, &meta()).await;

        let html = sections[0].body.html().unwrap();
        assert!(html.contains("<a href=\"https://museum.example.org/guitar\">rich history</a>"));
        // Exactly one new entry in the used-URL memory
        assert_eq!(store.external_url_count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected_across_sections() {
        let completion = MockCompletion::new()
            .with_json_response(
                "phrases worth citing",
                json!({"phrases": ["digital modeling technology"]}),
            )
            .with_text_response("web search query", "digital modeling amps")
            .with_json_response(
                "single best source",
                json!({"url": "https://amps.example.org/modeling"}),
            );
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Web,
            "digital modeling amps",
            &["https://amps.example.org/modeling"],
        );
        let cms = MockCms::new();
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = config();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(7);

        let mut sections = vec![
            prose_section(3, "Amps", &long_html("digital modeling technology")),
            prose_section(4, "Effects", &long_html("digital modeling technology")),
        ];
        insert_external_links(&stage.ctx, &mut sections, &meta()).await;

        // First section got the link; second was rejected as a duplicate
        assert!(sections[0].body.html().unwrap().contains("<a href"));
        assert!(!sections[1].body.html().unwrap().contains("<a href"));
        assert_eq!(store.external_url_count(), 1);
    }

    #[tokio::test]
    async fn test_short_sections_are_skipped() {
        let completion = MockCompletion::new();
        let searcher = MockWebSearcher::new();
        let cms = MockCms::new();
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = config();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(7);

        let mut sections = vec![prose_section(3, "Tiny", "<p>Too short.</p>")];
        insert_external_links(&stage.ctx, &mut sections, &meta()).await;

        assert_eq!(completion.json_calls(), 0);
        assert_eq!(store.external_url_count(), 0);
    }

    #[tokio::test]
    async fn test_invented_url_is_rejected() {
        let completion = MockCompletion::new()
            .with_json_response("phrases worth citing", json!({"phrases": ["rich history"]}))
            .with_text_response("web search query", "history of the guitar")
            .with_json_response(
                "single best source",
                json!({"url": "https://not-in-results.example.com"}),
            );
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Web,
            "history of the guitar",
            &["https://museum.example.org/guitar"],
        );
        let cms = MockCms::new();
        let fetcher = MockFetcher::new();
        let store = ContentStore::new();
        let config = config();
        let stage = EnrichmentStage::new(&completion, &searcher, &cms, &fetcher, &store, &config)
            .with_seed(7);

        let mut sections = vec![prose_section(3, "Origins", &long_html("rich history"))];
        insert_external_links(&stage.ctx, &mut sections, &meta()).await;

        assert!(!sections[0].body.html().unwrap().contains("<a href"));
        assert_eq!(store.external_url_count(), 0);
    }
}
