//! Keyword preparation: suitability, uniqueness, persona, SERP context,
//! and structured analysis.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::html::slugify;
use crate::pipeline::{decode, prompts};
use crate::traits::completion::TextCompletion;
use crate::traits::searcher::{SearchKind, WebSearcher};
use crate::traits::spreadsheet::{columns, updates, SpreadsheetGateway};
use crate::traits::vector_index::{normalize_for_index, VectorIndexGateway};
use crate::types::config::EngineConfig;
use crate::types::keyword::{AuthorPersona, KeywordAnalysis, PreparationResult};

/// Outcome of the preparation stage.
///
/// `Unsuitable` and `NotUnique` are expected stops, not errors; `Failed`
/// covers infrastructure or malformed-response failures that prevent the
/// stage from producing a verdict at all.
#[derive(Debug)]
pub enum Prepared {
    Ready(PreparationResult),
    Unsuitable,
    NotUnique,
    Failed(String),
}

/// The keyword preparation stage.
pub struct PreparationStage<'a> {
    completion: &'a dyn TextCompletion,
    searcher: &'a dyn WebSearcher,
    vector_index: &'a dyn VectorIndexGateway,
    spreadsheet: &'a dyn SpreadsheetGateway,
    config: &'a EngineConfig,
}

impl<'a> PreparationStage<'a> {
    pub fn new(
        completion: &'a dyn TextCompletion,
        searcher: &'a dyn WebSearcher,
        vector_index: &'a dyn VectorIndexGateway,
        spreadsheet: &'a dyn SpreadsheetGateway,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            completion,
            searcher,
            vector_index,
            spreadsheet,
            config,
        }
    }

    /// Run the full preparation flow for one keyword.
    pub async fn prepare(&self, keyword: &str) -> Prepared {
        // 1. Suitability
        match self.check_suitability(keyword).await {
            Ok(true) => {}
            Ok(false) => {
                info!(keyword, "keyword rejected as unsuitable");
                self.mark_row(
                    keyword,
                    &[(columns::USED, columns::YES), (columns::SUITABLE, columns::NO)],
                )
                .await;
                return Prepared::Unsuitable;
            }
            Err(e) => return Prepared::Failed(format!("suitability check: {}", e)),
        }

        // 2. Uniqueness (fail-closed: infrastructure trouble counts as a
        // duplicate so we never publish one by accident)
        if !self.is_unique(keyword).await {
            info!(keyword, "keyword rejected as near-duplicate");
            self.mark_row(
                keyword,
                &[
                    (columns::USED, columns::YES),
                    (columns::SUITABLE, columns::YES),
                    (columns::UNIQUE, columns::NO),
                ],
            )
            .await;
            return Prepared::NotUnique;
        }
        self.mark_row(
            keyword,
            &[
                (columns::USED, columns::YES),
                (columns::SUITABLE, columns::YES),
                (columns::UNIQUE, columns::YES),
            ],
        )
        .await;

        // 3. Author persona (fallback on any malformed response)
        let author = self.select_author(keyword).await;
        debug!(keyword, author = %author.name, "persona selected");

        // 4. Competitive context (absence tolerated)
        let serp_context = self.gather_serp_context(keyword).await;
        if serp_context.is_none() {
            warn!(keyword, "no competitive context; analysis will run degraded");
        }

        // 5. Keyword analysis (load-bearing; missing fields fail the stage)
        let analysis = match self.analyze_keyword(keyword, serp_context.as_deref()).await {
            Ok(analysis) => analysis,
            Err(e) => return Prepared::Failed(format!("keyword analysis: {}", e)),
        };

        Prepared::Ready(PreparationResult {
            keyword: keyword.to_string(),
            author,
            serp_context,
            analysis,
        })
    }

    async fn check_suitability(&self, keyword: &str) -> Result<bool> {
        let prompt = prompts::fill(prompts::SUITABILITY_PROMPT, &[("keyword", keyword)]);
        let response = self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await?;

        decode::yes_no(&response, &["suitable", "usable"]).ok_or_else(|| {
            crate::error::EngineError::MissingField {
                field: "suitable".to_string(),
            }
        })
    }

    async fn is_unique(&self, keyword: &str) -> bool {
        let embedding = match self.completion.embed(keyword).await {
            Ok(e) => e,
            Err(e) => {
                warn!(keyword, error = %e, "embedding failed; treating as not unique");
                return false;
            }
        };

        let Some(vector) = normalize_for_index(&embedding, self.config.embedding_dim) else {
            warn!(keyword, "degenerate embedding; treating as not unique");
            return false;
        };

        let matches = match self.vector_index.query_nearest(&vector, 1).await {
            Ok(m) => m,
            Err(e) => {
                warn!(keyword, error = %e, "index query failed; treating as not unique");
                return false;
            }
        };

        if let Some(nearest) = matches.first() {
            if nearest.score > self.config.similarity_threshold {
                debug!(
                    keyword,
                    nearest = %nearest.id,
                    score = nearest.score,
                    "similarity over threshold"
                );
                return false;
            }
        }

        // Register the keyword so future runs see it
        if let Err(e) = self.vector_index.upsert(&slugify(keyword), &vector).await {
            warn!(keyword, error = %e, "index upsert failed; treating as not unique");
            return false;
        }
        true
    }

    async fn select_author(&self, keyword: &str) -> AuthorPersona {
        let roster = self
            .config
            .authors
            .iter()
            .map(|a| format!("{}: {} — {}", a.id, a.name, a.bio))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = prompts::fill(
            prompts::AUTHOR_SELECT_PROMPT,
            &[("keyword", keyword), ("roster", &roster)],
        );

        let picked = match self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await
        {
            Ok(response) => decode::u64_field(&response, &["author_id", "id"])
                .and_then(|id| self.config.author_by_id(id as u32).cloned()),
            Err(e) => {
                warn!(keyword, error = %e, "author selection failed");
                None
            }
        };

        picked.unwrap_or_else(|| self.config.default_author().clone())
    }

    async fn gather_serp_context(&self, keyword: &str) -> Option<String> {
        let hits = match self
            .searcher
            .search(keyword, SearchKind::Web, self.config.search_result_limit)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(keyword, error = %e, "competitive search failed");
                return None;
            }
        };
        if hits.is_empty() {
            return None;
        }

        let blocks: Vec<String> = hits
            .iter()
            .map(|h| {
                format!(
                    "{}\n{}\n{}",
                    h.title,
                    h.snippet.as_deref().unwrap_or(""),
                    h.url
                )
            })
            .collect();
        Some(blocks.join("\n\n"))
    }

    async fn analyze_keyword(
        &self,
        keyword: &str,
        serp_context: Option<&str>,
    ) -> Result<KeywordAnalysis> {
        let prompt = prompts::fill(
            prompts::KEYWORD_ANALYSIS_PROMPT,
            &[
                ("keyword", keyword),
                ("serp_context", serp_context.unwrap_or("(no results available)")),
            ],
        );
        let response = self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await?;

        Ok(serde_json::from_value(response)?)
    }

    async fn mark_row(&self, keyword: &str, pairs: &[(&str, &str)]) {
        if let Err(e) = self
            .spreadsheet
            .update_row(
                &self.config.keyword_sheet,
                columns::KEYWORD,
                keyword,
                &updates(pairs),
            )
            .await
        {
            warn!(keyword, error = %e, "spreadsheet update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockCompletion, MockSpreadsheet, MockVectorIndex};
    use crate::traits::searcher::MockWebSearcher;
    use serde_json::json;

    fn analysis_json() -> serde_json::Value {
        json!({
            "search_intent": "commercial",
            "content_format": "listicle",
            "article_type": "ListOfProducts",
            "model_framework": "AIDA",
            "semantic_keywords": ["budget guitars", "starter guitars"]
        })
    }

    #[tokio::test]
    async fn test_unsuitable_keyword_marks_row_and_stops() {
        let completion = MockCompletion::new()
            .with_json_response("suitable", json!({"suitable": "no", "reason": "off topic"}));
        let searcher = MockWebSearcher::new();
        let index = MockVectorIndex::new();
        let sheet = MockSpreadsheet::new();
        let config = EngineConfig::default();

        let stage = PreparationStage::new(&completion, &searcher, &index, &sheet, &config);
        let outcome = stage.prepare("casino bonuses").await;

        assert!(matches!(outcome, Prepared::Unsuitable));
        let updates = sheet.updates();
        assert_eq!(updates.len(), 1);
        assert!(updates[0]
            .updates
            .contains(&("suitable".to_string(), "no".to_string())));
        // No embedding call was made
        assert_eq!(completion.embed_calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_keyword_fails_closed() {
        let completion = MockCompletion::new()
            .with_json_response("suitable", json!({"suitable": "yes"}))
            .with_embedding(vec![1.0, 0.0, 0.0]);
        let searcher = MockWebSearcher::new();
        // Nearest neighbor above the 0.85 default threshold
        let index = MockVectorIndex::new().with_match("existing-topic", 0.93);
        let sheet = MockSpreadsheet::new();
        let config = EngineConfig::default();

        let stage = PreparationStage::new(&completion, &searcher, &index, &sheet, &config);
        let outcome = stage.prepare("best budget electric guitars").await;

        assert!(matches!(outcome, Prepared::NotUnique));
        assert_eq!(index.upsert_count(), 0);
        let updates = sheet.updates();
        assert!(updates[0]
            .updates
            .contains(&("unique".to_string(), "no".to_string())));
    }

    #[tokio::test]
    async fn test_index_error_treated_as_not_unique() {
        let completion = MockCompletion::new()
            .with_json_response("suitable", json!({"suitable": "yes"}))
            .with_embedding(vec![1.0, 0.0, 0.0]);
        let searcher = MockWebSearcher::new();
        let index = MockVectorIndex::new().failing();
        let sheet = MockSpreadsheet::new();
        let config = EngineConfig::default();

        let stage = PreparationStage::new(&completion, &searcher, &index, &sheet, &config);
        let outcome = stage.prepare("best budget electric guitars").await;

        assert!(matches!(outcome, Prepared::NotUnique));
    }

    #[tokio::test]
    async fn test_full_preparation_happy_path() {
        let completion = MockCompletion::new()
            .with_json_response("suitable", json!({"suitable": "yes"}))
            .with_json_response("author", json!({"author_id": 2}))
            .with_json_response("search_intent", analysis_json())
            .with_embedding(vec![0.5, 0.5, 0.0]);
        let searcher = MockWebSearcher::new().with_urls(
            SearchKind::Web,
            "best budget electric guitars",
            &["https://competitor.com/guitars"],
        );
        let index = MockVectorIndex::new().with_match("far-topic", 0.2);
        let sheet = MockSpreadsheet::new();
        let config = EngineConfig::default();

        let stage = PreparationStage::new(&completion, &searcher, &index, &sheet, &config);
        let outcome = stage.prepare("best budget electric guitars").await;

        let Prepared::Ready(result) = outcome else {
            panic!("expected Ready, got {:?}", outcome);
        };
        assert_eq!(result.author.id, 2);
        assert!(result.serp_context.is_some());
        assert_eq!(result.analysis.semantic_keywords.len(), 2);
        // Keyword registered for future dedup
        assert_eq!(index.upsert_count(), 1);
        // Row marked used + suitable + unique
        let updates = sheet.updates();
        assert!(updates[0]
            .updates
            .contains(&("unique".to_string(), "yes".to_string())));
    }

    #[tokio::test]
    async fn test_author_fallback_on_unknown_id() {
        let completion = MockCompletion::new()
            .with_json_response("suitable", json!({"suitable": "yes"}))
            .with_json_response("author", json!({"author_id": 999}))
            .with_json_response("search_intent", analysis_json())
            .with_embedding(vec![0.5, 0.5, 0.0]);
        let searcher = MockWebSearcher::new();
        let index = MockVectorIndex::new();
        let sheet = MockSpreadsheet::new();
        let config = EngineConfig::default();

        let stage = PreparationStage::new(&completion, &searcher, &index, &sheet, &config);
        let Prepared::Ready(result) = stage.prepare("quiet keyboards").await else {
            panic!("expected Ready");
        };
        assert_eq!(result.author.id, config.default_author_id);
        // Search returned nothing; context is degraded but the stage ran
        assert!(result.serp_context.is_none());
    }

    #[tokio::test]
    async fn test_missing_analysis_fields_fail_stage() {
        let completion = MockCompletion::new()
            .with_json_response("suitable", json!({"suitable": "yes"}))
            .with_json_response("author", json!({"author_id": 1}))
            .with_json_response("search_intent", json!({"search_intent": "commercial"}))
            .with_embedding(vec![0.5, 0.5, 0.0]);
        let searcher = MockWebSearcher::new();
        let index = MockVectorIndex::new();
        let sheet = MockSpreadsheet::new();
        let config = EngineConfig::default();

        let stage = PreparationStage::new(&completion, &searcher, &index, &sheet, &config);
        let outcome = stage.prepare("quiet keyboards").await;
        assert!(matches!(outcome, Prepared::Failed(_)));
    }
}
