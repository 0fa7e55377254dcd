//! The per-keyword pipeline orchestrator.
//!
//! Sequences the six stages, short-circuiting on each stage's failure
//! contract. No error crosses a stage boundary: every stage hands back a
//! result or a sentinel, and the orchestrator turns those into one
//! structured [`PipelineOutcome`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::Result;
use crate::pipeline::assemble::AssemblyStage;
use crate::pipeline::enrich::EnrichmentStage;
use crate::pipeline::outline::OutlineStage;
use crate::pipeline::prepare::{Prepared, PreparationStage};
use crate::pipeline::publish::PublicationStage;
use crate::pipeline::writer::WritingStage;
use crate::store::ContentStore;
use crate::traits::cms::CmsGateway;
use crate::traits::completion::TextCompletion;
use crate::traits::fetcher::MediaFetcher;
use crate::traits::relational::RelationalGateway;
use crate::traits::searcher::WebSearcher;
use crate::traits::spreadsheet::{columns, SpreadsheetGateway};
use crate::traits::vector_index::VectorIndexGateway;
use crate::types::config::EngineConfig;
use crate::types::outcome::{PipelineOutcome, Stage};

/// One keyword in, one published article (or a structured stop) out.
pub struct ArticlePipeline {
    completion: Arc<dyn TextCompletion>,
    searcher: Arc<dyn WebSearcher>,
    vector_index: Arc<dyn VectorIndexGateway>,
    spreadsheet: Arc<dyn SpreadsheetGateway>,
    cms: Arc<dyn CmsGateway>,
    relational: Arc<dyn RelationalGateway>,
    fetcher: Arc<dyn MediaFetcher>,
    config: EngineConfig,
    rng_seed: Option<u64>,
}

impl ArticlePipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        searcher: Arc<dyn WebSearcher>,
        vector_index: Arc<dyn VectorIndexGateway>,
        spreadsheet: Arc<dyn SpreadsheetGateway>,
        cms: Arc<dyn CmsGateway>,
        relational: Arc<dyn RelationalGateway>,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            completion,
            searcher,
            vector_index,
            spreadsheet,
            cms,
            relational,
            fetcher,
            config: EngineConfig::default(),
            rng_seed: None,
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed enrichment randomness (tests).
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pick the next unprocessed keyword from the spreadsheet queue.
    pub async fn next_pending_keyword(&self) -> Result<Option<String>> {
        let rows = self
            .spreadsheet
            .read_rows(&self.config.keyword_sheet)
            .await?;
        Ok(rows.into_iter().find_map(|row| {
            let used = row
                .get(columns::USED)
                .map(|v| !v.trim().is_empty() && v.trim() != columns::NO)
                .unwrap_or(false);
            if used {
                return None;
            }
            row.get(columns::KEYWORD)
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
        }))
    }

    /// Run the full pipeline for one keyword.
    pub async fn run(&self, keyword: &str) -> PipelineOutcome {
        info!(keyword, "pipeline run starting");
        if let Err(e) = self.config.validate() {
            return PipelineOutcome::failed(keyword, Stage::Preparation, e.to_string());
        }

        // Stage 1: preparation
        let preparation = PreparationStage::new(
            self.completion.as_ref(),
            self.searcher.as_ref(),
            self.vector_index.as_ref(),
            self.spreadsheet.as_ref(),
            &self.config,
        );
        let prep = match preparation.prepare(keyword).await {
            Prepared::Ready(prep) => prep,
            Prepared::Unsuitable => {
                return PipelineOutcome::skipped(keyword, Stage::Preparation, "keyword unsuitable");
            }
            Prepared::NotUnique => {
                return PipelineOutcome::skipped(keyword, Stage::Preparation, "keyword not unique");
            }
            Prepared::Failed(reason) => {
                return PipelineOutcome::failed(keyword, Stage::Preparation, reason);
            }
        };

        // Stage 2: outline
        let outline_stage = OutlineStage::new(self.completion.as_ref());
        let Some(outline) = outline_stage.build(&prep).await else {
            return PipelineOutcome::failed(keyword, Stage::Outline, "no sections produced");
        };
        let meta = outline.meta;
        let mut sections = outline.sections;
        // Pre-content snapshot for the assembler's table extraction
        let outline_sections = sections.clone();

        // Stage 3: content writing
        let writer = WritingStage::new(self.completion.as_ref());
        let written = writer.write_all(&mut sections, &meta, &prep).await;
        if written == 0 {
            return PipelineOutcome::failed(keyword, Stage::Writing, "no sections written");
        }

        // Stage 4: enrichment (never fatal)
        let store = ContentStore::new();
        let mut enrichment = EnrichmentStage::new(
            self.completion.as_ref(),
            self.searcher.as_ref(),
            self.cms.as_ref(),
            self.fetcher.as_ref(),
            &store,
            &self.config,
        );
        if let Some(seed) = self.rng_seed {
            enrichment = enrichment.with_seed(seed);
        }
        let (images, videos) = enrichment.enrich(&mut sections, &meta).await;

        // Stage 5: assembly
        let assembler = AssemblyStage::new(self.completion.as_ref());
        let Some(html) = assembler
            .assemble(&sections, &meta, &outline_sections, &images, &videos)
            .await
        else {
            return PipelineOutcome::failed(keyword, Stage::Assembly, "no content assembled");
        };

        // Stage 6: publication
        let publication = PublicationStage::new(
            self.completion.as_ref(),
            self.cms.as_ref(),
            self.relational.as_ref(),
            self.spreadsheet.as_ref(),
            self.fetcher.as_ref(),
            &self.config,
        );
        match publication.publish(&html, &meta, &prep).await {
            Ok(report) => {
                info!(keyword, post_id = report.post.id, "pipeline run published");
                PipelineOutcome::published(keyword, report.post.id, report.post.url)
            }
            Err(e) => {
                warn!(keyword, error = %e, "post creation failed");
                PipelineOutcome::failed(keyword, Stage::Publication, e.to_string())
            }
        }
    }
}
