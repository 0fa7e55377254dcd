//! Keyword-to-published-article orchestration pipeline.
//!
//! Takes one keyword from a spreadsheet queue through verification,
//! outlining, prose generation, enrichment (citations, images, video),
//! assembly, and CMS publication, updating the spreadsheet and the CMS
//! database as side effects.
//!
//! # Design
//!
//! - Every external system sits behind an object-safe async trait
//!   ([`traits`]) so stages run identically against production gateways
//!   and the scripted mocks in [`testing`].
//! - Stage functions return results or explicit sentinels; nothing throws
//!   across a stage boundary. The orchestrator folds sentinels into one
//!   structured [`PipelineOutcome`] per keyword.
//! - Flattening ([`pipeline::flatten_outline`]) is the single authority
//!   for section order, role tags, and container status.
//! - A run-scoped [`ContentStore`] deduplicates citation URLs and image
//!   sources across the whole article.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use article_engine::{ArticlePipeline, EngineConfig};
//!
//! let pipeline = ArticlePipeline::new(
//!     completion, searcher, vector_index, spreadsheet, cms, relational, fetcher,
//! )
//! .with_config(EngineConfig::default().with_video_probability(0.25));
//!
//! if let Some(keyword) = pipeline.next_pending_keyword().await? {
//!     let outcome = pipeline.run(&keyword).await;
//!     println!("{:?}", outcome.status);
//! }
//! ```

pub mod error;
pub mod html;
pub mod media;
pub mod php_array;
pub mod pipeline;
pub mod security;
pub mod store;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{EngineError, Result};
pub use pipeline::{
    flatten_outline, should_skip, ArticlePipeline, AssemblyStage, Concern, EnrichmentStage,
    OutlineStage, PreparationStage, Prepared, PublicationStage, PublishReport, WritingStage,
};
pub use store::{normalize_url, ContentStore};
pub use types::{
    config::EngineConfig,
    keyword::{ArticleType, AuthorPersona, KeywordAnalysis, PreparationResult},
    outcome::{PipelineOutcome, PipelineStatus, Stage},
    outline::{ArticleMeta, DraftChapter, DraftSubchapter, OutlineDraft, OutlineResult},
    section::{ImageOutcome, ImageRecord, Section, SectionBody, SectionKind, SectionTag, VideoRecord},
};

// Re-export collaborator traits
pub use traits::{
    cms::{Category, CmsGateway, MediaItem, NewPost, PostRef, PostStatus, PostUpdate},
    completion::TextCompletion,
    fetcher::{FetchedMedia, HttpMediaFetcher, MediaFetcher},
    relational::RelationalGateway,
    searcher::{MockWebSearcher, SearchHit, SearchKind, SerperWebSearcher, WebSearcher},
    spreadsheet::{SheetRow, SpreadsheetGateway},
    vector_index::{IndexMatch, VectorIndexGateway},
};
