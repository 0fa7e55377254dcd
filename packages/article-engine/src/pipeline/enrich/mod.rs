//! Enrichment stage: external citations, images, and video embeds.
//!
//! Three independently-runnable sub-flows over the section list, sharing
//! one run-scoped [`ContentStore`] for dedup and one skip predicate.

pub mod images;
pub mod links;
pub mod videos;

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::store::ContentStore;
use crate::traits::cms::CmsGateway;
use crate::traits::completion::TextCompletion;
use crate::traits::fetcher::MediaFetcher;
use crate::traits::searcher::WebSearcher;
use crate::types::config::EngineConfig;
use crate::types::outline::ArticleMeta;
use crate::types::section::{ImageRecord, Section, VideoRecord};

/// Which enrichment flow is asking whether to skip a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Concern {
    Links,
    Images,
    Videos,
}

/// Sections that never receive a given kind of enrichment.
///
/// Structural sections (intro/conclusion/FAQ) and containers are skipped
/// by every flow. Links and videos additionally skip the product-list
/// header, matched both by its "top rated" name and by its legacy fixed
/// position (`index == 2`) — the positional rule is inherited behavior,
/// kept until product confirms it can key off the tag alone.
pub fn should_skip(section: &Section, concern: Concern) -> bool {
    if section.tag.is_structural() || section.is_container {
        return true;
    }
    match concern {
        Concern::Images => false,
        Concern::Links | Concern::Videos => {
            section.name.to_lowercase().contains("top rated") || section.index == 2
        }
    }
}

/// Shared dependencies for the three enrichment flows.
pub(crate) struct EnrichCtx<'a> {
    pub completion: &'a dyn TextCompletion,
    pub searcher: &'a dyn WebSearcher,
    pub cms: &'a dyn CmsGateway,
    pub fetcher: &'a dyn MediaFetcher,
    pub store: &'a ContentStore,
    pub config: &'a EngineConfig,
    pub rng: Mutex<StdRng>,
}

/// The enrichment stage.
pub struct EnrichmentStage<'a> {
    ctx: EnrichCtx<'a>,
}

impl<'a> EnrichmentStage<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        completion: &'a dyn TextCompletion,
        searcher: &'a dyn WebSearcher,
        cms: &'a dyn CmsGateway,
        fetcher: &'a dyn MediaFetcher,
        store: &'a ContentStore,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            ctx: EnrichCtx {
                completion,
                searcher,
                cms,
                fetcher,
                store,
                config,
                rng: Mutex::new(StdRng::from_os_rng()),
            },
        }
    }

    /// Seed the stage's RNG (tests).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ctx.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Run all three flows. Link insertion mutates section HTML in place;
    /// images and videos come back as side tables keyed by section index.
    pub async fn enrich(
        &self,
        sections: &mut [Section],
        meta: &ArticleMeta,
    ) -> (Vec<ImageRecord>, Vec<VideoRecord>) {
        links::insert_external_links(&self.ctx, sections, meta).await;
        let images = images::select_images(&self.ctx, sections, meta).await;
        let videos = videos::select_videos(&self.ctx, sections, meta).await;
        debug!(
            run_id = %self.ctx.store.run_id(),
            links = self.ctx.store.external_url_count(),
            images = images.iter().filter(|r| r.outcome.url().is_some()).count(),
            videos = videos.iter().filter(|r| r.video_id.is_some()).count(),
            "enrichment complete"
        );
        (images, videos)
    }
}
