//! Publication stage: featured image, category, post creation, and the
//! spreadsheet/database side effects.
//!
//! Post creation is the one fatal step. Everything around it degrades:
//! a missing featured image, an unresolvable category, or a failed
//! metadata upsert still leaves a published post behind.

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::media::prepare_image;
use crate::php_array::encode_keyword_array;
use crate::pipeline::{decode, prompts};
use crate::traits::cms::{CmsGateway, NewPost, PostRef, PostStatus, PostUpdate};
use crate::traits::completion::TextCompletion;
use crate::traits::fetcher::MediaFetcher;
use crate::traits::relational::RelationalGateway;
use crate::traits::spreadsheet::{columns, updates, SpreadsheetGateway};
use crate::types::config::EngineConfig;
use crate::types::keyword::PreparationResult;
use crate::types::outline::ArticleMeta;

/// The metadata key the internal-linking plugin reads.
const INTERNAL_LINK_META_KEY: &str = "internal_link_keywords";

/// What publication produced.
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub post: PostRef,
    pub featured_media: Option<u64>,
    pub category_id: u64,
}

/// The publication stage.
pub struct PublicationStage<'a> {
    completion: &'a dyn TextCompletion,
    cms: &'a dyn CmsGateway,
    relational: &'a dyn RelationalGateway,
    spreadsheet: &'a dyn SpreadsheetGateway,
    fetcher: &'a dyn MediaFetcher,
    config: &'a EngineConfig,
}

impl<'a> PublicationStage<'a> {
    pub fn new(
        completion: &'a dyn TextCompletion,
        cms: &'a dyn CmsGateway,
        relational: &'a dyn RelationalGateway,
        spreadsheet: &'a dyn SpreadsheetGateway,
        fetcher: &'a dyn MediaFetcher,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            completion,
            cms,
            relational,
            spreadsheet,
            fetcher,
            config,
        }
    }

    /// Publish the assembled document.
    ///
    /// Returns Err only when post creation itself fails.
    pub async fn publish(
        &self,
        html: &str,
        meta: &ArticleMeta,
        prep: &PreparationResult,
    ) -> Result<PublishReport> {
        // 1. Featured image, best-effort
        let featured_media = self.generate_featured_media(meta).await;

        // 2. Category resolution, degrading to the configured default
        let category_id = self.determine_category_id(prep).await;

        // 3. Post creation — the fatal step
        let post = self
            .cms
            .create_post(&NewPost {
                title: meta.title.clone(),
                content: html.to_string(),
                slug: meta.slug.clone(),
                status: PostStatus::Publish,
                category_id,
                author_id: meta.author_id,
                excerpt: meta.excerpt.clone(),
            })
            .await?;
        info!(post_id = post.id, url = %post.url, "post created");

        // 4. Attach the featured image, best-effort
        if let Some(media_id) = featured_media {
            if let Err(e) = self
                .cms
                .update_post(
                    post.id,
                    &PostUpdate {
                        featured_media: Some(media_id),
                    },
                )
                .await
            {
                warn!(post_id = post.id, error = %e, "featured media attach failed");
            }
        }

        // 5. Spreadsheet bookkeeping, best-effort
        if let Err(e) = self
            .spreadsheet
            .update_row(
                &self.config.keyword_sheet,
                columns::KEYWORD,
                &meta.keyword,
                &updates(&[
                    (columns::USED, columns::YES),
                    (columns::TITLE, &meta.title),
                    (columns::POST_ID, &post.id.to_string()),
                    (columns::POST_URL, &post.url),
                ]),
            )
            .await
        {
            warn!(keyword = %meta.keyword, error = %e, "spreadsheet update failed");
        }

        // 6. Internal-linking metadata, best-effort
        if let Err(e) = self.store_internal_link_keywords(post.id, meta).await {
            warn!(post_id = post.id, error = %e, "internal-link metadata failed");
        }

        Ok(PublishReport {
            post,
            featured_media,
            category_id,
        })
    }

    /// Generate, download, resize, and upload the featured image.
    /// Any failure is logged and yields None.
    async fn generate_featured_media(&self, meta: &ArticleMeta) -> Option<u64> {
        let result: Result<u64> = async {
            let prompt_request =
                prompts::fill(prompts::FEATURED_IMAGE_PROMPT, &[("title", &meta.title)]);
            let image_prompt = self
                .completion
                .complete(prompts::SYSTEM_PLANNER, &prompt_request)
                .await?;

            let url = self
                .completion
                .generate_image(image_prompt.trim(), &self.config.featured_image_size)
                .await?;

            let media = self.fetcher.fetch(&url).await?;
            let processed = prepare_image(
                &media.bytes,
                self.config.image_max_width,
                self.config.image_encoding,
            )?;

            let filename = format!(
                "{}-featured.{}",
                meta.slug,
                self.config.image_encoding.extension()
            );
            let uploaded = self
                .cms
                .upload_media(processed, &filename, self.config.image_encoding.mime())
                .await?;
            Ok(uploaded.id)
        }
        .await;

        match result {
            Ok(id) => {
                debug!(media_id = id, "featured image uploaded");
                Some(id)
            }
            Err(e) => {
                warn!(title = %meta.title, error = %e, "featured image failed; publishing without");
                None
            }
        }
    }

    /// Resolve the category id: model recommendation against the existing
    /// tree, creating a new category when asked, otherwise falling back
    /// to the configured default.
    async fn determine_category_id(&self, prep: &PreparationResult) -> u64 {
        let categories = match self.cms.categories().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "category fetch failed; using default");
                return self.config.default_category_id;
            }
        };

        let listing = categories
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = prompts::fill(
            prompts::CATEGORY_PROMPT,
            &[
                ("search_intent", &prep.analysis.search_intent),
                ("keyword", &prep.keyword),
                ("categories", &listing),
            ],
        );
        let response = match self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "category recommendation failed; using default");
                return self.config.default_category_id;
            }
        };

        let Some(name) = decode::string_field(&response, &["category", "name"]) else {
            return self.config.default_category_id;
        };
        let create_new = decode::yes_no(&response, &["create_new", "new"]).unwrap_or(false);

        if let Some(existing) = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&name))
        {
            return existing.id;
        }
        if create_new {
            match self.cms.create_category(&name).await {
                Ok(id) => {
                    info!(category = %name, id, "category created");
                    return id;
                }
                Err(e) => {
                    warn!(category = %name, error = %e, "category creation failed; using default");
                    return self.config.default_category_id;
                }
            }
        }
        self.config.default_category_id
    }

    /// Generate related keywords and upsert the plugin's metadata row,
    /// clearing any duplicate rows first.
    async fn store_internal_link_keywords(&self, post_id: u64, meta: &ArticleMeta) -> Result<()> {
        let prompt = prompts::fill(
            prompts::INTERNAL_KEYWORDS_PROMPT,
            &[
                ("keyword", &meta.keyword),
                ("count", &self.config.internal_link_keyword_count.to_string()),
            ],
        );
        let response = self
            .completion
            .complete_json(prompts::SYSTEM_PLANNER, &prompt)
            .await?;
        let keywords = decode::string_list(&response, &["keywords", "related_keywords"]);
        if keywords.is_empty() {
            debug!(post_id, "no internal-link keywords generated");
            return Ok(());
        }

        let encoded = encode_keyword_array(&keywords);
        let post_id_param = serde_json::json!(post_id);
        let key_param = serde_json::json!(INTERNAL_LINK_META_KEY);

        let existing = self
            .relational
            .query(
                "SELECT meta_id FROM wp_postmeta WHERE post_id = ? AND meta_key = ?",
                &[post_id_param.clone(), key_param.clone()],
            )
            .await?;

        if existing.len() > 1 {
            // Duplicate rows from older runs; clear and reinsert
            self.relational
                .execute(
                    "DELETE FROM wp_postmeta WHERE post_id = ? AND meta_key = ?",
                    &[post_id_param.clone(), key_param.clone()],
                )
                .await?;
        }

        if existing.len() == 1 {
            self.relational
                .execute(
                    "UPDATE wp_postmeta SET meta_value = ? WHERE post_id = ? AND meta_key = ?",
                    &[serde_json::json!(encoded), post_id_param, key_param],
                )
                .await?;
        } else {
            self.relational
                .execute(
                    "INSERT INTO wp_postmeta (post_id, meta_key, meta_value) VALUES (?, ?, ?)",
                    &[post_id_param, key_param, serde_json::json!(encoded)],
                )
                .await?;
        }
        debug!(post_id, keywords = keywords.len(), "internal-link metadata stored");
        Ok(())
    }
}
