//! Video selection.
//!
//! Eligible sections first pass a probability draw — the variability is
//! intentional, so most runs embed videos in only some sections. There is
//! no cross-section dedup for videos; a repeated embed is tolerated.

use rand::Rng;
use tracing::{debug, warn};

use crate::pipeline::enrich::{should_skip, Concern, EnrichCtx};
use crate::pipeline::{decode, prompts};
use crate::traits::searcher::{SearchHit, SearchKind};
use crate::types::outline::ArticleMeta;
use crate::types::section::{Section, VideoRecord};

pub(crate) async fn select_videos(
    ctx: &EnrichCtx<'_>,
    sections: &[Section],
    meta: &ArticleMeta,
) -> Vec<VideoRecord> {
    let mut records = Vec::with_capacity(sections.len());
    for section in sections {
        let video_id = if should_skip(section, Concern::Videos) || !wins_draw(ctx) {
            None
        } else {
            video_for_section(ctx, section, meta).await
        };
        if let Some(id) = &video_id {
            ctx.store.record_video(id);
        }
        records.push(VideoRecord {
            index: section.index,
            video_id,
        });
    }
    records
}

/// Probability draw: p >= 1.0 always proceeds, p <= 0.0 never does.
fn wins_draw(ctx: &EnrichCtx<'_>) -> bool {
    let p = ctx.config.video_probability;
    if p >= 1.0 {
        return true;
    }
    let draw: f64 = ctx.rng.lock().unwrap().random();
    draw < p
}

async fn video_for_section(
    ctx: &EnrichCtx<'_>,
    section: &Section,
    meta: &ArticleMeta,
) -> Option<String> {
    let phrase_prompt = prompts::fill(
        prompts::VIDEO_QUERY_PROMPT,
        &[("title", &meta.title), ("section_name", &section.name)],
    );
    let phrase = match ctx
        .completion
        .complete(prompts::SYSTEM_PLANNER, &phrase_prompt)
        .await
    {
        Ok(p) => p.trim().trim_matches('"').to_string(),
        Err(e) => {
            warn!(section = %section.name, error = %e, "video phrase generation failed");
            return None;
        }
    };

    let hits = match ctx
        .searcher
        .search(&phrase, SearchKind::Video, ctx.config.search_result_limit)
        .await
    {
        Ok(hits) if !hits.is_empty() => hits,
        Ok(_) => return None,
        Err(e) => {
            warn!(section = %section.name, error = %e, "video search failed");
            return None;
        }
    };

    let lines: Vec<String> = hits
        .iter()
        .map(|h| {
            format!(
                "{} — {} ({})",
                h.title,
                h.snippet.as_deref().unwrap_or(""),
                h.channel.as_deref().unwrap_or("unknown channel")
            )
        })
        .collect();
    let pick_prompt = prompts::fill(
        prompts::VIDEO_PICK_PROMPT,
        &[
            ("section_name", &section.name),
            ("candidates", &prompts::numbered_candidates(&lines)),
        ],
    );
    let chosen: Option<&SearchHit> = match ctx
        .completion
        .complete_json(prompts::SYSTEM_PLANNER, &pick_prompt)
        .await
    {
        Ok(response) => decode::choice_index(&response, &["choice", "selection"])
            .and_then(|i| hits.get(i)),
        Err(e) => {
            warn!(section = %section.name, error = %e, "video pick failed");
            None
        }
    };

    let id = chosen.and_then(|h| youtube_id(&h.url));
    if let Some(id) = &id {
        debug!(section = %section.name, video_id = %id, "video selected");
    }
    id
}

/// Extract a YouTube video id from watch/short/embed URL shapes.
pub fn youtube_id(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.");

    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "m.youtube.com" => {
            if let Some(v) = parsed
                .query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.to_string())
            {
                Some(v)
            } else {
                let segments: Vec<_> = parsed.path_segments()?.collect();
                match segments.as_slice() {
                    ["embed", id] | ["shorts", id] => Some((*id).to_string()),
                    _ => None,
                }
            }
        }
        _ => None,
    };

    id.filter(|s| !s.is_empty())
}
