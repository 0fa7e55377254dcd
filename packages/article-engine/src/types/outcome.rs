//! Per-keyword pipeline outcome reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Preparation,
    Outline,
    Writing,
    Enrichment,
    Assembly,
    Publication,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preparation => "preparation",
            Stage::Outline => "outline",
            Stage::Writing => "writing",
            Stage::Enrichment => "enrichment",
            Stage::Assembly => "assembly",
            Stage::Publication => "publication",
        };
        f.write_str(name)
    }
}

/// Final status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    /// Post created in the CMS
    Published,

    /// Expected early stop (keyword unsuitable or not unique)
    Skipped,

    /// A fatal stage failure
    Failed,
}

/// Structured per-keyword outcome returned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub status: PipelineStatus,

    /// The stage that stopped the run (absent on success)
    pub stage: Option<Stage>,

    /// Human-readable stop reason (absent on success)
    pub reason: Option<String>,

    /// The keyword this run processed
    pub keyword: String,

    /// Created CMS post id (present iff published)
    pub post_id: Option<u64>,

    /// Created CMS post URL (present iff published)
    pub post_url: Option<String>,

    /// When the run finished
    pub completed_at: DateTime<Utc>,
}

impl PipelineOutcome {
    /// A successful publication.
    pub fn published(keyword: impl Into<String>, post_id: u64, post_url: impl Into<String>) -> Self {
        Self {
            status: PipelineStatus::Published,
            stage: None,
            reason: None,
            keyword: keyword.into(),
            post_id: Some(post_id),
            post_url: Some(post_url.into()),
            completed_at: Utc::now(),
        }
    }

    /// An expected early stop.
    pub fn skipped(keyword: impl Into<String>, stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            status: PipelineStatus::Skipped,
            stage: Some(stage),
            reason: Some(reason.into()),
            keyword: keyword.into(),
            post_id: None,
            post_url: None,
            completed_at: Utc::now(),
        }
    }

    /// A fatal stage failure.
    pub fn failed(keyword: impl Into<String>, stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            status: PipelineStatus::Failed,
            stage: Some(stage),
            reason: Some(reason.into()),
            keyword: keyword.into(),
            post_id: None,
            post_url: None,
            completed_at: Utc::now(),
        }
    }
}
