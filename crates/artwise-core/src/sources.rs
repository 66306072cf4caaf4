//! Inbound data sources consumed by the core.
//!
//! - `FeedSource`: paged history of stage executions
//! - `StageDetailSource`: result/author/timestamp of a single stage
//! - `MaterialSource`: commits behind a stage
//! - `ActivitySource`: currently running jobs
//!
//! All traits are async and transport-agnostic. In-memory fakes live in the
//! `fakes` module; the GoCD HTTP client lives in the `artwise-gocd` crate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Activity, Author, BuildNumber, Material, StageReport, StageResult};
use crate::error::Result;

/// One page of the history feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeedPage {
    #[serde(default)]
    pub entries: Vec<FeedEntry>,

    /// Continuation reference for the next (older) page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// A feed entry describing one stage execution.
///
/// `result` and `author` may be missing from the feed; they are then looked
/// up through the [`StageDetailSource`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    pub id: String,

    /// Build number as transmitted.
    pub build_number: String,

    pub stage_name: String,

    #[serde(default = "default_run_number")]
    pub run_number: u32,

    pub updated: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<StageResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_ref: Option<String>,
}

fn default_run_number() -> u32 {
    1
}

impl FeedEntry {
    /// Whether the feed itself carried everything a stage report needs.
    pub fn is_complete(&self) -> bool {
        self.result.is_some() && self.author.is_some()
    }

    /// Build a stage report, filling gaps from `details`.
    pub fn into_report(self, build_number: BuildNumber, details: Option<StageDetails>) -> StageReport {
        let (detail_result, detail_author, detail_updated) = match details {
            Some(d) => (Some(d.result), d.author, d.updated),
            None => (None, None, None),
        };
        StageReport {
            id: self.id,
            build_number,
            stage_name: self.stage_name,
            run_number: self.run_number,
            result: self
                .result
                .or(detail_result)
                .unwrap_or(StageResult::Failed),
            author: self.author.or(detail_author),
            updated: detail_updated.unwrap_or(self.updated),
            material_ref: self.material_ref,
        }
    }
}

/// Details of one stage execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageDetails {
    pub result: StageResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// Paged history feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the page at `next`, or the first page when `None`.
    async fn fetch_page(&self, next: Option<&str>) -> Result<FeedPage>;
}

/// Per-stage detail lookup.
#[async_trait]
pub trait StageDetailSource: Send + Sync {
    async fn stage_details(&self, stage_id: &str) -> Result<StageDetails>;
}

/// Commit/material lookup.
#[async_trait]
pub trait MaterialSource: Send + Sync {
    async fn materials(&self, material_ref: &str) -> Result<Vec<Material>>;
}

/// Live job activity.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn activity(&self) -> Result<Activity>;
}

/// The four sources a pipeline monitor reads from.
#[derive(Clone)]
pub struct Sources {
    pub feed: Arc<dyn FeedSource>,
    pub stages: Arc<dyn StageDetailSource>,
    pub materials: Arc<dyn MaterialSource>,
    pub activity: Arc<dyn ActivitySource>,
}

impl Sources {
    /// Use one value for all four roles.
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: FeedSource + StageDetailSource + MaterialSource + ActivitySource + 'static,
    {
        Sources {
            feed: client.clone(),
            stages: client.clone(),
            materials: client.clone(),
            activity: client,
        }
    }
}
