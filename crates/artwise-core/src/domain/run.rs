//! Pipeline runs aggregated from stage reports.
//!
//! A [`PipelineRun`] is rebuilt as a new value on every aggregation step
//! (`with_stage`, `resolved`), so a run handed to a reader is never mutated
//! underneath it.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::author::Author;
use super::build_number::BuildNumber;
use super::stage::{StageReport, StageResult};

pub const UNKNOWN_CHANGE: &str = "Unknown change";
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// A commit that went into a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub comment: String,
    pub committer: String,
    pub sha: String,
}

/// Aggregate over all stage reports sharing a build number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRun {
    pub build_number: BuildNumber,
    stages: Vec<StageReport>,
    result: StageResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stage_failed: Option<String>,
    time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    initials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    materials: Option<Vec<Material>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<String>,
}

impl PipelineRun {
    /// Start a run from its first observed stage report.
    pub fn new(first: StageReport) -> Self {
        let run = PipelineRun {
            build_number: first.build_number,
            result: first.result,
            stage_failed: None,
            time: first.updated,
            author: None,
            initials: None,
            materials: None,
            info: None,
            stages: vec![first],
        };
        run.recomputed()
    }

    /// Return a new run that includes `report`.
    ///
    /// A report whose stage id is already part of the run is ignored. Adding a
    /// stage invalidates the `info` summary so it is recomputed on the next
    /// enrichment; fetched materials are kept.
    pub fn with_stage(mut self, report: StageReport) -> Self {
        if self.stages.iter().any(|s| s.id == report.id) {
            return self;
        }
        self.stages.push(report);
        self.info = None;
        self.recomputed()
    }

    /// Return the resolved run carrying `materials` (if any were obtained)
    /// and its one-line summary.
    pub fn resolved(mut self, materials: Option<Vec<Material>>) -> Self {
        if materials.is_some() {
            self.materials = materials;
        }
        self.info = Some(self.summary_line());
        self
    }

    fn recomputed(mut self) -> Self {
        self.time = self
            .stages
            .iter()
            .map(|s| s.updated)
            .max()
            .unwrap_or(self.time);

        let failed = self
            .latest_runs_of_stages()
            .into_iter()
            .find(|s| s.result == StageResult::Failed)
            .map(|s| s.stage_name.clone());
        self.result = if failed.is_some() {
            StageResult::Failed
        } else {
            StageResult::Passed
        };
        self.stage_failed = failed;

        self.author = self.first_stage().and_then(|s| s.author.clone()).or_else(|| {
            self.stages_chronologically()
                .into_iter()
                .find_map(|s| s.author.clone())
        });
        self.initials = self.author.as_ref().and_then(Author::initials);
        self
    }

    /// Stage reports ordered by update time; equal times keep arrival order.
    fn stages_chronologically(&self) -> Vec<&StageReport> {
        let mut stages: Vec<&StageReport> = self.stages.iter().collect();
        stages.sort_by_key(|s| s.updated);
        stages
    }

    /// The chronologically first stage, which identifies who triggered the run.
    pub fn first_stage(&self) -> Option<&StageReport> {
        self.stages_chronologically().into_iter().next()
    }

    /// For every stage name, the report with the highest run number.
    ///
    /// Stage names appear in the order they were first observed. When two
    /// reports share a run number the later arrival wins.
    pub fn latest_runs_of_stages(&self) -> Vec<&StageReport> {
        let mut order: Vec<&str> = Vec::new();
        let mut latest: HashMap<&str, &StageReport> = HashMap::new();
        for stage in &self.stages {
            match latest.get(stage.stage_name.as_str()) {
                Some(current) if current.run_number > stage.run_number => {}
                Some(_) => {
                    latest.insert(&stage.stage_name, stage);
                }
                None => {
                    order.push(&stage.stage_name);
                    latest.insert(&stage.stage_name, stage);
                }
            }
        }
        order.into_iter().filter_map(|name| latest.remove(name)).collect()
    }

    pub fn stages(&self) -> &[StageReport] {
        &self.stages
    }

    pub fn result(&self) -> StageResult {
        self.result
    }

    pub fn was_successful(&self) -> bool {
        self.result.is_passed()
    }

    pub fn stage_failed(&self) -> Option<&str> {
        self.stage_failed.as_deref()
    }

    /// Latest update across all stages.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn initials(&self) -> Option<&str> {
        self.initials.as_deref()
    }

    pub fn materials(&self) -> Option<&[Material]> {
        self.materials.as_deref()
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Whether enrichment already produced a summary for this run.
    pub fn is_resolved(&self) -> bool {
        self.info.is_some()
    }

    /// Short label shown above the figure.
    pub fn label(&self) -> String {
        self.build_number.to_string()
    }

    /// `[build] time | result-or-failed-stage | latest commit | author`.
    pub fn summary_line(&self) -> String {
        let commit = self
            .materials
            .as_ref()
            .and_then(|m| m.last())
            .map(|m| m.comment.as_str())
            .unwrap_or(UNKNOWN_CHANGE);
        let author = self
            .author
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or(UNKNOWN_AUTHOR);
        let result = if self.was_successful() {
            "Success"
        } else {
            self.stage_failed.as_deref().unwrap_or("Failed")
        };
        format!(
            "[{}] {} | {} | {} | {}",
            self.build_number,
            format_long_time(self.time),
            result,
            commit,
            author
        )
    }
}

/// Render like `July 18th 2014, 4:08:39 pm`.
pub fn format_long_time(time: DateTime<Utc>) -> String {
    let day = time.day();
    format!(
        "{} {}{} {}",
        time.format("%B"),
        day,
        ordinal_suffix(day),
        time.format("%Y, %-I:%M:%S %P")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
