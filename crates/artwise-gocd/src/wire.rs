//! GoCD REST response shapes and their mapping onto the core source types.

use artwise_core::domain::{
    Activity, ActivityEntry, Author, BuildNumber, BuildStatus, JobActivity, Material, StageResult,
};
use artwise_core::{FeedEntry, FeedPage, StageDetails};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Href {
    pub href: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<Href>,
}

/// `GET /go/api/pipelines/:name/history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineHistory {
    #[serde(default, rename = "_links")]
    pub links: Links,
    #[serde(default)]
    pub pipelines: Vec<PipelineInstance>,
}

/// `GET /go/api/pipelines/:name/:counter`
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineInstance {
    pub name: String,
    pub counter: u64,
    #[serde(default)]
    pub scheduled_date: Option<i64>,
    #[serde(default)]
    pub build_cause: BuildCause,
    #[serde(default)]
    pub stages: Vec<StageInstance>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildCause {
    #[serde(default)]
    pub material_revisions: Vec<MaterialRevision>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialRevision {
    #[serde(default)]
    pub modifications: Vec<Modification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Modification {
    pub revision: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A stage as embedded in a pipeline instance, or
/// `GET /go/api/stages/:pipeline/:counter/:stage/:stage_counter`.
#[derive(Debug, Clone, Deserialize)]
pub struct StageInstance {
    pub name: String,
    #[serde(default)]
    pub counter: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub jobs: Vec<JobInstance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobInstance {
    #[serde(default)]
    pub scheduled_date: Option<i64>,
}

impl StageInstance {
    /// GoCD sends the counter as a string in some versions and a number in others.
    fn run_number(&self) -> u32 {
        match &self.counter {
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(1),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(1),
            _ => 1,
        }
    }

    /// Completed stages only; building or unknown stages have no result yet.
    fn stage_result(&self) -> Option<StageResult> {
        match self.result.as_deref() {
            Some("Passed") => Some(StageResult::Passed),
            Some("Failed") | Some("Cancelled") => Some(StageResult::Failed),
            _ => None,
        }
    }

    fn is_building(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("Building") | Some("Scheduled") | Some("Assigned") | Some("Preparing")
        )
    }

    fn updated(&self) -> Option<DateTime<Utc>> {
        self.jobs
            .iter()
            .filter_map(|job| job.scheduled_date)
            .max()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Manual approvers count as authors; automatic triggers report `changes`.
    fn approver(&self) -> Option<Author> {
        match self.approved_by.as_deref() {
            None | Some("") | Some("changes") | Some("timer") => None,
            Some(user) => Some(Author::new(user)),
        }
    }
}

/// Split `Name <email>` into an author.
pub fn parse_author(user_name: &str) -> Option<Author> {
    let user_name = user_name.trim();
    if user_name.is_empty() {
        return None;
    }
    match (user_name.find('<'), user_name.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let name = user_name[..open].trim();
            let email = user_name[open + 1..close].trim();
            Some(Author {
                name: if name.is_empty() { email } else { name }.to_string(),
                email: (!email.is_empty()).then(|| email.to_string()),
            })
        }
        _ => Some(Author::new(user_name)),
    }
}

impl PipelineInstance {
    pub fn reference(&self) -> String {
        format!("{}/{}", self.name, self.counter)
    }

    fn modifications(&self) -> impl Iterator<Item = &Modification> {
        self.build_cause
            .material_revisions
            .iter()
            .flat_map(|revision| revision.modifications.iter())
    }

    fn author(&self) -> Option<Author> {
        self.modifications()
            .find_map(|m| m.user_name.as_deref().and_then(parse_author))
    }

    pub fn materials(&self) -> Vec<Material> {
        self.modifications()
            .map(|m| Material {
                comment: m.comment.clone().unwrap_or_default(),
                committer: m
                    .user_name
                    .as_deref()
                    .and_then(parse_author)
                    .map(|a| a.name)
                    .unwrap_or_default(),
                sha: m.revision.clone(),
            })
            .collect()
    }

    /// One feed entry per completed stage.
    pub fn feed_entries(&self) -> Vec<FeedEntry> {
        let fallback = self
            .scheduled_date
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_default();
        let author = self.author();

        self.stages
            .iter()
            .filter_map(|stage| {
                let result = stage.stage_result()?;
                let run_number = stage.run_number();
                Some(FeedEntry {
                    id: format!("{}/{}/{}/{}", self.name, self.counter, stage.name, run_number),
                    build_number: self.counter.to_string(),
                    stage_name: stage.name.clone(),
                    run_number,
                    updated: stage.updated().unwrap_or(fallback),
                    result: Some(result),
                    author: author.clone().or_else(|| stage.approver()),
                    material_ref: Some(self.reference()),
                })
            })
            .collect()
    }
}

impl PipelineHistory {
    pub fn into_page(self) -> FeedPage {
        FeedPage {
            entries: self.pipelines.iter().flat_map(PipelineInstance::feed_entries).collect(),
            next: self.links.next.map(|link| link.href),
        }
    }

    /// Stages currently running in the newest instances, with the status of
    /// the same stage in the instance before.
    pub fn activity(&self) -> Activity {
        let jobs = self
            .pipelines
            .iter()
            .enumerate()
            .flat_map(|(i, instance)| {
                let previous = self.pipelines.get(i + 1);
                instance
                    .stages
                    .iter()
                    .filter(|stage| stage.is_building())
                    .map(move |stage| ActivityEntry {
                        name: format!("{} :: {}", instance.name, stage.name),
                        stage_name: stage.name.clone(),
                        build_number: BuildNumber::new(instance.counter),
                        activity: JobActivity::Building,
                        last_build_status: previous_status(previous, &stage.name),
                        author: instance.author(),
                    })
            })
            .collect();
        Activity { jobs }
    }
}

fn previous_status(previous: Option<&PipelineInstance>, stage_name: &str) -> BuildStatus {
    let result = previous
        .and_then(|p| p.stages.iter().find(|s| s.name == stage_name))
        .and_then(StageInstance::stage_result);
    match result {
        Some(StageResult::Passed) => BuildStatus::Success,
        Some(StageResult::Failed) => BuildStatus::Failure,
        None => BuildStatus::Unknown,
    }
}

impl StageInstance {
    pub fn into_details(self) -> Option<StageDetails> {
        Some(StageDetails {
            result: self.stage_result()?,
            author: self.approver(),
            updated: self.updated(),
        })
    }
}
