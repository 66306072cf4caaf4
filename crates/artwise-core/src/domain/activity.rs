//! Live activity: jobs currently running or just finished.

use serde::{Deserialize, Serialize};

use super::author::Author;
use super::build_number::BuildNumber;

/// What a job is doing right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobActivity {
    Building,
    Sleeping,
    CheckingModifications,
    #[serde(other)]
    Unknown,
}

/// Status of the job's last completed build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    Failure,
    Exception,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BuildStatus::Success => "Success",
            BuildStatus::Failure => "Failure",
            BuildStatus::Exception => "Exception",
            BuildStatus::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

/// One job from the live activity feed. Lives for a single poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub name: String,
    pub stage_name: String,
    pub build_number: BuildNumber,
    pub activity: JobActivity,
    pub last_build_status: BuildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
}

impl ActivityEntry {
    pub fn is_building(&self) -> bool {
        self.activity == JobActivity::Building
    }

    pub fn was_successful(&self) -> bool {
        self.last_build_status == BuildStatus::Success
    }
}

/// Snapshot of the live activity source.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    #[serde(default)]
    pub jobs: Vec<ActivityEntry>,
}

impl Activity {
    pub fn any_building(&self) -> bool {
        self.jobs.iter().any(ActivityEntry::is_building)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_cctray_style_job() {
        let json = r#"{
            "name": "artwise :: build",
            "stageName": "build",
            "buildNumber": "42",
            "activity": "Building",
            "lastBuildStatus": "Failure",
            "author": { "name": "Max Mustermann" }
        }"#;
        let entry: ActivityEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_building());
        assert!(!entry.was_successful());
        assert_eq!(entry.build_number, BuildNumber::new(42));
    }

    #[test]
    fn test_unknown_states_do_not_fail_parsing() {
        let json = r#"{
            "name": "x", "stageName": "s", "buildNumber": 1,
            "activity": "Paused", "lastBuildStatus": "Cancelled"
        }"#;
        let entry: ActivityEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.activity, JobActivity::Unknown);
        assert_eq!(entry.last_build_status, BuildStatus::Unknown);
    }
}
