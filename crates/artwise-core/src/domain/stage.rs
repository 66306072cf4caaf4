//! Stage reports: one observed execution of one pipeline stage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::author::Author;
use super::build_number::BuildNumber;

/// Outcome of a stage or of a whole pipeline run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageResult {
    Passed,
    Failed,
}

impl StageResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, StageResult::Passed)
    }
}

/// A single execution of a stage. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    /// Identifier the CI server assigned to this stage execution.
    pub id: String,

    pub build_number: BuildNumber,

    pub stage_name: String,

    /// Incremented each time the stage is rerun within the same build.
    pub run_number: u32,

    pub result: StageResult,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,

    pub updated: DateTime<Utc>,

    /// Opaque reference used to look up commit materials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_ref: Option<String>,
}

impl StageReport {
    /// Reference to query materials with, falling back to the stage id.
    pub fn material_lookup(&self) -> &str {
        self.material_ref.as_deref().unwrap_or(&self.id)
    }
}
