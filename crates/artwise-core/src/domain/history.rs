//! Keyed pipeline history, ordered by numeric build number.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::build_number::BuildNumber;
use super::run::PipelineRun;
use super::stage::StageReport;

/// Mapping from build number to pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    runs: BTreeMap<BuildNumber, PipelineRun>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn get(&self, key: &BuildNumber) -> Option<&PipelineRun> {
        self.runs.get(key)
    }

    pub fn contains(&self, key: &BuildNumber) -> bool {
        self.runs.contains_key(key)
    }

    /// Insert or replace a run.
    pub fn insert(&mut self, run: PipelineRun) {
        self.runs.insert(run.build_number, run);
    }

    /// Build a new run from `report`, or extend the run it belongs to.
    pub fn record_stage(&mut self, report: StageReport) {
        let key = report.build_number;
        let run = match self.runs.remove(&key) {
            Some(existing) => existing.with_stage(report),
            None => PipelineRun::new(report),
        };
        self.runs.insert(key, run);
    }

    /// Fold every stage of `other` into this history.
    pub fn merge(&mut self, other: History) {
        for (key, incoming) in other.runs {
            match self.runs.remove(&key) {
                Some(existing) => {
                    let merged = incoming
                        .stages()
                        .iter()
                        .cloned()
                        .fold(existing, PipelineRun::with_stage);
                    self.runs.insert(key, merged);
                }
                None => {
                    self.runs.insert(key, incoming);
                }
            }
        }
    }

    /// Keys from newest to oldest.
    pub fn keys_descending(&self) -> impl Iterator<Item = &BuildNumber> {
        self.runs.keys().rev()
    }

    /// Runs from newest to oldest.
    pub fn iter_descending(&self) -> impl Iterator<Item = &PipelineRun> {
        self.runs.values().rev()
    }

    /// The most recent run.
    pub fn latest(&self) -> Option<&PipelineRun> {
        self.runs.values().next_back()
    }

    /// The run immediately preceding `key`.
    pub fn previous(&self, key: &BuildNumber) -> Option<&PipelineRun> {
        self.runs.range(..*key).next_back().map(|(_, run)| run)
    }

    /// Drop everything but the `limit` newest runs.
    pub fn retain_newest(&mut self, limit: usize) {
        while self.runs.len() > limit {
            self.runs.pop_first();
        }
    }

    /// Copy of this history holding only the `limit` newest runs.
    pub fn newest(&self, limit: usize) -> History {
        History {
            runs: self
                .runs
                .iter()
                .rev()
                .take(limit)
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
        }
    }

    pub fn into_runs(self) -> impl Iterator<Item = PipelineRun> {
        self.runs.into_values()
    }
}

impl FromIterator<PipelineRun> for History {
    fn from_iter<T: IntoIterator<Item = PipelineRun>>(iter: T) -> Self {
        let mut history = History::new();
        for run in iter {
            history.insert(run);
        }
        history
    }
}
