//! Shared server state handed to every handler.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Result};
use artwise_core::{BoardConfig, BroadcastScheduler, HaringBoard, PipelineMonitor, Sources};
use serde::Deserialize;

/// Monitor and viewer scheduler of one pipeline.
pub struct PipelineBoard {
    pub monitor: Arc<PipelineMonitor>,
    pub scheduler: BroadcastScheduler,
}

impl PipelineBoard {
    pub fn new(sources: Sources, config: BoardConfig) -> Self {
        let poll_interval = config.poll_interval();
        let monitor = Arc::new(PipelineMonitor::new(sources, config));
        let board = Arc::new(HaringBoard::new(monitor.clone()));
        PipelineBoard {
            monitor,
            scheduler: BroadcastScheduler::new(board, poll_interval),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        self.monitor.config()
    }
}

/// `?pipeline=<name>` on data endpoints and the websocket upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct PipelineQuery {
    pub pipeline: Option<String>,
}

/// Boards for the configured pipelines; the first one is the default.
pub struct AppState {
    boards: BTreeMap<String, PipelineBoard>,
    default_pipeline: String,
}

impl AppState {
    pub fn new(pipelines: Vec<(String, Sources)>, config: BoardConfig) -> Result<Arc<Self>> {
        let Some(default_pipeline) = pipelines.first().map(|(name, _)| name.clone()) else {
            bail!("no pipeline configured");
        };
        let boards = pipelines
            .into_iter()
            .map(|(name, sources)| (name, PipelineBoard::new(sources, config.clone())))
            .collect();
        Ok(Arc::new(AppState {
            boards,
            default_pipeline,
        }))
    }

    pub fn default_pipeline(&self) -> &str {
        &self.default_pipeline
    }

    /// Board for `pipeline`, or the default board when none is requested.
    pub fn board(&self, pipeline: Option<&str>) -> Option<&PipelineBoard> {
        self.boards.get(pipeline.unwrap_or(&self.default_pipeline))
    }

    pub fn boards(&self) -> impl Iterator<Item = (&str, &PipelineBoard)> {
        self.boards.iter().map(|(name, board)| (name.as_str(), board))
    }
}
