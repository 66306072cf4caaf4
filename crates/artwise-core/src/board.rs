//! The haring board: history assembly plus four-in-a-row, per poll.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::assembler::{assemble, Assembly};
use crate::broadcast::{BoardUpdate, SnapshotProvider};
use crate::config::BoardConfig;
use crate::domain::Background;
use crate::error::Result;
use crate::four;
use crate::monitor::{GocdData, PipelineMonitor};

pub struct HaringBoard {
    monitor: Arc<PipelineMonitor>,
}

impl HaringBoard {
    pub fn new(monitor: Arc<PipelineMonitor>) -> Self {
        Self { monitor }
    }

    fn config(&self) -> &BoardConfig {
        self.monitor.config()
    }

    /// Build the board from one read of history and activity.
    pub fn render(&self, data: &GocdData) -> Assembly {
        let config = self.config();
        let mut assembly = assemble(
            &data.history,
            &data.activity.jobs,
            config.grid.capacity(),
            Utc::now(),
        );
        if config.four_in_a_row && assembly.background != Some(Background::Blue) {
            four::apply(&mut assembly.figures, config.grid);
        }
        assembly
    }
}

#[async_trait]
impl SnapshotProvider for HaringBoard {
    async fn poll(&self) -> Result<BoardUpdate> {
        if !self.monitor.cache().is_ready() {
            return Ok(BoardUpdate::WarmingUp);
        }
        let data = self.monitor.read_data().await?;
        Ok(BoardUpdate::Snapshot(self.render(&data)))
    }
}
