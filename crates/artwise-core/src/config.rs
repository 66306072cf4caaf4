//! Board and refresh configuration consumed by the core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{BuildNumber, Grid};

/// Shortest poll or refresh period; timers cannot tick with a zero period.
pub const MIN_INTERVAL_SECS: u64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub grid: Grid,

    /// Seconds between board pushes to each viewer.
    #[serde(default = "BoardConfig::default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Enables four-in-a-row annotation.
    #[serde(default = "BoardConfig::default_four_in_a_row")]
    pub four_in_a_row: bool,

    /// Builds left out of the backfill.
    #[serde(default)]
    pub exclude: Vec<BuildNumber>,

    /// Maximum number of runs kept in the cache.
    #[serde(default = "BoardConfig::default_history_limit")]
    pub history_limit: usize,

    /// Feed pages read on each refresh after the initial backfill.
    #[serde(default = "BoardConfig::default_refresh_pages")]
    pub refresh_pages: usize,

    #[serde(default = "BoardConfig::default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "BoardConfig::default_enrichment_timeout_secs")]
    pub enrichment_timeout_secs: u64,

    /// Seconds between keep-alive pings to each viewer.
    #[serde(default = "BoardConfig::default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    /// A viewer silent for this many ping intervals is considered gone.
    #[serde(default = "BoardConfig::default_stale_after_multiplier")]
    pub stale_after_multiplier: u32,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            grid: Grid::default(),
            poll_interval_secs: Self::default_poll_interval_secs(),
            four_in_a_row: Self::default_four_in_a_row(),
            exclude: Vec::new(),
            history_limit: Self::default_history_limit(),
            refresh_pages: Self::default_refresh_pages(),
            refresh_interval_secs: Self::default_refresh_interval_secs(),
            enrichment_timeout_secs: Self::default_enrichment_timeout_secs(),
            ping_interval_secs: Self::default_ping_interval_secs(),
            stale_after_multiplier: Self::default_stale_after_multiplier(),
        }
    }
}

impl BoardConfig {
    fn default_poll_interval_secs() -> u64 {
        10
    }

    fn default_four_in_a_row() -> bool {
        true
    }

    fn default_history_limit() -> usize {
        100
    }

    fn default_refresh_pages() -> usize {
        1
    }

    fn default_refresh_interval_secs() -> u64 {
        30
    }

    fn default_enrichment_timeout_secs() -> u64 {
        10
    }

    fn default_ping_interval_secs() -> u64 {
        30
    }

    fn default_stale_after_multiplier() -> u32 {
        3
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_INTERVAL_SECS))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(MIN_INTERVAL_SECS))
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout_secs)
    }

    /// Zero disables keep-alive pings.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    /// Silence after which a viewer connection is treated as dead.
    pub fn stale_after(&self) -> Duration {
        self.ping_interval() * self.stale_after_multiplier
    }
}
