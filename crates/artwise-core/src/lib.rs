//! Artwise Core Library
//!
//! Pipeline history reconstruction, board assembly, four-in-a-row detection
//! and the per-viewer broadcast scheduler.

pub mod assembler;
pub mod board;
pub mod broadcast;
pub mod cache;
pub mod config;
pub mod domain;
pub mod enrich;
pub mod error;
pub mod fakes;
pub mod feed;
pub mod four;
pub mod metrics;
pub mod monitor;
pub mod obs;
pub mod sources;
pub mod telemetry;

pub use assembler::{assemble, Assembly, FigureSource};
pub use board::HaringBoard;
pub use broadcast::{
    BoardUpdate, BroadcastScheduler, Liveness, SnapshotProvider, ViewerMessage, ViewerSink,
    ViewerSubscription, HARING_CHANNEL,
};
pub use cache::{CacheState, DataCache};
pub use config::BoardConfig;
pub use domain::{
    Activity, ActivityEntry, Author, Background, BuildNumber, BuildStatus, Figure, FigureType,
    Grid, History, Material, PipelineRun, StageReport, StageResult,
};
pub use enrich::RunEnricher;
pub use error::{ArtwiseError, Result};
pub use fakes::Fixture;
pub use feed::{FeedReader, ReadOptions};
pub use four::{detect, FourInARow, NUM_TO_WIN};
pub use monitor::{GocdData, PipelineMonitor};
pub use sources::{
    ActivitySource, FeedEntry, FeedPage, FeedSource, MaterialSource, Sources, StageDetailSource,
    StageDetails,
};

/// Crate version, reported by the daemon.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
