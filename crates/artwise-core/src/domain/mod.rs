//! Domain models for Artwise.
//!
//! - `StageReport`: one execution of one stage
//! - `PipelineRun`: aggregate over the stage reports of a build
//! - `History`: runs keyed by numeric build number
//! - `ActivityEntry`: a live job
//! - `Figure`: the visual unit placed on the board grid

pub mod activity;
pub mod author;
pub mod build_number;
pub mod figure;
pub mod history;
pub mod run;
pub mod stage;

pub use activity::{Activity, ActivityEntry, BuildStatus, JobActivity};
pub use author::{initials_of, Author, INITIAL_PLACEHOLDER};
pub use build_number::BuildNumber;
pub use figure::{Background, Border, Color, Direction, Figure, FigureType, FourMark, Grid};
pub use history::History;
pub use run::{format_long_time, Material, PipelineRun};
pub use stage::{StageReport, StageResult};
