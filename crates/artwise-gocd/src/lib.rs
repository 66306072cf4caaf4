//! GoCD sources for Artwise
//!
//! HTTP client that reads pipeline history, stage details, commit materials
//! and live activity from a GoCD server.

pub mod client;
pub mod config;
pub mod error;
pub mod wire;

pub use client::GocdClient;
pub use config::GocdConfig;
pub use error::{GocdError, Result};
