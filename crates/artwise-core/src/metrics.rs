//! Global atomic counters for Artwise observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    pages_fetched: AtomicU64,
    runs_enriched: AtomicU64,
    enrichments_degraded: AtomicU64,
    snapshots_pushed: AtomicU64,
    poll_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            pages_fetched: AtomicU64::new(0),
            runs_enriched: AtomicU64::new(0),
            enrichments_degraded: AtomicU64::new(0),
            snapshots_pushed: AtomicU64::new(0),
            poll_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_pages_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_runs_enriched(&self) {
        self.runs_enriched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_enrichments_degraded(&self) {
        self.enrichments_degraded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_snapshots_pushed(&self) {
        self.snapshots_pushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_poll_failures(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            pages_fetched = self.pages_fetched(),
            runs_enriched = self.runs_enriched(),
            enrichments_degraded = self.enrichments_degraded(),
            snapshots_pushed = self.snapshots_pushed(),
            poll_failures = self.poll_failures(),
        );
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn runs_enriched(&self) -> u64 {
        self.runs_enriched.load(Ordering::Relaxed)
    }

    pub fn enrichments_degraded(&self) -> u64 {
        self.enrichments_degraded.load(Ordering::Relaxed)
    }

    pub fn snapshots_pushed(&self) -> u64 {
        self.snapshots_pushed.load(Ordering::Relaxed)
    }

    pub fn poll_failures(&self) -> u64 {
        self.poll_failures.load(Ordering::Relaxed)
    }
}
