//! Structured lifecycle events for backfills, enrichment and viewers.
//!
//! Events are emitted at `info!` (or `warn!` for degradations) with an
//! `event` field so log pipelines can filter on them.

use tracing::{info, warn};

/// Span for one backfill or refresh. Attach it to the async body with
/// [`tracing::Instrument::instrument`]; never hold it entered across `.await`.
pub fn backfill_span(kind: &'static str) -> tracing::Span {
    tracing::info_span!("artwise.backfill", kind = kind)
}

pub fn emit_backfill_started(kind: &str) {
    info!(event = "backfill.started", kind = %kind);
}

pub fn emit_backfill_finished(kind: &str, runs: usize, pages: usize, duration_ms: u64) {
    info!(
        event = "backfill.finished",
        kind = %kind,
        runs = runs,
        pages = pages,
        duration_ms = duration_ms,
    );
}

pub fn emit_backfill_failed(kind: &str, error: &dyn std::fmt::Display) {
    warn!(event = "backfill.failed", kind = %kind, error = %error);
}

pub fn emit_page_fetched(page: usize, entries: usize, has_next: bool) {
    info!(
        event = "feed.page_fetched",
        page = page,
        entries = entries,
        has_next = has_next,
    );
}

/// Enrichment failed or stalled; the run resolves without materials.
pub fn emit_enrichment_degraded(build: &str, error: &dyn std::fmt::Display) {
    warn!(event = "run.enrichment_degraded", build = %build, error = %error);
}

pub fn emit_viewer_connected(viewer_id: &str, channel: &str) {
    info!(event = "viewer.connected", viewer_id = %viewer_id, channel = %channel);
}

pub fn emit_viewer_disconnected(viewer_id: &str, reason: &str) {
    info!(event = "viewer.disconnected", viewer_id = %viewer_id, reason = %reason);
}

pub fn emit_poll_failed(viewer_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "viewer.poll_failed", viewer_id = %viewer_id, error = %error);
}
