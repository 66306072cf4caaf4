//! Material enrichment of pipeline runs.
//!
//! Enrichment never blocks progress: if the material lookup fails or stalls
//! past the timeout, the run is resolved with a placeholder commit instead.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::domain::{History, PipelineRun};
use crate::error::ArtwiseError;
use crate::metrics::METRICS;
use crate::obs;
use crate::sources::MaterialSource;

/// Attaches commit materials and the summary line to runs.
pub struct RunEnricher {
    materials: Arc<dyn MaterialSource>,
    timeout: Duration,
}

impl RunEnricher {
    pub fn new(materials: Arc<dyn MaterialSource>, timeout: Duration) -> Self {
        Self { materials, timeout }
    }

    /// Resolve `run`. Already resolved runs are returned unchanged, and runs
    /// that already carry materials are resolved without a new lookup.
    pub async fn enrich(&self, run: PipelineRun) -> PipelineRun {
        if run.is_resolved() {
            return run;
        }
        if run.materials().is_some() {
            return run.resolved(None);
        }

        let lookup = match run.first_stage() {
            Some(stage) => stage.material_lookup().to_string(),
            None => return run.resolved(None),
        };

        let fetched = tokio::time::timeout(self.timeout, self.materials.materials(&lookup)).await;
        match fetched {
            Ok(Ok(materials)) => {
                METRICS.inc_runs_enriched();
                run.resolved(Some(materials))
            }
            Ok(Err(err)) => {
                METRICS.inc_enrichments_degraded();
                obs::emit_enrichment_degraded(&run.label(), &err);
                run.resolved(None)
            }
            Err(_) => {
                METRICS.inc_enrichments_degraded();
                let err = ArtwiseError::transport(
                    "materials",
                    format!("timed out after {:?}", self.timeout),
                );
                obs::emit_enrichment_degraded(&run.label(), &err);
                run.resolved(None)
            }
        }
    }

    /// Enrich every unresolved run of `history` concurrently.
    pub async fn enrich_history(&self, history: History) -> History {
        join_all(history.into_runs().map(|run| self.enrich(run)))
            .await
            .into_iter()
            .collect()
    }
}
