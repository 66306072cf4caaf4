//! Pipeline monitor: owns the history cache and the backfill/refresh path.
//!
//! The monitor is the only writer of the [`DataCache`]. Viewers read through
//! [`PipelineMonitor::read_data`], which combines the cached history with a
//! fresh activity poll.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, Instrument};

use crate::cache::DataCache;
use crate::config::BoardConfig;
use crate::domain::{Activity, History};
use crate::enrich::RunEnricher;
use crate::error::Result;
use crate::feed::{FeedReader, ReadOptions};
use crate::obs;
use crate::sources::{ActivitySource, Sources};

/// History and live activity as read for one poll.
#[derive(Debug, Clone, Serialize)]
pub struct GocdData {
    pub history: Arc<History>,
    pub activity: Activity,
}

pub struct PipelineMonitor {
    reader: FeedReader,
    enricher: RunEnricher,
    activity: Arc<dyn ActivitySource>,
    cache: DataCache,
    config: BoardConfig,
}

impl PipelineMonitor {
    pub fn new(sources: Sources, config: BoardConfig) -> Self {
        Self {
            reader: FeedReader::new(sources.feed, sources.stages),
            enricher: RunEnricher::new(sources.materials, config.enrichment_timeout()),
            activity: sources.activity,
            cache: DataCache::new(),
            config,
        }
    }

    pub fn cache(&self) -> &DataCache {
        &self.cache
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Read the feed into the cache, down to the `history_limit` newest runs.
    ///
    /// On failure the cache keeps whatever it held before; a cache that was
    /// never filled stays uninitialized.
    pub async fn backfill(&self) -> Result<()> {
        self.backfill_inner()
            .instrument(obs::backfill_span("initial"))
            .await
    }

    async fn backfill_inner(&self) -> Result<()> {
        obs::emit_backfill_started("initial");
        self.cache.begin_backfill();
        let start = Instant::now();

        let options = ReadOptions::new()
            .exclude(self.config.exclude.iter().copied())
            .max_runs(self.config.history_limit);
        let (history, pages) = match self.reader.collect(options).await {
            Ok(read) => read,
            Err(err) => {
                obs::emit_backfill_failed("initial", &err);
                self.cache.fail_backfill();
                return Err(err);
            }
        };

        let mut history = history;
        history.retain_newest(self.config.history_limit);
        let history = self.enricher.enrich_history(history).await;
        let runs = history.len();
        self.cache.publish(history).await;

        obs::emit_backfill_finished("initial", runs, pages, start.elapsed().as_millis() as u64);
        Ok(())
    }

    /// Merge the newest feed pages into the cache, or backfill if the cache
    /// was never filled.
    pub async fn refresh(&self) -> Result<()> {
        if !self.cache.is_ready() {
            return self.backfill().await;
        }
        self.refresh_inner()
            .instrument(obs::backfill_span("refresh"))
            .await
    }

    async fn refresh_inner(&self) -> Result<()> {
        let start = Instant::now();
        let options = ReadOptions::new()
            .exclude(self.config.exclude.iter().copied())
            .max_pages(self.config.refresh_pages.max(1));
        let (fresh, pages) = match self.reader.collect(options).await {
            Ok(read) => read,
            Err(err) => {
                obs::emit_backfill_failed("refresh", &err);
                return Err(err);
            }
        };

        let mut merged = History::clone(&*self.cache.read().await?);
        merged.merge(fresh);
        merged.retain_newest(self.config.history_limit);
        let merged = self.enricher.enrich_history(merged).await;
        let runs = merged.len();
        self.cache.publish(merged).await;

        obs::emit_backfill_finished("refresh", runs, pages, start.elapsed().as_millis() as u64);
        Ok(())
    }

    /// Backfill, then keep refreshing on the configured interval.
    ///
    /// Failures are logged and retried on the next tick.
    pub fn spawn_refresh_loop(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.refresh_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Errors were already reported through obs.
                if let Err(err) = self.refresh().await {
                    debug!(error = %err, "Refresh tick failed; retrying next tick");
                }
            }
        })
    }

    /// Cached history plus a fresh activity poll.
    pub async fn read_data(&self) -> Result<GocdData> {
        let history = self.cache.read().await?;
        let activity = self.activity.activity().await?;
        Ok(GocdData { history, activity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheState;
    use crate::fakes::{MemoryActivity, MemoryFeed, MemoryMaterials, MemoryStageDetails};
    use crate::domain::{Author, BuildNumber, StageResult};
    use crate::sources::{FeedEntry, FeedPage};
    use chrono::{TimeZone, Utc};

    fn entry(build: u64, id: &str) -> FeedEntry {
        FeedEntry {
            id: id.to_string(),
            build_number: build.to_string(),
            stage_name: "build".to_string(),
            run_number: 1,
            updated: Utc.with_ymd_and_hms(2014, 7, 18, 16, 0, 0).unwrap(),
            result: Some(StageResult::Passed),
            author: Some(Author::new("Max Mustermann")),
            material_ref: None,
        }
    }

    fn sources(feed: Arc<MemoryFeed>) -> Sources {
        Sources {
            feed,
            stages: Arc::new(MemoryStageDetails::new()),
            materials: Arc::new(MemoryMaterials::new()),
            activity: Arc::new(MemoryActivity::new()),
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn test_refresh_loop_fills_cache_even_with_zero_interval() {
        let feed = Arc::new(MemoryFeed::new().with_first_page(FeedPage {
            entries: vec![entry(1, "a")],
            next: None,
        }));
        let config = BoardConfig {
            refresh_interval_secs: 0,
            ..BoardConfig::default()
        };
        let monitor = Arc::new(PipelineMonitor::new(sources(feed), config));
        assert_send(&monitor.backfill());
        assert_send(&monitor.refresh());

        let handle = monitor.clone().spawn_refresh_loop();
        let history = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            monitor.cache().wait_ready(),
        )
        .await
        .unwrap();
        assert_eq!(history.len(), 1);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_backfill_stops_paging_past_history_limit() {
        let feed = Arc::new(
            MemoryFeed::new()
                .with_first_page(FeedPage {
                    entries: vec![entry(6, "f"), entry(5, "e")],
                    next: Some("p2".to_string()),
                })
                .with_page(
                    "p2",
                    FeedPage {
                        entries: vec![entry(4, "d"), entry(3, "c")],
                        next: Some("p3".to_string()),
                    },
                )
                .with_page(
                    "p3",
                    FeedPage {
                        entries: vec![entry(2, "b")],
                        next: None,
                    },
                ),
        );
        let config = BoardConfig {
            history_limit: 3,
            ..BoardConfig::default()
        };
        let monitor = PipelineMonitor::new(sources(feed.clone()), config);
        monitor.backfill().await.unwrap();

        assert_eq!(feed.requested(), vec![None, Some("p2".to_string())]);
        let history = monitor.cache().read().await.unwrap();
        let keys: Vec<u64> = history.keys_descending().map(BuildNumber::value).collect();
        assert_eq!(keys, vec![6, 5, 4]);
    }

    #[tokio::test]
    async fn test_failed_backfill_leaves_cache_uninitialized() {
        let feed = Arc::new(MemoryFeed::new());
        let monitor = PipelineMonitor::new(sources(feed), BoardConfig::default());
        assert!(monitor.backfill().await.is_err());
        assert_eq!(monitor.cache().state(), CacheState::Uninitialized);
        assert!(monitor.read_data().await.is_err());
    }

    #[tokio::test]
    async fn test_refresh_merges_and_trims() {
        let feed = Arc::new(MemoryFeed::new().with_first_page(FeedPage {
            entries: vec![entry(1, "a"), entry(2, "b")],
            next: None,
        }));
        let config = BoardConfig {
            history_limit: 2,
            ..BoardConfig::default()
        };
        let monitor = PipelineMonitor::new(sources(feed.clone()), config);
        monitor.backfill().await.unwrap();
        assert_eq!(monitor.cache().read().await.unwrap().len(), 2);

        feed.set_first_page(FeedPage {
            entries: vec![entry(3, "c")],
            next: None,
        });
        monitor.refresh().await.unwrap();
        let history = monitor.cache().read().await.unwrap();
        let keys: Vec<u64> = history.keys_descending().map(BuildNumber::value).collect();
        assert_eq!(keys, vec![3, 2]);
        assert!(history.iter_descending().all(|run| run.is_resolved()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_cache() {
        let feed = Arc::new(MemoryFeed::new().with_first_page(FeedPage {
            entries: vec![entry(1, "a")],
            next: None,
        }));
        let monitor = PipelineMonitor::new(sources(feed.clone()), BoardConfig::default());
        monitor.backfill().await.unwrap();

        feed.fail_next_fetch();
        assert!(monitor.refresh().await.is_err());
        assert!(monitor.cache().is_ready());
        assert_eq!(monitor.cache().read().await.unwrap().len(), 1);
    }
}
