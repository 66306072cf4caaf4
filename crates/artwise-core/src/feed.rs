//! Feed paginator: walks the paged history feed into a keyed [`History`].
//!
//! Pages are fetched strictly one after another, since each page's location
//! comes from the previous response. Entries are resolved into stage reports
//! (looking up stage details where the feed is incomplete) and folded into
//! their pipeline run. Any transport failure aborts the walk.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, warn};

use crate::domain::{BuildNumber, History, StageReport};
use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs;
use crate::sources::{FeedEntry, FeedSource, StageDetailSource};

/// Options for a single feed walk.
///
/// `callback_parameter` is handed back untouched to the completion callback.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions<P = ()> {
    /// Build numbers to leave out of the result.
    pub exclude: HashSet<BuildNumber>,

    /// Continuation reference to resume from; first page when `None`.
    pub next_url: Option<String>,

    /// Stop after this many pages even if the feed continues.
    pub max_pages: Option<usize>,

    /// Stop after the first page that leaves more than this many runs, so
    /// the newest `max_runs` builds are complete without walking the
    /// whole feed.
    pub max_runs: Option<usize>,

    pub callback_parameter: P,
}

impl ReadOptions<()> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P> ReadOptions<P> {
    pub fn exclude(mut self, keys: impl IntoIterator<Item = BuildNumber>) -> Self {
        self.exclude.extend(keys);
        self
    }

    pub fn next_url(mut self, url: impl Into<String>) -> Self {
        self.next_url = Some(url.into());
        self
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.max_pages = Some(pages);
        self
    }

    pub fn max_runs(mut self, runs: usize) -> Self {
        self.max_runs = Some(runs);
        self
    }

    pub fn callback_parameter<Q>(self, parameter: Q) -> ReadOptions<Q> {
        ReadOptions {
            exclude: self.exclude,
            next_url: self.next_url,
            max_pages: self.max_pages,
            max_runs: self.max_runs,
            callback_parameter: parameter,
        }
    }
}

/// Where the walk stands between fetches.
enum PageState {
    Fetching(Option<String>),
    Done,
}

/// Reads pipeline history from a paged feed.
pub struct FeedReader {
    feed: Arc<dyn FeedSource>,
    stages: Arc<dyn StageDetailSource>,
}

impl FeedReader {
    pub fn new(feed: Arc<dyn FeedSource>, stages: Arc<dyn StageDetailSource>) -> Self {
        Self { feed, stages }
    }

    /// Walk the feed and hand the accumulated history to `on_complete`
    /// together with the caller's `callback_parameter`.
    pub async fn read_history<P, R>(
        &self,
        on_complete: impl FnOnce(History, P) -> R,
        options: ReadOptions<P>,
    ) -> Result<R> {
        let ReadOptions {
            exclude,
            next_url,
            max_pages,
            max_runs,
            callback_parameter,
        } = options;

        let (history, _pages) = self.walk(&exclude, next_url, max_pages, max_runs).await?;
        Ok(on_complete(history, callback_parameter))
    }

    /// Walk the feed and return the history with the number of pages read.
    pub async fn collect(&self, options: ReadOptions) -> Result<(History, usize)> {
        self.walk(
            &options.exclude,
            options.next_url,
            options.max_pages,
            options.max_runs,
        )
        .await
    }

    async fn walk(
        &self,
        exclude: &HashSet<BuildNumber>,
        start: Option<String>,
        max_pages: Option<usize>,
        max_runs: Option<usize>,
    ) -> Result<(History, usize)> {
        let mut history = History::new();
        let mut pages = 0usize;
        let mut state = PageState::Fetching(start);

        while let PageState::Fetching(next) = state {
            let page = self.feed.fetch_page(next.as_deref()).await?;
            pages += 1;
            METRICS.inc_pages_fetched();
            obs::emit_page_fetched(pages, page.entries.len(), page.next.is_some());

            let wanted: Vec<(BuildNumber, FeedEntry)> = page
                .entries
                .into_iter()
                .filter_map(|entry| match entry.build_number.parse::<BuildNumber>() {
                    Ok(key) if exclude.contains(&key) => {
                        debug!(build = %key, "Skipping excluded build");
                        None
                    }
                    Ok(key) => Some((key, entry)),
                    Err(err) => {
                        warn!(stage_id = %entry.id, error = %err, "Skipping feed entry");
                        None
                    }
                })
                .collect();

            let reports = try_join_all(
                wanted
                    .into_iter()
                    .map(|(key, entry)| self.resolve_entry(key, entry)),
            )
            .await?;
            for report in reports {
                history.record_stage(report);
            }

            let limit_reached = max_pages.is_some_and(|max| pages >= max)
                || max_runs.is_some_and(|max| history.len() > max);
            state = match page.next {
                Some(next) if !limit_reached => PageState::Fetching(Some(next)),
                _ => PageState::Done,
            };
        }

        Ok((history, pages))
    }

    async fn resolve_entry(&self, key: BuildNumber, entry: FeedEntry) -> Result<StageReport> {
        if entry.is_complete() {
            return Ok(entry.into_report(key, None));
        }
        let details = self.stages.stage_details(&entry.id).await?;
        Ok(entry.into_report(key, Some(details)))
    }
}
