//! In-memory sources for tests and the `--fake` server mode.
//!
//! Every fake returns a transport error for data it does not hold, so tests
//! can exercise the failure paths without a network.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Activity, ActivityEntry, Material};
use crate::error::{ArtwiseError, Result};
use crate::sources::{
    ActivitySource, FeedPage, FeedSource, MaterialSource, StageDetailSource, StageDetails, Sources,
};

/// Key under which the first feed page is stored.
pub const FIRST_PAGE: &str = "";

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Feed pages keyed by continuation reference.
#[derive(Debug, Default)]
pub struct MemoryFeed {
    pages: Mutex<HashMap<String, FeedPage>>,
    requested: Mutex<Vec<Option<String>>>,
    fail_next: AtomicBool,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: HashMap<String, FeedPage>) -> Self {
        Self {
            pages: Mutex::new(pages),
            ..Self::default()
        }
    }

    pub fn with_first_page(self, page: FeedPage) -> Self {
        self.with_page(FIRST_PAGE, page)
    }

    pub fn with_page(self, next: impl Into<String>, page: FeedPage) -> Self {
        lock(&self.pages).insert(next.into(), page);
        self
    }

    pub fn set_first_page(&self, page: FeedPage) {
        lock(&self.pages).insert(FIRST_PAGE.to_string(), page);
    }

    /// Make the next fetch fail with a transport error.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Continuation references in the order they were requested.
    pub fn requested(&self) -> Vec<Option<String>> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl FeedSource for MemoryFeed {
    async fn fetch_page(&self, next: Option<&str>) -> Result<FeedPage> {
        lock(&self.requested).push(next.map(str::to_string));
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ArtwiseError::transport("memory-feed", "injected failure"));
        }
        let key = next.unwrap_or(FIRST_PAGE);
        lock(&self.pages)
            .get(key)
            .cloned()
            .ok_or_else(|| ArtwiseError::transport("memory-feed", format!("no page at {key:?}")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryStageDetails {
    details: HashMap<String, StageDetails>,
}

impl MemoryStageDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stage_id: impl Into<String>, details: StageDetails) -> Self {
        self.details.insert(stage_id.into(), details);
        self
    }
}

#[async_trait]
impl StageDetailSource for MemoryStageDetails {
    async fn stage_details(&self, stage_id: &str) -> Result<StageDetails> {
        self.details.get(stage_id).cloned().ok_or_else(|| {
            ArtwiseError::transport("memory-stages", format!("unknown stage {stage_id}"))
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryMaterials {
    materials: HashMap<String, Vec<Material>>,
    delay: Option<Duration>,
    lookups: AtomicUsize,
}

impl MemoryMaterials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, material_ref: impl Into<String>, materials: Vec<Material>) -> Self {
        self.materials.insert(material_ref.into(), materials);
        self
    }

    /// Delay every lookup, e.g. to trip the enrichment timeout.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MaterialSource for MemoryMaterials {
    async fn materials(&self, material_ref: &str) -> Result<Vec<Material>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.materials.get(material_ref).cloned().ok_or_else(|| {
            ArtwiseError::transport("memory-materials", format!("no materials for {material_ref}"))
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryActivity {
    jobs: Mutex<Vec<ActivityEntry>>,
}

impl MemoryActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: Vec<ActivityEntry>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
        }
    }

    pub fn set_jobs(&self, jobs: Vec<ActivityEntry>) {
        *lock(&self.jobs) = jobs;
    }
}

#[async_trait]
impl ActivitySource for MemoryActivity {
    async fn activity(&self) -> Result<Activity> {
        Ok(Activity {
            jobs: lock(&self.jobs).clone(),
        })
    }
}

/// Canned data for all four sources, as read from a JSON file.
///
/// The first feed page is stored under the empty key `""`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(default)]
    pub pages: HashMap<String, FeedPage>,
    #[serde(default)]
    pub stage_details: HashMap<String, StageDetails>,
    #[serde(default)]
    pub materials: HashMap<String, Vec<Material>>,
    #[serde(default)]
    pub activity: Activity,
}

impl Fixture {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn into_sources(self) -> Sources {
        Sources {
            feed: Arc::new(MemoryFeed::from_pages(self.pages)),
            stages: Arc::new(MemoryStageDetails {
                details: self.stage_details,
            }),
            materials: Arc::new(MemoryMaterials {
                materials: self.materials,
                ..MemoryMaterials::default()
            }),
            activity: Arc::new(MemoryActivity::with_jobs(self.activity.jobs)),
        }
    }
}
