//! Process-wide pipeline history cache.
//!
//! Lifecycle: `Uninitialized -> Backfilling -> Ready`. A failed first
//! backfill falls back to `Uninitialized`. Once ready the cache stays ready;
//! refreshes swap in a new history snapshot atomically.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::domain::History;
use crate::error::{ArtwiseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Backfilling,
    Ready,
}

pub struct DataCache {
    state: watch::Sender<CacheState>,
    history: RwLock<Arc<History>>,
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCache {
    pub fn new() -> Self {
        let (state, _) = watch::channel(CacheState::Uninitialized);
        Self {
            state,
            history: RwLock::new(Arc::new(History::new())),
        }
    }

    pub fn state(&self) -> CacheState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == CacheState::Ready
    }

    /// Mark a first backfill as in progress. No-op once ready.
    pub fn begin_backfill(&self) {
        self.state.send_if_modified(|state| {
            if *state == CacheState::Uninitialized {
                *state = CacheState::Backfilling;
                true
            } else {
                false
            }
        });
    }

    /// A first backfill failed; readers keep waiting.
    pub fn fail_backfill(&self) {
        self.state.send_if_modified(|state| {
            if *state == CacheState::Backfilling {
                *state = CacheState::Uninitialized;
                true
            } else {
                false
            }
        });
    }

    /// Swap in a new history and open the gate.
    pub async fn publish(&self, history: History) {
        *self.history.write().await = Arc::new(history);
        self.state.send_replace(CacheState::Ready);
    }

    /// Current history, or `CacheNotReady` before the first backfill.
    pub async fn read(&self) -> Result<Arc<History>> {
        if !self.is_ready() {
            return Err(ArtwiseError::CacheNotReady);
        }
        Ok(self.history.read().await.clone())
    }

    /// Wait until the cache is ready, then return the current history.
    pub async fn wait_ready(&self) -> Arc<History> {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state == CacheState::Ready).await;
        self.history.read().await.clone()
    }
}
