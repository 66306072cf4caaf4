//! Broadcast scheduler: one recurring poll per connected viewer.
//!
//! A viewer is anything implementing [`ViewerSink`]. On connect the scheduler
//! pushes one message immediately and then one per interval until the
//! returned [`ViewerSubscription`] is closed or dropped. Closing aborts the
//! viewer's task, so no poll fires after teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::assembler::Assembly;
use crate::config::MIN_INTERVAL_SECS;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs;

/// Channel name wrapping board snapshots on the wire.
pub const HARING_CHANNEL: &str = "haring";

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardUpdate {
    /// The cache has not completed its first backfill.
    WarmingUp,
    Snapshot(Assembly),
}

/// Computes the current board for a poll.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn poll(&self) -> Result<BoardUpdate>;
}

/// Message delivered to a viewer.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerMessage {
    Snapshot(Assembly),
    WarmingUp,
    Error(String),
    /// Answer to a viewer's application-level `ping`.
    Pong,
}

impl From<BoardUpdate> for ViewerMessage {
    fn from(update: BoardUpdate) -> Self {
        match update {
            BoardUpdate::WarmingUp => ViewerMessage::WarmingUp,
            BoardUpdate::Snapshot(assembly) => ViewerMessage::Snapshot(assembly),
        }
    }
}

impl ViewerMessage {
    pub fn to_json(&self, channel: &str) -> Result<Value> {
        Ok(match self {
            ViewerMessage::Snapshot(assembly) => {
                let snapshot = serde_json::to_value(assembly)?;
                json!({ channel: snapshot })
            }
            ViewerMessage::WarmingUp => json!({ channel: { "warmingUp": true } }),
            ViewerMessage::Error(message) => json!({ "error": message }),
            ViewerMessage::Pong => json!({ "ping": "success" }),
        })
    }

    pub fn to_text(&self, channel: &str) -> Result<String> {
        Ok(self.to_json(channel)?.to_string())
    }
}

/// Outbound side of one viewer connection.
#[async_trait]
pub trait ViewerSink: Send + Sync {
    /// Deliver a message. Returns `false` once the viewer is gone.
    async fn push(&self, message: ViewerMessage) -> bool;
}

pub struct BroadcastScheduler {
    provider: Arc<dyn SnapshotProvider>,
    interval: Duration,
}

impl BroadcastScheduler {
    /// A zero `interval` is raised to [`MIN_INTERVAL_SECS`] seconds.
    pub fn new(provider: Arc<dyn SnapshotProvider>, interval: Duration) -> Self {
        Self {
            provider,
            interval: interval.max(Duration::from_secs(MIN_INTERVAL_SECS)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the recurring poll for a new viewer.
    pub fn connect(&self, sink: Arc<dyn ViewerSink>) -> ViewerSubscription {
        let id = Uuid::new_v4().to_string();
        let closed = Arc::new(AtomicBool::new(false));
        obs::emit_viewer_connected(&id, HARING_CHANNEL);

        let task = tokio::spawn(run_viewer(
            id.clone(),
            self.provider.clone(),
            sink,
            self.interval,
            closed.clone(),
        ));

        ViewerSubscription {
            id,
            closed,
            task: Some(task),
        }
    }

    /// Compute a single message without a persistent connection.
    pub async fn poll_once(&self) -> ViewerMessage {
        poll_message("request", self.provider.as_ref()).await
    }
}

async fn poll_message(viewer_id: &str, provider: &dyn SnapshotProvider) -> ViewerMessage {
    match provider.poll().await {
        Ok(update) => update.into(),
        Err(err) => {
            METRICS.inc_poll_failures();
            obs::emit_poll_failed(viewer_id, &err);
            ViewerMessage::Error(err.to_string())
        }
    }
}

async fn run_viewer(
    id: String,
    provider: Arc<dyn SnapshotProvider>,
    sink: Arc<dyn ViewerSink>,
    interval: Duration,
    closed: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately.
        ticker.tick().await;
        if closed.load(Ordering::SeqCst) {
            break;
        }
        let message = poll_message(&id, provider.as_ref()).await;
        if closed.load(Ordering::SeqCst) {
            break;
        }
        if !sink.push(message).await {
            obs::emit_viewer_disconnected(&id, "sink closed");
            return;
        }
        METRICS.inc_snapshots_pushed();
    }
    obs::emit_viewer_disconnected(&id, "closed");
}

/// Handle to one viewer's recurring poll. Dropping it tears the poll down.
pub struct ViewerSubscription {
    id: String,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ViewerSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ViewerSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Last time a viewer showed signs of life.
#[derive(Debug)]
pub struct Liveness {
    last_seen: Mutex<Instant>,
    stale_after: Duration,
}

impl Liveness {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            last_seen: Mutex::new(Instant::now()),
            stale_after,
        }
    }

    pub fn touch(&self) {
        let mut last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last_seen = Instant::now();
    }

    pub fn is_stale(&self) -> bool {
        let last_seen = self
            .last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        last_seen.elapsed() > self.stale_after
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArtwiseError;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<ViewerMessage>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.messages.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ViewerSink for RecordingSink {
        async fn push(&self, message: ViewerMessage) -> bool {
            self.messages.lock().unwrap().push(message);
            true
        }
    }

    /// Fails on the polls listed in `fail_on` (zero-based).
    struct CountingProvider {
        polls: AtomicUsize,
        fail_on: Vec<usize>,
    }

    #[async_trait]
    impl SnapshotProvider for CountingProvider {
        async fn poll(&self) -> Result<BoardUpdate> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&n) {
                return Err(ArtwiseError::Poll("boom".to_string()));
            }
            Ok(BoardUpdate::WarmingUp)
        }
    }

    fn scheduler_every(fail_on: Vec<usize>, interval: Duration) -> BroadcastScheduler {
        let provider = Arc::new(CountingProvider {
            polls: AtomicUsize::new(0),
            fail_on,
        });
        BroadcastScheduler::new(provider, interval)
    }

    fn scheduler(fail_on: Vec<usize>) -> BroadcastScheduler {
        scheduler_every(fail_on, Duration::from_secs(10))
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pushes_immediately_then_per_interval() {
        let scheduler = scheduler(vec![]);
        let sink = Arc::new(RecordingSink::default());
        let _sub = scheduler.connect(sink.clone());

        settle().await;
        assert_eq!(sink.count(), 1);

        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_still_polls() {
        let scheduler = scheduler_every(vec![], Duration::ZERO);
        assert_eq!(scheduler.interval(), Duration::from_secs(1));
        let sink = Arc::new(RecordingSink::default());
        let _sub = scheduler.connect(sink.clone());

        settle().await;
        assert_eq!(sink.count(), 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(sink.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_push_after_close() {
        let scheduler = scheduler(vec![]);
        let sink = Arc::new(RecordingSink::default());
        let mut sub = scheduler.connect(sink.clone());
        settle().await;
        let before = sink.count();

        sub.close();
        assert!(sub.is_closed());
        tokio::time::advance(Duration::from_secs(35)).await;
        settle().await;
        assert_eq!(sink.count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_reported_and_loop_continues() {
        let scheduler = scheduler(vec![0]);
        let sink = Arc::new(RecordingSink::default());
        let _sub = scheduler.connect(sink.clone());
        settle().await;
        tokio::time::advance(Duration::from_secs(10)).await;
        settle().await;

        let messages = sink.messages.lock().unwrap().clone();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ViewerMessage::Error(_)));
        assert_eq!(messages[1], ViewerMessage::WarmingUp);
    }

    #[test]
    fn test_wire_shapes() {
        assert_eq!(
            ViewerMessage::WarmingUp.to_text(HARING_CHANNEL).unwrap(),
            r#"{"haring":{"warmingUp":true}}"#
        );
        assert_eq!(
            ViewerMessage::Error("boom".into()).to_text(HARING_CHANNEL).unwrap(),
            r#"{"error":"boom"}"#
        );
        assert_eq!(
            ViewerMessage::Pong.to_text(HARING_CHANNEL).unwrap(),
            r#"{"ping":"success"}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_goes_stale() {
        let liveness = Liveness::new(Duration::from_secs(90));
        assert!(!liveness.is_stale());
        tokio::time::advance(Duration::from_secs(91)).await;
        assert!(liveness.is_stale());
        liveness.touch();
        assert!(!liveness.is_stale());
    }
}
