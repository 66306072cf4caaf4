//! Websocket transport for board viewers.
//!
//! Each connection gets a write task fed by an mpsc channel, a recurring
//! board poll from the scheduler and a ping ticker that drops the viewer
//! once it has been silent for too long.

use std::sync::Arc;

use artwise_core::{Liveness, ViewerMessage, ViewerSink, HARING_CHANNEL};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::routes::select_board;
use crate::state::{AppState, PipelineBoard, PipelineQuery};

const OUTBOUND_BUFFER: usize = 64;

/// Text a viewer sends to check the connection.
const PING_TEXT: &str = "ping";

pub async fn haring_socket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<PipelineQuery>,
) -> Response {
    if let Err(response) = select_board(&state, &query) {
        return response;
    }
    ws.on_upgrade(move |socket| handle_socket(state, query, socket))
}

/// Viewer sink writing JSON text frames into the connection's outbound queue.
pub struct ChannelSink {
    sender: mpsc::Sender<Message>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, message: &ViewerMessage) -> bool {
        match message.to_text(HARING_CHANNEL) {
            Ok(text) => self.sender.send(Message::Text(text)).await.is_ok(),
            Err(err) => {
                warn!(error = %err, "Could not serialize viewer message");
                true
            }
        }
    }
}

#[async_trait]
impl ViewerSink for ChannelSink {
    async fn push(&self, message: ViewerMessage) -> bool {
        self.send(&message).await
    }
}

async fn handle_socket(state: Arc<AppState>, query: PipelineQuery, socket: WebSocket) {
    let Some(board) = state.board(query.pipeline.as_deref()) else {
        return;
    };
    let (mut ws_sender, ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    let write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                return;
            }
        }
    });

    serve_viewer(board, ws_receiver, tx).await;
    let _ = write_task.await;
}

/// Why a viewer connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    Closed,
    ReadError,
    Stale,
}

impl Disconnect {
    fn as_str(self) -> &'static str {
        match self {
            Disconnect::Closed => "closed",
            Disconnect::ReadError => "read error",
            Disconnect::Stale => "stale",
        }
    }
}

/// Run one viewer until it closes, errors or goes silent, then tear down its
/// poll and ping tasks. Returns once every sender clone held here is dropped.
pub async fn serve_viewer<S>(
    board: &PipelineBoard,
    mut receiver: S,
    tx: mpsc::Sender<Message>,
) -> Disconnect
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let sink = Arc::new(ChannelSink::new(tx.clone()));
    let mut subscription = board.scheduler.connect(sink.clone());
    let liveness = Arc::new(Liveness::new(board.config().stale_after()));
    let (stale_tx, mut stale_rx) = oneshot::channel();
    let ping_task = spawn_ping(
        tx.clone(),
        liveness.clone(),
        board.config().ping_interval(),
        subscription.id().to_string(),
        stale_tx,
    );

    let reason = loop {
        let msg = tokio::select! {
            // A dropped sender (pings disabled) just disables this branch.
            Ok(()) = &mut stale_rx => break Disconnect::Stale,
            next = receiver.next() => next,
        };
        let msg = match msg {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                debug!(viewer_id = %subscription.id(), error = %err, "Read error");
                break Disconnect::ReadError;
            }
            None => break Disconnect::Closed,
        };
        liveness.touch();
        match msg {
            Message::Text(text) if text.trim() == PING_TEXT => {
                if !sink.send(&ViewerMessage::Pong).await {
                    break Disconnect::Closed;
                }
            }
            Message::Close(_) => break Disconnect::Closed,
            _ => {}
        }
    };

    debug!(viewer_id = %subscription.id(), reason = reason.as_str(), "Tearing down viewer");
    ping_task.abort();
    subscription.close();
    reason
}

/// Send Ping frames every `interval`; once the viewer has been silent for too
/// long, queue a Close frame and fire `stale`.
fn spawn_ping(
    sender: mpsc::Sender<Message>,
    liveness: Arc<Liveness>,
    interval: std::time::Duration,
    viewer_id: String,
    stale: oneshot::Sender<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if interval.is_zero() {
            return;
        }
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if liveness.is_stale() {
                warn!(viewer_id = %viewer_id, "Viewer went silent, closing");
                let _ = sender.send(Message::Close(None)).await;
                let _ = stale.send(());
                return;
            }
            if sender.send(Message::Ping(Vec::new())).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use artwise_core::{BoardConfig, Fixture};
    use futures::stream;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sink_writes_wrapped_text() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);
        assert!(sink.push(ViewerMessage::WarmingUp).await);
        match rx.recv().await.unwrap() {
            Message::Text(text) => assert_eq!(text, r#"{"haring":{"warmingUp":true}}"#),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sink_reports_closed_connection() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let sink = ChannelSink::new(tx);
        assert!(!sink.push(ViewerMessage::Pong).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_viewer_gets_closed() {
        let (tx, mut rx) = mpsc::channel(8);
        let liveness = Arc::new(Liveness::new(Duration::from_secs(90)));
        let (stale_tx, stale_rx) = oneshot::channel();
        let _task = spawn_ping(
            tx,
            liveness,
            Duration::from_secs(30),
            "v1".to_string(),
            stale_tx,
        );

        let mut pings = 0;
        loop {
            match rx.recv().await.unwrap() {
                Message::Ping(_) => pings += 1,
                Message::Close(_) => break,
                other => panic!("unexpected frame {other:?}"),
            }
        }
        assert_eq!(pings, 3);
        assert!(stale_rx.await.is_ok());
    }

    fn fake_board() -> PipelineBoard {
        let config = BoardConfig {
            poll_interval_secs: 10,
            ping_interval_secs: 30,
            ..BoardConfig::default()
        };
        PipelineBoard::new(Fixture::default().into_sources(), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_viewer_is_torn_down() {
        let board = fake_board();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_BUFFER);
        let silent = stream::pending::<Result<Message, axum::Error>>();

        let reason = serve_viewer(&board, silent, tx).await;
        assert_eq!(reason, Disconnect::Stale);

        // Every sender is gone once the poll and ping tasks have stopped.
        let frames = tokio::time::timeout(Duration::from_secs(600), async {
            let mut frames = Vec::new();
            while let Some(frame) = rx.recv().await {
                frames.push(frame);
            }
            frames
        })
        .await
        .unwrap();
        assert!(frames.iter().any(|frame| matches!(frame, Message::Close(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_text_is_answered_until_close() {
        let board = fake_board();
        let (tx, mut rx) = mpsc::channel(OUTBOUND_BUFFER);
        let incoming = stream::iter(vec![Ok(Message::Text(" ping ".to_string()))]);

        let reason = serve_viewer(&board, incoming, tx).await;
        assert_eq!(reason, Disconnect::Closed);

        let mut texts = Vec::new();
        while let Some(frame) = rx.recv().await {
            if let Message::Text(text) = frame {
                texts.push(text);
            }
        }
        assert!(texts.contains(&r#"{"ping":"success"}"#.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_pings_never_mark_stale() {
        let config = BoardConfig {
            ping_interval_secs: 0,
            ..BoardConfig::default()
        };
        let board = PipelineBoard::new(Fixture::default().into_sources(), config);
        let (tx, _rx) = mpsc::channel(OUTBOUND_BUFFER);
        let silent = stream::pending::<Result<Message, axum::Error>>();

        let served = tokio::time::timeout(
            Duration::from_secs(3600),
            serve_viewer(&board, silent, tx),
        )
        .await;
        assert!(served.is_err());
    }
}
