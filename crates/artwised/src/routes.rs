//! HTTP endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use artwise_core::{ViewerMessage, HARING_CHANNEL};
use serde_json::json;
use tracing::{debug, warn};

use crate::state::{AppState, PipelineBoard, PipelineQuery};
use crate::ws;

const WARMING_UP: &str = "warming up";

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/alive", get(alive))
        .route("/data/gocd", get(gocd_data))
        .route("/data/gocd/haring", get(haring_data))
        .route(&format!("/{HARING_CHANNEL}"), get(ws::haring_socket))
        .with_state(state)
}

pub async fn alive() -> &'static str {
    debug!("life sign");
    "OK"
}

/// Resolve `?pipeline=`, answering 404 for pipelines this server does not watch.
pub fn select_board<'a>(
    state: &'a AppState,
    query: &PipelineQuery,
) -> Result<&'a PipelineBoard, Response> {
    let requested = query.pipeline.as_deref();
    state.board(requested).ok_or_else(|| {
        let name = requested.unwrap_or(state.default_pipeline());
        error_response(StatusCode::NOT_FOUND, &format!("unknown pipeline {name}"))
    })
}

/// Raw history and activity.
pub async fn gocd_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PipelineQuery>,
) -> Response {
    let board = match select_board(&state, &query) {
        Ok(board) => board,
        Err(response) => return response,
    };
    if !board.monitor.cache().is_ready() {
        return WARMING_UP.into_response();
    }
    match board.monitor.read_data().await {
        Ok(data) => Json(data).into_response(),
        Err(err) => {
            warn!(error = %err, "Could not read data");
            error_response(StatusCode::BAD_GATEWAY, &err.to_string())
        }
    }
}

/// One board snapshot, computed per request.
pub async fn haring_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PipelineQuery>,
) -> Response {
    let board = match select_board(&state, &query) {
        Ok(board) => board,
        Err(response) => return response,
    };
    match board.scheduler.poll_once().await {
        ViewerMessage::Snapshot(assembly) => Json(assembly).into_response(),
        ViewerMessage::WarmingUp => WARMING_UP.into_response(),
        ViewerMessage::Error(message) => error_response(StatusCode::BAD_GATEWAY, &message),
        ViewerMessage::Pong => StatusCode::NO_CONTENT.into_response(),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use artwise_core::fakes::{MemoryActivity, MemoryFeed, MemoryMaterials, MemoryStageDetails};
    use artwise_core::{Author, BoardConfig, FeedEntry, FeedPage, Sources, StageResult};
    use chrono::{TimeZone, Utc};

    fn sources(builds: &[u64]) -> Sources {
        let entries = builds
            .iter()
            .map(|build| FeedEntry {
                id: format!("s{build}"),
                build_number: build.to_string(),
                stage_name: "build".to_string(),
                run_number: 1,
                updated: Utc.with_ymd_and_hms(2014, 7, 18, 16, 0, 0).unwrap(),
                result: Some(StageResult::Passed),
                author: Some(Author::new("Max Mustermann")),
                material_ref: None,
            })
            .collect();
        Sources {
            feed: Arc::new(MemoryFeed::new().with_first_page(FeedPage {
                entries,
                next: None,
            })),
            stages: Arc::new(MemoryStageDetails::new()),
            materials: Arc::new(MemoryMaterials::new()),
            activity: Arc::new(MemoryActivity::new()),
        }
    }

    fn state() -> Arc<AppState> {
        AppState::new(
            vec![
                ("web".to_string(), sources(&[])),
                ("api".to_string(), sources(&[7, 8])),
            ],
            BoardConfig::default(),
        )
        .unwrap()
    }

    fn query(pipeline: Option<&str>) -> Query<PipelineQuery> {
        Query(PipelineQuery {
            pipeline: pipeline.map(str::to_string),
        })
    }

    async fn backfill_all(state: &AppState) {
        for (_, board) in state.boards() {
            board.monitor.backfill().await.unwrap();
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_alive() {
        assert_eq!(alive().await, "OK");
    }

    #[tokio::test]
    async fn test_warming_up_before_backfill() {
        let state = state();
        let response = haring_data(State(state.clone()), query(None)).await;
        assert_eq!(body_text(response).await, "warming up");
        let response = gocd_data(State(state), query(None)).await;
        assert_eq!(body_text(response).await, "warming up");
    }

    #[tokio::test]
    async fn test_snapshot_after_backfill() {
        let state = state();
        backfill_all(&state).await;

        let response = haring_data(State(state.clone()), query(None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["figures"].as_array().unwrap().is_empty());

        let response = gocd_data(State(state), query(None)).await;
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["activity"]["jobs"].is_array());
    }

    #[tokio::test]
    async fn test_pipeline_query_selects_board() {
        let state = state();
        backfill_all(&state).await;

        let response = haring_data(State(state.clone()), query(Some("api"))).await;
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["figures"].as_array().unwrap().len(), 2);

        let response = gocd_data(State(state), query(Some("api"))).await;
        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["history"]["8"].is_object());
    }

    #[tokio::test]
    async fn test_unknown_pipeline_is_not_found() {
        let state = state();
        let response = haring_data(State(state.clone()), query(Some("nope"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = gocd_data(State(state), query(Some("nope"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("unknown pipeline nope"));
    }
}
