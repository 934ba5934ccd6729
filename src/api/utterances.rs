//! Utterance queue and conversation history endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::error::ApiError;
use crate::Error;
use crate::conversation::{ConversationMessage, QueueCounts, Utterance};
use crate::session::{WaitOutcome, wait_for_pending};

/// Build utterance router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route(
            "/utterances",
            get(list_utterances).post(ingest).delete(clear),
        )
        .route("/utterances/status", get(status))
        .route("/utterances/{id}", delete(delete_utterance))
        .route("/conversation", get(conversation))
        .route("/dequeue-utterances", post(dequeue))
        .route("/wait-for-utterances", post(wait))
        .with_state(state)
}

/// New utterance
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// `?limit=N`
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct UtterancesResponse {
    pub utterances: Vec<Utterance>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Serialize)]
pub struct DequeueResponse {
    pub success: bool,
    pub utterances: Vec<Utterance>,
}

/// Optional wait parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitRequest {
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitResponse {
    pub utterances: Vec<Utterance>,
    pub timed_out: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub success: bool,
    pub cleared_count: usize,
}

async fn ingest(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<Json<Utterance>, ApiError> {
    let Json(request) = payload?;
    let utterance = state
        .session
        .lock()
        .await
        .store
        .ingest(&request.text, request.timestamp)?;
    Ok(Json(utterance))
}

async fn list_utterances(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<UtterancesResponse>, ApiError> {
    let Query(query) = query?;
    let utterances = state.session.lock().await.store.recent_utterances(query.limit);
    Ok(Json(UtterancesResponse { utterances }))
}

async fn conversation(
    State(state): State<Arc<ApiState>>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let Query(query) = query?;
    let messages = state.session.lock().await.store.recent_messages(query.limit);
    Ok(Json(ConversationResponse { messages }))
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<QueueCounts> {
    Json(state.session.lock().await.store.counts())
}

async fn dequeue(State(state): State<Arc<ApiState>>) -> Json<DequeueResponse> {
    let utterances = state.session.lock().await.store.deliver_pending();
    tracing::info!(count = utterances.len(), "dequeued utterances");
    Json(DequeueResponse {
        success: true,
        utterances,
    })
}

/// Wait for voice input
///
/// Body is optional; an empty body uses the configured timeout.
async fn wait(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<WaitResponse>, ApiError> {
    let request: WaitRequest = if body.iter().all(u8::is_ascii_whitespace) {
        WaitRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::Validation(format!("invalid request body: {e}")))?
    };

    let timeout = state.wait.effective_timeout(request.timeout_secs);
    tracing::debug!(?timeout, "waiting for utterances");

    let response = match wait_for_pending(&state.session, timeout, state.wait.poll_interval).await? {
        WaitOutcome::Delivered(utterances) => WaitResponse {
            utterances,
            timed_out: false,
        },
        WaitOutcome::TimedOut => WaitResponse {
            utterances: Vec::new(),
            timed_out: true,
        },
    };
    Ok(Json(response))
}

async fn delete_utterance(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state
        .session
        .lock()
        .await
        .store
        .delete(&id)
        .into_result(&id)?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "utterance deleted".to_string(),
    }))
}

async fn clear(State(state): State<Arc<ApiState>>) -> Json<ClearResponse> {
    let cleared_count = state.session.lock().await.store.clear();
    Json(ClearResponse {
        success: true,
        cleared_count,
    })
}
