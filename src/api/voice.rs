//! Spoken output endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::error::ApiError;
use crate::Error;
use crate::speech::{DEFAULT_RATE, validate_rate};

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/speak", post(speak))
        .route("/speak-system", post(speak_system))
        .with_state(state)
}

/// Assistant reply to speak
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

/// System announcement to speak regardless of preferences
#[derive(Debug, Deserialize)]
pub struct SpeakSystemRequest {
    pub text: String,
    #[serde(default)]
    pub rate: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakResponse {
    pub success: bool,
    pub responded_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SpeakSystemResponse {
    pub success: bool,
}

fn required_text(text: &str) -> Result<&str, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("text is required".to_string()));
    }
    Ok(text)
}

/// Speak an assistant reply
///
/// Records the reply and marks every delivered utterance responded. The
/// session lock is released while speech runs.
async fn speak(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SpeakRequest>, JsonRejection>,
) -> Result<Json<SpeakResponse>, ApiError> {
    let Json(request) = payload?;
    let text = required_text(&request.text)?;

    if !state.session.lock().await.preferences.voice_responses_enabled {
        return Err(Error::PreconditionFailed(
            "voice responses are disabled; enable them to speak".to_string(),
        )
        .into());
    }

    state.speech.speak(text, state.speech_rate).await?;

    let mut session = state.session.lock().await;
    session.store.append_assistant_reply(text)?;
    let responded_count = session.store.respond_delivered();
    drop(session);

    tracing::info!(responded_count, "spoke assistant reply");
    Ok(Json(SpeakResponse {
        success: true,
        responded_count,
    }))
}

/// Speak a system message, ignoring voice preferences
async fn speak_system(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<SpeakSystemRequest>, JsonRejection>,
) -> Result<Json<SpeakSystemResponse>, ApiError> {
    let Json(request) = payload?;
    let text = required_text(&request.text)?;
    let rate = validate_rate(request.rate.unwrap_or(i64::from(DEFAULT_RATE)))?;

    state.speech.speak(text, rate).await?;

    Ok(Json(SpeakSystemResponse { success: true }))
}
