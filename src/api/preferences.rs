//! Voice preference endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::Deserialize;

use super::ApiState;
use super::error::ApiError;
use crate::Error;
use crate::preferences::VoicePreferences;

/// Build preferences router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/voice-input-state", post(set_voice_input_state))
        .route(
            "/voice-preferences",
            get(get_preferences).post(update_preferences),
        )
        .route("/voice-preferences/reset", post(reset_preferences))
        .with_state(state)
}

/// Browser capture state
#[derive(Debug, Deserialize)]
pub struct VoiceInputStateRequest {
    pub active: bool,
}

/// Partial preference update
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePreferencesRequest {
    #[serde(default)]
    pub voice_input_active: Option<bool>,
    #[serde(default)]
    pub voice_responses_enabled: Option<bool>,
}

async fn set_voice_input_state(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<VoiceInputStateRequest>, JsonRejection>,
) -> Result<Json<VoicePreferences>, ApiError> {
    let Json(request) = payload?;
    let mut session = state.session.lock().await;
    session.preferences.set_voice_input_active(request.active);
    Ok(Json(session.preferences.snapshot()))
}

async fn get_preferences(State(state): State<Arc<ApiState>>) -> Json<VoicePreferences> {
    Json(state.session.lock().await.preferences.snapshot())
}

async fn update_preferences(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<VoicePreferencesRequest>, JsonRejection>,
) -> Result<Json<VoicePreferences>, ApiError> {
    let Json(request) = payload?;
    if request.voice_input_active.is_none() && request.voice_responses_enabled.is_none() {
        return Err(Error::Validation(
            "expected voiceInputActive or voiceResponsesEnabled".to_string(),
        )
        .into());
    }

    let mut session = state.session.lock().await;
    if let Some(active) = request.voice_input_active {
        session.preferences.set_voice_input_active(active);
    }
    if let Some(enabled) = request.voice_responses_enabled {
        session.preferences.set_voice_responses_enabled(enabled);
    }
    Ok(Json(session.preferences.snapshot()))
}

async fn reset_preferences(State(state): State<Arc<ApiState>>) -> Json<VoicePreferences> {
    let mut session = state.session.lock().await;
    session.reset();
    Json(session.preferences.snapshot())
}
