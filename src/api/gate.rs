//! Action gate endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;

use super::ApiState;
use super::error::ApiError;
use crate::gate::{GateAction, GateDecision};

/// Build gate router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/validate-action", post(validate_action))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ValidateActionRequest {
    pub action: String,
}

async fn validate_action(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ValidateActionRequest>, JsonRejection>,
) -> Result<Json<GateDecision>, ApiError> {
    let Json(request) = payload?;
    let action: GateAction = request.action.parse()?;

    let decision = state.session.lock().await.evaluate(action);
    tracing::debug!(
        action = %request.action,
        allowed = decision.allowed,
        "validated action"
    );
    Ok(Json(decision))
}
