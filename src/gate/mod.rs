//! Action gate: may the assistant use a tool or end its turn right now?
//!
//! Checks run in priority order and stop at the first failure:
//!
//! 1. unread voice input (pending utterances while voice input is active)
//! 2. unspoken replies (delivered utterances while voice responses are enabled)
//! 3. stopping while voice input is active and the queue is not empty

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conversation::QueueCounts;
use crate::preferences::VoicePreferences;
use crate::{Error, Result};

/// Assistant step being gated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateAction {
    ToolUse,
    Stop,
}

impl FromStr for GateAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tool-use" => Ok(Self::ToolUse),
            "stop" => Ok(Self::Stop),
            other => Err(Error::Validation(format!(
                "invalid action '{other}': expected 'tool-use' or 'stop'"
            ))),
        }
    }
}

/// What the assistant must do before the gated step is allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAction {
    DequeueUtterances,
    Speak,
    WaitForUtterance,
}

/// Gate verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_action: Option<RequiredAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl GateDecision {
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            required_action: None,
            reason: None,
        }
    }

    fn deny(required_action: RequiredAction, reason: String) -> Self {
        Self {
            allowed: false,
            required_action: Some(required_action),
            reason: Some(reason),
        }
    }
}

/// Decide whether `action` may proceed given the queue and preferences
#[must_use]
pub fn evaluate(
    action: GateAction,
    counts: &QueueCounts,
    preferences: &VoicePreferences,
) -> GateDecision {
    if preferences.voice_input_active && counts.pending > 0 {
        return GateDecision::deny(
            RequiredAction::DequeueUtterances,
            format!(
                "{} pending utterance(s) must be dequeued first. Use dequeue_utterances to process them.",
                counts.pending
            ),
        );
    }

    if preferences.voice_responses_enabled && counts.delivered > 0 {
        return GateDecision::deny(
            RequiredAction::Speak,
            format!(
                "{} delivered utterance(s) require a voice response. Use speak to respond before proceeding.",
                counts.delivered
            ),
        );
    }

    if action == GateAction::Stop && preferences.voice_input_active && counts.total > 0 {
        return GateDecision::deny(
            RequiredAction::WaitForUtterance,
            "Stopping is not allowed without first checking for voice input. Use wait_for_utterance to listen for more."
                .to_string(),
        );
    }

    GateDecision::allow()
}
