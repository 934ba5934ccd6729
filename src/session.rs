//! Owned conversation context shared by the HTTP layer

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::conversation::{ConversationStore, Utterance};
use crate::events::EventHub;
use crate::gate::{self, GateAction, GateDecision};
use crate::preferences::VoicePreferences;
use crate::{Error, Result};

/// Conversation store plus voice preferences
#[derive(Debug)]
pub struct VoiceSession {
    pub store: ConversationStore,
    pub preferences: VoicePreferences,
}

impl VoiceSession {
    /// Create an empty session publishing store events to `hub`
    #[must_use]
    pub const fn new(hub: EventHub) -> Self {
        Self {
            store: ConversationStore::new(hub),
            preferences: VoicePreferences {
                voice_input_active: false,
                voice_responses_enabled: false,
            },
        }
    }

    /// Gate an assistant step against the current state
    #[must_use]
    pub fn evaluate(&self, action: GateAction) -> GateDecision {
        gate::evaluate(action, &self.store.counts(), &self.preferences)
    }

    /// Return preferences to their defaults; queued conversation is kept
    pub fn reset(&mut self) {
        self.preferences.reset();
    }
}

/// Outcome of [`wait_for_pending`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Pending utterances were found and marked delivered, newest first
    Delivered(Vec<Utterance>),
    /// Nothing arrived before the deadline
    TimedOut,
}

/// Poll for pending utterances until one arrives or `timeout` elapses
///
/// The lock is held only while checking, never across the sleep, so dropping
/// the returned future at any point leaves no state behind.
///
/// # Errors
///
/// Returns `Error::PreconditionFailed` if voice input is inactive, either at
/// the start or at any later check.
pub async fn wait_for_pending(
    session: &Mutex<VoiceSession>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<WaitOutcome> {
    let deadline = Instant::now() + timeout;

    loop {
        {
            let mut session = session.lock().await;
            if !session.preferences.voice_input_active {
                return Err(Error::PreconditionFailed(
                    "voice input is not active; enable it before waiting for utterances"
                        .to_string(),
                ));
            }

            let delivered = session.store.deliver_pending();
            if !delivered.is_empty() {
                tracing::debug!(count = delivered.len(), "wait delivered utterances");
                return Ok(WaitOutcome::Delivered(delivered));
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(WaitOutcome::TimedOut);
        }
        tokio::time::sleep(poll_interval.min(deadline - now)).await;
    }
}
