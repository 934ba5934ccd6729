//! Voice input and voice response toggles

use serde::{Deserialize, Serialize};

/// Process-wide voice preferences
///
/// Both toggles default to off and return to off on [`VoicePreferences::reset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoicePreferences {
    /// The browser is capturing speech into the queue
    pub voice_input_active: bool,
    /// Assistant replies are spoken aloud
    pub voice_responses_enabled: bool,
}

impl VoicePreferences {
    pub fn set_voice_input_active(&mut self, active: bool) {
        tracing::info!(active, "voice input state changed");
        self.voice_input_active = active;
    }

    pub fn set_voice_responses_enabled(&mut self, enabled: bool) {
        tracing::info!(enabled, "voice responses toggled");
        self.voice_responses_enabled = enabled;
    }

    /// Copy of the current values
    #[must_use]
    pub const fn snapshot(&self) -> Self {
        *self
    }

    /// Restore both toggles to off
    pub fn reset(&mut self) {
        *self = Self::default();
        tracing::debug!("voice preferences reset");
    }
}
