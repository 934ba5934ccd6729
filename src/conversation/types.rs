//! Conversation data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of an utterance
///
/// Ordered: an utterance only ever moves to a greater status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtteranceStatus {
    /// Captured, not yet handed to the assistant
    Pending,
    /// Handed to the assistant, awaiting a reply
    Delivered,
    /// Covered by a spoken assistant reply
    Responded,
}

impl UtteranceStatus {
    /// Lowercase name as used on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Responded => "responded",
        }
    }
}

impl std::fmt::Display for UtteranceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured span of user speech or typed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub status: UtteranceStatus,
}

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Display view over user utterances and assistant replies
///
/// User messages share the id of the utterance they mirror and carry its status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UtteranceStatus>,
}

impl ConversationMessage {
    /// Mirror an utterance as a user message
    #[must_use]
    pub fn mirror(utterance: &Utterance) -> Self {
        Self {
            id: utterance.id.clone(),
            role: Role::User,
            text: utterance.text.clone(),
            timestamp: utterance.timestamp,
            status: Some(utterance.status),
        }
    }
}

/// Snapshot of utterance counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub total: usize,
    pub pending: usize,
    pub delivered: usize,
    pub responded: usize,
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The utterance and its message were removed
    Deleted,
    /// No utterance with that id exists
    NotFound,
    /// The utterance has left the pending state and can no longer be removed
    NotPending(UtteranceStatus),
}

impl DeleteOutcome {
    /// Convert a refused delete into a precondition failure
    ///
    /// # Errors
    ///
    /// Returns `Error::PreconditionFailed` unless the utterance was removed
    pub fn into_result(self, id: &str) -> crate::Result<()> {
        match self {
            Self::Deleted => Ok(()),
            Self::NotFound => Err(crate::Error::PreconditionFailed(format!(
                "utterance {id} not found"
            ))),
            Self::NotPending(status) => Err(crate::Error::PreconditionFailed(format!(
                "only pending utterances can be deleted (utterance {id} is {status})"
            ))),
        }
    }
}
