//! Conversation state: the utterance queue and the message history
//!
//! Utterances move strictly forward through `pending → delivered → responded`.
//! The user side of the history mirrors the queue one-to-one; assistant
//! replies exist only in the history.

mod store;
mod types;

pub use store::{ConversationStore, DEFAULT_MESSAGE_LIMIT, DEFAULT_UTTERANCE_LIMIT};
pub use types::{
    ConversationMessage, DeleteOutcome, QueueCounts, Role, Utterance, UtteranceStatus,
};
