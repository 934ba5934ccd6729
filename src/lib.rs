//! Voice Gate - Spoken conversation and action gating for AI assistants
//!
//! This library provides the core functionality for the voice gate server:
//! - Utterance queue with conversation history
//! - Live fan-out of state changes to observers
//! - Action gate deciding whether the assistant may proceed or stop
//! - Tool invocation classifier (allow / deny / ask) with an audit trail
//! - Speech output through an external command
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │     Browser (speech capture)  │  Assistant hooks    │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP / SSE
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Voice Gate                        │
//! │  Session (store + preferences)  │  Hub  │  Gate     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │          Speech command  │  Audit log               │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod classifier;
pub mod config;
pub mod conversation;
pub mod error;
pub mod events;
pub mod gate;
pub mod hook;
pub mod preferences;
pub mod session;
pub mod speech;

pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use classifier::{Classification, CommandClassifier, Decision};
pub use config::Config;
pub use conversation::{ConversationStore, QueueCounts, Utterance, UtteranceStatus};
pub use error::{Error, Result};
pub use events::{EventHub, HubEvent, Subscription};
pub use gate::{GateAction, GateDecision, RequiredAction};
pub use preferences::VoicePreferences;
pub use session::VoiceSession;
pub use speech::{CommandSynthesizer, SpeechSynthesizer};
