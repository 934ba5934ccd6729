//! Live conversation events fanned out to subscribed observers
//!
//! Publishing is best-effort: an observer whose channel has closed is dropped
//! from the registry and never surfaces an error to the publisher.
//!
//! Call [`EventHub::subscribe`] to register, then read the returned
//! [`Subscription`] as a stream. Dropping the subscription unregisters it.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::conversation::{ConversationMessage, Utterance};

/// Event pushed to observers
///
/// Serialized with a `type` tag, e.g. `{"type":"utterance-deleted","id":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HubEvent {
    /// Sent once to a new observer, and only to it
    Connected,
    UtteranceAdded {
        utterance: Utterance,
    },
    UtteranceStatusChanged {
        utterance: Utterance,
    },
    UtteranceDeleted {
        id: String,
    },
    QueueCleared {
        count: usize,
    },
    AssistantMessageAdded {
        message: ConversationMessage,
    },
}

impl HubEvent {
    /// Wire name of the event type
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::UtteranceAdded { .. } => "utterance-added",
            Self::UtteranceStatusChanged { .. } => "utterance-status-changed",
            Self::UtteranceDeleted { .. } => "utterance-deleted",
            Self::QueueCleared { .. } => "queue-cleared",
            Self::AssistantMessageAdded { .. } => "assistant-message-added",
        }
    }
}

type Subscribers = HashMap<Uuid, mpsc::UnboundedSender<HubEvent>>;

/// Registry of live observers
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl EventHub {
    /// Create an empty hub
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer
    ///
    /// The observer immediately receives [`HubEvent::Connected`].
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();

        // Receiver is alive, so this cannot fail
        let _ = tx.send(HubEvent::Connected);

        let mut subscribers = self.lock();
        subscribers.insert(id, tx);
        tracing::debug!(%id, observers = subscribers.len(), "observer subscribed");
        drop(subscribers);

        Subscription {
            id,
            receiver: rx,
            hub: self.clone(),
        }
    }

    /// Remove an observer, returning whether it was registered
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(%id, "observer unsubscribed");
        }
        removed
    }

    /// Push an event to every live observer
    ///
    /// Observers that have gone away are dropped. Returns the number of
    /// observers the event reached.
    pub fn publish(&self, event: &HubEvent) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|id, tx| {
            let alive = tx.send(event.clone()).is_ok();
            if !alive {
                tracing::debug!(%id, event = event.name(), "dropping closed observer");
            }
            alive
        });
        subscribers.len()
    }

    /// Number of registered observers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }
}

/// A registered observer's end of the hub
///
/// Implements [`futures::Stream`]; unregisters itself on drop.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    receiver: mpsc::UnboundedReceiver<HubEvent>,
    hub: EventHub,
}

impl Subscription {
    /// Registry id of this observer
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<HubEvent> {
        self.receiver.try_recv().ok()
    }
}

impl futures::Stream for Subscription {
    type Item = HubEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}
