//! Utterance queue and message history

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{
    ConversationMessage, DeleteOutcome, QueueCounts, Role, Utterance, UtteranceStatus,
};
use crate::events::{EventHub, HubEvent};
use crate::{Error, Result};

/// Default number of utterances returned by [`ConversationStore::recent_utterances`]
pub const DEFAULT_UTTERANCE_LIMIT: usize = 10;

/// Default number of messages returned by [`ConversationStore::recent_messages`]
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;

/// In-memory conversation state
///
/// Every utterance has exactly one mirrored user message, written and removed
/// in the same call. Each successful mutation is published to the hub.
#[derive(Debug)]
pub struct ConversationStore {
    utterances: Vec<Utterance>,
    messages: Vec<ConversationMessage>,
    hub: EventHub,
}

impl ConversationStore {
    /// Create an empty store publishing to `hub`
    #[must_use]
    pub const fn new(hub: EventHub) -> Self {
        Self {
            utterances: Vec::new(),
            messages: Vec::new(),
            hub,
        }
    }

    /// Queue a new pending utterance
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `text` is empty after trimming
    pub fn ingest(&mut self, text: &str, timestamp: Option<DateTime<Utc>>) -> Result<Utterance> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("text is required".to_string()));
        }

        let utterance = Utterance {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
            status: UtteranceStatus::Pending,
        };

        self.messages.push(ConversationMessage::mirror(&utterance));
        self.utterances.push(utterance.clone());

        tracing::info!(id = %utterance.id, "utterance added");
        self.hub.publish(&HubEvent::UtteranceAdded {
            utterance: utterance.clone(),
        });

        Ok(utterance)
    }

    /// Record an assistant reply in the message history
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `text` is empty after trimming
    pub fn append_assistant_reply(&mut self, text: &str) -> Result<ConversationMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("text is required".to_string()));
        }

        let message = ConversationMessage {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: text.to_string(),
            timestamp: Utc::now(),
            status: None,
        };
        self.messages.push(message.clone());

        tracing::debug!(id = %message.id, "assistant message added");
        self.hub.publish(&HubEvent::AssistantMessageAdded {
            message: message.clone(),
        });

        Ok(message)
    }

    /// Advance an utterance to `delivered`
    ///
    /// Returns `false` without side effects if the id is unknown or the
    /// utterance is already delivered or responded.
    pub fn mark_delivered(&mut self, id: &str) -> bool {
        self.advance(id, UtteranceStatus::Delivered)
    }

    /// Advance an utterance to `responded`
    ///
    /// Returns `false` without side effects if the id is unknown or the
    /// utterance is already responded.
    pub fn mark_responded(&mut self, id: &str) -> bool {
        self.advance(id, UtteranceStatus::Responded)
    }

    fn advance(&mut self, id: &str, target: UtteranceStatus) -> bool {
        let Some(utterance) = self.utterances.iter_mut().find(|u| u.id == id) else {
            return false;
        };
        if utterance.status >= target {
            return false;
        }

        utterance.status = target;
        let updated = utterance.clone();

        if let Some(message) = self
            .messages
            .iter_mut()
            .find(|m| m.role == Role::User && m.id == id)
        {
            message.status = Some(target);
        }

        tracing::debug!(id, status = %target, "utterance status changed");
        self.hub
            .publish(&HubEvent::UtteranceStatusChanged { utterance: updated });

        true
    }

    /// Mark every pending utterance delivered
    ///
    /// Returns the newly delivered utterances, newest first.
    pub fn deliver_pending(&mut self) -> Vec<Utterance> {
        let mut pending = self.ids_with_status(UtteranceStatus::Pending);
        // Newest first
        pending.sort_by(|a, b| b.1.cmp(&a.1));

        let mut delivered = Vec::with_capacity(pending.len());
        for (id, _) in pending {
            if self.mark_delivered(&id)
                && let Some(utterance) = self.get(&id)
            {
                delivered.push(utterance.clone());
            }
        }
        delivered
    }

    /// Mark every delivered utterance responded, returning how many changed
    pub fn respond_delivered(&mut self) -> usize {
        self.ids_with_status(UtteranceStatus::Delivered)
            .into_iter()
            .filter(|(id, _)| self.mark_responded(id))
            .count()
    }

    fn ids_with_status(&self, status: UtteranceStatus) -> Vec<(String, DateTime<Utc>)> {
        self.utterances
            .iter()
            .filter(|u| u.status == status)
            .map(|u| (u.id.clone(), u.timestamp))
            .collect()
    }

    /// Remove a pending utterance and its mirrored message
    ///
    /// Delivered and responded utterances are kept; the outcome says why.
    pub fn delete(&mut self, id: &str) -> DeleteOutcome {
        let Some(index) = self.utterances.iter().position(|u| u.id == id) else {
            return DeleteOutcome::NotFound;
        };

        let status = self.utterances[index].status;
        if status != UtteranceStatus::Pending {
            return DeleteOutcome::NotPending(status);
        }

        self.utterances.remove(index);
        self.messages.retain(|m| !(m.role == Role::User && m.id == id));

        tracing::info!(id, "utterance deleted");
        self.hub.publish(&HubEvent::UtteranceDeleted { id: id.to_string() });

        DeleteOutcome::Deleted
    }

    /// Remove all utterances and messages, returning the number of utterances removed
    pub fn clear(&mut self) -> usize {
        let count = self.utterances.len();
        self.utterances.clear();
        self.messages.clear();

        tracing::info!(count, "queue cleared");
        self.hub.publish(&HubEvent::QueueCleared { count });

        count
    }

    /// Most recent utterances, newest first
    #[must_use]
    pub fn recent_utterances(&self, limit: Option<usize>) -> Vec<Utterance> {
        // Reversed first so equal timestamps keep the later insertion ahead
        let mut utterances: Vec<Utterance> = self.utterances.iter().rev().cloned().collect();
        utterances.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        utterances.truncate(limit.unwrap_or(DEFAULT_UTTERANCE_LIMIT));
        utterances
    }

    /// The last `limit` messages, oldest first
    #[must_use]
    pub fn recent_messages(&self, limit: Option<usize>) -> Vec<ConversationMessage> {
        let mut messages = self.messages.clone();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let limit = limit.unwrap_or(DEFAULT_MESSAGE_LIMIT);
        let skip = messages.len().saturating_sub(limit);
        messages.split_off(skip)
    }

    /// Utterance counts by status
    #[must_use]
    pub fn counts(&self) -> QueueCounts {
        self.utterances
            .iter()
            .fold(QueueCounts::default(), |mut counts, u| {
                counts.total += 1;
                match u.status {
                    UtteranceStatus::Pending => counts.pending += 1,
                    UtteranceStatus::Delivered => counts.delivered += 1,
                    UtteranceStatus::Responded => counts.responded += 1,
                }
                counts
            })
    }

    /// Look up an utterance by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Utterance> {
        self.utterances.iter().find(|u| u.id == id)
    }

    /// Look up the message mirroring or recording `id`
    #[must_use]
    pub fn message(&self, id: &str) -> Option<&ConversationMessage> {
        self.messages.iter().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::new(EventHub::new())
    }

    #[test]
    fn test_ingest_trims_and_mirrors() {
        let mut store = store();
        let utterance = store.ingest("  hello there \n", None).unwrap();

        assert_eq!(utterance.text, "hello there");
        assert_eq!(utterance.status, UtteranceStatus::Pending);

        let message = store.message(&utterance.id).unwrap();
        assert_eq!(message.role, Role::User);
        assert_eq!(message.text, "hello there");
        assert_eq!(message.status, Some(UtteranceStatus::Pending));
    }

    #[test]
    fn test_ingest_rejects_blank_text() {
        let mut store = store();
        assert!(matches!(store.ingest("   ", None), Err(Error::Validation(_))));
        assert!(matches!(store.ingest("", None), Err(Error::Validation(_))));
        assert_eq!(store.counts().total, 0);
        assert!(store.recent_messages(None).is_empty());
    }

    #[test]
    fn test_assistant_reply_has_no_status_or_utterance() {
        let mut store = store();
        let message = store.append_assistant_reply("sure thing").unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.status, None);
        assert_eq!(store.counts().total, 0);
        assert!(matches!(
            store.append_assistant_reply(" "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_status_is_monotone() {
        let mut store = store();
        let id = store.ingest("one", None).unwrap().id;

        assert!(store.mark_delivered(&id));
        assert!(!store.mark_delivered(&id));
        assert!(store.mark_responded(&id));
        assert!(!store.mark_delivered(&id));
        assert!(!store.mark_responded(&id));

        assert_eq!(store.get(&id).unwrap().status, UtteranceStatus::Responded);
        assert_eq!(
            store.message(&id).unwrap().status,
            Some(UtteranceStatus::Responded)
        );
    }

    #[test]
    fn test_mark_unknown_id_is_noop() {
        let mut store = store();
        assert!(!store.mark_delivered("missing"));
        assert!(!store.mark_responded("missing"));
    }

    #[test]
    fn test_repeated_mark_delivered_publishes_once() {
        let hub = EventHub::new();
        let mut store = ConversationStore::new(hub.clone());
        let id = store.ingest("one", None).unwrap().id;

        let mut subscription = hub.subscribe();
        assert_eq!(subscription.try_recv(), Some(HubEvent::Connected));

        store.mark_delivered(&id);
        let first = store.get(&id).cloned();
        store.mark_delivered(&id);

        assert_eq!(store.get(&id).cloned(), first);
        assert!(matches!(
            subscription.try_recv(),
            Some(HubEvent::UtteranceStatusChanged { .. })
        ));
        assert_eq!(subscription.try_recv(), None);
    }

    #[test]
    fn test_delete_only_pending() {
        let mut store = store();
        let pending = store.ingest("keep me out", None).unwrap().id;
        let delivered = store.ingest("already seen", None).unwrap().id;
        store.mark_delivered(&delivered);

        assert_eq!(
            store.delete(&delivered),
            DeleteOutcome::NotPending(UtteranceStatus::Delivered)
        );
        assert!(store.get(&delivered).is_some());
        assert!(store.message(&delivered).is_some());

        assert_eq!(store.delete(&pending), DeleteOutcome::Deleted);
        assert!(store.get(&pending).is_none());
        assert!(store.message(&pending).is_none());

        assert_eq!(store.delete(&pending), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_delete_outcome_into_result() {
        assert!(DeleteOutcome::Deleted.into_result("a").is_ok());
        assert!(matches!(
            DeleteOutcome::NotFound.into_result("a"),
            Err(Error::PreconditionFailed(_))
        ));
        assert!(matches!(
            DeleteOutcome::NotPending(UtteranceStatus::Responded).into_result("a"),
            Err(Error::PreconditionFailed(_))
        ));
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut store = store();
        store.ingest("one", None).unwrap();
        store.ingest("two", None).unwrap();
        store.append_assistant_reply("reply").unwrap();

        assert_eq!(store.clear(), 2);
        assert_eq!(store.counts(), QueueCounts::default());
        assert!(store.recent_messages(None).is_empty());
    }

    #[test]
    fn test_recent_utterances_newest_first_and_bounded() {
        let mut store = store();
        let base = Utc::now();
        for i in 0..15 {
            store
                .ingest(&format!("utterance {i}"), Some(base + Duration::seconds(i)))
                .unwrap();
        }

        let recent = store.recent_utterances(None);
        assert_eq!(recent.len(), DEFAULT_UTTERANCE_LIMIT);
        assert_eq!(recent[0].text, "utterance 14");
        assert_eq!(recent[9].text, "utterance 5");

        assert_eq!(store.recent_utterances(Some(3)).len(), 3);
    }

    #[test]
    fn test_recent_messages_oldest_first_keeps_tail() {
        let mut store = store();
        let base = Utc::now();
        // Inserted out of order on purpose
        store.ingest("second", Some(base + Duration::seconds(2))).unwrap();
        store.ingest("first", Some(base + Duration::seconds(1))).unwrap();
        store.ingest("third", Some(base + Duration::seconds(3))).unwrap();

        let all: Vec<_> = store
            .recent_messages(None)
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(all, ["first", "second", "third"]);

        let tail: Vec<_> = store
            .recent_messages(Some(2))
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(tail, ["second", "third"]);
    }

    #[test]
    fn test_deliver_pending_newest_first() {
        let mut store = store();
        let base = Utc::now();
        store.ingest("old", Some(base)).unwrap();
        store.ingest("new", Some(base + Duration::seconds(5))).unwrap();

        let delivered = store.deliver_pending();
        let texts: Vec<_> = delivered.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, ["new", "old"]);
        assert!(delivered.iter().all(|u| u.status == UtteranceStatus::Delivered));

        assert!(store.deliver_pending().is_empty());
    }

    #[test]
    fn test_respond_delivered_skips_pending() {
        let mut store = store();
        let a = store.ingest("a", None).unwrap().id;
        store.mark_delivered(&a);
        store.ingest("b", None).unwrap();

        assert_eq!(store.respond_delivered(), 1);
        let counts = store.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.responded, 1);
        assert_eq!(counts.total, 2);
    }
}
