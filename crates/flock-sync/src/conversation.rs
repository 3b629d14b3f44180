//! Per-conversation message lists and optimistic reconciliation.
//!
//! The store keeps one ordered list of messages per conversation. Local
//! sends are appended immediately under a `temp-<millis>` id; when the
//! server echo arrives the optimistic entry is replaced in place, so the
//! list never shows the same message twice and the entry keeps its position.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use flock_shared::constants::MAX_MESSAGE_LEN;
use flock_shared::protocol::{MessageEvent, OutgoingMessage};
use flock_shared::types::{ConversationId, MessageId, UserId};

use crate::error::{Result, SyncError};
use crate::model::{ConversationPreview, Message};

/// Outcome of reconciling an inbound message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// An optimistic entry was replaced in place by its server echo.
    Replaced(MessageId),
    /// The event was new and appended to the list.
    Appended,
    /// A message with this server id already exists; nothing changed.
    Duplicate,
}

#[derive(Debug, Default)]
struct Conversation {
    messages: Vec<Message>,
    preview: ConversationPreview,
}

/// Message lists for every conversation the client knows about.
#[derive(Debug)]
pub struct ConversationStore {
    local_user: UserId,
    conversations: HashMap<ConversationId, Conversation>,
    /// The conversation whose screen is currently open, if any. Inbound
    /// messages for it do not bump the unread counter.
    open: Option<ConversationId>,
}

impl ConversationStore {
    pub fn new(local_user: UserId) -> Self {
        Self {
            local_user,
            conversations: HashMap::new(),
            open: None,
        }
    }

    /// Mark a conversation as the open screen and clear its unread counter.
    pub fn open_conversation(&mut self, conversation: ConversationId) {
        self.open = Some(conversation);
        if let Some(conv) = self.conversations.get_mut(&conversation) {
            conv.preview.unread = 0;
        }
    }

    /// No conversation screen is open (user navigated away).
    pub fn close_conversation(&mut self) {
        self.open = None;
    }

    pub fn open_conversation_id(&self) -> Option<ConversationId> {
        self.open
    }

    /// Append an optimistic local message. Always succeeds once the draft
    /// passes validation; the returned id is the placeholder the echo will
    /// replace.
    pub fn append_optimistic(
        &mut self,
        draft: &OutgoingMessage,
        now: DateTime<Utc>,
    ) -> Result<MessageId> {
        if draft.text.trim().is_empty() && draft.venue.is_none() && draft.image_url.is_none() {
            return Err(SyncError::EmptyMessage);
        }
        if draft.text.chars().count() > MAX_MESSAGE_LEN {
            return Err(SyncError::MessageTooLong(MAX_MESSAGE_LEN));
        }

        let conv = self.conversations.entry(draft.conversation).or_default();

        // Millisecond timestamps collide under rapid fire; bump until free.
        let mut millis = now.timestamp_millis();
        let mut id = MessageId::new_temp(millis);
        while conv.messages.iter().any(|m| m.id == id) {
            millis += 1;
            id = MessageId::new_temp(millis);
        }

        let message = Message::optimistic(id.clone(), draft, now);
        conv.preview.last_message = message.preview_text();
        conv.preview.last_message_time = Some(now);
        conv.messages.push(message);

        debug!(conversation = %draft.conversation, id = %id, "appended optimistic message");
        Ok(id)
    }

    /// Reconcile a server-delivered message event into the store.
    ///
    /// Own echoes replace their optimistic entry in place, matched by client
    /// key when the server echoed one, falling back to the first temp entry
    /// with identical text. Everything else is appended behind an id-dedup
    /// guard.
    pub fn reconcile_incoming(&mut self, event: &MessageEvent) -> Reconciliation {
        self.reconcile(event, true)
    }

    /// Reconcile a message from a REST history load. Same replacement and
    /// dedup rules as [`ConversationStore::reconcile_incoming`], but history
    /// is not news: the unread counter is left untouched.
    pub fn seed_incoming(&mut self, event: &MessageEvent) -> Reconciliation {
        self.reconcile(event, false)
    }

    fn reconcile(&mut self, event: &MessageEvent, live: bool) -> Reconciliation {
        let is_own = event.sender_id == self.local_user;
        let is_open = self.open == Some(event.conversation);
        let conv = self.conversations.entry(event.conversation).or_default();

        let server_id = MessageId::Server(event.id);
        if conv.messages.iter().any(|m| m.id == server_id) {
            debug!(id = event.id, "duplicate message event ignored");
            return Reconciliation::Duplicate;
        }

        let mut confirmed = Message::confirmed(event);
        let preview_text = confirmed.preview_text();

        let outcome = if is_own {
            match find_optimistic(&conv.messages, event) {
                Some(pos) => {
                    let temp_id = conv.messages[pos].id.clone();
                    // Reactions can land on the temp entry before the echo.
                    confirmed.reactions = std::mem::take(&mut conv.messages[pos].reactions);
                    conv.messages[pos] = confirmed;
                    debug!(temp = %temp_id, server = event.id, "replaced optimistic message");
                    Reconciliation::Replaced(temp_id)
                }
                None => {
                    conv.messages.push(confirmed);
                    Reconciliation::Appended
                }
            }
        } else {
            conv.messages.push(confirmed);
            Reconciliation::Appended
        };

        conv.preview.last_message = preview_text;
        conv.preview.last_message_time = Some(event.sent_at);
        if live && !is_own && !is_open && outcome == Reconciliation::Appended {
            conv.preview.unread += 1;
        }

        outcome
    }

    /// The ordered message list for a conversation (empty if unknown).
    pub fn messages(&self, conversation: ConversationId) -> &[Message] {
        self.conversations
            .get(&conversation)
            .map(|c| c.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn preview(&self, conversation: ConversationId) -> Option<&ConversationPreview> {
        self.conversations.get(&conversation).map(|c| &c.preview)
    }

    /// Look up a message by id for mutation (reactions).
    pub(crate) fn message_mut(
        &mut self,
        conversation: ConversationId,
        id: &MessageId,
    ) -> Option<&mut Message> {
        self.conversations
            .get_mut(&conversation)
            .and_then(|c| c.messages.iter_mut().find(|m| &m.id == id))
    }

    /// Drop a conversation entirely (e.g. a deleted DM).
    pub fn remove_conversation(&mut self, conversation: ConversationId) -> bool {
        self.conversations.remove(&conversation).is_some()
    }

    pub fn local_user(&self) -> UserId {
        self.local_user
    }
}

/// Find the optimistic entry an own-echo should replace: exact client-key
/// match first, then the oldest temp entry with identical text.
fn find_optimistic(messages: &[Message], event: &MessageEvent) -> Option<usize> {
    if let Some(key) = event.client_key {
        if let Some(pos) = messages
            .iter()
            .position(|m| m.id.is_temp() && m.client_key == Some(key))
        {
            return Some(pos);
        }
    }
    messages
        .iter()
        .position(|m| m.id.is_temp() && m.text == event.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flock_shared::protocol::MessageKind;
    use flock_shared::types::FlockId;
    use uuid::Uuid;

    const LOCAL: UserId = UserId(1);
    const CONV: ConversationId = ConversationId::Flock(FlockId(3));

    fn draft(text: &str) -> OutgoingMessage {
        OutgoingMessage {
            client_key: Uuid::new_v4(),
            conversation: CONV,
            sender_id: LOCAL,
            sender_name: "You".into(),
            text: text.into(),
            kind: MessageKind::Text,
            venue: None,
            image_url: None,
            reply_to: None,
        }
    }

    fn echo(id: i64, sender: UserId, text: &str, client_key: Option<Uuid>) -> MessageEvent {
        MessageEvent {
            id,
            client_key,
            conversation: CONV,
            sender_id: sender,
            sender_name: if sender == LOCAL { "You" } else { "Ada" }.into(),
            text: text.into(),
            kind: MessageKind::Text,
            venue: None,
            image_url: None,
            reply_to: None,
            sent_at: Utc::now(),
        }
    }

    #[test]
    fn repeated_ids_are_deduplicated() {
        let mut store = ConversationStore::new(LOCAL);
        let event = echo(55, UserId(2), "hello", None);

        assert_eq!(store.reconcile_incoming(&event), Reconciliation::Appended);
        assert_eq!(store.reconcile_incoming(&event), Reconciliation::Duplicate);
        assert_eq!(store.reconcile_incoming(&event), Reconciliation::Duplicate);

        let matching: Vec<_> = store
            .messages(CONV)
            .iter()
            .filter(|m| m.id == MessageId::Server(55))
            .collect();
        assert_eq!(matching.len(), 1);
    }

    #[test]
    fn echo_replaces_optimistic_entry_in_place() {
        let mut store = ConversationStore::new(LOCAL);
        let d = draft("hi");
        let temp_id = store.append_optimistic(&d, Utc::now()).unwrap();
        assert!(temp_id.is_temp());

        let result = store.reconcile_incoming(&echo(55, LOCAL, "hi", Some(d.client_key)));
        assert_eq!(result, Reconciliation::Replaced(temp_id.clone()));

        let messages = store.messages(CONV);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, MessageId::Server(55));
        assert!(!messages.iter().any(|m| m.id == temp_id));
    }

    #[test]
    fn temp_id_uses_millisecond_format() {
        let mut store = ConversationStore::new(LOCAL);
        let now = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let id = store.append_optimistic(&draft("hi"), now).unwrap();
        assert_eq!(id.to_string(), "temp-1700000000000");
    }

    #[test]
    fn rapid_fire_identical_texts_reconcile_by_client_key() {
        let mut store = ConversationStore::new(LOCAL);
        let first = draft("same");
        let second = draft("same");
        let now = Utc::now();
        let temp_a = store.append_optimistic(&first, now).unwrap();
        let temp_b = store.append_optimistic(&second, now).unwrap();
        assert_ne!(temp_a, temp_b);

        // Echoes arrive out of order; keys still pair them correctly.
        store.reconcile_incoming(&echo(56, LOCAL, "same", Some(second.client_key)));
        store.reconcile_incoming(&echo(55, LOCAL, "same", Some(first.client_key)));

        let messages = store.messages(CONV);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, MessageId::Server(55));
        assert_eq!(messages[1].id, MessageId::Server(56));
    }

    #[test]
    fn keyless_echo_falls_back_to_text_match() {
        let mut store = ConversationStore::new(LOCAL);
        store.append_optimistic(&draft("hi"), Utc::now()).unwrap();

        store.reconcile_incoming(&echo(55, LOCAL, "hi", None));
        let messages = store.messages(CONV);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, MessageId::Server(55));
    }

    #[test]
    fn own_echo_without_optimistic_entry_is_appended_once() {
        // Sent from another device: no temp entry to replace.
        let mut store = ConversationStore::new(LOCAL);
        store.reconcile_incoming(&echo(55, LOCAL, "elsewhere", None));
        store.reconcile_incoming(&echo(55, LOCAL, "elsewhere", None));
        assert_eq!(store.messages(CONV).len(), 1);
    }

    #[test]
    fn unread_counts_only_foreign_messages_in_closed_conversations() {
        let mut store = ConversationStore::new(LOCAL);

        store.reconcile_incoming(&echo(1, UserId(2), "a", None));
        assert_eq!(store.preview(CONV).unwrap().unread, 1);

        // Own messages never count.
        store.reconcile_incoming(&echo(2, LOCAL, "b", None));
        assert_eq!(store.preview(CONV).unwrap().unread, 1);

        // Open screen: counter clears and stays at zero.
        store.open_conversation(CONV);
        store.reconcile_incoming(&echo(3, UserId(2), "c", None));
        assert_eq!(store.preview(CONV).unwrap().unread, 0);

        store.close_conversation();
        store.reconcile_incoming(&echo(4, UserId(2), "d", None));
        assert_eq!(store.preview(CONV).unwrap().unread, 1);
    }

    #[test]
    fn history_seed_leaves_unread_untouched() {
        let mut store = ConversationStore::new(LOCAL);
        for i in 1..=50 {
            store.seed_incoming(&echo(i, UserId(2), "old", None));
        }
        assert_eq!(store.messages(CONV).len(), 50);
        assert_eq!(store.preview(CONV).unwrap().unread, 0);

        // Seeding is id-deduplicated like the live path.
        assert_eq!(
            store.seed_incoming(&echo(50, UserId(2), "old", None)),
            Reconciliation::Duplicate
        );

        // A live message arriving after the seed still counts.
        store.reconcile_incoming(&echo(99, UserId(2), "new", None));
        assert_eq!(store.preview(CONV).unwrap().unread, 1);
    }

    #[test]
    fn preview_tracks_latest_message() {
        let mut store = ConversationStore::new(LOCAL);
        store.reconcile_incoming(&echo(1, UserId(2), "first", None));
        store.reconcile_incoming(&echo(2, UserId(2), "second", None));
        assert_eq!(store.preview(CONV).unwrap().last_message, "second");
    }

    #[test]
    fn empty_draft_is_rejected_before_network() {
        let mut store = ConversationStore::new(LOCAL);
        let err = store.append_optimistic(&draft("   "), Utc::now());
        assert_eq!(err, Err(SyncError::EmptyMessage));
        assert!(store.messages(CONV).is_empty());
    }

    #[test]
    fn same_millisecond_sends_get_distinct_temp_ids() {
        let mut store = ConversationStore::new(LOCAL);
        let now = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let a = store.append_optimistic(&draft("x"), now).unwrap();
        let b = store.append_optimistic(&draft("y"), now).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn removed_conversation_is_empty() {
        let mut store = ConversationStore::new(LOCAL);
        store.reconcile_incoming(&echo(1, UserId(2), "a", None));
        assert!(store.remove_conversation(CONV));
        assert!(store.messages(CONV).is_empty());
        assert!(!store.remove_conversation(CONV));
    }
}
