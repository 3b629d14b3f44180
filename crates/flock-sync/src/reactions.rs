//! Reaction aggregation.
//!
//! A reaction is a `(emoji, user)` tuple on a message. Add is idempotent and
//! remove deletes by exact match, so the local optimistic toggle and the
//! server echo of that same toggle can be applied in either order without
//! producing duplicates.

use tracing::debug;

use flock_shared::protocol::ReactionEvent;

use crate::conversation::ConversationStore;
use crate::model::ReactionEntry;

impl ConversationStore {
    /// Add a reaction to a message. Returns `false` (no-op) when the exact
    /// `(emoji, user)` pair is already present or the message is unknown.
    pub fn add_reaction(&mut self, event: &ReactionEvent) -> bool {
        let Some(message) = self.message_mut(event.conversation, &event.message_id) else {
            debug!(message = %event.message_id, "reaction for unknown message dropped");
            return false;
        };

        let exists = message
            .reactions
            .iter()
            .any(|r| r.emoji == event.emoji && r.user_id == event.user_id);
        if exists {
            return false;
        }

        message.reactions.push(ReactionEntry {
            emoji: event.emoji.clone(),
            user_id: event.user_id,
            user_name: event.user_name.clone(),
        });
        true
    }

    /// Remove a reaction by exact `(emoji, user)` match. Returns `false`
    /// when no matching entry exists.
    pub fn remove_reaction(&mut self, event: &ReactionEvent) -> bool {
        let Some(message) = self.message_mut(event.conversation, &event.message_id) else {
            return false;
        };

        let before = message.reactions.len();
        message
            .reactions
            .retain(|r| !(r.emoji == event.emoji && r.user_id == event.user_id));
        message.reactions.len() != before
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use flock_shared::protocol::{MessageEvent, MessageKind};
    use flock_shared::types::{ConversationId, FlockId, MessageId, UserId};

    use super::*;

    const LOCAL: UserId = UserId(1);
    const CONV: ConversationId = ConversationId::Flock(FlockId(3));

    fn store_with_message() -> ConversationStore {
        let mut store = ConversationStore::new(LOCAL);
        store.reconcile_incoming(&MessageEvent {
            id: 10,
            client_key: None,
            conversation: CONV,
            sender_id: UserId(2),
            sender_name: "Ada".into(),
            text: "hello".into(),
            kind: MessageKind::Text,
            venue: None,
            image_url: None,
            reply_to: None,
            sent_at: Utc::now(),
        });
        store
    }

    fn react(emoji: &str, user: UserId) -> ReactionEvent {
        ReactionEvent {
            conversation: CONV,
            message_id: MessageId::Server(10),
            emoji: emoji.into(),
            user_id: user,
            user_name: "You".into(),
        }
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = store_with_message();
        assert!(store.add_reaction(&react("🔥", LOCAL)));
        assert!(!store.add_reaction(&react("🔥", LOCAL)));
        assert_eq!(store.messages(CONV)[0].reactions.len(), 1);
    }

    #[test]
    fn remove_after_add_restores_original_set() {
        let mut store = store_with_message();
        store.add_reaction(&react("🔥", LOCAL));
        assert!(store.remove_reaction(&react("🔥", LOCAL)));
        assert!(store.messages(CONV)[0].reactions.is_empty());
        assert!(!store.remove_reaction(&react("🔥", LOCAL)));
    }

    #[test]
    fn same_emoji_different_users_coexist() {
        let mut store = store_with_message();
        store.add_reaction(&react("🔥", LOCAL));
        store.add_reaction(&react("🔥", UserId(2)));
        assert_eq!(store.messages(CONV)[0].reactions.len(), 2);

        // Removing one user's reaction leaves the other's.
        store.remove_reaction(&react("🔥", LOCAL));
        let reactions = &store.messages(CONV)[0].reactions;
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].user_id, UserId(2));
    }

    #[test]
    fn reaction_for_unknown_message_is_dropped() {
        let mut store = store_with_message();
        let mut event = react("🔥", LOCAL);
        event.message_id = MessageId::Server(999);
        assert!(!store.add_reaction(&event));
    }
}
