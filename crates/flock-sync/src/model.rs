//! In-memory domain models held by the sync engine.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flock_shared::protocol::{MessageEvent, MessageKind, OutgoingMessage, ReplyRef, VenueSnapshot};
use flock_shared::types::{MessageId, UserId};

/// A single chat message as held in a conversation's message list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Temp id until the server echo arrives, then the server id.
    pub id: MessageId,
    /// Client-generated key carried by locally-sent messages and their echoes.
    pub client_key: Option<Uuid>,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub kind: MessageKind,
    pub venue: Option<VenueSnapshot>,
    pub image_url: Option<String>,
    pub reply_to: Option<ReplyRef>,
    pub sent_at: DateTime<Utc>,
    /// Reactions accumulated on this message, at most one per
    /// `(emoji, user_id)` pair.
    pub reactions: Vec<ReactionEntry>,
}

impl Message {
    /// Build the optimistic local copy of an outgoing message.
    pub fn optimistic(id: MessageId, draft: &OutgoingMessage, sent_at: DateTime<Utc>) -> Self {
        Self {
            id,
            client_key: Some(draft.client_key),
            sender_id: draft.sender_id,
            sender_name: draft.sender_name.clone(),
            text: draft.text.clone(),
            kind: draft.kind,
            venue: draft.venue.clone(),
            image_url: draft.image_url.clone(),
            reply_to: draft.reply_to.clone(),
            sent_at,
            reactions: Vec::new(),
        }
    }

    /// Build a message from a server-confirmed broadcast.
    pub fn confirmed(event: &MessageEvent) -> Self {
        Self {
            id: MessageId::Server(event.id),
            client_key: event.client_key,
            sender_id: event.sender_id,
            sender_name: event.sender_name.clone(),
            text: event.text.clone(),
            kind: event.kind,
            venue: event.venue.clone(),
            image_url: event.image_url.clone(),
            reply_to: event.reply_to.clone(),
            sent_at: event.sent_at,
            reactions: Vec::new(),
        }
    }

    /// Short text shown in conversation list previews.
    pub fn preview_text(&self) -> String {
        match self.kind {
            MessageKind::Text => self.text.clone(),
            MessageKind::VenueCard => self
                .venue
                .as_ref()
                .map(|v| format!("Suggested {}", v.name))
                .unwrap_or_else(|| "Suggested a venue".to_string()),
            MessageKind::Image => "Sent a photo".to_string(),
        }
    }
}

/// One reaction on a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionEntry {
    pub emoji: String,
    pub user_id: UserId,
    pub user_name: String,
}

/// Metadata shown in the conversation list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationPreview {
    pub last_message: String,
    pub last_message_time: Option<DateTime<Utc>>,
    /// Messages received while the conversation was not the open screen.
    pub unread: u32,
}
