use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FlockError;
use crate::types::{ConversationId, FlockId, FlockStatus, MessageId, UserId};

/// Events emitted by this client over the socket.
///
/// Serialized as `{"event": "...", "data": {...}}`, matching the named-event
/// shape of the realtime channel. Emits are fire-and-forget: no
/// acknowledgement is awaited and failures are not surfaced to the sender.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Join a conversation room to start receiving its broadcasts.
    JoinRoom { conversation: ConversationId },

    /// Leave a conversation room.
    LeaveRoom { conversation: ConversationId },

    /// Send a chat message.
    SendMessage(OutgoingMessage),

    /// Local user started typing in a conversation.
    StartTyping {
        conversation: ConversationId,
        user_id: UserId,
        user_name: String,
    },

    /// Local user stopped typing (debounce expiry or explicit send).
    StopTyping {
        conversation: ConversationId,
        user_id: UserId,
    },

    /// Toggle a reaction on.
    AddReaction(ReactionEvent),

    /// Toggle a reaction off.
    RemoveReaction(ReactionEvent),

    /// Cast (or switch) a venue vote.
    CastVote(VoteCast),

    /// Pin a venue as the conversation's assigned venue.
    PinVenue(VenuePin),

    /// Broadcast the local user's position.
    ShareLocation(MemberLocation),

    /// Stop broadcasting position.
    StopSharingLocation {
        conversation: ConversationId,
        user_id: UserId,
    },

    /// Invite a user to a flock.
    FlockInvite(FlockInvite),

    /// Respond to a flock invite.
    FlockInviteResponse(InviteResponse),

    /// Send a friend request.
    FriendRequest(FriendRequest),

    /// Respond to a friend request.
    FriendResponse(FriendResponse),
}

/// Events pushed by the server to this client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message was broadcast to a room this client is in. This includes
    /// echoes of the client's own sends.
    NewMessage(MessageEvent),

    /// A remote user started typing.
    UserTyping {
        conversation: ConversationId,
        user_id: UserId,
        user_name: String,
    },

    /// A remote user stopped typing.
    UserStoppedTyping {
        conversation: ConversationId,
        user_id: UserId,
    },

    /// A reaction was added to a message.
    ReactionAdded(ReactionEvent),

    /// A reaction was removed from a message.
    ReactionRemoved(ReactionEvent),

    /// Authoritative vote state for a conversation. Replaces local vote
    /// state wholesale (last write wins).
    NewVote(VoteSnapshot),

    /// The assigned venue changed.
    VenuePinned(VenuePin),

    /// A member's position update.
    LocationUpdate(MemberLocation),

    /// A member stopped sharing their position.
    MemberStoppedSharing {
        conversation: ConversationId,
        user_id: UserId,
    },

    /// A flock's lifecycle status changed.
    FlockStatusChanged {
        flock_id: FlockId,
        status: FlockStatus,
    },

    /// Someone invited this client to a flock.
    FlockInviteReceived(FlockInvite),

    /// Someone responded to an invite this client sent.
    FlockInviteResponded(InviteResponse),

    /// Someone sent this client a friend request.
    FriendRequestReceived(FriendRequest),

    /// Someone responded to a friend request this client sent.
    FriendRequestResponded(FriendResponse),
}

/// Kind of message payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    VenueCard,
    Image,
}

/// Venue summary embedded in a `venue_card` message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VenueSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Reference to the message being replied to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyRef {
    pub id: MessageId,
    pub text: String,
    pub sender: String,
}

/// An outgoing chat message.
///
/// `client_key` is generated by the sender and echoed back verbatim by the
/// server so the optimistic local copy can be matched exactly on arrival.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingMessage {
    pub client_key: Uuid,
    pub conversation: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<VenueSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
}

/// A server-confirmed chat message as broadcast to the room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageEvent {
    /// Authoritative server-assigned id.
    pub id: i64,
    /// Echo of the sender's client key, when the sender supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<Uuid>,
    pub conversation: ConversationId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<VenueSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
    pub sent_at: DateTime<Utc>,
}

/// A reaction toggle, outgoing or inbound.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReactionEvent {
    pub conversation: ConversationId,
    pub message_id: MessageId,
    pub emoji: String,
    pub user_id: UserId,
    pub user_name: String,
}

/// A vote cast by a single voter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteCast {
    pub conversation: ConversationId,
    pub venue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    pub voter_id: UserId,
    pub voter_name: String,
}

/// One entry in a conversation's venue leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteEntry {
    pub venue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
    pub vote_count: u32,
    pub voters: Vec<String>,
}

/// The full authoritative vote state for a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoteSnapshot {
    pub conversation: ConversationId,
    pub votes: Vec<VoteEntry>,
}

/// Pin (assign) a venue to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VenuePin {
    pub conversation: ConversationId,
    pub venue_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue_id: Option<String>,
}

/// A member's position, broadcast while sharing is active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberLocation {
    pub conversation: ConversationId,
    pub user_id: UserId,
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

/// An invitation to join a flock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlockInvite {
    pub flock_id: FlockId,
    pub flock_name: String,
    pub inviter_id: UserId,
    pub inviter_name: String,
    pub invitee_id: UserId,
}

/// Accept/decline response to a flock invite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InviteResponse {
    pub flock_id: FlockId,
    pub invitee_id: UserId,
    pub invitee_name: String,
    pub accepted: bool,
}

/// A friend request between two users.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendRequest {
    pub from_id: UserId,
    pub from_name: String,
    pub to_id: UserId,
}

/// Accept/decline response to a friend request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendResponse {
    pub from_id: UserId,
    pub to_id: UserId,
    pub to_name: String,
    pub accepted: bool,
}

impl ClientEvent {
    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, FlockError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerEvent {
    /// Parse a JSON wire payload into a typed event.
    ///
    /// This is the validation boundary: anything the server sends that does
    /// not parse into one of the known shapes is rejected here, never
    /// handed to the engine as-is.
    pub fn from_json(payload: &str) -> Result<Self, FlockError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// The conversation this event belongs to, if it is room-scoped.
    pub fn conversation(&self) -> Option<ConversationId> {
        match self {
            Self::NewMessage(m) => Some(m.conversation),
            Self::UserTyping { conversation, .. }
            | Self::UserStoppedTyping { conversation, .. }
            | Self::MemberStoppedSharing { conversation, .. } => Some(*conversation),
            Self::ReactionAdded(r) | Self::ReactionRemoved(r) => Some(r.conversation),
            Self::NewVote(v) => Some(v.conversation),
            Self::VenuePinned(p) => Some(p.conversation),
            Self::LocationUpdate(l) => Some(l.conversation),
            Self::FlockStatusChanged { flock_id, .. } => {
                Some(ConversationId::Flock(*flock_id))
            }
            Self::FlockInviteReceived(_)
            | Self::FlockInviteResponded(_)
            | Self::FriendRequestReceived(_)
            | Self::FriendRequestResponded(_) => None,
        }
    }
}
