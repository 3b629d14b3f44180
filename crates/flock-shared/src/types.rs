use serde::{Deserialize, Serialize};

use crate::constants::TEMP_ID_PREFIX;

/// Server-assigned user identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server-assigned flock (group plan) identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlockId(pub i64);

impl std::fmt::Display for FlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation is either a flock chat or a one-to-one DM.
///
/// Both share the same message/typing/reaction/vote/location machinery; the
/// id decides which socket room the traffic flows through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConversationId {
    /// A flock group chat, keyed by flock id.
    Flock(FlockId),
    /// A direct message thread, keyed by the *other* participant's user id.
    Dm(UserId),
}

impl ConversationId {
    /// Socket room name for this conversation, e.g. `flock:42` or `dm:7`.
    pub fn to_room(&self) -> String {
        match self {
            Self::Flock(id) => format!("flock:{id}"),
            Self::Dm(id) => format!("dm:{id}"),
        }
    }

    /// Parse a room name produced by [`ConversationId::to_room`].
    pub fn from_room(room: &str) -> Option<Self> {
        if let Some(rest) = room.strip_prefix("flock:") {
            return rest.parse().ok().map(|n| Self::Flock(FlockId(n)));
        }
        if let Some(rest) = room.strip_prefix("dm:") {
            return rest.parse().ok().map(|n| Self::Dm(UserId(n)));
        }
        None
    }

    pub fn is_flock(&self) -> bool {
        matches!(self, Self::Flock(_))
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_room())
    }
}

/// A message identifier: either the authoritative server id or a
/// client-generated placeholder used while the echo is in flight.
///
/// Serialized untagged so the wire carries a plain number for server ids and
/// a `temp-<millis>` string for placeholders, matching what the UI renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum MessageId {
    Server(i64),
    Temp(String),
}

impl MessageId {
    /// Create a new temporary id from a millisecond timestamp.
    pub fn new_temp(millis: i64) -> Self {
        Self::Temp(format!("{TEMP_ID_PREFIX}{millis}"))
    }

    pub fn is_temp(&self) -> bool {
        matches!(self, Self::Temp(_))
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Server(n) => write!(f, "{n}"),
            Self::Temp(s) => write!(f, "{s}"),
        }
    }
}

/// Lifecycle status of a flock.
///
/// Live location sharing is only permitted while the flock is `Confirmed`;
/// any transition away from it force-stops sharing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlockStatus {
    Forming,
    Confirmed,
    Completed,
    Cancelled,
}
