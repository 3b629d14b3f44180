//! Socket room membership tracking.
//!
//! Room membership is explicit: entering a chat screen joins the room,
//! leaving it leaves the room — unless location sharing is still active for
//! that conversation, in which case membership is deliberately retained so
//! location broadcasts keep flowing.

use std::collections::HashSet;

use tracing::debug;

use flock_shared::types::ConversationId;

/// Tracks which conversation rooms this client is currently in.
#[derive(Debug, Clone, Default)]
pub struct RoomTracker {
    joined: HashSet<ConversationId>,
    /// Rooms held open past screen exit because sharing is active.
    retained: HashSet<ConversationId>,
}

impl RoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record joining a room. Returns `false` if already a member.
    pub fn join(&mut self, conversation: ConversationId) -> bool {
        let joined = self.joined.insert(conversation);
        if joined {
            debug!(%conversation, "joined room");
        }
        joined
    }

    /// Mark a room as retained (location sharing active) or release it.
    pub fn set_retained(&mut self, conversation: ConversationId, retained: bool) {
        if retained {
            self.retained.insert(conversation);
        } else {
            self.retained.remove(&conversation);
        }
    }

    /// Attempt to leave a room. Returns `true` if membership actually ended;
    /// `false` if the room is retained or was never joined.
    pub fn leave(&mut self, conversation: ConversationId) -> bool {
        if self.retained.contains(&conversation) {
            debug!(%conversation, "room retained, sharing still active");
            return false;
        }
        let left = self.joined.remove(&conversation);
        if left {
            debug!(%conversation, "left room");
        }
        left
    }

    pub fn is_joined(&self, conversation: ConversationId) -> bool {
        self.joined.contains(&conversation)
    }

    pub fn is_retained(&self, conversation: ConversationId) -> bool {
        self.retained.contains(&conversation)
    }

    /// Snapshot of current memberships.
    pub fn joined_rooms(&self) -> Vec<ConversationId> {
        self.joined.iter().copied().collect()
    }

    pub fn room_count(&self) -> usize {
        self.joined.len()
    }
}

#[cfg(test)]
mod tests {
    use flock_shared::types::{FlockId, UserId};

    use super::*;

    const FLOCK: ConversationId = ConversationId::Flock(FlockId(3));
    const DM: ConversationId = ConversationId::Dm(UserId(7));

    #[test]
    fn join_leave_round_trip() {
        let mut tracker = RoomTracker::new();

        assert!(tracker.join(FLOCK));
        assert!(!tracker.join(FLOCK));
        assert!(tracker.is_joined(FLOCK));

        assert!(tracker.leave(FLOCK));
        assert!(!tracker.is_joined(FLOCK));
        assert!(!tracker.leave(FLOCK));
    }

    #[test]
    fn retained_room_survives_leave() {
        let mut tracker = RoomTracker::new();
        tracker.join(FLOCK);
        tracker.set_retained(FLOCK, true);

        assert!(!tracker.leave(FLOCK), "sharing keeps the room open");
        assert!(tracker.is_joined(FLOCK));

        tracker.set_retained(FLOCK, false);
        assert!(tracker.leave(FLOCK));
        assert!(!tracker.is_joined(FLOCK));
    }

    #[test]
    fn rooms_are_independent() {
        let mut tracker = RoomTracker::new();
        tracker.join(FLOCK);
        tracker.join(DM);
        tracker.set_retained(FLOCK, true);

        assert!(tracker.leave(DM));
        assert!(!tracker.leave(FLOCK));
        assert_eq!(tracker.room_count(), 1);
    }
}
