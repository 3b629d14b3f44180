//! Live location cache.
//!
//! Inbound position updates are keyed by user id: each update fully
//! supersedes the previous one, and a stop-sharing event deletes the key.
//! Staleness is never purged by time; age is computed for display only.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flock_shared::protocol::MemberLocation;
use flock_shared::types::UserId;

/// A member's last-known position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberPosition {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

/// Last-known positions of conversation members, keyed by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationMap {
    positions: HashMap<UserId, MemberPosition>,
}

impl LocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a member's position from an inbound update.
    pub fn apply_update(&mut self, update: &MemberLocation) {
        self.positions.insert(
            update.user_id,
            MemberPosition {
                lat: update.lat,
                lng: update.lng,
                name: update.name.clone(),
                timestamp: update.timestamp,
            },
        );
    }

    /// Remove a member after their stop-sharing event. Returns `true` if a
    /// position was actually evicted.
    pub fn remove(&mut self, user_id: UserId) -> bool {
        self.positions.remove(&user_id).is_some()
    }

    pub fn get(&self, user_id: UserId) -> Option<&MemberPosition> {
        self.positions.get(&user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &MemberPosition)> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

/// Human-readable age of a position fix, e.g. `just now`, `5m ago`, `2h ago`.
pub fn display_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - timestamp).num_seconds().max(0);
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use flock_shared::types::{ConversationId, FlockId};

    use super::*;

    fn update(user: UserId, lat: f64, at: DateTime<Utc>) -> MemberLocation {
        MemberLocation {
            conversation: ConversationId::Flock(FlockId(1)),
            user_id: user,
            lat,
            lng: -0.1,
            name: "Ada".into(),
            timestamp: at,
        }
    }

    #[test]
    fn latest_update_supersedes_previous() {
        let mut map = LocationMap::new();
        let now = Utc::now();

        map.apply_update(&update(UserId(2), 51.50, now));
        map.apply_update(&update(UserId(2), 51.51, now));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(UserId(2)).unwrap().lat, 51.51);
    }

    #[test]
    fn stop_event_evicts_the_member() {
        let mut map = LocationMap::new();
        map.apply_update(&update(UserId(2), 51.50, Utc::now()));

        assert!(map.remove(UserId(2)));
        assert!(map.get(UserId(2)).is_none());
        assert!(map.is_empty());
        assert!(!map.remove(UserId(2)));
    }

    #[test]
    fn stale_entries_are_not_purged_by_time() {
        let mut map = LocationMap::new();
        let old = Utc::now() - chrono::Duration::hours(3);
        map.apply_update(&update(UserId(2), 51.50, old));
        assert_eq!(map.len(), 1, "only explicit stop events evict");
    }

    #[test]
    fn age_is_display_only() {
        let now = Utc::now();
        assert_eq!(display_age(now, now), "just now");
        assert_eq!(display_age(now - chrono::Duration::minutes(5), now), "5m ago");
        assert_eq!(display_age(now - chrono::Duration::hours(2), now), "2h ago");
        // Clock skew: a future fix reads as fresh, never negative.
        assert_eq!(display_age(now + chrono::Duration::minutes(1), now), "just now");
    }
}
