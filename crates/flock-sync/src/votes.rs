//! Venue vote aggregation.
//!
//! A small leaderboard of venue names per conversation. A voter holds at
//! most one active vote: casting for a new venue atomically removes them
//! from the previous entry. The server broadcasts the authoritative vote
//! array after every cast, which replaces local state wholesale.

use serde::{Deserialize, Serialize};
use tracing::debug;

use flock_shared::protocol::VoteEntry;

/// Vote state for one conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VoteBoard {
    entries: Vec<VoteEntry>,
    /// Name of the pinned/assigned venue. Always listed first and retained
    /// as a zero-vote placeholder when its count drops to zero.
    pinned: Option<String>,
}

impl VoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cast (or switch) a vote. Returns `true` if local state changed.
    pub fn cast_vote(&mut self, venue_name: &str, venue_id: Option<&str>, voter: &str) -> bool {
        // Already voting for this venue: nothing to do.
        if self
            .entries
            .iter()
            .any(|e| e.venue_name == venue_name && e.voters.iter().any(|v| v == voter))
        {
            return false;
        }

        self.retract(voter);

        match self.entries.iter_mut().find(|e| e.venue_name == venue_name) {
            Some(entry) => {
                entry.voters.push(voter.to_string());
                entry.vote_count += 1;
                if entry.venue_id.is_none() {
                    entry.venue_id = venue_id.map(str::to_string);
                }
            }
            None => {
                self.entries.push(VoteEntry {
                    venue_name: venue_name.to_string(),
                    venue_id: venue_id.map(str::to_string),
                    vote_count: 1,
                    voters: vec![voter.to_string()],
                });
            }
        }

        debug!(venue = venue_name, voter, "vote cast");
        true
    }

    /// Remove a voter from whichever entry currently holds their vote, then
    /// prune zero-count entries (the pinned venue survives as a placeholder).
    fn retract(&mut self, voter: &str) {
        for entry in &mut self.entries {
            let before = entry.voters.len();
            entry.voters.retain(|v| v != voter);
            if entry.voters.len() != before {
                entry.vote_count = entry.vote_count.saturating_sub(1);
            }
        }
        let pinned = self.pinned.clone();
        self.entries
            .retain(|e| e.vote_count > 0 || pinned.as_deref() == Some(e.venue_name.as_str()));
    }

    /// Replace local state with the server's authoritative vote array
    /// (last write wins).
    pub fn apply_snapshot(&mut self, votes: Vec<VoteEntry>) {
        self.entries = votes;
    }

    /// Pin a venue as the conversation's assigned venue. Creates a zero-vote
    /// placeholder entry if the venue has no votes yet.
    pub fn pin(&mut self, venue_name: &str, venue_id: Option<&str>) {
        self.pinned = Some(venue_name.to_string());
        if !self.entries.iter().any(|e| e.venue_name == venue_name) {
            self.entries.push(VoteEntry {
                venue_name: venue_name.to_string(),
                venue_id: venue_id.map(str::to_string),
                vote_count: 0,
                voters: Vec::new(),
            });
        }
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    /// Entries in display order: pinned first, then descending voter count,
    /// ties keeping prior relative order.
    pub fn display_order(&self) -> Vec<&VoteEntry> {
        let mut entries: Vec<&VoteEntry> = self.entries.iter().collect();
        entries.sort_by_key(|e| {
            let is_pinned = self.pinned.as_deref() == Some(e.venue_name.as_str());
            (!is_pinned, std::cmp::Reverse(e.vote_count))
        });
        entries
    }

    /// Raw entries in insertion order.
    pub fn entries(&self) -> &[VoteEntry] {
        &self.entries
    }

    /// The venue the given voter currently votes for, if any.
    pub fn vote_of(&self, voter: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.voters.iter().any(|v| v == voter))
            .map(|e| e.venue_name.as_str())
    }
}
