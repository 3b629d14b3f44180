//! The sync engine: one place where every inbound socket event is applied
//! to client state and every local action produces its optimistic update
//! plus the event to emit.
//!
//! [`SyncEngine::apply`] is the single reducer for server events. It returns
//! the [`Notification`]s the UI layer should react to; the bridge in
//! `flock-client` forwards them and handles the side effects that need IO
//! (cancelling the location broadcast task, leaving rooms).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use flock_shared::protocol::{
    ClientEvent, FlockInvite, FriendRequest, FriendResponse, InviteResponse, MemberLocation,
    MessageKind, OutgoingMessage, ReactionEvent, ReplyRef, ServerEvent, VenueSnapshot, VoteCast,
};
use flock_shared::types::{ConversationId, FlockStatus, MessageId, UserId};

use crate::conversation::{ConversationStore, Reconciliation};
use crate::error::{Result, SyncError};
use crate::location::LocationMap;
use crate::typing::RemoteTyping;
use crate::votes::VoteBoard;

/// State changes the UI layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A message was appended or an optimistic entry replaced.
    MessageUpserted {
        conversation: ConversationId,
        message_id: MessageId,
        /// The temp id that was replaced, when this was an own echo.
        replaced: Option<MessageId>,
    },
    /// The remote typing indicator changed.
    TypingChanged {
        conversation: ConversationId,
        typing_user: Option<String>,
    },
    /// A message's reaction set changed.
    ReactionsChanged {
        conversation: ConversationId,
        message_id: MessageId,
    },
    /// The vote leaderboard changed.
    VotesChanged { conversation: ConversationId },
    /// The assigned venue changed.
    VenuePinned {
        conversation: ConversationId,
        venue_name: String,
    },
    /// A member's position was updated or evicted.
    LocationsChanged { conversation: ConversationId },
    /// Local sharing was force-stopped (flock left `confirmed`). The bridge
    /// must cancel the broadcast task and emit the stop event.
    SharingForceStopped { conversation: ConversationId },
    FlockInviteReceived(FlockInvite),
    FlockInviteResponded(InviteResponse),
    FriendRequestReceived(FriendRequest),
    FriendRequestResponded(FriendResponse),
}

/// Fields of a message being composed, before the engine stamps ids on it.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub kind: Option<MessageKind>,
    pub venue: Option<VenueSnapshot>,
    pub image_url: Option<String>,
    pub reply_to: Option<ReplyRef>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Client-side realtime state for the authenticated user.
pub struct SyncEngine {
    local_user: UserId,
    local_name: String,
    conversations: ConversationStore,
    votes: HashMap<ConversationId, VoteBoard>,
    locations: HashMap<ConversationId, LocationMap>,
    remote_typing: HashMap<ConversationId, RemoteTyping>,
    /// Conversations where the local user is actively sharing location.
    sharing: HashSet<ConversationId>,
    /// Last known local position fix, needed before sharing can start.
    last_fix: Option<(f64, f64)>,
}

impl SyncEngine {
    pub fn new(local_user: UserId, local_name: impl Into<String>) -> Self {
        Self {
            local_user,
            local_name: local_name.into(),
            conversations: ConversationStore::new(local_user),
            votes: HashMap::new(),
            locations: HashMap::new(),
            remote_typing: HashMap::new(),
            sharing: HashSet::new(),
            last_fix: None,
        }
    }

    // -- Inbound ------------------------------------------------------------

    /// Apply a server event to local state. Never fails: events that do not
    /// match anything (unknown message ids, duplicate broadcasts) are
    /// absorbed without effect.
    pub fn apply(&mut self, event: &ServerEvent, now: DateTime<Utc>) -> Vec<Notification> {
        match event {
            ServerEvent::NewMessage(msg) => {
                match self.conversations.reconcile_incoming(msg) {
                    Reconciliation::Duplicate => Vec::new(),
                    Reconciliation::Appended => vec![Notification::MessageUpserted {
                        conversation: msg.conversation,
                        message_id: MessageId::Server(msg.id),
                        replaced: None,
                    }],
                    Reconciliation::Replaced(temp) => vec![Notification::MessageUpserted {
                        conversation: msg.conversation,
                        message_id: MessageId::Server(msg.id),
                        replaced: Some(temp),
                    }],
                }
            }

            ServerEvent::UserTyping {
                conversation,
                user_id,
                user_name,
            } => {
                // Our own typing echo is not an indicator.
                if *user_id == self.local_user {
                    return Vec::new();
                }
                self.remote_typing
                    .entry(*conversation)
                    .or_default()
                    .on_typing(user_name, now);
                vec![Notification::TypingChanged {
                    conversation: *conversation,
                    typing_user: Some(user_name.clone()),
                }]
            }

            ServerEvent::UserStoppedTyping {
                conversation,
                user_id,
            } => {
                if *user_id == self.local_user {
                    return Vec::new();
                }
                if let Some(remote) = self.remote_typing.get_mut(conversation) {
                    remote.on_stopped();
                }
                vec![Notification::TypingChanged {
                    conversation: *conversation,
                    typing_user: None,
                }]
            }

            ServerEvent::ReactionAdded(reaction) => {
                if self.conversations.add_reaction(reaction) {
                    vec![Notification::ReactionsChanged {
                        conversation: reaction.conversation,
                        message_id: reaction.message_id.clone(),
                    }]
                } else {
                    Vec::new()
                }
            }

            ServerEvent::ReactionRemoved(reaction) => {
                if self.conversations.remove_reaction(reaction) {
                    vec![Notification::ReactionsChanged {
                        conversation: reaction.conversation,
                        message_id: reaction.message_id.clone(),
                    }]
                } else {
                    Vec::new()
                }
            }

            ServerEvent::NewVote(snapshot) => {
                self.votes
                    .entry(snapshot.conversation)
                    .or_default()
                    .apply_snapshot(snapshot.votes.clone());
                vec![Notification::VotesChanged {
                    conversation: snapshot.conversation,
                }]
            }

            ServerEvent::VenuePinned(pin) => {
                self.votes
                    .entry(pin.conversation)
                    .or_default()
                    .pin(&pin.venue_name, pin.venue_id.as_deref());
                vec![Notification::VenuePinned {
                    conversation: pin.conversation,
                    venue_name: pin.venue_name.clone(),
                }]
            }

            ServerEvent::LocationUpdate(update) => {
                // Our own broadcast comes back through the room; skip it.
                if update.user_id == self.local_user {
                    return Vec::new();
                }
                self.locations
                    .entry(update.conversation)
                    .or_default()
                    .apply_update(update);
                vec![Notification::LocationsChanged {
                    conversation: update.conversation,
                }]
            }

            ServerEvent::MemberStoppedSharing {
                conversation,
                user_id,
            } => {
                let evicted = self
                    .locations
                    .get_mut(conversation)
                    .map(|map| map.remove(*user_id))
                    .unwrap_or(false);
                if evicted {
                    vec![Notification::LocationsChanged {
                        conversation: *conversation,
                    }]
                } else {
                    Vec::new()
                }
            }

            ServerEvent::FlockStatusChanged { flock_id, status } => {
                let conversation = ConversationId::Flock(*flock_id);
                if *status != FlockStatus::Confirmed && self.sharing.remove(&conversation) {
                    info!(%conversation, ?status, "flock left confirmed, force-stopping share");
                    self.locations.remove(&conversation);
                    vec![Notification::SharingForceStopped { conversation }]
                } else {
                    Vec::new()
                }
            }

            ServerEvent::FlockInviteReceived(invite) => {
                vec![Notification::FlockInviteReceived(invite.clone())]
            }
            ServerEvent::FlockInviteResponded(response) => {
                vec![Notification::FlockInviteResponded(response.clone())]
            }
            ServerEvent::FriendRequestReceived(request) => {
                vec![Notification::FriendRequestReceived(request.clone())]
            }
            ServerEvent::FriendRequestResponded(response) => {
                vec![Notification::FriendRequestResponded(response.clone())]
            }
        }
    }

    /// Force-clear stale remote typing indicators whose stop event was lost.
    pub fn poll_remote_typing(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        let mut cleared = Vec::new();
        for (conversation, remote) in &mut self.remote_typing {
            if remote.poll(now) {
                debug!(%conversation, "remote typing indicator force-cleared");
                cleared.push(Notification::TypingChanged {
                    conversation: *conversation,
                    typing_user: None,
                });
            }
        }
        cleared
    }

    // -- Local actions ------------------------------------------------------

    /// Optimistically append a message and build the emit for it.
    ///
    /// The returned event is fire-and-forget: nothing is rolled back if the
    /// socket or the backup HTTP call later fails.
    pub fn send_message(
        &mut self,
        conversation: ConversationId,
        draft: Draft,
        now: DateTime<Utc>,
    ) -> Result<(MessageId, ClientEvent)> {
        let outgoing = OutgoingMessage {
            client_key: Uuid::new_v4(),
            conversation,
            sender_id: self.local_user,
            sender_name: self.local_name.clone(),
            text: draft.text,
            kind: draft.kind.unwrap_or(MessageKind::Text),
            venue: draft.venue,
            image_url: draft.image_url,
            reply_to: draft.reply_to,
        };

        let temp_id = self.conversations.append_optimistic(&outgoing, now)?;
        Ok((temp_id, ClientEvent::SendMessage(outgoing)))
    }

    /// Optimistic reaction toggle-on. Returns the emit when state changed.
    pub fn add_reaction(
        &mut self,
        conversation: ConversationId,
        message_id: MessageId,
        emoji: impl Into<String>,
    ) -> Option<ClientEvent> {
        let event = ReactionEvent {
            conversation,
            message_id,
            emoji: emoji.into(),
            user_id: self.local_user,
            user_name: self.local_name.clone(),
        };
        self.conversations
            .add_reaction(&event)
            .then_some(ClientEvent::AddReaction(event))
    }

    /// Optimistic reaction toggle-off. Returns the emit when state changed.
    pub fn remove_reaction(
        &mut self,
        conversation: ConversationId,
        message_id: MessageId,
        emoji: impl Into<String>,
    ) -> Option<ClientEvent> {
        let event = ReactionEvent {
            conversation,
            message_id,
            emoji: emoji.into(),
            user_id: self.local_user,
            user_name: self.local_name.clone(),
        };
        self.conversations
            .remove_reaction(&event)
            .then_some(ClientEvent::RemoveReaction(event))
    }

    /// Optimistically cast a vote. Returns the emit when state changed; the
    /// server's `new_vote` broadcast will later replace the board wholesale.
    pub fn cast_vote(
        &mut self,
        conversation: ConversationId,
        venue_name: &str,
        venue_id: Option<&str>,
    ) -> Option<ClientEvent> {
        let voter = self.local_name.clone();
        let changed = self
            .votes
            .entry(conversation)
            .or_default()
            .cast_vote(venue_name, venue_id, &voter);

        changed.then(|| {
            ClientEvent::CastVote(VoteCast {
                conversation,
                venue_name: venue_name.to_string(),
                venue_id: venue_id.map(str::to_string),
                voter_id: self.local_user,
                voter_name: voter,
            })
        })
    }

    /// Record the latest local geolocation fix.
    pub fn update_local_fix(&mut self, lat: f64, lng: f64) {
        self.last_fix = Some((lat, lng));
    }

    /// Start sharing location in a conversation. Requires a known fix;
    /// returns the immediate first broadcast. The 10 s repeat interval is
    /// driven by the client layer via [`SyncEngine::location_beat`].
    pub fn start_sharing(
        &mut self,
        conversation: ConversationId,
        now: DateTime<Utc>,
    ) -> Result<ClientEvent> {
        let (lat, lng) = self.last_fix.ok_or(SyncError::NoKnownPosition)?;
        self.sharing.insert(conversation);
        Ok(ClientEvent::ShareLocation(MemberLocation {
            conversation,
            user_id: self.local_user,
            lat,
            lng,
            name: self.local_name.clone(),
            timestamp: now,
        }))
    }

    /// One periodic broadcast while sharing is active.
    pub fn location_beat(
        &self,
        conversation: ConversationId,
        now: DateTime<Utc>,
    ) -> Option<ClientEvent> {
        if !self.sharing.contains(&conversation) {
            return None;
        }
        let (lat, lng) = self.last_fix?;
        Some(ClientEvent::ShareLocation(MemberLocation {
            conversation,
            user_id: self.local_user,
            lat,
            lng,
            name: self.local_name.clone(),
            timestamp: now,
        }))
    }

    /// Stop sharing: clears the conversation's position cache and returns
    /// the stop emit. No-op if sharing was not active.
    pub fn stop_sharing(&mut self, conversation: ConversationId) -> Option<ClientEvent> {
        if !self.sharing.remove(&conversation) {
            return None;
        }
        self.locations.remove(&conversation);
        Some(ClientEvent::StopSharingLocation {
            conversation,
            user_id: self.local_user,
        })
    }

    pub fn is_sharing(&self, conversation: ConversationId) -> bool {
        self.sharing.contains(&conversation)
    }

    // -- Views --------------------------------------------------------------

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn conversations_mut(&mut self) -> &mut ConversationStore {
        &mut self.conversations
    }

    pub fn votes(&self, conversation: ConversationId) -> Option<&VoteBoard> {
        self.votes.get(&conversation)
    }

    pub fn locations(&self, conversation: ConversationId) -> Option<&LocationMap> {
        self.locations.get(&conversation)
    }

    /// Who is currently shown as typing in a conversation.
    pub fn typing_user(&self, conversation: ConversationId) -> Option<&str> {
        self.remote_typing
            .get(&conversation)
            .and_then(|r| r.typing_user())
    }

    pub fn local_user(&self) -> UserId {
        self.local_user
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

#[cfg(test)]
mod tests {
    use flock_shared::protocol::{MessageEvent, VoteEntry, VoteSnapshot};
    use flock_shared::types::FlockId;

    use super::*;

    const LOCAL: UserId = UserId(1);
    const CONV: ConversationId = ConversationId::Flock(FlockId(3));

    fn engine() -> SyncEngine {
        SyncEngine::new(LOCAL, "You")
    }

    fn message_event(id: i64, sender: UserId, text: &str, key: Option<Uuid>) -> ServerEvent {
        ServerEvent::NewMessage(MessageEvent {
            id,
            client_key: key,
            conversation: CONV,
            sender_id: sender,
            sender_name: if sender == LOCAL { "You" } else { "Ada" }.into(),
            text: text.into(),
            kind: MessageKind::Text,
            venue: None,
            image_url: None,
            reply_to: None,
            sent_at: Utc::now(),
        })
    }

    #[test]
    fn send_then_echo_yields_one_message_with_server_id() {
        let mut engine = engine();
        let now = Utc::now();
        let (temp_id, emit) = engine
            .send_message(CONV, Draft::text("hi"), now)
            .unwrap();

        let ClientEvent::SendMessage(outgoing) = emit else {
            panic!("expected send emit");
        };

        let notifs = engine.apply(
            &message_event(55, LOCAL, "hi", Some(outgoing.client_key)),
            now,
        );
        assert_eq!(
            notifs,
            vec![Notification::MessageUpserted {
                conversation: CONV,
                message_id: MessageId::Server(55),
                replaced: Some(temp_id),
            }]
        );
        assert_eq!(engine.conversations().messages(CONV).len(), 1);
    }

    #[test]
    fn duplicate_broadcast_produces_no_notification() {
        let mut engine = engine();
        let event = message_event(55, UserId(2), "hello", None);
        let now = Utc::now();

        assert_eq!(engine.apply(&event, now).len(), 1);
        assert!(engine.apply(&event, now).is_empty());
    }

    #[test]
    fn own_typing_echo_is_ignored() {
        let mut engine = engine();
        let notifs = engine.apply(
            &ServerEvent::UserTyping {
                conversation: CONV,
                user_id: LOCAL,
                user_name: "You".into(),
            },
            Utc::now(),
        );
        assert!(notifs.is_empty());
        assert_eq!(engine.typing_user(CONV), None);
    }

    #[test]
    fn remote_typing_sets_and_force_clears() {
        let mut engine = engine();
        let now = Utc::now();
        engine.apply(
            &ServerEvent::UserTyping {
                conversation: CONV,
                user_id: UserId(2),
                user_name: "Ada".into(),
            },
            now,
        );
        assert_eq!(engine.typing_user(CONV), Some("Ada"));

        let cleared = engine.poll_remote_typing(now + chrono::Duration::milliseconds(5000));
        assert_eq!(cleared.len(), 1);
        assert_eq!(engine.typing_user(CONV), None);
    }

    #[test]
    fn vote_snapshot_replaces_optimistic_board() {
        let mut engine = engine();
        assert!(engine.cast_vote(CONV, "Venue A", None).is_some());

        engine.apply(
            &ServerEvent::NewVote(VoteSnapshot {
                conversation: CONV,
                votes: vec![VoteEntry {
                    venue_name: "Venue B".into(),
                    venue_id: None,
                    vote_count: 2,
                    voters: vec!["Ada".into(), "You".into()],
                }],
            }),
            Utc::now(),
        );

        let board = engine.votes(CONV).unwrap();
        assert_eq!(board.entries().len(), 1);
        assert_eq!(board.entries()[0].venue_name, "Venue B");
    }

    #[test]
    fn sharing_requires_a_known_fix() {
        let mut engine = engine();
        assert_eq!(
            engine.start_sharing(CONV, Utc::now()),
            Err(SyncError::NoKnownPosition)
        );

        engine.update_local_fix(51.5, -0.1);
        let emit = engine.start_sharing(CONV, Utc::now()).unwrap();
        assert!(matches!(emit, ClientEvent::ShareLocation(_)));
        assert!(engine.is_sharing(CONV));
        assert!(engine.location_beat(CONV, Utc::now()).is_some());
    }

    #[test]
    fn stop_sharing_clears_the_position_cache() {
        let mut engine = engine();
        engine.update_local_fix(51.5, -0.1);
        engine.start_sharing(CONV, Utc::now()).unwrap();

        engine.apply(
            &ServerEvent::LocationUpdate(MemberLocation {
                conversation: CONV,
                user_id: UserId(2),
                lat: 51.0,
                lng: 0.0,
                name: "Ada".into(),
                timestamp: Utc::now(),
            }),
            Utc::now(),
        );
        assert_eq!(engine.locations(CONV).unwrap().len(), 1);

        assert!(engine.stop_sharing(CONV).is_some());
        assert!(!engine.is_sharing(CONV));
        assert!(engine.locations(CONV).is_none());
        assert!(engine.location_beat(CONV, Utc::now()).is_none());
        // Second stop is a no-op.
        assert!(engine.stop_sharing(CONV).is_none());
    }

    #[test]
    fn flock_leaving_confirmed_force_stops_sharing() {
        let mut engine = engine();
        engine.update_local_fix(51.5, -0.1);
        engine.start_sharing(CONV, Utc::now()).unwrap();

        let notifs = engine.apply(
            &ServerEvent::FlockStatusChanged {
                flock_id: FlockId(3),
                status: FlockStatus::Completed,
            },
            Utc::now(),
        );
        assert_eq!(
            notifs,
            vec![Notification::SharingForceStopped { conversation: CONV }]
        );
        assert!(!engine.is_sharing(CONV));
    }

    #[test]
    fn confirmed_status_does_not_stop_sharing() {
        let mut engine = engine();
        engine.update_local_fix(51.5, -0.1);
        engine.start_sharing(CONV, Utc::now()).unwrap();

        let notifs = engine.apply(
            &ServerEvent::FlockStatusChanged {
                flock_id: FlockId(3),
                status: FlockStatus::Confirmed,
            },
            Utc::now(),
        );
        assert!(notifs.is_empty());
        assert!(engine.is_sharing(CONV));
    }

    #[test]
    fn own_location_echo_is_skipped() {
        let mut engine = engine();
        let notifs = engine.apply(
            &ServerEvent::LocationUpdate(MemberLocation {
                conversation: CONV,
                user_id: LOCAL,
                lat: 51.0,
                lng: 0.0,
                name: "You".into(),
                timestamp: Utc::now(),
            }),
            Utc::now(),
        );
        assert!(notifs.is_empty());
    }

    #[test]
    fn invite_events_surface_as_notifications() {
        let mut engine = engine();
        let invite = FlockInvite {
            flock_id: FlockId(9),
            flock_name: "Friday".into(),
            inviter_id: UserId(2),
            inviter_name: "Ada".into(),
            invitee_id: LOCAL,
        };
        let notifs = engine.apply(&ServerEvent::FlockInviteReceived(invite.clone()), Utc::now());
        assert_eq!(notifs, vec![Notification::FlockInviteReceived(invite)]);
    }

    #[test]
    fn reaction_echo_of_local_toggle_is_absorbed() {
        let mut engine = engine();
        engine.apply(&message_event(10, UserId(2), "hello", None), Utc::now());

        let emit = engine.add_reaction(CONV, MessageId::Server(10), "🔥");
        assert!(emit.is_some());

        // The server echoes the same toggle back; idempotence absorbs it.
        let ClientEvent::AddReaction(reaction) = emit.unwrap() else {
            panic!("expected reaction emit");
        };
        let notifs = engine.apply(&ServerEvent::ReactionAdded(reaction), Utc::now());
        assert!(notifs.is_empty());
        assert_eq!(engine.conversations().messages(CONV)[0].reactions.len(), 1);
    }
}
