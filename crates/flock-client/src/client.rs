//! High-level client facade.
//!
//! [`FlockClient`] owns the shared engine, the socket command channel, the
//! per-conversation timer tasks, the REST client, and the durable cache
//! database. UI screens call its methods; state changes come back through
//! the [`UiEvent`] channel returned by [`FlockClient::connect`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use flock_net::{spawn_socket, SocketCommand, Transport};
use flock_shared::protocol::{
    ClientEvent, FlockInvite, FriendRequest, FriendResponse, InviteResponse, VenuePin,
    VenueSnapshot,
};
use flock_shared::types::{ConversationId, MessageId, UserId};
use flock_store::Database;
use flock_sync::{Draft, SyncEngine};

use crate::api::ApiClient;
use crate::bridge::spawn_bridge;
use crate::config::ClientConfig;
use crate::events::UiEvent;
use crate::session::Session;
use crate::sharing::spawn_sharing_task;
use crate::typing_task::{spawn_typing_task, TypingInput};

/// The connected Flock client.
pub struct FlockClient {
    session: Session,
    engine: Arc<Mutex<SyncEngine>>,
    socket_tx: mpsc::Sender<SocketCommand>,
    api: Arc<ApiClient>,
    db: Option<Mutex<Database>>,
    sharing_tasks: Mutex<HashMap<ConversationId, JoinHandle<()>>>,
    typing_tasks: Mutex<HashMap<ConversationId, mpsc::Sender<TypingInput>>>,
    ui_tx: mpsc::Sender<UiEvent>,
}

impl FlockClient {
    /// Wire up the socket task and the bridge over the given transport.
    ///
    /// Returns the client and the UI event stream.
    pub fn connect(
        session: Session,
        config: &ClientConfig,
        transport: Transport,
        db: Option<Database>,
    ) -> (Self, mpsc::Receiver<UiEvent>) {
        let engine = Arc::new(Mutex::new(SyncEngine::new(
            session.user_id,
            session.display_name.clone(),
        )));

        let (socket_tx, notif_rx) = spawn_socket(transport);
        let (ui_tx, ui_rx) = mpsc::channel(flock_shared::constants::SOCKET_CHANNEL_CAPACITY);
        spawn_bridge(engine.clone(), socket_tx.clone(), notif_rx, ui_tx.clone());

        let mut api = ApiClient::new(
            config.api_base_url.clone(),
            std::time::Duration::from_secs(config.http_timeout_secs),
        );
        if let Some(token) = db
            .as_ref()
            .and_then(|db| db.auth_token().ok().flatten())
        {
            api.set_token(token);
        }

        // Startup housekeeping on the durable caches.
        if let Some(db) = &db {
            match db.purge_expired_searches(Utc::now()) {
                Ok(0) => {}
                Ok(n) => debug!(purged = n, "expired venue searches removed"),
                Err(e) => warn!(error = %e, "search cache purge failed"),
            }
        }

        let client = Self {
            session,
            engine,
            socket_tx,
            api: Arc::new(api),
            db: db.map(Mutex::new),
            sharing_tasks: Mutex::new(HashMap::new()),
            typing_tasks: Mutex::new(HashMap::new()),
            ui_tx,
        };
        (client, ui_rx)
    }

    fn engine(&self) -> anyhow::Result<std::sync::MutexGuard<'_, SyncEngine>> {
        self.engine.lock().map_err(|_| anyhow!("engine lock poisoned"))
    }

    // -- Conversations ------------------------------------------------------

    /// Enter a conversation screen: join its room and clear its unread
    /// counter.
    pub async fn open_conversation(&self, conversation: ConversationId) -> anyhow::Result<()> {
        self.engine()?
            .conversations_mut()
            .open_conversation(conversation);
        self.socket_tx
            .send(SocketCommand::JoinRoom(conversation))
            .await?;
        Ok(())
    }

    /// Leave a conversation screen. The socket task keeps the room joined
    /// while location sharing is active for it.
    pub async fn close_conversation(&self, conversation: ConversationId) -> anyhow::Result<()> {
        self.engine()?.conversations_mut().close_conversation();

        // Dropping the sender ends the conversation's debounce task,
        // flushing a pending stop_typing on the way out.
        self.typing_tasks
            .lock()
            .map_err(|_| anyhow!("typing tasks lock poisoned"))?
            .remove(&conversation);

        self.socket_tx
            .send(SocketCommand::LeaveRoom(conversation))
            .await?;
        Ok(())
    }

    /// Seed a conversation's message list from REST history. Events already
    /// reconciled over the socket are absorbed by the id-dedup guard, and
    /// old messages never bump the unread counter.
    pub async fn load_history(&self, conversation: ConversationId) -> anyhow::Result<()> {
        let history = self.api.fetch_messages(conversation).await?;
        let mut engine = self.engine()?;
        for event in &history {
            engine.conversations_mut().seed_incoming(event);
        }
        Ok(())
    }

    // -- Messaging ----------------------------------------------------------

    /// Send a message: optimistic append, socket emit, stop-typing, and a
    /// fire-and-forget backup POST whose failure is logged and toasted but
    /// never rolled back.
    pub async fn send_message(
        &self,
        conversation: ConversationId,
        draft: Draft,
    ) -> anyhow::Result<MessageId> {
        let (temp_id, emit) = self
            .engine()?
            .send_message(conversation, draft, Utc::now())?;

        let ClientEvent::SendMessage(outgoing) = &emit else {
            return Err(anyhow!("unexpected emit for send"));
        };

        // Backup persistence over HTTP; the socket broadcast is the
        // durability signal for the UI. A failure never rolls back the
        // optimistic message, it only surfaces as a toast.
        let api = self.api.clone();
        let backup = outgoing.clone();
        let ui_tx = self.ui_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = api.persist_message(&backup).await {
                warn!(error = %e, "backup message persistence failed");
                let _ = ui_tx.send(UiEvent::Toast(e.toast_message())).await;
            }
        });

        self.socket_tx.send(SocketCommand::Emit(emit)).await?;
        self.typing_input(conversation, TypingInput::Send).await?;
        Ok(temp_id)
    }

    /// The composer text changed: drive the typing debounce.
    pub async fn on_keystroke(&self, conversation: ConversationId) -> anyhow::Result<()> {
        self.typing_input(conversation, TypingInput::Keystroke).await
    }

    async fn typing_input(
        &self,
        conversation: ConversationId,
        input: TypingInput,
    ) -> anyhow::Result<()> {
        let input_tx = {
            let mut tasks = self
                .typing_tasks
                .lock()
                .map_err(|_| anyhow!("typing tasks lock poisoned"))?;
            tasks
                .entry(conversation)
                .or_insert_with(|| {
                    spawn_typing_task(
                        conversation,
                        self.session.user_id,
                        self.session.display_name.clone(),
                        self.socket_tx.clone(),
                    )
                })
                .clone()
        };
        input_tx.send(input).await?;
        Ok(())
    }

    /// Toggle a reaction on or off and mirror the change to the server.
    pub async fn toggle_reaction(
        &self,
        conversation: ConversationId,
        message_id: MessageId,
        emoji: &str,
    ) -> anyhow::Result<()> {
        let emit = {
            let mut engine = self.engine()?;
            let already = engine
                .conversations()
                .messages(conversation)
                .iter()
                .find(|m| m.id == message_id)
                .map(|m| {
                    m.reactions
                        .iter()
                        .any(|r| r.emoji == emoji && r.user_id == self.session.user_id)
                })
                .unwrap_or(false);

            if already {
                engine.remove_reaction(conversation, message_id, emoji)
            } else {
                engine.add_reaction(conversation, message_id, emoji)
            }
        };

        if let Some(emit) = emit {
            self.socket_tx.send(SocketCommand::Emit(emit)).await?;
        }
        Ok(())
    }

    // -- Votes & venues -----------------------------------------------------

    /// Cast (or switch) a venue vote.
    pub async fn cast_vote(
        &self,
        conversation: ConversationId,
        venue_name: &str,
        venue_id: Option<&str>,
    ) -> anyhow::Result<()> {
        let emit = self.engine()?.cast_vote(conversation, venue_name, venue_id);
        if let Some(emit) = emit {
            self.socket_tx.send(SocketCommand::Emit(emit)).await?;
        } else {
            debug!(venue = venue_name, "vote unchanged, nothing emitted");
        }
        Ok(())
    }

    /// Pin a venue as the conversation's assigned venue.
    pub async fn pin_venue(
        &self,
        conversation: ConversationId,
        venue_name: &str,
        venue_id: Option<&str>,
    ) -> anyhow::Result<()> {
        self.socket_tx
            .send(SocketCommand::Emit(ClientEvent::PinVenue(VenuePin {
                conversation,
                venue_name: venue_name.to_string(),
                venue_id: venue_id.map(str::to_string),
            })))
            .await?;
        Ok(())
    }

    /// Venue text search with the 5-minute local cache in front of the API.
    pub async fn search_venues(&self, query: &str) -> anyhow::Result<Vec<VenueSnapshot>> {
        if let Some(db) = &self.db {
            let cached = {
                let db = db.lock().map_err(|_| anyhow!("db lock poisoned"))?;
                db.cached_search(query, Utc::now())?
            };
            if let Some(venues) = cached {
                debug!(query, "venue search served from cache");
                return Ok(venues);
            }
        }

        let venues = self.api.search_venues(query).await?;

        if let Some(db) = &self.db {
            let db = db.lock().map_err(|_| anyhow!("db lock poisoned"))?;
            db.cache_search(query, &venues, Utc::now())?;
        }
        Ok(venues)
    }

    // -- Live location ------------------------------------------------------

    /// Record a fresh geolocation fix, persisting it as the map's next
    /// starting position.
    pub fn update_fix(&self, lat: f64, lng: f64) -> anyhow::Result<()> {
        self.engine()?.update_local_fix(lat, lng);
        if let Some(db) = &self.db {
            let db = db.lock().map_err(|_| anyhow!("db lock poisoned"))?;
            db.set_last_fix(lat, lng)?;
        }
        Ok(())
    }

    /// Start sharing location in a conversation: immediate emit, retained
    /// room membership, and a 10-second repeat task.
    ///
    /// Fails with [`flock_sync::SyncError::NoKnownPosition`] when no fix has
    /// been recorded yet; the UI shows its banner in that case.
    pub async fn start_sharing(&self, conversation: ConversationId) -> anyhow::Result<()> {
        let emit = self.engine()?.start_sharing(conversation, Utc::now())?;

        self.socket_tx
            .send(SocketCommand::SetRetained(conversation, true))
            .await?;
        self.socket_tx.send(SocketCommand::Emit(emit)).await?;

        let task = spawn_sharing_task(conversation, self.engine.clone(), self.socket_tx.clone());
        let mut tasks = self
            .sharing_tasks
            .lock()
            .map_err(|_| anyhow!("sharing tasks lock poisoned"))?;
        if let Some(previous) = tasks.insert(conversation, task) {
            previous.abort();
        }
        Ok(())
    }

    /// Stop sharing: cancel the repeat task, emit the stop event, release
    /// room retention.
    pub async fn stop_sharing(&self, conversation: ConversationId) -> anyhow::Result<()> {
        let emit = self.engine()?.stop_sharing(conversation);
        let Some(emit) = emit else {
            return Ok(());
        };

        if let Some(task) = self
            .sharing_tasks
            .lock()
            .map_err(|_| anyhow!("sharing tasks lock poisoned"))?
            .remove(&conversation)
        {
            task.abort();
        }

        self.socket_tx.send(SocketCommand::Emit(emit)).await?;
        self.socket_tx
            .send(SocketCommand::SetRetained(conversation, false))
            .await?;
        Ok(())
    }

    // -- Invites & friends --------------------------------------------------

    pub async fn send_flock_invite(&self, invite: FlockInvite) -> anyhow::Result<()> {
        self.socket_tx
            .send(SocketCommand::Emit(ClientEvent::FlockInvite(invite)))
            .await?;
        Ok(())
    }

    pub async fn respond_flock_invite(&self, response: InviteResponse) -> anyhow::Result<()> {
        self.socket_tx
            .send(SocketCommand::Emit(ClientEvent::FlockInviteResponse(
                response,
            )))
            .await?;
        Ok(())
    }

    pub async fn send_friend_request(&self, to_id: UserId) -> anyhow::Result<()> {
        self.socket_tx
            .send(SocketCommand::Emit(ClientEvent::FriendRequest(
                FriendRequest {
                    from_id: self.session.user_id,
                    from_name: self.session.display_name.clone(),
                    to_id,
                },
            )))
            .await?;
        Ok(())
    }

    pub async fn respond_friend_request(&self, response: FriendResponse) -> anyhow::Result<()> {
        self.socket_tx
            .send(SocketCommand::Emit(ClientEvent::FriendResponse(response)))
            .await?;
        Ok(())
    }

    // -- Accessors ----------------------------------------------------------

    /// Shared engine handle, for read access from UI screens.
    pub fn engine_handle(&self) -> Arc<Mutex<SyncEngine>> {
        self.engine.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
